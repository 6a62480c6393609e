//! Applying instructions to tables.
//!
//! Every call builds a fresh engine and scope, runs the instruction's script,
//! and returns a new table. Structural scripts rebind `table`; formula
//! expressions read `row` (column mode) or `rows` (cell mode) and may not
//! contain statements or assignments.

use crate::error::{Result, SheetflowError};
use crate::instruction::{Action, Instruction, Mode};
use crate::resolver::resolve_target;
use sheetflow_engine::engine::{
    create_formula_engine, create_structural_engine, formula_scope, structural_scope, CellRef,
    Dynamic, Table, Value,
};

/// Where the instruction wrote its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteTarget {
    /// A structural script replaced the whole table.
    WholeTable,
    /// A column-mode formula filled this column.
    Column { index: usize },
    /// A cell-mode formula wrote one cell. `dropped` is set when the target
    /// row was past the end of the table and the write went nowhere.
    Cell {
        col: usize,
        row: usize,
        dropped: bool,
    },
}

/// The result of applying an instruction.
#[derive(Debug, Clone)]
pub struct Applied {
    pub table: Table,
    pub target: WriteTarget,
}

/// Apply a single instruction to a table.
pub fn apply(table: Table, instruction: &Instruction) -> Result<Applied> {
    instruction.validate()?;
    match instruction.action {
        Action::Structural => apply_structural(table, &instruction.expression),
        Action::Formula => match instruction.mode {
            Mode::Column => apply_column(table, instruction),
            Mode::Cell => apply_cell(table, instruction),
            // validate() already rejected this combination
            Mode::Structural => unreachable!("validated instruction"),
        },
    }
}

fn apply_structural(table: Table, script: &str) -> Result<Applied> {
    let engine = create_structural_engine();
    let mut scope = structural_scope(table);

    engine
        .run_with_scope(&mut scope, script)
        .map_err(|e| SheetflowError::Execution(e.to_string()))?;

    let table = scope
        .get_value::<Table>("table")
        .ok_or(SheetflowError::MissingResult("table"))?;

    tracing::debug!(
        rows = table.row_count(),
        cols = table.column_count(),
        "structural script produced table"
    );
    Ok(Applied {
        table,
        target: WriteTarget::WholeTable,
    })
}

fn apply_column(mut table: Table, instruction: &Instruction) -> Result<Applied> {
    let index = resolve_target(&mut table.headers, &instruction.target);

    let engine = create_formula_engine();
    let mut scope = formula_scope(&table);

    let row_count = table.row_count();
    match engine.compile_expression(&instruction.expression) {
        Ok(ast) => {
            for i in 0..row_count {
                scope.set_value("row", table.row_map(i));
                let value = match engine.eval_ast_with_scope::<Dynamic>(&mut scope, &ast) {
                    Ok(d) => Value::from_dynamic(&d),
                    Err(e) => Value::Text(format!("Error: {e}")),
                };
                table.set_cell(i, index, value);
            }
        }
        Err(e) => {
            // The expression never compiled; every row gets the same marker
            // so the output still lines up with its inputs.
            tracing::warn!(error = %e, "formula failed to compile");
            let sentinel = Value::Text(format!("Error: {e}"));
            for i in 0..row_count {
                table.set_cell(i, index, sentinel.clone());
            }
        }
    }

    Ok(Applied {
        table,
        target: WriteTarget::Column { index },
    })
}

fn apply_cell(mut table: Table, instruction: &Instruction) -> Result<Applied> {
    let cell = CellRef::from_str(&instruction.target).ok_or_else(|| {
        SheetflowError::MalformedInstruction(format!(
            "cell target {:?} is not a valid cell reference",
            instruction.target
        ))
    })?;

    let engine = create_formula_engine();
    let mut scope = formula_scope(&table);
    let ast = engine
        .compile_expression(&instruction.expression)
        .map_err(|e| SheetflowError::Execution(e.to_string()))?;
    let value = engine
        .eval_ast_with_scope::<Dynamic>(&mut scope, &ast)
        .map(|d| Value::from_dynamic(&d))
        .map_err(|e| SheetflowError::Execution(e.to_string()))?;

    // Sheet row 1 is the header row; data rows start at sheet row 2.
    let target = if cell.row == 0 {
        if cell.col >= table.headers.len() {
            table.headers.resize(cell.col + 1, String::new());
        }
        table.headers[cell.col] = value.to_string();
        WriteTarget::Cell {
            col: cell.col,
            row: 0,
            dropped: false,
        }
    } else {
        let row = cell.row - 1;
        let dropped = !table.set_cell(row, cell.col, value);
        if dropped {
            tracing::warn!(target = %instruction.target, "cell write past the last row, dropped");
        }
        WriteTarget::Cell {
            col: cell.col,
            row: cell.row,
            dropped,
        }
    };

    Ok(Applied { table, target })
}

/// Run a script over several named tables at once.
///
/// The script sees a `tables` map keyed by name and must assign its output
/// to `result`.
pub fn apply_multi(tables: Vec<(String, Table)>, script: &str) -> Result<Table> {
    let engine = create_structural_engine();
    let mut scope = rhai::Scope::new();

    let mut map = rhai::Map::new();
    for (name, table) in tables {
        map.insert(name.into(), Dynamic::from(table));
    }
    scope.push("tables", map);
    scope.push("result", Dynamic::UNIT);

    engine
        .run_with_scope(&mut scope, script)
        .map_err(|e| SheetflowError::Execution(e.to_string()))?;

    scope
        .get_value::<Table>("result")
        .ok_or(SheetflowError::MissingResult("result"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty_table() -> Table {
        Table::new(
            vec!["ID".into(), "Qty".into()],
            vec![
                vec![Value::Number(1.0), Value::Number(5.0)],
                vec![Value::Number(2.0), Value::Empty],
                vec![Value::Number(3.0), Value::Number(10.0)],
            ],
        )
    }

    fn column_formula(expression: &str, target: &str) -> Instruction {
        Instruction {
            action: Action::Formula,
            expression: expression.to_string(),
            mode: Mode::Column,
            target: target.to_string(),
            display_formula: String::new(),
            explanation: String::new(),
        }
    }

    #[test]
    fn test_column_formula_new_column() {
        let instr = column_formula("MULTIPLY(row[\"Qty\"], 2)", "Total");
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(applied.target, WriteTarget::Column { index: 2 });
        assert_eq!(applied.table.headers[2], "Total");
        assert_eq!(applied.table.cell(0, 2), Value::Number(10.0));
        assert_eq!(applied.table.cell(1, 2), Value::Number(0.0));
        assert_eq!(applied.table.cell(2, 2), Value::Number(20.0));
    }

    #[test]
    fn test_column_formula_overwrites_existing() {
        let instr = column_formula("MULTIPLY(row[\"Qty\"], 10)", "Qty");
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(applied.target, WriteTarget::Column { index: 1 });
        assert_eq!(applied.table.column_count(), 2);
        assert_eq!(applied.table.cell(0, 1), Value::Number(50.0));
    }

    #[test]
    fn test_column_formula_bad_call_marks_rows() {
        let instr = column_formula("NOPE(row[\"Qty\"])", "Out");
        let applied = apply(qty_table(), &instr).unwrap();
        for i in 0..3 {
            match applied.table.cell(i, 2) {
                Value::Text(t) => assert!(t.starts_with("Error: "), "got {t}"),
                other => panic!("expected error marker, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_column_formula_rejects_statements() {
        // Compile failure, so every row carries the same marker.
        let instr = column_formula("let x = 1; x", "Out");
        let applied = apply(qty_table(), &instr).unwrap();
        let first = applied.table.cell(0, 2);
        assert!(matches!(&first, Value::Text(t) if t.starts_with("Error: ")));
        assert_eq!(applied.table.cell(2, 2), first);
    }

    #[test]
    fn test_structural_script_replaces_table() {
        let instr = Instruction {
            action: Action::Structural,
            expression: "table = table.sort_by(\"Qty\");".to_string(),
            mode: Mode::Structural,
            target: String::new(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(applied.target, WriteTarget::WholeTable);
        assert_eq!(applied.table.cell(0, 1), Value::Number(5.0));
        // Empty cells sort last.
        assert_eq!(applied.table.cell(2, 1), Value::Empty);
    }

    #[test]
    fn test_structural_script_must_keep_table_bound() {
        let instr = Instruction {
            action: Action::Structural,
            expression: "table = 42;".to_string(),
            mode: Mode::Structural,
            target: String::new(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        assert!(matches!(
            apply(qty_table(), &instr),
            Err(SheetflowError::MissingResult("table"))
        ));
    }

    #[test]
    fn test_cell_formula_writes_one_cell() {
        let instr = Instruction {
            action: Action::Formula,
            expression: "SUM(rows.map(|r| r[\"Qty\"]))".to_string(),
            mode: Mode::Cell,
            target: "C2".to_string(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(
            applied.target,
            WriteTarget::Cell {
                col: 2,
                row: 1,
                dropped: false
            }
        );
        assert_eq!(applied.table.cell(0, 2), Value::Number(15.0));
    }

    #[test]
    fn test_cell_formula_row_one_writes_header() {
        let instr = Instruction {
            action: Action::Formula,
            expression: "\"Grand Total\"".to_string(),
            mode: Mode::Cell,
            target: "C1".to_string(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(applied.table.headers[2], "Grand Total");
    }

    #[test]
    fn test_cell_formula_past_last_row_is_dropped() {
        let instr = Instruction {
            action: Action::Formula,
            expression: "1 + 1".to_string(),
            mode: Mode::Cell,
            target: "A99".to_string(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        let applied = apply(qty_table(), &instr).unwrap();
        assert_eq!(applied.table.row_count(), 3);
        assert!(matches!(
            applied.target,
            WriteTarget::Cell { dropped: true, .. }
        ));
    }

    #[test]
    fn test_cell_formula_bad_target_errors() {
        let instr = Instruction {
            action: Action::Formula,
            expression: "1".to_string(),
            mode: Mode::Cell,
            target: "not-a-cell".to_string(),
            display_formula: String::new(),
            explanation: String::new(),
        };
        assert!(matches!(
            apply(qty_table(), &instr),
            Err(SheetflowError::MalformedInstruction(_))
        ));
    }

    #[test]
    fn test_apply_multi_joins_tables() {
        let orders = qty_table();
        let extra = Table::new(
            vec!["ID".into(), "Qty".into()],
            vec![vec![Value::Number(9.0), Value::Number(1.0)]],
        );
        let script = r#"
            let out = tables["orders"];
            for r in tables["extra"].rows() {
                out = out.push_row(r);
            }
            result = out;
        "#;
        let joined = apply_multi(
            vec![("orders".into(), orders), ("extra".into(), extra)],
            script,
        )
        .unwrap();
        assert_eq!(joined.row_count(), 4);
        assert_eq!(joined.cell(3, 0), Value::Number(9.0));
    }

    #[test]
    fn test_apply_multi_requires_result() {
        let script = "let x = tables[\"t\"].row_count();";
        let err = apply_multi(vec![("t".into(), qty_table())], script);
        assert!(matches!(err, Err(SheetflowError::MissingResult("result"))));
    }
}
