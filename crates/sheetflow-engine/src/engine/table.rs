//! Ordered header + rows table and its script-facing API.
//!
//! A [`Table`] is the engine's unit of data: one header row and an ordered
//! list of data rows. Tables are plain values; every instruction execution
//! works on its own copy and replaces the whole table on success, so a
//! failed run never leaves a half-written table behind.
//!
//! Structural scripts manipulate tables through the small allow-listed
//! method set registered by [`register_table_api`]; nothing else of the host
//! is reachable from a script.

use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, Map, NativeCallContext, Position};
use serde::{Deserialize, Serialize};

use super::value::Value;

/// An in-memory table: header row plus data rows.
///
/// Column names are not guaranteed unique; the first occurrence wins when
/// resolving by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Value>>) -> Table {
        Table { headers, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Index of the first column whose trimmed header equals `name` (trimmed).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim();
        self.headers.iter().position(|h| h.trim() == wanted)
    }

    /// Cell at (row, col); `Value::Empty` for positions inside the row count
    /// but beyond a short row's width.
    pub fn cell(&self, row: usize, col: usize) -> Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .cloned()
            .unwrap_or(Value::Empty)
    }

    /// Write a cell, padding the row with empty cells if the column index is
    /// beyond the row's current width. Writes past the row extent are
    /// dropped: returns false and the table is unchanged.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Value) -> bool {
        let Some(cells) = self.rows.get_mut(row) else {
            return false;
        };
        if cells.len() <= col {
            cells.resize(col + 1, Value::Empty);
        }
        cells[col] = value;
        true
    }

    /// One data row as a Rhai map keyed by (trimmed) header name.
    /// On duplicate headers the first occurrence wins.
    pub fn row_map(&self, index: usize) -> Map {
        let mut map = Map::new();
        if let Some(row) = self.rows.get(index) {
            for (col, header) in self.headers.iter().enumerate() {
                let key = header.trim();
                if key.is_empty() || map.contains_key(key) {
                    continue;
                }
                let value = row.get(col).cloned().unwrap_or(Value::Empty);
                map.insert(key.into(), value.to_dynamic());
            }
        }
        map
    }

    /// All data rows as an array of maps (the `rows` binding).
    pub fn rows_array(&self) -> Array {
        (0..self.rows.len())
            .map(|i| Dynamic::from(self.row_map(i)))
            .collect()
    }

    fn sorted_by(&self, col: usize, ascending: bool) -> Table {
        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let left = a.get(col).cloned().unwrap_or(Value::Empty);
            let right = b.get(col).cloned().unwrap_or(Value::Empty);
            let ord = left.sort_cmp(&right);
            if ascending { ord } else { ord.reverse() }
        });
        Table::new(self.headers.clone(), rows)
    }

    fn without_column(&self, col: usize) -> Table {
        let mut headers = self.headers.clone();
        headers.remove(col);
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut row = row.clone();
                if col < row.len() {
                    row.remove(col);
                }
                row
            })
            .collect();
        Table::new(headers, rows)
    }
}

fn unknown_column(name: &str) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(format!("unknown column: {}", name).into(), Position::NONE).into()
}

/// Register the `Table` type and its allow-listed manipulation methods.
///
/// Kept deliberately small: structural scripts get exactly these primitives
/// plus the scalar function library, and nothing else.
pub fn register_table_api(engine: &mut Engine) {
    engine.register_type_with_name::<Table>("Table");

    engine.register_fn("row_count", |t: &mut Table| -> i64 { t.rows.len() as i64 });
    engine.register_fn("column_count", |t: &mut Table| -> i64 {
        t.headers.len() as i64
    });
    engine.register_fn("headers", |t: &mut Table| -> Array {
        t.headers.iter().map(|h| Dynamic::from(h.clone())).collect()
    });

    // column("Qty"): all values of one column as an array.
    engine.register_fn(
        "column",
        |t: &mut Table, name: &str| -> Result<Array, Box<EvalAltResult>> {
            let col = t.column_index(name).ok_or_else(|| unknown_column(name))?;
            Ok((0..t.rows.len())
                .map(|row| t.cell(row, col).to_dynamic())
                .collect())
        },
    );

    engine.register_fn(
        "sort_by",
        |t: &mut Table, name: &str| -> Result<Table, Box<EvalAltResult>> {
            let col = t.column_index(name).ok_or_else(|| unknown_column(name))?;
            Ok(t.sorted_by(col, true))
        },
    );
    engine.register_fn(
        "sort_by",
        |t: &mut Table, name: &str, ascending: bool| -> Result<Table, Box<EvalAltResult>> {
            let col = t.column_index(name).ok_or_else(|| unknown_column(name))?;
            Ok(t.sorted_by(col, ascending))
        },
    );

    // filter(|row| ...): keep rows where the predicate is true.
    engine.register_fn(
        "filter",
        |ctx: NativeCallContext,
         t: &mut Table,
         pred: FnPtr|
         -> Result<Table, Box<EvalAltResult>> {
            let mut rows = Vec::new();
            for (i, row) in t.rows.iter().enumerate() {
                let keep: bool = pred.call_within_context(&ctx, (t.row_map(i),))?;
                if keep {
                    rows.push(row.clone());
                }
            }
            Ok(Table::new(t.headers.clone(), rows))
        },
    );

    engine.register_fn(
        "drop_column",
        |t: &mut Table, name: &str| -> Result<Table, Box<EvalAltResult>> {
            let col = t.column_index(name).ok_or_else(|| unknown_column(name))?;
            Ok(t.without_column(col))
        },
    );

    engine.register_fn(
        "rename_column",
        |t: &mut Table, old: &str, new: &str| -> Result<Table, Box<EvalAltResult>> {
            let col = t.column_index(old).ok_or_else(|| unknown_column(old))?;
            let mut table = t.clone();
            table.headers[col] = new.to_string();
            Ok(table)
        },
    );

    // head(n): first n rows, for derived previews.
    engine.register_fn("head", |t: &mut Table, n: i64| -> Table {
        let n = usize::try_from(n).unwrap_or(0).min(t.rows.len());
        Table::new(t.headers.clone(), t.rows[..n].to_vec())
    });

    // rows(): all data rows as maps, for iteration across tables.
    engine.register_fn("rows", |t: &mut Table| -> Array { t.rows_array() });

    // push_row(#{...}): append one row, matching values to headers by name.
    engine.register_fn("push_row", |t: &mut Table, row: Map| -> Table {
        let cells = t
            .headers
            .iter()
            .map(|h| {
                row.get(h.trim())
                    .map(Value::from_dynamic)
                    .unwrap_or(Value::Empty)
            })
            .collect();
        let mut table = t.clone();
        table.rows.push(cells);
        table
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_structural_engine;
    use rhai::Scope;

    fn sample() -> Table {
        Table::new(
            vec!["ID".into(), "Qty".into()],
            vec![
                vec![Value::Number(1.0), Value::Number(5.0)],
                vec![Value::Number(2.0), Value::Number(0.0)],
                vec![Value::Number(3.0), Value::Number(10.0)],
            ],
        )
    }

    #[test]
    fn test_column_index_first_occurrence_wins() {
        let table = Table::new(vec!["A".into(), " A ".into(), "B".into()], vec![]);
        assert_eq!(table.column_index("A"), Some(0));
        assert_eq!(table.column_index(" B "), Some(2));
        assert_eq!(table.column_index("C"), None);
    }

    #[test]
    fn test_set_cell_pads_width_but_not_rows() {
        let mut table = sample();
        assert!(table.set_cell(0, 5, Value::Text("x".into())));
        assert_eq!(table.rows[0].len(), 6);
        assert_eq!(table.cell(0, 4), Value::Empty);
        // Writing past the row extent is dropped.
        assert!(!table.set_cell(99, 0, Value::Number(1.0)));
        assert_eq!(table.row_count(), 3);
    }

    #[test]
    fn test_row_map_binds_headers() {
        let table = sample();
        let map = table.row_map(2);
        assert_eq!(map.get("Qty").unwrap().as_float().unwrap(), 10.0);
        assert_eq!(map.get("ID").unwrap().as_float().unwrap(), 3.0);
    }

    #[test]
    fn test_script_sort_by_descending() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        engine
            .run_with_scope(&mut scope, r#"table = table.sort_by("Qty", false);"#)
            .unwrap();
        let table: Table = scope.get_value("table").unwrap();
        assert_eq!(table.cell(0, 1), Value::Number(10.0));
        assert_eq!(table.cell(2, 1), Value::Number(0.0));
    }

    #[test]
    fn test_script_filter_with_closure() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        engine
            .run_with_scope(&mut scope, r#"table = table.filter(|row| row["Qty"] > 0);"#)
            .unwrap();
        let table: Table = scope.get_value("table").unwrap();
        assert_eq!(table.row_count(), 2);
    }

    #[test]
    fn test_script_drop_and_rename_column() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        engine
            .run_with_scope(
                &mut scope,
                r#"
                table = table.rename_column("Qty", "Quantity");
                table = table.drop_column("ID");
                "#,
            )
            .unwrap();
        let table: Table = scope.get_value("table").unwrap();
        assert_eq!(table.headers, vec!["Quantity".to_string()]);
        assert_eq!(table.cell(0, 0), Value::Number(5.0));
    }

    #[test]
    fn test_script_column_head_and_headers() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        let total: f64 = engine
            .eval_with_scope(&mut scope, r#"SUM(table.column("Qty"))"#)
            .unwrap();
        assert_eq!(total, 15.0);
        engine
            .run_with_scope(&mut scope, "table = table.head(2);")
            .unwrap();
        let table: Table = scope.get_value("table").unwrap();
        assert_eq!(table.row_count(), 2);
        let names: Array = engine
            .eval_with_scope(&mut scope, "table.headers()")
            .unwrap();
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn test_script_push_row_matches_headers() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        engine
            .run_with_scope(
                &mut scope,
                r#"table = table.push_row(#{ "Qty": 7, "ID": 4 });"#,
            )
            .unwrap();
        let table: Table = scope.get_value("table").unwrap();
        assert_eq!(table.row_count(), 4);
        assert_eq!(table.cell(3, 0), Value::Number(4.0));
        assert_eq!(table.cell(3, 1), Value::Number(7.0));
    }

    #[test]
    fn test_script_unknown_column_is_an_error() {
        let engine = create_structural_engine();
        let mut scope = Scope::new();
        scope.push("table", sample());
        let result = engine.run_with_scope(&mut scope, r#"table = table.sort_by("Nope");"#);
        assert!(result.is_err());
    }
}
