//! CSV import/export for tables.
//!
//! Tables are rebuilt fresh from storage at the start of every operation and
//! written out whole; nothing is patched in place. [`read_header`] reads only
//! the first line so the batch grouper never has to load full files.

use crate::error::{Result, SheetflowError};
use sheetflow_engine::engine::{Table, Value};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Parse a CSV file into a table. The first line is the header row.
pub fn read_table(path: &Path) -> Result<Table> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();

    let header_line = lines.next().ok_or(SheetflowError::EmptyCsv)?;
    let headers = parse_csv_line(header_line);
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SheetflowError::NoHeader);
    }

    let width = headers.len();
    let mut rows = Vec::new();
    for line in lines {
        let mut row: Vec<Value> = parse_csv_line(line)
            .iter()
            .map(|field| parse_csv_field(field))
            .collect();
        if row.len() < width {
            row.resize(width, Value::Empty);
        }
        rows.push(row);
    }

    Ok(Table::new(headers, rows))
}

/// Read only the header row of a CSV file (grouping fast path).
pub fn read_header(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(SheetflowError::EmptyCsv);
    }
    let headers = parse_csv_line(line.trim_end_matches(['\r', '\n']));
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SheetflowError::NoHeader);
    }
    Ok(headers)
}

/// Write a table as CSV, header row first.
pub fn write_table(path: &Path, table: &Table) -> Result<()> {
    let width = table
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(table.headers.len());

    let mut file = std::fs::File::create(path)?;

    let mut header_fields: Vec<String> =
        table.headers.iter().map(|h| escape_csv_field(h)).collect();
    header_fields.resize(width, String::new());
    writeln!(file, "{}", header_fields.join(","))?;

    for row in &table.rows {
        let mut fields: Vec<String> = row
            .iter()
            .map(|v| escape_csv_field(&v.to_string()))
            .collect();
        fields.resize(width, String::new());
        writeln!(file, "{}", fields.join(","))?;
    }

    Ok(())
}

/// Parse a single CSV line, handling quoted fields.
pub(crate) fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                // Check for escaped quote
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => {
                    in_quotes = true;
                    field_was_quoted = true;
                }
                ',' => {
                    if field_was_quoted {
                        fields.push(current.clone());
                    } else {
                        fields.push(current.trim().to_string());
                    }
                    current = String::new();
                    field_was_quoted = false;
                }
                _ => current.push(c),
            }
        }
    }
    if field_was_quoted {
        fields.push(current);
    } else {
        fields.push(current.trim().to_string());
    }
    fields
}

/// Parse a CSV field into a cell value.
/// - Empty string -> Empty
/// - Valid number -> Number (unless it has leading zeros like "007")
/// - Otherwise -> Text
pub(crate) fn parse_csv_field(field: &str) -> Value {
    if field.is_empty() {
        return Value::Empty;
    }

    // Keep explicit surrounding whitespace (typically from quoted CSV fields).
    let trimmed = field.trim();
    if field != trimmed {
        return Value::Text(field.to_string());
    }

    // Preserve strings that look like numbers but have leading zeros
    // (e.g. "007") unless they're just "0" or start with "0.".
    if trimmed.starts_with('0')
        && trimmed.len() > 1
        && !trimmed.starts_with("0.")
        && trimmed.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
    {
        return Value::Text(trimmed.to_string());
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        return Value::Number(n);
    }

    Value::Text(trimmed.to_string())
}

/// Escape a field for CSV output.
fn escape_csv_field(field: &str) -> String {
    // Guard against CSV formula injection in spreadsheet apps.
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains(',')
        || safe_field.contains('"')
        || safe_field.contains('\n')
        || safe_field.contains('\r')
    {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_csv_line_simple() {
        assert_eq!(parse_csv_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_csv_line_quoted() {
        assert_eq!(
            parse_csv_line(r#"a,"hello, world",c"#),
            vec!["a", "hello, world", "c"]
        );
    }

    #[test]
    fn test_parse_csv_line_escaped_quotes() {
        assert_eq!(
            parse_csv_line(r#"a,"say ""hello""",c"#),
            vec!["a", r#"say "hello""#, "c"]
        );
    }

    #[test]
    fn test_parse_csv_field_types() {
        assert_eq!(parse_csv_field("42"), Value::Number(42.0));
        assert_eq!(parse_csv_field("0"), Value::Number(0.0));
        assert_eq!(parse_csv_field("007"), Value::Text("007".to_string()));
        assert_eq!(parse_csv_field(""), Value::Empty);
        assert_eq!(parse_csv_field("0.5"), Value::Number(0.5));
    }

    #[test]
    fn test_read_table_pads_short_rows() {
        let file = write_fixture("ID,Qty,Note\n1,5\n2,0,ok\n");
        let table = read_table(file.path()).unwrap();
        assert_eq!(table.headers, vec!["ID", "Qty", "Note"]);
        assert_eq!(table.rows[0].len(), 3);
        assert_eq!(table.cell(0, 2), Value::Empty);
        assert_eq!(table.cell(1, 2), Value::Text("ok".to_string()));
    }

    #[test]
    fn test_read_table_empty_file_errors() {
        let file = write_fixture("");
        assert!(matches!(
            read_table(file.path()),
            Err(SheetflowError::EmptyCsv)
        ));
    }

    #[test]
    fn test_read_header_reads_first_line_only() {
        let file = write_fixture("ID,Qty\n1,5\n2,0\n");
        assert_eq!(read_header(file.path()).unwrap(), vec!["ID", "Qty"]);
    }

    #[test]
    fn test_read_header_blank_header_errors() {
        let file = write_fixture(",,\n1,2,3\n");
        assert!(matches!(
            read_header(file.path()),
            Err(SheetflowError::NoHeader)
        ));
    }

    #[test]
    fn test_write_table_round_trip() {
        let table = Table::new(
            vec!["ID".into(), "Name".into()],
            vec![
                vec![Value::Number(1.0), Value::Text("with,comma".into())],
                vec![Value::Number(2.0), Value::Empty],
            ],
        );
        let out = NamedTempFile::new().unwrap();
        write_table(out.path(), &table).unwrap();
        let back = read_table(out.path()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_write_table_guards_formula_injection() {
        let table = Table::new(
            vec!["A".into()],
            vec![vec![Value::Text("=1+1".into())]],
        );
        let out = NamedTempFile::new().unwrap();
        write_table(out.path(), &table).unwrap();
        let contents = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(contents.lines().nth(1), Some("'=1+1"));
    }
}
