//! Column target resolution.
//!
//! A formula target can name an existing column, a spreadsheet column letter,
//! or describe a brand new column. Resolution tries those in order, so a
//! header literally named "B" always wins over the letter interpretation.

use sheetflow_engine::engine::parse_column_letters;

/// Resolve a target descriptor to a column index, extending `headers` if the
/// target lands beyond or outside the current columns.
///
/// Tiers, in order:
/// 1. Exact (trimmed) match against an existing header name.
/// 2. A short run of ASCII letters, read as a spreadsheet column ("A", "AA").
///    Headers are padded with blanks up to that index, and the descriptor is
///    written into the header slot if it was blank.
/// 3. Anything else is a new column name, appended at the end.
pub fn resolve_target(headers: &mut Vec<String>, target: &str) -> usize {
    let trimmed = target.trim();

    if let Some(index) = headers.iter().position(|h| h.trim() == trimmed) {
        return index;
    }

    if trimmed.len() <= 3 && !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphabetic())
    {
        if let Some(index) = parse_column_letters(trimmed) {
            if index >= headers.len() {
                headers.resize(index + 1, String::new());
            }
            if headers[index].trim().is_empty() {
                headers[index] = trimmed.to_string();
            }
            return index;
        }
    }

    headers.push(trimmed.to_string());
    headers.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_existing_header_resolves_in_place() {
        let mut h = headers(&["ID", "Qty"]);
        assert_eq!(resolve_target(&mut h, "Qty"), 1);
        assert_eq!(resolve_target(&mut h, "  Qty  "), 1);
        assert_eq!(h.len(), 2);
    }

    #[test]
    fn test_column_letter_extends_headers() {
        let mut h = headers(&["ID", "Qty"]);
        assert_eq!(resolve_target(&mut h, "A"), 0);
        assert_eq!(h, headers(&["ID", "Qty"]));

        assert_eq!(resolve_target(&mut h, "G"), 6);
        assert_eq!(h.len(), 7);
        assert_eq!(h[6], "G");
        assert_eq!(h[2], "");

        assert_eq!(resolve_target(&mut h, "AA"), 26);
        assert_eq!(h.len(), 27);
        assert_eq!(h[26], "AA");
    }

    #[test]
    fn test_new_column_name_appends() {
        let mut h = headers(&["ID", "Qty"]);
        assert_eq!(resolve_target(&mut h, "Total"), 2);
        assert_eq!(h[2], "Total");

        // Resolving the same name again finds the appended column.
        assert_eq!(resolve_target(&mut h, "Total"), 2);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_header_named_like_letter_wins() {
        let mut h = headers(&["ID", "B", "Qty"]);
        assert_eq!(resolve_target(&mut h, "B"), 1);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn test_long_names_are_never_letters() {
        let mut h = headers(&["ID"]);
        // "Fees" is four letters, past the letter-run cutoff.
        assert_eq!(resolve_target(&mut h, "Fees"), 1);
        assert_eq!(h[1], "Fees");
    }
}
