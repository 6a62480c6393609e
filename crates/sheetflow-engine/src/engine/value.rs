//! Scalar cell values and total coercion between values and Rhai dynamics.
//!
//! Generated expressions see table cells as [`Dynamic`] values; everything
//! coming back out of an evaluation is converted with [`Value::from_dynamic`].
//! The coercion helpers (`to_number`, `to_text`, `to_bool`) never fail: a
//! value that cannot be converted degrades to the neutral default instead,
//! so a single bad cell cannot abort a whole-column computation.

use rhai::Dynamic;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single table cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view of the cell; `None` when there is no sensible number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse::<f64>().ok(),
            Value::Empty => None,
        }
    }

    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            Value::Empty => Dynamic::from(String::new()),
            Value::Text(s) => Dynamic::from(s.clone()),
            Value::Number(n) => Dynamic::from(*n),
            Value::Bool(b) => Dynamic::from(*b),
        }
    }

    /// Convert an evaluation result back into a cell.
    pub fn from_dynamic(value: &Dynamic) -> Value {
        if value.is_unit() {
            return Value::Empty;
        }
        if let Ok(b) = value.as_bool() {
            return Value::Bool(b);
        }
        if let Ok(n) = value.as_float() {
            return Value::Number(n);
        }
        if let Ok(n) = value.as_int() {
            return Value::Number(n as f64);
        }
        if let Ok(s) = value.clone().into_string() {
            if s.is_empty() {
                return Value::Empty;
            }
            return Value::Text(s);
        }
        // Fallback: arrays, maps and custom types keep a debug rendering.
        Value::Text(value.to_string())
    }

    /// Ordering used by table sorts: numbers first (numeric order), then
    /// text (lexical), then empty cells.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.as_number(), other.as_number()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => match (self.is_empty(), other.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.to_string().cmp(&other.to_string()),
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(s) => write!(f, "{}", s),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
        }
    }
}

/// Format a number for persistence and display.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{:.0}", n)
    } else {
        n.to_string()
    }
}

/// Coerce any Rhai value to a number; failure yields `0.0`.
pub fn to_number(value: &Dynamic) -> f64 {
    if let Ok(n) = value.as_float() {
        return n;
    }
    if let Ok(n) = value.as_int() {
        return n as f64;
    }
    if let Ok(b) = value.as_bool() {
        return if b { 1.0 } else { 0.0 };
    }
    if let Ok(s) = value.clone().into_string() {
        return s.trim().parse::<f64>().unwrap_or(0.0);
    }
    0.0
}

/// Coerce any Rhai value to text; unit becomes the empty string.
pub fn to_text(value: &Dynamic) -> String {
    if value.is_unit() {
        return String::new();
    }
    if let Ok(s) = value.clone().into_string() {
        return s;
    }
    if let Ok(n) = value.as_int() {
        return n.to_string();
    }
    if let Ok(n) = value.as_float() {
        return format_number(n);
    }
    if let Ok(b) = value.as_bool() {
        return if b { "TRUE" } else { "FALSE" }.to_string();
    }
    value.to_string()
}

/// Truthiness for already-computed operands (`IF`, `AND`, `OR`).
pub fn to_bool(value: &Dynamic) -> bool {
    if let Ok(b) = value.as_bool() {
        return b;
    }
    if let Ok(n) = value.as_int() {
        return n != 0;
    }
    if let Ok(n) = value.as_float() {
        return n != 0.0;
    }
    if let Ok(s) = value.clone().into_string() {
        return !s.is_empty();
    }
    !value.is_unit()
}

/// Coerce to an integer where one is required (digit counts, char counts).
/// Returns `None` when nothing integral can be extracted.
pub fn to_int(value: &Dynamic) -> Option<i64> {
    if let Ok(n) = value.as_int() {
        return Some(n);
    }
    if let Ok(n) = value.as_float() {
        if n.is_finite() {
            return Some(n.trunc() as i64);
        }
        return None;
    }
    if let Ok(b) = value.as_bool() {
        return Some(if b { 1 } else { 0 });
    }
    if let Ok(s) = value.clone().into_string() {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Some(n);
        }
        if let Ok(n) = trimmed.parse::<f64>() {
            if n.is_finite() {
                return Some(n.trunc() as i64);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_dynamic_round_trip() {
        assert_eq!(Value::from_dynamic(&Dynamic::from(2.5_f64)), Value::Number(2.5));
        assert_eq!(Value::from_dynamic(&Dynamic::from(3_i64)), Value::Number(3.0));
        assert_eq!(
            Value::from_dynamic(&Dynamic::from("hi".to_string())),
            Value::Text("hi".to_string())
        );
        assert_eq!(Value::from_dynamic(&Dynamic::from(true)), Value::Bool(true));
        assert_eq!(Value::from_dynamic(&Dynamic::UNIT), Value::Empty);
        assert_eq!(Value::from_dynamic(&Dynamic::from(String::new())), Value::Empty);
    }

    #[test]
    fn test_to_number_is_total() {
        assert_eq!(to_number(&Dynamic::from(" 4.5 ".to_string())), 4.5);
        assert_eq!(to_number(&Dynamic::from("not a number".to_string())), 0.0);
        assert_eq!(to_number(&Dynamic::UNIT), 0.0);
        assert_eq!(to_number(&Dynamic::from(true)), 1.0);
    }

    #[test]
    fn test_to_text_formats_numbers() {
        assert_eq!(to_text(&Dynamic::from(3.0_f64)), "3");
        assert_eq!(to_text(&Dynamic::from(3.25_f64)), "3.25");
        assert_eq!(to_text(&Dynamic::UNIT), "");
    }

    #[test]
    fn test_to_int_truncates_floats() {
        assert_eq!(to_int(&Dynamic::from(2.9_f64)), Some(2));
        assert_eq!(to_int(&Dynamic::from("12".to_string())), Some(12));
        assert_eq!(to_int(&Dynamic::from("nope".to_string())), None);
    }

    #[test]
    fn test_sort_cmp_numbers_before_text() {
        let n = Value::Number(10.0);
        let t = Value::Text("abc".to_string());
        let e = Value::Empty;
        assert_eq!(n.sort_cmp(&t), Ordering::Less);
        assert_eq!(t.sort_cmp(&e), Ordering::Less);
        assert_eq!(Value::Number(2.0).sort_cmp(&Value::Text("10".to_string())), Ordering::Less);
    }
}
