//! Scalar spreadsheet builtins available to generated expressions.
//!
//! Conventions:
//! - Spreadsheet-facing names are ALL CAPS (e.g. `SUM`, `CONCAT`).
//! - Every function is total: conversion failure substitutes a neutral
//!   default (0.0 for numeric, "" for text) instead of raising. These run
//!   once per row over thousands of rows, and a single bad cell must
//!   degrade to a sentinel, not abort the batch.
//! - Variadic spreadsheet forms are registered as 1-4 argument overloads
//!   plus an array-accepting overload.

use rhai::{Array, Dynamic, Engine, Map};

use crate::engine::{to_bool, to_int, to_number, to_text};

fn sum_of(values: &[Dynamic]) -> f64 {
    values.iter().map(to_number).sum()
}

fn average_of(values: &[Dynamic]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        sum_of(values) / values.len() as f64
    }
}

fn divide(a: &Dynamic, b: &Dynamic) -> f64 {
    let denominator = to_number(b);
    if denominator == 0.0 {
        // Division by zero yields 0, never an error.
        0.0
    } else {
        to_number(a) / denominator
    }
}

fn round_to(number: &Dynamic, digits: &Dynamic) -> f64 {
    // An unconvertible or absurd digit count degrades to 0.
    let Some(digits) = to_int(digits) else {
        return 0.0;
    };
    if !(-12..=12).contains(&digits) {
        return 0.0;
    }
    let factor = 10f64.powi(digits as i32);
    (to_number(number) * factor).round() / factor
}

fn and_of(values: &[Dynamic]) -> bool {
    values.iter().all(to_bool)
}

fn or_of(values: &[Dynamic]) -> bool {
    values.iter().any(to_bool)
}

fn concat_of(values: &[Dynamic]) -> String {
    values.iter().map(to_text).collect()
}

fn left_str(text: &Dynamic, count: &Dynamic) -> String {
    let s = to_text(text);
    let n = to_int(count).unwrap_or(0).max(0) as usize;
    s.chars().take(n).collect()
}

fn right_str(text: &Dynamic, count: &Dynamic) -> String {
    let s = to_text(text);
    let n = to_int(count).unwrap_or(0).max(0) as usize;
    let len = s.chars().count();
    s.chars().skip(len.saturating_sub(n)).collect()
}

fn mid_str(text: &Dynamic, start: &Dynamic, count: &Dynamic) -> String {
    let s = to_text(text);
    // 1-based start, translated to a 0-based char offset.
    let start = (to_int(start).unwrap_or(1).max(1) - 1) as usize;
    let n = to_int(count).unwrap_or(0).max(0) as usize;
    s.chars().skip(start).take(n).collect()
}

fn find_in(needle: &Dynamic, haystack: &Dynamic) -> i64 {
    let needle = to_text(needle);
    let haystack = to_text(haystack);
    match haystack.find(&needle) {
        // 1-based char position.
        Some(byte_pos) => haystack[..byte_pos].chars().count() as i64 + 1,
        None => -1,
    }
}

/// Register the scalar function library into a Rhai engine.
pub fn register_builtins(engine: &mut Engine) {
    // SUM(a[, b[, c[, d]]]) and SUM(array)
    engine.register_fn("SUM", |values: Array| sum_of(&values));
    engine.register_fn("SUM", |a: Dynamic| sum_of(&[a]));
    engine.register_fn("SUM", |a: Dynamic, b: Dynamic| sum_of(&[a, b]));
    engine.register_fn("SUM", |a: Dynamic, b: Dynamic, c: Dynamic| sum_of(&[a, b, c]));
    engine.register_fn("SUM", |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        sum_of(&[a, b, c, d])
    });

    // AVERAGE: same shapes as SUM; empty input yields 0.
    engine.register_fn("AVERAGE", |values: Array| average_of(&values));
    engine.register_fn("AVERAGE", |a: Dynamic| average_of(&[a]));
    engine.register_fn("AVERAGE", |a: Dynamic, b: Dynamic| average_of(&[a, b]));
    engine.register_fn("AVERAGE", |a: Dynamic, b: Dynamic, c: Dynamic| {
        average_of(&[a, b, c])
    });
    engine.register_fn("AVERAGE", |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        average_of(&[a, b, c, d])
    });

    engine.register_fn("MULTIPLY", |a: Dynamic, b: Dynamic| {
        to_number(&a) * to_number(&b)
    });

    // DIVIDE(a, 0) -> 0
    engine.register_fn("DIVIDE", |a: Dynamic, b: Dynamic| divide(&a, &b));

    // ROUND(n, digits); invalid digit count -> 0
    engine.register_fn("ROUND", |n: Dynamic, digits: Dynamic| round_to(&n, &digits));

    // IF(cond, a, b): plain selection over already-computed operands.
    engine.register_fn("IF", |cond: Dynamic, a: Dynamic, b: Dynamic| -> Dynamic {
        if to_bool(&cond) { a } else { b }
    });

    engine.register_fn("AND", |values: Array| and_of(&values));
    engine.register_fn("AND", |a: Dynamic, b: Dynamic| and_of(&[a, b]));
    engine.register_fn("AND", |a: Dynamic, b: Dynamic, c: Dynamic| and_of(&[a, b, c]));
    engine.register_fn("AND", |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        and_of(&[a, b, c, d])
    });

    engine.register_fn("OR", |values: Array| or_of(&values));
    engine.register_fn("OR", |a: Dynamic, b: Dynamic| or_of(&[a, b]));
    engine.register_fn("OR", |a: Dynamic, b: Dynamic, c: Dynamic| or_of(&[a, b, c]));
    engine.register_fn("OR", |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        or_of(&[a, b, c, d])
    });

    // Text slicing uses char counts, 1-based where the sheet convention is.
    engine.register_fn("LEFT", |text: Dynamic, n: Dynamic| left_str(&text, &n));
    engine.register_fn("RIGHT", |text: Dynamic, n: Dynamic| right_str(&text, &n));
    engine.register_fn("MID", |text: Dynamic, start: Dynamic, n: Dynamic| {
        mid_str(&text, &start, &n)
    });
    engine.register_fn("LEN", |text: Dynamic| -> i64 {
        to_text(&text).chars().count() as i64
    });

    engine.register_fn("CONCAT", |values: Array| concat_of(&values));
    engine.register_fn("CONCAT", |a: Dynamic, b: Dynamic| concat_of(&[a, b]));
    engine.register_fn("CONCAT", |a: Dynamic, b: Dynamic, c: Dynamic| {
        concat_of(&[a, b, c])
    });
    engine.register_fn("CONCAT", |a: Dynamic, b: Dynamic, c: Dynamic, d: Dynamic| {
        concat_of(&[a, b, c, d])
    });

    // FIND(needle, haystack): 1-based position, -1 when absent.
    engine.register_fn("FIND", |needle: Dynamic, haystack: Dynamic| {
        find_in(&needle, &haystack)
    });

    // LOOKUP(key, map, default): simplified cross-reference join.
    engine.register_fn(
        "LOOKUP",
        |key: Dynamic, map: Map, default: Dynamic| -> Dynamic {
            let key = to_text(&key);
            map.get(key.as_str()).cloned().unwrap_or(default)
        },
    );

    // TEXT(x): explicit text coercion, handy in CONCAT-heavy expressions.
    engine.register_fn("TEXT", |value: Dynamic| to_text(&value));

    // NUMBER(x): explicit numeric coercion (0 on failure).
    engine.register_fn("NUMBER", |value: Dynamic| to_number(&value));
}
