//! Evaluation engine API.
//!
//! This module provides the restricted execution machinery for instruction
//! code:
//!
//! - [`Value`], [`Table`] - Cell values and the in-memory table
//! - [`CellRef`], [`parse_column_letters`] - A1/column-letter parsing
//! - [`create_formula_engine`], [`create_structural_engine`] - Allow-listed
//!   Rhai engines with resource limits
//! - [`formula_scope`], [`structural_scope`] - Per-invocation scopes
//! - Total coercion helpers (`to_number`, `to_text`, ...)

mod cell_ref;
mod eval;
mod table;
mod value;

pub use cell_ref::{CellRef, parse_column_letters};
pub use eval::{
    create_formula_engine, create_structural_engine, formula_scope, structural_scope,
};
pub use table::{Table, register_table_api};
pub use value::{Value, format_number, to_bool, to_int, to_number, to_text};

pub use rhai::Dynamic;
