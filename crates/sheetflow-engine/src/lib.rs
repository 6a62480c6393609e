//! sheetflow-engine - restricted evaluation of generated table expressions.

pub mod builtins;
pub mod engine;
