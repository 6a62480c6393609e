//! Restricted Rhai engine construction for instruction evaluation.
//!
//! Generated instruction code is untrusted, so every evaluation runs inside
//! an engine that exposes an explicit allow-list only: the scalar function
//! library, and (for structural scripts) the table manipulation methods.
//! Rhai has no ambient access to the filesystem, network or process
//! environment, and the limits below bound runaway scripts.
//!
//! Engines and scopes are never shared: each invocation builds its own, since
//! instruction code can rebind arbitrary names in its scope.

use rhai::{Engine, Scope};

use super::table::{Table, register_table_api};
use crate::builtins::register_builtins;

const MAX_OPERATIONS: u64 = 5_000_000;
const MAX_CALL_LEVELS: usize = 32;
const MAX_STRING_SIZE: usize = 1 << 20;
const MAX_ARRAY_SIZE: usize = 1 << 20;
const MAX_MAP_SIZE: usize = 1 << 16;

fn apply_limits(engine: &mut Engine) {
    engine.set_max_operations(MAX_OPERATIONS);
    engine.set_max_call_levels(MAX_CALL_LEVELS);
    engine.set_max_string_size(MAX_STRING_SIZE);
    engine.set_max_array_size(MAX_ARRAY_SIZE);
    engine.set_max_map_size(MAX_MAP_SIZE);
}

/// Engine for row/aggregate value expressions. Expressions are compiled with
/// `compile_expression`, so statements and assignments are rejected by
/// construction.
pub fn create_formula_engine() -> Engine {
    let mut engine = Engine::new();
    apply_limits(&mut engine);
    register_builtins(&mut engine);
    tracing::trace!("formula engine created");
    engine
}

/// Engine for whole-table scripts: scalar builtins plus the table API.
pub fn create_structural_engine() -> Engine {
    let mut engine = create_formula_engine();
    register_table_api(&mut engine);
    tracing::trace!("structural engine created");
    engine
}

/// Scope for value computations: `rows` bound to the full row collection.
/// Column mode additionally sets `row` per data row.
pub fn formula_scope(table: &Table) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("rows", table.rows_array());
    scope
}

/// Scope for structural scripts: the table itself under `table`.
/// The script must leave a table bound to that name.
pub fn structural_scope(table: Table) -> Scope<'static> {
    let mut scope = Scope::new();
    scope.push("table", table);
    scope
}
