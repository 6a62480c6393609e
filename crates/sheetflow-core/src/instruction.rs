//! The instruction model.
//!
//! An [`Instruction`] is the unit of work a generator hands back: a single
//! script plus enough metadata to know how to apply it. The JSON field names
//! are the wire contract with external generators, so they are pinned with
//! serde renames rather than left to derive defaults.

use crate::error::{Result, SheetflowError};
use serde::{Deserialize, Serialize};

/// What kind of transformation an instruction performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Whole-table reshaping: the script receives and rebinds `table`.
    #[serde(rename = "structure")]
    Structural,
    /// A per-cell or per-column expression.
    #[serde(rename = "formula")]
    Formula,
}

/// Where a formula instruction writes its results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Evaluate the expression once per data row, writing a whole column.
    #[default]
    Column,
    /// Evaluate the expression once, writing a single cell.
    Cell,
    /// Only valid with [`Action::Structural`].
    Structural,
}

/// A single transformation to apply to a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(rename = "action_type")]
    pub action: Action,
    pub expression: String,
    #[serde(default)]
    pub mode: Mode,
    /// Column name, column letter, or cell reference, depending on mode.
    #[serde(default)]
    pub target: String,
    /// Human-readable spreadsheet-style formula, for display only.
    #[serde(default)]
    pub display_formula: String,
    #[serde(default)]
    pub explanation: String,
}

impl Instruction {
    /// Check the instruction for internal consistency before running it.
    pub fn validate(&self) -> Result<()> {
        if self.expression.trim().is_empty() {
            return Err(SheetflowError::MalformedInstruction(
                "instruction has an empty expression".to_string(),
            ));
        }
        if self.action == Action::Formula {
            if self.target.trim().is_empty() {
                return Err(SheetflowError::MalformedInstruction(
                    "formula instruction has no target".to_string(),
                ));
            }
            if self.mode == Mode::Structural {
                return Err(SheetflowError::MalformedInstruction(
                    "formula instruction cannot use structural mode".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// The explanation with the display formula appended, when one exists
    /// and the explanation does not already mention it.
    pub fn explanation_with_formula(&self) -> String {
        if self.display_formula.is_empty() || self.explanation.contains(&self.display_formula) {
            return self.explanation.clone();
        }
        if self.explanation.is_empty() {
            return format!("(formula: `{}`)", self.display_formula);
        }
        format!("{} (formula: `{}`)", self.explanation, self.display_formula)
    }
}
