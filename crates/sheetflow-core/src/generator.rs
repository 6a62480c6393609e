//! Instruction generation seam.
//!
//! Batch processing never inspects how instructions come to exist; it hands a
//! table preview and the user's requirement to an [`InstructionGenerator`]
//! and gets an [`Instruction`] back. The binary plugs in an external command,
//! tests plug in fixed instructions.

use crate::error::Result;
use crate::instruction::Instruction;
use serde::Serialize;
use sheetflow_engine::engine::Table;
use std::path::{Path, PathBuf};

/// What a generator gets to see of a table: the headers plus a few sample
/// rows rendered as text, never the full data.
#[derive(Debug, Clone, Serialize)]
pub struct TablePreview {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub row_count: usize,
}

impl TablePreview {
    pub fn from_table(path: &Path, table: &Table, sample: usize) -> TablePreview {
        let sample_rows = table
            .rows
            .iter()
            .take(sample)
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();
        TablePreview {
            path: path.to_path_buf(),
            headers: table.headers.clone(),
            sample_rows,
            row_count: table.row_count(),
        }
    }
}

/// Turns a natural-language requirement into a runnable instruction.
pub trait InstructionGenerator {
    fn generate(&self, preview: &TablePreview, requirement: &str) -> Result<Instruction>;
}
