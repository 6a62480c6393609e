//! Batch processing: many files, few generator calls.
//!
//! Files are grouped by schema signature first; the generator then runs once
//! per group, with a preview built from the group's first file. The resulting
//! instruction is applied to every file in the group independently, so one
//! broken file never takes the rest of its group down.

use crate::error::Result;
use crate::executor::apply;
use crate::generator::{InstructionGenerator, TablePreview};
use crate::grouper::group_by_schema;
use crate::instruction::Instruction;
use crate::storage::{read_table, write_table};
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Where output files land; defaults to each source file's directory.
    pub output_dir: Option<PathBuf>,
    /// How many data rows a generator preview may contain.
    pub sample_rows: usize,
}

impl Default for BatchOptions {
    fn default() -> BatchOptions {
        BatchOptions {
            output_dir: None,
            sample_rows: 5,
        }
    }
}

/// Per-file outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub source: PathBuf,
    /// Signature of the schema group the file landed in, if it was grouped.
    pub group_signature: Option<String>,
    #[serde(flatten)]
    pub status: BatchStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchStatus {
    Success { output: PathBuf, explanation: String },
    Failed { error: String },
    Skipped { error: String },
}

/// Apply one instruction to one file, writing the result next to the source
/// (or into `output_dir`) under a fresh `processed_<id>.csv` name.
pub fn apply_to_file(
    path: &Path,
    instruction: &Instruction,
    output_dir: Option<&Path>,
) -> Result<PathBuf> {
    let table = read_table(path)?;
    let applied = apply(table, instruction)?;

    let id = Uuid::new_v4().simple().to_string();
    let name = format!("processed_{}.csv", &id[..8]);
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let output = dir.join(name);

    write_table(&output, &applied.table)?;
    Ok(output)
}

/// Run one script over several files at once, binding each table under its
/// file stem. The combined table is written as `multi_result_<id>.csv`.
pub fn join_files(files: &[PathBuf], script: &str, output_dir: Option<&Path>) -> Result<PathBuf> {
    let mut tables = Vec::with_capacity(files.len());
    for path in files {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        tables.push((name, read_table(path)?));
    }

    let table = crate::executor::apply_multi(tables, script)?;

    let id = Uuid::new_v4().simple().to_string();
    let name = format!("multi_result_{}.csv", &id[..8]);
    let dir = output_dir
        .map(Path::to_path_buf)
        .or_else(|| files.first().and_then(|p| p.parent().map(Path::to_path_buf)))
        .unwrap_or_else(|| PathBuf::from("."));
    let output = dir.join(name);

    write_table(&output, &table)?;
    Ok(output)
}

/// Run one requirement over many files.
///
/// Returns an entry per input file, in input order within each group. Never
/// fails as a whole; every problem is recorded on the file it belongs to.
pub fn run_batch(
    files: &[PathBuf],
    requirement: &str,
    generator: &dyn InstructionGenerator,
    options: &BatchOptions,
) -> Vec<BatchEntry> {
    let (groups, skipped) = group_by_schema(files);
    tracing::info!(
        files = files.len(),
        groups = groups.len(),
        skipped = skipped.len(),
        "batch grouped"
    );

    let mut entries: Vec<BatchEntry> = skipped
        .into_iter()
        .map(|s| BatchEntry {
            source: s.path,
            group_signature: None,
            status: BatchStatus::Skipped { error: s.error },
        })
        .collect();

    for group in groups {
        let instruction = generate_for_group(&group.files[0], requirement, generator, options);

        match instruction {
            Ok(instruction) => {
                let explanation = instruction.explanation_with_formula();
                for path in &group.files {
                    let status =
                        match apply_to_file(path, &instruction, options.output_dir.as_deref()) {
                            Ok(output) => BatchStatus::Success {
                                output,
                                explanation: explanation.clone(),
                            },
                            Err(e) => {
                                tracing::warn!(path = %path.display(), error = %e, "file failed");
                                BatchStatus::Failed {
                                    error: e.to_string(),
                                }
                            }
                        };
                    entries.push(BatchEntry {
                        source: path.clone(),
                        group_signature: Some(group.signature.clone()),
                        status,
                    });
                }
            }
            Err(e) => {
                // No instruction for this schema; every file in the group
                // fails the same way.
                tracing::warn!(error = %e, "generator failed for group");
                let error = e.to_string();
                for path in &group.files {
                    entries.push(BatchEntry {
                        source: path.clone(),
                        group_signature: Some(group.signature.clone()),
                        status: BatchStatus::Failed {
                            error: error.clone(),
                        },
                    });
                }
            }
        }
    }

    entries
}

fn generate_for_group(
    representative: &Path,
    requirement: &str,
    generator: &dyn InstructionGenerator,
    options: &BatchOptions,
) -> Result<Instruction> {
    let table = read_table(representative)?;
    let preview = TablePreview::from_table(representative, &table, options.sample_rows);
    let instruction = generator.generate(&preview, requirement)?;
    instruction.validate()?;
    Ok(instruction)
}
