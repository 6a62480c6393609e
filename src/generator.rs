//! Instruction generation through an external command.
//!
//! The command gets one JSON request on stdin and must print a single
//! instruction as JSON on stdout. Any model, service or script can sit
//! behind it; the binary only speaks this pipe protocol.

use serde::Serialize;
use sheetflow_core::{Instruction, InstructionGenerator, Result, SheetflowError, TablePreview};
use std::io::Write;
use std::process::{Command, Stdio};

#[derive(Serialize)]
struct GeneratorRequest<'a> {
    headers: &'a [String],
    sample_rows: &'a [Vec<String>],
    row_count: usize,
    requirement: &'a str,
}

/// Runs a user-supplied shell command as the instruction generator.
pub struct CommandGenerator {
    command: String,
}

impl CommandGenerator {
    pub fn new(command: String) -> CommandGenerator {
        CommandGenerator { command }
    }
}

impl InstructionGenerator for CommandGenerator {
    fn generate(&self, preview: &TablePreview, requirement: &str) -> Result<Instruction> {
        let request = GeneratorRequest {
            headers: &preview.headers,
            sample_rows: &preview.sample_rows,
            row_count: preview.row_count,
            requirement,
        };
        let payload = serde_json::to_vec(&request)?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(|e| SheetflowError::Generator(format!("failed to spawn: {e}")))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SheetflowError::Generator("generator stdin unavailable".to_string()))?;
        stdin
            .write_all(&payload)
            .map_err(|e| SheetflowError::Generator(format!("failed to write request: {e}")))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .map_err(|e| SheetflowError::Generator(format!("failed to read output: {e}")))?;
        if !output.status.success() {
            return Err(SheetflowError::Generator(format!(
                "generator exited with {}",
                output.status
            )));
        }

        let instruction: Instruction = serde_json::from_slice(&output.stdout)
            .map_err(|e| SheetflowError::Generator(format!("bad instruction JSON: {e}")))?;
        Ok(instruction)
    }
}
