//! Error types for Sheetflow core.

use thiserror::Error;

use rhai::EvalAltResult;

/// Errors that can occur while loading tables and executing instructions.
#[derive(Error, Debug)]
pub enum SheetflowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV file is empty")]
    EmptyCsv,

    #[error("table has no usable header row")]
    NoHeader,

    #[error("malformed instruction: {0}")]
    MalformedInstruction(String),

    #[error("execution failed: {0}")]
    Execution(String),

    #[error("script finished without leaving a table bound to `{0}`")]
    MissingResult(&'static str),

    #[error("instruction generator failed: {0}")]
    Generator(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("evaluation error: {0}")]
    Rhai(
        #[from]
        #[source]
        Box<EvalAltResult>,
    ),
}

pub type Result<T> = std::result::Result<T, SheetflowError>;
