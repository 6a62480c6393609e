//! Table transformation core: instructions, execution, grouping and batch
//! orchestration on top of the scripting engine.

pub mod batch;
pub mod error;
pub mod executor;
pub mod generator;
pub mod grouper;
pub mod instruction;
pub mod resolver;
pub mod storage;

pub use batch::{apply_to_file, join_files, run_batch, BatchEntry, BatchOptions, BatchStatus};
pub use error::{Result, SheetflowError};
pub use executor::{apply, apply_multi, Applied, WriteTarget};
pub use generator::{InstructionGenerator, TablePreview};
pub use grouper::{group_by_schema, schema_signature, SchemaGroup, SkippedFile};
pub use instruction::{Action, Instruction, Mode};

pub use sheetflow_engine::engine::{CellRef, Table, Value};
