//! Grouping files by schema fingerprint.
//!
//! Files whose headers contain the same column names (order ignored) get the
//! same signature and can share one generated instruction. Only the header
//! line of each file is read here.

use crate::storage::read_header;
use std::collections::HashMap;
use std::path::PathBuf;

/// Files sharing one schema signature, in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaGroup {
    pub signature: String,
    pub files: Vec<PathBuf>,
}

/// A file that could not be grouped because its header was unreadable.
#[derive(Debug, Clone)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Canonical signature for a header row: the sorted column names, one per
/// line. Order-insensitive, case- and whitespace-sensitive.
pub fn schema_signature(headers: &[String]) -> String {
    let mut names = headers.to_vec();
    names.sort();
    names.join("\n")
}

/// Partition `files` into schema groups, preserving first-seen order of both
/// groups and the files inside them. Unreadable files are skipped, not fatal.
pub fn group_by_schema(files: &[PathBuf]) -> (Vec<SchemaGroup>, Vec<SkippedFile>) {
    let mut groups: Vec<SchemaGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut skipped = Vec::new();

    for path in files {
        match read_header(path) {
            Ok(headers) => {
                let signature = schema_signature(&headers);
                match index.get(&signature) {
                    Some(&i) => groups[i].files.push(path.clone()),
                    None => {
                        index.insert(signature.clone(), groups.len());
                        groups.push(SchemaGroup {
                            signature,
                            files: vec![path.clone()],
                        });
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
                skipped.push(SkippedFile {
                    path: path.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    (groups, skipped)
}
