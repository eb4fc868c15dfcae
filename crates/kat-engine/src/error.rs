//! Library error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::device::StageKind;
use crate::shader::SourceOrigin;

/// Failure while assembling a shader program.
#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("embedded shader resource `{key}` not found")]
    ResourceNotFound { key: String },

    #[error("failed to read shader source `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{kind} stage ({origin}) failed to compile:\n{log}")]
    Compile {
        kind: StageKind,
        origin: SourceOrigin,
        log: String,
    },

    #[error("program with stages {} failed to link:\n{log}", join_kinds(kinds))]
    Link { kinds: Vec<StageKind>, log: String },
}

/// Invalid vertex layout description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("attribute list is empty")]
    EmptyAttributeList,

    #[error("attribute {position} has {count} components (expected 1..=4)")]
    InvalidComponentCount { position: usize, count: u32 },
}

fn join_kinds(kinds: &[StageKind]) -> String {
    let names: Vec<String> = kinds.iter().map(ToString::to_string).collect();
    format!("[{}]", names.join(", "))
}
