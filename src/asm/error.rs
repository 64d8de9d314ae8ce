use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{kind}: {detail} in @{scope}, {file}:{line}.")]
pub struct AsmError {
    pub kind: AsmErrorKind,
    pub detail: String,
    pub file: PathBuf,
    pub line: usize,
    pub scope: String,
}

#[derive(Debug, Error)]
pub enum AsmErrorKind {
    #[error("empty name")]
    EmptyName,
    #[error("name already defined")]
    Duplicate,
    #[error("name collides with a hex literal or opcode")]
    OpcodeCollision,
    #[error("address out of range")]
    OutOfRange,
    #[error("token too long")]
    TokenTooLong,
    #[error("table full")]
    TableFull,
    #[error("unknown reference")]
    UnknownReference,
    #[error("reference out of range")]
    ReferenceOutOfRange,
    #[error("unmatched brace")]
    UnmatchedBrace,
    #[error("could not open include")]
    Include,
}

impl AsmError {
    pub fn new(kind: AsmErrorKind, detail: impl Into<String>, file: &std::path::Path, line: usize, scope: &str) -> Self {
        AsmError { kind, detail: detail.into(), file: file.to_path_buf(), line, scope: scope.to_string() }
    }
}
