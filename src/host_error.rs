use std::path::PathBuf;
use thiserror::Error;

/// Failures in the host adapters (CLI argument handling, ROM loading,
/// window/device setup) rather than in the VM or assembler themselves.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("could not read {path:?}: {source}")]
    Read { path: PathBuf, #[source] source: std::io::Error },
    #[error("could not write {path:?}: {source}")]
    Write { path: PathBuf, #[source] source: std::io::Error },
    #[error("could not open a presentation window: {0}")]
    Window(String),
}
