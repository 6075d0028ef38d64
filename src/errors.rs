// errors.rs
use std::fmt;

/// Run-level errors. Only `Config` aborts the process; remote and per-item
/// failures are handled as soft failures closer to where they happen.
#[derive(Debug)]
pub enum PipelineError {
    Config(String),
    Remote(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Config(msg) => write!(f, "Configuration error: {msg}"),
            PipelineError::Remote(msg) => write!(f, "Remote error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
