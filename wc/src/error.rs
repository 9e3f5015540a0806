use std::fmt;
use std::io;
use std::path::PathBuf;

pub type Result<T, E = WordCountError> = std::result::Result<T, E>;

/// Everything that can stop a word count run.
pub enum WordCountError {
    /// Missing or invalid configuration, raised before any I/O.
    Argument(String),
    InputNotFound(PathBuf),
    InputRead { path: PathBuf, source: io::Error },
    OutputExists(PathBuf),
    OutputWrite { path: PathBuf, source: io::Error },
    /// A blocking task died without returning a result.
    TaskFailed { task: String, reason: String },
    Cancelled,
}

impl WordCountError {
    pub fn input_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WordCountError::InputRead {
            path: path.into(),
            source,
        }
    }

    pub fn output_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        WordCountError::OutputWrite {
            path: path.into(),
            source,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            WordCountError::Argument(_) => 1,
            WordCountError::InputNotFound(_) | WordCountError::InputRead { .. } => 2,
            WordCountError::OutputExists(_) | WordCountError::OutputWrite { .. } => 3,
            WordCountError::TaskFailed { .. } => 4,
            WordCountError::Cancelled => 130,
        }
    }
}

impl fmt::Display for WordCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WordCountError::Argument(msg) => write!(f, "invalid argument: {}", msg),
            WordCountError::InputNotFound(path) => {
                write!(f, "input path does not exist: {}", path.display())
            }
            WordCountError::InputRead { path, .. } => {
                write!(f, "failed to read input {}", path.display())
            }
            WordCountError::OutputExists(path) => {
                write!(f, "output path already exists: {}", path.display())
            }
            WordCountError::OutputWrite { path, .. } => {
                write!(f, "failed to write output {}", path.display())
            }
            WordCountError::TaskFailed { task, reason } => {
                write!(f, "task {} failed: {}", task, reason)
            }
            WordCountError::Cancelled => write!(f, "job cancelled before output was committed"),
        }
    }
}

impl fmt::Debug for WordCountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        error_chain_fmt(f, self)
    }
}

impl std::error::Error for WordCountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WordCountError::InputRead { source, .. } | WordCountError::OutputWrite { source, .. } => {
                Some(source)
            }
            _ => None,
        }
    }
}

pub fn error_chain_fmt(
    f: &mut fmt::Formatter<'_>,
    e: &impl std::error::Error,
) -> fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
