use std::path::PathBuf;
use thiserror::Error;

/// Errors that terminate a watch session.
///
/// Every variant is fatal: configuration problems are detected before any
/// watch resource is opened, I/O and dispatch failures end the running
/// session and propagate to the caller, who decides whether to start a
/// fresh session.
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("invalid configuration: {reason}")]
    Config { reason: String },

    #[error("filesystem I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to register watch: {0}")]
    Watch(#[from] notify::Error),

    #[error("dispatch of job '{job}' failed: {reason}")]
    Dispatch { job: String, reason: String },
}

impl TriggerError {
    pub fn config(reason: impl Into<String>) -> Self {
        TriggerError::Config {
            reason: reason.into(),
        }
    }

    pub fn not_absolute(path: &std::path::Path) -> Self {
        TriggerError::Config {
            reason: format!("path is not absolute: {}", path.display()),
        }
    }

    pub fn dispatch(job: impl Into<String>, reason: impl Into<String>) -> Self {
        TriggerError::Dispatch {
            job: job.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from the single-pass path operations.
#[derive(Error, Debug)]
pub enum FsOpError {
    #[error("path is not absolute: {0}")]
    NotAbsolute(PathBuf),

    #[error("destination is not a valid directory: {0}")]
    NotADirectory(PathBuf),

    #[error("at least the user or the group has to be specified")]
    MissingOwner,

    #[error("invalid permission string '{0}'")]
    BadMode(String),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("failed to create directory {path}: {source}")]
    Mkdir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to copy {path}: {source}")]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to move {path}: {source}")]
    Move {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set permissions on {path}: {source}")]
    Chmod {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to set ownership on {path}: {source}")]
    Chown { path: PathBuf, source: nix::Error },

    #[error("failed to list {path}: {source}")]
    Walk {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
