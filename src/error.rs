//! Error types shared by the analyzer, indexer, registry and rewriter.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort an analysis, index build or rewrite.
#[derive(Error, Debug)]
pub enum Error {
    /// The source text is not syntactically valid.
    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
    /// A class name that must map to a file resolved to nothing.
    #[error("couldn't resolve class: {name}")]
    Resolution { name: String },
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

impl Error {
    /// Wrap an io error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_subject() {
        let err = Error::Resolution {
            name: "App.view.Missing".to_string(),
        };
        assert_eq!(err.to_string(), "couldn't resolve class: App.view.Missing");

        let err = Error::Parse {
            path: "app/Main.js".to_string(),
            message: "syntax error at 3:1".to_string(),
        };
        assert!(err.to_string().contains("app/Main.js"));
    }
}
