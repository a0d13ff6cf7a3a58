//! Harness error type.

use std::path::PathBuf;

use thiserror::Error;

use crate::logging::LogError;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("reading {source_name}: {source}")]
    Input {
        source_name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("writing {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Logging(#[from] LogError),
    #[error("unsupported format '{0}', expected plain|json")]
    UnsupportedFormat(String),
}

impl HarnessError {
    pub(crate) fn output(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Output { path, source }
    }
}
