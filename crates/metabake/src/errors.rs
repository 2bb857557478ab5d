use std::error::Error;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("file {file:?} not found in {search_path:?}")]
    NotFound { file: PathBuf, search_path: String },

    #[error("unable to read {path:?}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0:?} is not a .conf, .bb, .inc or .bbclass file")]
    UnsupportedFile(PathBuf),

    #[error("can't EXPORT_FUNCTIONS({0}), class stack is empty")]
    ExportWithoutClass(String),

    #[error("anonymous function execution failed for {file:?}")]
    AnonymousExecution {
        file: PathBuf,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("task dependency cycle between {0}")]
    TaskCycle(String),
}

impl MetadataError {
    /// True if any error in the chain is a resolution failure.
    pub fn is_not_found(err: &anyhow::Error) -> bool {
        err.chain().any(|e| {
            matches!(
                e.downcast_ref::<MetadataError>(),
                Some(MetadataError::NotFound { .. })
            )
        })
    }
}
