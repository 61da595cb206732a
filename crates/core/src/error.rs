use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::pool::PoolError;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("invalid directory: {}", .path.display())]
    InvalidDirectory { path: PathBuf },

    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("invalid keyword '{keyword}': {reason}")]
    InvalidKeyword {
        keyword: String,
        reason: &'static str,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(String),

    #[error("failed to read directory {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl OrganizeError {
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            OrganizeError::InvalidDirectory { .. }
                | OrganizeError::EmptyKeyword
                | OrganizeError::InvalidKeyword { .. }
                | OrganizeError::InvalidOptions(_)
        )
    }
}
