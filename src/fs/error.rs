use crate::disc::error::DiscError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Permission denied: {0} is read-only")]
    PermissionDenied(String),

    #[error(transparent)]
    InvalidPattern(#[from] glob::PatternError),

    #[error(transparent)]
    DiscError(#[from] DiscError),
}

impl FsError {
    /// errno reported back through the filesystem-call boundary.
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound(_) => libc::ENOENT,
            FsError::PermissionDenied(_) => libc::EACCES,
            FsError::InvalidPattern(_) => libc::EINVAL,
            FsError::DiscError(_) => libc::EIO,
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
