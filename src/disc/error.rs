use crate::cd::UnknownTrackType;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiscError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    ChdError(#[from] chd::Error),

    #[error(transparent)]
    UnknownTrackType(#[from] UnknownTrackType),

    #[error("CHD file does not contain CD-ROM track metadata")]
    NoTrackMetadata,

    #[error("Invalid CD-ROM track metadata: {0}")]
    InvalidTrackMetadata(String),

    #[error("CHD hunk size {0} is not a whole number of CD frames")]
    InvalidHunkSize(u32),

    #[error("Sector address {0} lies beyond the end of the disc")]
    AddressOutOfRange(u32),

    #[error("Cursor is positioned past the end of the disc")]
    EndOfDisc,
}

pub type DiscResult<T> = Result<T, DiscError>;
