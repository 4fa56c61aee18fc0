use crate::disc::error::DiscError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Disc image is unavailable: {0}")]
    SourceUnavailable(#[from] DiscError),

    #[error("Disc image does not contain any tracks")]
    NoTracks,

    #[error("Disc ended while walking track {track} of {total}")]
    UnexpectedEndOfDisc { track: u32, total: u32 },

    #[error("Track {track} starts at sector {start}, before the end of the previous track")]
    OverlappingTrack { track: u32, start: u32 },
}

pub type CatalogResult<T> = Result<T, CatalogError>;
