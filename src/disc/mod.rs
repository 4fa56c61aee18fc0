use crate::cd::{Msf, TrackType};
use crate::disc::error::DiscResult;

pub mod chd;
pub mod error;
#[cfg(test)]
pub mod memory;

/// Outcome of moving a [`DiscCursor`] forward by one sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorEvent {
    None,
    TrackChange,
    EndOfDisc,
}

impl CursorEvent {
    /// Whether the sector just left was the last one of its track.
    pub fn ends_track(&self) -> bool {
        matches!(self, CursorEvent::TrackChange | CursorEvent::EndOfDisc)
    }
}

/// Sequential, stateful access to the sectors of a disc image.
///
/// A cursor starts on the first sector of track 1. Addresses are counted in
/// 2352 byte sectors, while [`DiscCursor::copy_current_sector`] returns only the
/// payload of the current track's mode.
pub trait DiscCursor {
    fn num_tracks(&self) -> u32;

    /// Disc-absolute timestamp of the current sector.
    fn current_global_msf(&self) -> Msf;

    fn current_track_type(&self) -> TrackType;

    fn copy_current_sector(&mut self) -> DiscResult<Vec<u8>>;

    fn advance_position(&mut self) -> DiscResult<CursorEvent>;

    fn set_location(&mut self, location: Msf) -> DiscResult<()>;
}

impl<C: DiscCursor + ?Sized> DiscCursor for &mut C {
    fn num_tracks(&self) -> u32 {
        (**self).num_tracks()
    }

    fn current_global_msf(&self) -> Msf {
        (**self).current_global_msf()
    }

    fn current_track_type(&self) -> TrackType {
        (**self).current_track_type()
    }

    fn copy_current_sector(&mut self) -> DiscResult<Vec<u8>> {
        (**self).copy_current_sector()
    }

    fn advance_position(&mut self) -> DiscResult<CursorEvent> {
        (**self).advance_position()
    }

    fn set_location(&mut self, location: Msf) -> DiscResult<()> {
        (**self).set_location(location)
    }
}
