//! In-memory [`DiscCursor`] used to drive the catalog and filesystem tests.

use crate::cd::{Msf, TrackType};
use crate::disc::error::{DiscError, DiscResult};
use crate::disc::{CursorEvent, DiscCursor};

#[derive(Debug, Clone)]
struct MemoryTrack {
    track_type: TrackType,
    start: u32,
    sectors: u32,
}

impl MemoryTrack {
    fn end(&self) -> u32 {
        self.start + self.sectors
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryDisc {
    tracks: Vec<MemoryTrack>,
    position: u32,
    track: usize,
    pub seeks: usize,
}

impl MemoryDisc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a track of `sectors` sectors directly after the previous one.
    pub fn with_track(mut self, track_type: TrackType, sectors: u32) -> Self {
        let start = self.tracks.last().map(|t| t.end()).unwrap_or(0);
        self.tracks.push(MemoryTrack {
            track_type,
            start,
            sectors,
        });
        self
    }

    /// Payload of the sector at `lba`, filled with a position dependent pattern.
    pub fn sector_bytes(&self, lba: u32) -> Vec<u8> {
        let track = self
            .tracks
            .iter()
            .find(|t| t.start <= lba && lba < t.end())
            .expect("lba outside of every track");
        (0..track.track_type.payload_size())
            .map(|i| ((lba as usize * 31 + i) % 251) as u8)
            .collect()
    }

    /// Every payload byte of the 1-based track `index`, in order.
    pub fn track_bytes(&self, index: usize) -> Vec<u8> {
        let track = &self.tracks[index - 1];
        (track.start..track.end())
            .flat_map(|lba| self.sector_bytes(lba))
            .collect()
    }

    fn total_sectors(&self) -> u32 {
        self.tracks.last().map(|t| t.end()).unwrap_or(0)
    }
}

impl DiscCursor for MemoryDisc {
    fn num_tracks(&self) -> u32 {
        self.tracks.len() as u32
    }

    fn current_global_msf(&self) -> Msf {
        Msf::from_lba(self.position).expect("position beyond the MSF range")
    }

    fn current_track_type(&self) -> TrackType {
        self.tracks[self.track].track_type
    }

    fn copy_current_sector(&mut self) -> DiscResult<Vec<u8>> {
        if self.position >= self.total_sectors() {
            return Err(DiscError::EndOfDisc);
        }
        Ok(self.sector_bytes(self.position))
    }

    fn advance_position(&mut self) -> DiscResult<CursorEvent> {
        if self.position >= self.total_sectors() {
            return Ok(CursorEvent::EndOfDisc);
        }
        self.position += 1;
        if self.position == self.total_sectors() {
            Ok(CursorEvent::EndOfDisc)
        } else if self.position == self.tracks[self.track].end() {
            self.track += 1;
            Ok(CursorEvent::TrackChange)
        } else {
            Ok(CursorEvent::None)
        }
    }

    fn set_location(&mut self, location: Msf) -> DiscResult<()> {
        let lba = location.to_lba();
        let track = self
            .tracks
            .iter()
            .position(|t| t.start <= lba && lba < t.end())
            .ok_or(DiscError::AddressOutOfRange(lba))?;
        self.position = lba;
        self.track = track;
        self.seeks += 1;
        Ok(())
    }
}
