use crate::catalog::error::{CatalogError, CatalogResult};
use crate::cd::TrackType;
use crate::disc::{CursorEvent, DiscCursor};
use indicatif::ProgressBar;
use log::{debug, info};

pub mod error;

/// One disc track, exposed as a flat `.bin` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// 1-based track number.
    pub index: u32,
    pub name: String,
    pub start_sector: u32,
    pub byte_length: u64,
    /// Payload bytes per sector, as returned by the cursor for this track.
    pub sector_length: u32,
    pub track_type: TrackType,
}

impl Track {
    pub fn mode_label(&self) -> &'static str {
        self.track_type.cue_label()
    }

    pub fn sector_count(&self) -> u64 {
        self.byte_length / self.sector_length as u64
    }
}

/// Immutable list of the tracks found on a disc.
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    basename: String,
    tracks: Vec<Track>,
}

impl TrackCatalog {
    /// Walks `cursor` from its current position (the first sector of track 1) to the
    /// end of the disc, measuring every track on the way.
    pub fn build<C: DiscCursor>(
        cursor: &mut C,
        basename: &str,
        progress: &ProgressBar,
    ) -> CatalogResult<Self> {
        let total = cursor.num_tracks();
        if total == 0 {
            return Err(CatalogError::NoTracks);
        }

        progress.set_length(total as u64);

        let mut tracks: Vec<Track> = Vec::with_capacity(total as usize);
        let mut next_free_sector = 0u32;
        let mut event = CursorEvent::None;

        for index in 1..=total {
            if event == CursorEvent::EndOfDisc {
                return Err(CatalogError::UnexpectedEndOfDisc {
                    track: index,
                    total,
                });
            }

            let start_sector = cursor.current_global_msf().to_lba();
            if start_sector < next_free_sector {
                return Err(CatalogError::OverlappingTrack {
                    track: index,
                    start: start_sector,
                });
            }

            let track_type = cursor.current_track_type();
            progress.set_message(format!("Scanning track {index} ({track_type})"));

            let mut byte_length = 0u64;
            let mut sectors = 0u32;
            let mut sector_length = 0u32;

            loop {
                let sector = cursor.copy_current_sector()?;
                if sectors == 0 {
                    sector_length = sector.len() as u32;
                }
                byte_length += sector.len() as u64;
                sectors += 1;

                event = cursor.advance_position()?;
                if event.ends_track() {
                    break;
                }
            }

            let track = Track {
                index,
                name: track_file_name(basename, index, total),
                start_sector,
                byte_length,
                sector_length,
                track_type,
            };

            debug!(
                "Track {} starts at sector {} with {} sectors of {} bytes",
                index, start_sector, sectors, sector_length
            );
            info!("Found {:?}: {}, {} bytes", track.name, track_type, byte_length);

            next_free_sector = start_sector + sectors;
            tracks.push(track);
            progress.inc(1);
        }

        progress.finish_and_clear();

        Ok(Self {
            basename: basename.to_string(),
            tracks,
        })
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn find(&self, name: &str) -> Option<&Track> {
        self.tracks.iter().find(|track| track.name == name)
    }

    pub fn cue_file_name(&self) -> String {
        format!("{}.cue", self.basename)
    }
}

/// `<basename> (Track NN).bin`, zero-padded to the digit count of `total`.
pub fn track_file_name(basename: &str, index: u32, total: u32) -> String {
    let width = total.to_string().len();
    format!("{basename} (Track {index:0width$}).bin")
}
