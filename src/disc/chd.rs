use crate::cd::{FRAME_SIZE, Msf, SECTOR_SIZE, TrackType};
use crate::disc::error::{DiscError, DiscResult};
use crate::disc::{CursorEvent, DiscCursor};
use chd::Chd;
use chd::metadata::MetadataTag;
use log::{debug, trace};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

/// "CHT2", CD-ROM track metadata v2
const CHT2_TAG: u32 = 0x43485432;
/// "CHTR", CD-ROM track metadata v1
const CHTR_TAG: u32 = 0x43485452;

/// chdman pads every track to a multiple of this many frames.
const TRACK_PADDING: u32 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrackEntry {
    number: u32,
    track_type: TrackType,
    frames: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ChdTrack {
    track_type: TrackType,
    start_lba: u32,
    frames: u32,
    /// First frame of the track inside the CHD's hunk stream.
    chd_frame: u32,
}

impl ChdTrack {
    fn end_lba(&self) -> u32 {
        self.start_lba + self.frames
    }
}

/// [`DiscCursor`] over a CD-ROM CHD image.
pub struct ChdCursor<F: Read + Seek> {
    chd: Chd<F>,
    tracks: Vec<ChdTrack>,
    frames_per_hunk: u32,
    hunk_buffer: Vec<u8>,
    compressed_buffer: Vec<u8>,
    loaded_hunk: Option<u32>,
    position: u32,
    track: usize,
}

impl ChdCursor<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> DiscResult<Self> {
        let file = File::open(path.as_ref())?;
        debug!("Opening CHD image: {:?}", path.as_ref());
        Self::from_reader(BufReader::new(file))
    }
}

impl<F: Read + Seek> ChdCursor<F> {
    pub fn from_reader(reader: F) -> DiscResult<Self> {
        let mut chd = Chd::open(reader, None)?;

        let hunk_size = chd.header().hunk_size();
        if hunk_size == 0 || hunk_size as usize % FRAME_SIZE != 0 {
            return Err(DiscError::InvalidHunkSize(hunk_size));
        }
        let frames_per_hunk = hunk_size / FRAME_SIZE as u32;
        let hunk_count = chd.header().hunk_count();

        let entries = read_track_metadata(&mut chd)?;
        let tracks = layout_tracks(entries)?;

        if let Some(last) = tracks.last() {
            let needed = last.chd_frame + last.frames;
            if needed as u64 > hunk_count as u64 * frames_per_hunk as u64 {
                return Err(DiscError::InvalidTrackMetadata(format!(
                    "tracks need {needed} frames but the image holds {hunk_count} hunks of {frames_per_hunk}"
                )));
            }
        }

        debug!(
            "CHD has {} tracks, {} frames per hunk",
            tracks.len(),
            frames_per_hunk
        );

        let hunk_buffer = chd.get_hunksized_buffer();

        Ok(Self {
            chd,
            tracks,
            frames_per_hunk,
            hunk_buffer,
            compressed_buffer: Vec::new(),
            loaded_hunk: None,
            position: 0,
            track: 0,
        })
    }

    fn total_sectors(&self) -> u32 {
        self.tracks.last().map(|t| t.end_lba()).unwrap_or(0)
    }

    fn load_frame(&mut self, chd_frame: u32) -> DiscResult<&[u8]> {
        let hunk = chd_frame / self.frames_per_hunk;
        if self.loaded_hunk != Some(hunk) {
            trace!("Decompressing hunk {hunk}");
            self.chd
                .hunk(hunk)?
                .read_hunk_in(&mut self.compressed_buffer, &mut self.hunk_buffer)?;
            self.loaded_hunk = Some(hunk);
        }

        let offset = (chd_frame % self.frames_per_hunk) as usize * FRAME_SIZE;
        Ok(&self.hunk_buffer[offset..offset + SECTOR_SIZE])
    }
}

impl<F: Read + Seek> DiscCursor for ChdCursor<F> {
    fn num_tracks(&self) -> u32 {
        self.tracks.len() as u32
    }

    fn current_global_msf(&self) -> Msf {
        // layout_tracks keeps the end of the disc within Msf::MAX_LBA
        Msf::from_lba(self.position).unwrap_or(Msf::MAX)
    }

    fn current_track_type(&self) -> TrackType {
        self.tracks[self.track].track_type
    }

    fn copy_current_sector(&mut self) -> DiscResult<Vec<u8>> {
        if self.position >= self.total_sectors() {
            return Err(DiscError::EndOfDisc);
        }

        let track = &self.tracks[self.track];
        let track_type = track.track_type;
        let chd_frame = track.chd_frame + (self.position - track.start_lba);

        let frame = self.load_frame(chd_frame)?;
        let mut sector = frame[..track_type.payload_size()].to_vec();

        // CHD keeps audio samples big-endian
        if track_type.is_audio() {
            for sample in sector.chunks_exact_mut(2) {
                sample.swap(0, 1);
            }
        }

        Ok(sector)
    }

    fn advance_position(&mut self) -> DiscResult<CursorEvent> {
        let total = self.total_sectors();
        if self.position >= total {
            return Ok(CursorEvent::EndOfDisc);
        }

        self.position += 1;
        if self.position == total {
            Ok(CursorEvent::EndOfDisc)
        } else if self.position == self.tracks[self.track].end_lba() {
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
            .position(|t| t.start_lba <= lba && lba < t.end_lba())
            .ok_or(DiscError::AddressOutOfRange(lba))?;

        self.position = lba;
        self.track = track;
        // Every positioned read starts from freshly decoded data.
        self.loaded_hunk = None;
        Ok(())
    }
}

fn read_track_metadata<F: Read + Seek>(chd: &mut Chd<F>) -> DiscResult<Vec<TrackEntry>> {
    // Refs are collected first so the reader can be borrowed again to read them.
    let meta_refs: Vec<_> = chd
        .metadata_refs()
        .filter(|meta_ref| meta_ref.metatag() == CHT2_TAG || meta_ref.metatag() == CHTR_TAG)
        .collect();

    let mut entries = Vec::with_capacity(meta_refs.len());
    for meta_ref in meta_refs {
        let metadata = meta_ref.read(chd.inner())?;
        let content = String::from_utf8_lossy(&metadata.value);
        debug!("Track metadata: {}", content.trim_end_matches('\0'));
        entries.push(parse_track_entry(&content)?);
    }

    Ok(entries)
}

/// Parses a `TRACK:1 TYPE:MODE1_RAW SUBTYPE:NONE FRAMES:1234 ...` metadata value.
fn parse_track_entry(content: &str) -> DiscResult<TrackEntry> {
    let mut number = None;
    let mut track_type = None;
    let mut frames = None;

    for part in content.trim_end_matches('\0').split_whitespace() {
        if let Some((key, value)) = part.split_once(':') {
            match key {
                "TRACK" => number = value.parse::<u32>().ok(),
                "TYPE" => track_type = Some(value.parse::<TrackType>()?),
                "FRAMES" => frames = value.parse::<u32>().ok(),
                _ => {}
            }
        }
    }

    match (number, track_type, frames) {
        (Some(number), Some(track_type), Some(frames)) if number > 0 && frames > 0 => {
            Ok(TrackEntry {
                number,
                track_type,
                frames,
            })
        }
        _ => Err(DiscError::InvalidTrackMetadata(
            content.trim_end_matches('\0').to_string(),
        )),
    }
}

fn layout_tracks(mut entries: Vec<TrackEntry>) -> DiscResult<Vec<ChdTrack>> {
    if entries.is_empty() {
        return Err(DiscError::NoTrackMetadata);
    }

    entries.sort_by_key(|e| e.number);

    let mut tracks = Vec::with_capacity(entries.len());
    let mut start_lba = 0u32;
    let mut chd_frame = 0u32;

    for (expected, entry) in (1u32..).zip(entries) {
        if entry.number != expected {
            return Err(DiscError::InvalidTrackMetadata(format!(
                "expected track {expected}, found track {}",
                entry.number
            )));
        }

        tracks.push(ChdTrack {
            track_type: entry.track_type,
            start_lba,
            frames: entry.frames,
            chd_frame,
        });

        start_lba = start_lba
            .checked_add(entry.frames)
            .filter(|end| *end <= Msf::MAX_LBA)
            .ok_or_else(|| {
                DiscError::InvalidTrackMetadata(format!(
                    "track {expected} ends beyond the last addressable sector"
                ))
            })?;
        chd_frame += entry.frames.div_ceil(TRACK_PADDING) * TRACK_PADDING;
    }

    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TrackCatalog;
    use crate::cd::SUBCODE_SIZE;
    use crate::fs::DiscFs;
    use indicatif::ProgressBar;
    use std::io::{Cursor, Write};

    const FRAMES_PER_HUNK: usize = 8;
    const HUNK_SIZE: usize = FRAME_SIZE * FRAMES_PER_HUNK;
    const V5_HEADER_SIZE: usize = 124;

    /// Byte `i` of the stored sector data of CHD frame `chd_frame`.
    fn stored_byte(chd_frame: usize, i: usize) -> u8 {
        ((chd_frame * 7 + i) % 251) as u8
    }

    /// What the cursor should hand out for CHD frame `chd_frame`.
    fn expected_sector(chd_frame: usize, track_type: TrackType) -> Vec<u8> {
        let mut sector: Vec<u8> = (0..track_type.payload_size())
            .map(|i| stored_byte(chd_frame, i))
            .collect();
        if track_type.is_audio() {
            for sample in sector.chunks_exact_mut(2) {
                sample.swap(0, 1);
            }
        }
        sector
    }

    /// Uncompressed v5 CD image with `tracks` padded to 4 frames the way chdman lays
    /// them out. Padding frames hold 0xAA and every subcode byte is 0xEE.
    fn chd_image(tracks: &[(&str, u32)]) -> Vec<u8> {
        let mut is_data = Vec::new();
        for &(_, frames) in tracks {
            let padded = frames.div_ceil(TRACK_PADDING) * TRACK_PADDING;
            is_data.extend((0..padded).map(|frame| frame < frames));
        }
        let hunk_count = is_data.len().div_ceil(FRAMES_PER_HUNK);
        let map_offset = V5_HEADER_SIZE;
        let meta_offset = match tracks {
            [] => 0,
            _ => map_offset + hunk_count * 4,
        };

        let mut image = Vec::new();
        image.extend_from_slice(b"MComprHD");
        image.extend_from_slice(&(V5_HEADER_SIZE as u32).to_be_bytes());
        image.extend_from_slice(&5u32.to_be_bytes());
        image.extend_from_slice(&[0; 16]);
        image.extend_from_slice(&((hunk_count * HUNK_SIZE) as u64).to_be_bytes());
        image.extend_from_slice(&(map_offset as u64).to_be_bytes());
        image.extend_from_slice(&(meta_offset as u64).to_be_bytes());
        image.extend_from_slice(&(HUNK_SIZE as u32).to_be_bytes());
        image.extend_from_slice(&(FRAME_SIZE as u32).to_be_bytes());
        image.resize(V5_HEADER_SIZE, 0);

        // Uncompressed map entries count in hunks; hunk n is stored in block n + 1.
        for hunk in 0..hunk_count {
            image.extend_from_slice(&(hunk as u32 + 1).to_be_bytes());
        }

        for (index, &(track_type, frames)) in tracks.iter().enumerate() {
            let value = format!(
                "TRACK:{} TYPE:{track_type} SUBTYPE:NONE FRAMES:{frames} PREGAP:0 PGTYPE:MODE1 PGSUB:NONE POSTGAP:0\0",
                index + 1
            );
            let next = if index + 1 == tracks.len() {
                0
            } else {
                image.len() + 16 + value.len()
            };
            image.extend_from_slice(&CHT2_TAG.to_be_bytes());
            image.extend_from_slice(&(value.len() as u32).to_be_bytes());
            image.extend_from_slice(&(next as u64).to_be_bytes());
            image.extend_from_slice(value.as_bytes());
        }

        assert!(image.len() <= HUNK_SIZE);
        image.resize(HUNK_SIZE, 0);

        for chd_frame in 0..hunk_count * FRAMES_PER_HUNK {
            match is_data.get(chd_frame) {
                Some(true) => image.extend((0..SECTOR_SIZE).map(|i| stored_byte(chd_frame, i))),
                _ => image.extend(std::iter::repeat_n(0xAA, SECTOR_SIZE)),
            }
            image.extend(std::iter::repeat_n(0xEE, SUBCODE_SIZE));
        }

        image
    }

    /// Track 1 sits in CHD frames 0-1, track 2 in frames 4-9 across the hunk boundary.
    fn audio_and_data_cursor() -> ChdCursor<Cursor<Vec<u8>>> {
        let image = chd_image(&[("AUDIO", 2), ("MODE1", 6)]);
        ChdCursor::from_reader(Cursor::new(image)).unwrap()
    }

    fn entry(number: u32, track_type: TrackType, frames: u32) -> TrackEntry {
        TrackEntry {
            number,
            track_type,
            frames,
        }
    }

    #[test]
    fn parses_cht2_metadata() {
        let content =
            "TRACK:2 TYPE:MODE1_RAW SUBTYPE:NONE FRAMES:16227 PREGAP:150 PGTYPE:V PGSUB:NONE POSTGAP:0\0";
        assert_eq!(
            parse_track_entry(content).unwrap(),
            entry(2, TrackType::Mode1Raw, 16227)
        );
    }

    #[test]
    fn parses_chtr_metadata() {
        let content = "TRACK:1 TYPE:AUDIO SUBTYPE:RW_RAW FRAMES:300";
        assert_eq!(
            parse_track_entry(content).unwrap(),
            entry(1, TrackType::Audio, 300)
        );
    }

    #[test]
    fn rejects_metadata_without_frames() {
        let result = parse_track_entry("TRACK:1 TYPE:MODE1 SUBTYPE:NONE");
        assert!(matches!(result, Err(DiscError::InvalidTrackMetadata(_))));
    }

    #[test]
    fn rejects_unknown_track_types() {
        let result = parse_track_entry("TRACK:1 TYPE:MODE3 SUBTYPE:NONE FRAMES:10");
        assert!(matches!(result, Err(DiscError::UnknownTrackType(_))));
    }

    #[test]
    fn layout_pads_chd_frames_but_not_lbas() {
        let tracks = layout_tracks(vec![
            entry(2, TrackType::Mode1, 10),
            entry(1, TrackType::Audio, 150),
            entry(3, TrackType::Audio, 5),
        ])
        .unwrap();

        assert_eq!(
            tracks.iter().map(|t| t.start_lba).collect::<Vec<_>>(),
            vec![0, 150, 160]
        );
        assert_eq!(
            tracks.iter().map(|t| t.chd_frame).collect::<Vec<_>>(),
            vec![0, 152, 164]
        );
        assert_eq!(tracks[1].track_type, TrackType::Mode1);
    }

    #[test]
    fn layout_rejects_gaps_in_track_numbers() {
        let result = layout_tracks(vec![
            entry(1, TrackType::Audio, 150),
            entry(3, TrackType::Audio, 150),
        ]);
        assert!(matches!(result, Err(DiscError::InvalidTrackMetadata(_))));
    }

    #[test]
    fn layout_requires_at_least_one_track() {
        assert!(matches!(
            layout_tracks(Vec::new()),
            Err(DiscError::NoTrackMetadata)
        ));
    }

    #[test]
    fn opening_a_file_that_is_not_a_chd_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x42; 4096]).unwrap();
        file.flush().unwrap();

        assert!(ChdCursor::open(file.path()).is_err());
    }

    #[test]
    fn walks_every_sector_skipping_track_padding() {
        let mut cursor = audio_and_data_cursor();
        assert_eq!(cursor.num_tracks(), 2);

        let chd_frames = [0, 1, 4, 5, 6, 7, 8, 9];
        for (lba, chd_frame) in (0u32..).zip(chd_frames) {
            let track_type = match lba {
                0 | 1 => TrackType::Audio,
                _ => TrackType::Mode1,
            };
            assert_eq!(cursor.current_global_msf().to_lba(), lba);
            assert_eq!(cursor.current_track_type(), track_type);
            assert_eq!(
                cursor.copy_current_sector().unwrap(),
                expected_sector(chd_frame, track_type),
                "sector {lba}"
            );
            cursor.advance_position().unwrap();
        }

        assert!(matches!(
            cursor.copy_current_sector(),
            Err(DiscError::EndOfDisc)
        ));
    }

    #[test]
    fn audio_samples_are_swapped_to_little_endian() {
        let mut cursor = audio_and_data_cursor();
        let sector = cursor.copy_current_sector().unwrap();

        assert_eq!(sector.len(), SECTOR_SIZE);
        assert_eq!(
            &sector[..4],
            &[
                stored_byte(0, 1),
                stored_byte(0, 0),
                stored_byte(0, 3),
                stored_byte(0, 2)
            ]
        );
    }

    #[test]
    fn cooked_sectors_are_cut_to_their_payload() {
        let mut cursor = audio_and_data_cursor();
        cursor.set_location(Msf::from_lba(2).unwrap()).unwrap();
        let sector = cursor.copy_current_sector().unwrap();

        assert_eq!(sector.len(), 2048);
        assert_eq!(sector[0], stored_byte(4, 0));
        assert_eq!(sector[2047], stored_byte(4, 2047));
    }

    #[test]
    fn advancing_reports_track_change_then_end_of_disc() {
        let mut cursor = audio_and_data_cursor();
        let events: Vec<_> = (0..9)
            .map(|_| cursor.advance_position().unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                CursorEvent::None,
                CursorEvent::TrackChange,
                CursorEvent::None,
                CursorEvent::None,
                CursorEvent::None,
                CursorEvent::None,
                CursorEvent::None,
                CursorEvent::EndOfDisc,
                CursorEvent::EndOfDisc,
            ]
        );
    }

    #[test]
    fn set_location_drops_the_decoded_hunk() {
        let mut cursor = audio_and_data_cursor();

        cursor.set_location(Msf::from_lba(7).unwrap()).unwrap();
        assert_eq!(
            cursor.copy_current_sector().unwrap(),
            expected_sector(9, TrackType::Mode1)
        );
        assert_eq!(cursor.loaded_hunk, Some(1));

        cursor.set_location(Msf::from_lba(3).unwrap()).unwrap();
        assert_eq!(cursor.loaded_hunk, None);
        assert_eq!(
            cursor.copy_current_sector().unwrap(),
            expected_sector(5, TrackType::Mode1)
        );
        assert_eq!(cursor.loaded_hunk, Some(0));

        cursor.set_location(Msf::from_lba(1).unwrap()).unwrap();
        assert_eq!(cursor.current_track_type(), TrackType::Audio);
        assert_eq!(cursor.advance_position().unwrap(), CursorEvent::TrackChange);
        assert_eq!(cursor.current_track_type(), TrackType::Mode1);
    }

    #[test]
    fn set_location_past_the_last_track_fails() {
        let mut cursor = audio_and_data_cursor();
        assert!(matches!(
            cursor.set_location(Msf::from_lba(8).unwrap()),
            Err(DiscError::AddressOutOfRange(8))
        ));
    }

    #[test]
    fn image_without_track_metadata_is_rejected() {
        let result = ChdCursor::from_reader(Cursor::new(chd_image(&[])));
        assert!(matches!(result, Err(DiscError::NoTrackMetadata)));
    }

    #[test]
    fn layout_rejects_discs_beyond_the_msf_range() {
        let result = layout_tracks(vec![
            entry(1, TrackType::Mode1, Msf::MAX_LBA),
            entry(2, TrackType::Audio, 2),
        ]);
        assert!(matches!(result, Err(DiscError::InvalidTrackMetadata(_))));
    }

    #[test]
    fn catalog_and_reads_over_a_chd_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&chd_image(&[("AUDIO", 2), ("MODE1", 6)]))
            .unwrap();
        file.flush().unwrap();

        let mut cursor = ChdCursor::open(file.path()).unwrap();
        let catalog = TrackCatalog::build(&mut cursor, "disc", &ProgressBar::hidden()).unwrap();
        let tracks = catalog.tracks();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].start_sector, 0);
        assert_eq!(tracks[0].byte_length, 2 * 2352);
        assert_eq!(tracks[0].mode_label(), "AUDIO");
        assert_eq!(tracks[1].start_sector, 2);
        assert_eq!(tracks[1].byte_length, 6 * 2048);
        assert_eq!(tracks[1].mode_label(), "MODE1/2352");

        let mut fs = DiscFs::new(catalog, cursor);
        let mut expected = expected_sector(4, TrackType::Mode1)[2000..].to_vec();
        expected.extend_from_slice(&expected_sector(5, TrackType::Mode1)[..52]);
        assert_eq!(fs.read("/disc (Track 2).bin", 100, 2000).unwrap(), expected);

        let track_2: Vec<u8> = (4..10)
            .flat_map(|chd_frame| expected_sector(chd_frame, TrackType::Mode1))
            .collect();
        assert_eq!(fs.read("/disc (Track 2).bin", 1 << 20, 0).unwrap(), track_2);
    }

    #[test]
    fn opening_a_missing_file_fails_with_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ChdCursor::open(dir.path().join("missing.chd"));
        assert!(matches!(result, Err(DiscError::IoError(_))));
    }
}
