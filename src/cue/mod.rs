use crate::catalog::Track;

/// Cue sheet tying the per-track `.bin` files back into one disc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSheet {
    bytes: Vec<u8>,
}

impl CueSheet {
    pub fn from_tracks(tracks: &[Track]) -> Self {
        let sheet: String = tracks
            .iter()
            .map(|track| {
                format!(
                    "FILE \"{}\" BINARY\n  TRACK {:02} {}\n    INDEX 01 00:00:00\n",
                    track.name,
                    track.index,
                    track.mode_label()
                )
            })
            .collect();

        Self {
            bytes: sheet.into_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Bytes in `[offset, offset + length)`, clipped to the end of the sheet.
    pub fn slice(&self, offset: u64, length: usize) -> &[u8] {
        let start = usize::try_from(offset)
            .unwrap_or(usize::MAX)
            .min(self.bytes.len());
        let end = start.saturating_add(length).min(self.bytes.len());
        &self.bytes[start..end]
    }
}
