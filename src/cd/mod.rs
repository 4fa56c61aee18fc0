use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

pub const SECTOR_SIZE: usize = 2352;
pub const SUBCODE_SIZE: usize = 96;
pub const FRAME_SIZE: usize = SECTOR_SIZE + SUBCODE_SIZE;

/// Frames per second of CD audio, the "F" in MSF.
pub const FRAMES_PER_SECOND: u32 = 75;
/// Two-second lead-in that disc-absolute timestamps are offset by.
pub const LEAD_IN_FRAMES: u32 = 150;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown track type: {0}")]
pub struct UnknownTrackType(pub String);

/// Track types as reported by a disc cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Audio,
    Mode1,
    Mode1Raw,
    Mode2,
    Mode2Raw,
    Mode2Form1,
    Mode2Form2,
    Mode2FormMix,
}

impl TrackType {
    /// Bytes of payload a cursor hands out per sector of this type.
    pub fn payload_size(&self) -> usize {
        match self {
            TrackType::Audio | TrackType::Mode1Raw | TrackType::Mode2Raw => SECTOR_SIZE,
            TrackType::Mode1 | TrackType::Mode2Form1 => 2048,
            TrackType::Mode2 | TrackType::Mode2FormMix => 2336,
            TrackType::Mode2Form2 => 2324,
        }
    }

    /// Label written on a cue sheet `TRACK` line.
    ///
    /// Data tracks are always advertised with a 2352 byte sector size, whatever payload
    /// the cursor returns for them.
    pub fn cue_label(&self) -> &'static str {
        match self {
            TrackType::Audio => "AUDIO",
            TrackType::Mode1 | TrackType::Mode1Raw => "MODE1/2352",
            TrackType::Mode2
            | TrackType::Mode2Raw
            | TrackType::Mode2Form1
            | TrackType::Mode2Form2
            | TrackType::Mode2FormMix => "MODE2/2352",
        }
    }

    pub fn is_audio(&self) -> bool {
        matches!(self, TrackType::Audio)
    }

    fn as_str(&self) -> &'static str {
        match self {
            TrackType::Audio => "AUDIO",
            TrackType::Mode1 => "MODE1",
            TrackType::Mode1Raw => "MODE1_RAW",
            TrackType::Mode2 => "MODE2",
            TrackType::Mode2Raw => "MODE2_RAW",
            TrackType::Mode2Form1 => "MODE2_FORM1",
            TrackType::Mode2Form2 => "MODE2_FORM2",
            TrackType::Mode2FormMix => "MODE2_FORM_MIX",
        }
    }
}

impl Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackType {
    type Err = UnknownTrackType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Older CHDs carry cue-style names instead of the chdman ones.
        match s {
            "AUDIO" => Ok(TrackType::Audio),
            "MODE1" | "MODE1/2048" => Ok(TrackType::Mode1),
            "MODE1_RAW" | "MODE1/2352" => Ok(TrackType::Mode1Raw),
            "MODE2" | "MODE2/2336" => Ok(TrackType::Mode2),
            "MODE2_RAW" | "MODE2/2352" | "CDI/2352" => Ok(TrackType::Mode2Raw),
            "MODE2_FORM1" | "MODE2/2048" => Ok(TrackType::Mode2Form1),
            "MODE2_FORM2" | "MODE2/2324" => Ok(TrackType::Mode2Form2),
            "MODE2_FORM_MIX" | "CDI/2336" => Ok(TrackType::Mode2FormMix),
            _ => Err(UnknownTrackType(s.to_string())),
        }
    }
}

/// Disc-absolute minutes:seconds:frames timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Msf {
    pub minutes: u8,
    pub seconds: u8,
    pub frames: u8,
}

impl Msf {
    pub const MAX: Msf = Msf {
        minutes: 255,
        seconds: 59,
        frames: 74,
    };

    /// Highest sector address an [`Msf`] can hold.
    pub const MAX_LBA: u32 = (255 * 60 + 59) * FRAMES_PER_SECOND + 74 - LEAD_IN_FRAMES;

    /// `None` once the minutes no longer fit.
    pub fn from_lba(lba: u32) -> Option<Self> {
        let absolute = lba.checked_add(LEAD_IN_FRAMES)?;
        Some(Self {
            minutes: u8::try_from(absolute / (60 * FRAMES_PER_SECOND)).ok()?,
            seconds: ((absolute / FRAMES_PER_SECOND) % 60) as u8,
            frames: (absolute % FRAMES_PER_SECOND) as u8,
        })
    }

    pub fn to_lba(&self) -> u32 {
        ((self.minutes as u32 * 60 + self.seconds as u32) * FRAMES_PER_SECOND
            + self.frames as u32)
            .saturating_sub(LEAD_IN_FRAMES)
    }
}

impl Display for Msf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.minutes, self.seconds, self.frames)
    }
}
