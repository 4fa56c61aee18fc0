use clap::Parser;
use std::path::PathBuf;

/// Mounts a CHD image read-only, exposing one .bin per track plus a .cue file.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
pub struct MountCommand {
    /// Input CHD file
    #[arg(value_name = "INPUT_CHD")]
    pub input: PathBuf,

    /// Directory to mount the tracks on
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// Allow other users to access the mount (requires user_allow_other in /etc/fuse.conf)
    #[arg(long, default_value_t = false)]
    pub allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long, default_value_t = false)]
    pub auto_unmount: bool,

    /// Filesystem name shown in the mount table
    #[arg(long, value_name = "NAME", default_value = "chd-tracks")]
    pub fs_name: String,
}

/// Prints the cue sheet a mount of the CHD image would expose.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
pub struct CueCommand {
    /// Input CHD file
    #[arg(value_name = "INPUT_CHD")]
    pub input: PathBuf,

    /// Write the cue sheet to this file instead of stdout
    #[arg(long, short = 'o', value_name = "OUTPUT")]
    pub output: Option<PathBuf>,
}

/// Lists the tracks of a CHD image with their virtual file names and sizes.
#[derive(Parser, Debug, Clone, Eq, PartialEq)]
pub struct TracksCommand {
    /// Input CHD file
    #[arg(value_name = "INPUT_CHD")]
    pub input: PathBuf,
}
