use crate::commands::chd::{CueCommand, MountCommand, TracksCommand};
use clap::{Parser, Subcommand};

pub mod chd;

/// Mount CD CHD images as a directory of per-track .bin files and a cue sheet.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Mount(MountCommand),
    Cue(CueCommand),
    Tracks(TracksCommand),
}
