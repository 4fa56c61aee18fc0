use crate::commands::{Cli, Commands};
use crate::mount::{mount_chd, print_cue, print_tracks};
use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

mod catalog;
mod cd;
mod commands;
mod cue;
mod disc;
mod fs;
mod mount;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let logger = env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .build();

    let level = logger.filter();
    let pb = MultiProgress::new();

    LogWrapper::new(pb.clone(), logger).try_init()?;
    log::set_max_level(level);

    let cli = Cli::parse();

    match cli.command {
        Commands::Mount(cmd) => mount_chd(pb, cmd)?,
        Commands::Cue(cmd) => print_cue(pb, cmd)?,
        Commands::Tracks(cmd) => print_tracks(pb, cmd)?,
    }

    Ok(())
}
