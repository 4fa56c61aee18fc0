use crate::catalog::TrackCatalog;
use crate::commands::chd::{CueCommand, MountCommand, TracksCommand};
use crate::cue::CueSheet;
use crate::disc::chd::ChdCursor;
use crate::fs::DiscFs;
use crate::fs::fuse::TrackFs;
use anyhow::{Context, anyhow};
use fuser::MountOption;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

pub fn mount_chd(pb: MultiProgress, cmd: MountCommand) -> anyhow::Result<()> {
    // Checked up front so a bad mountpoint does not surface as EIO from the kernel
    if !cmd.mountpoint.is_dir() {
        return Err(anyhow!(
            "Mountpoint {:?} does not exist or is not a directory",
            cmd.mountpoint
        ));
    }

    let (catalog, cursor) = scan_chd(&pb, &cmd.input)?;

    let mut options = vec![
        MountOption::FSName(cmd.fs_name.clone()),
        MountOption::RO,
        MountOption::DefaultPermissions,
    ];
    if cmd.allow_other {
        options.push(MountOption::AllowOther);
    }
    if cmd.auto_unmount {
        options.push(MountOption::AutoUnmount);
    }
    debug!("Mount options: {options:?}");

    info!(
        "Mounting {:?} as {:?} on {:?} ({} tracks)",
        cmd.input,
        catalog.basename(),
        cmd.mountpoint,
        catalog.tracks().len()
    );

    let fs = TrackFs::new(DiscFs::new(catalog, cursor));
    fuser::mount2(fs, &cmd.mountpoint, &options)
        .with_context(|| format!("Failed to mount {:?}", cmd.mountpoint))?;

    info!("Unmounted {:?}", cmd.mountpoint);
    Ok(())
}

pub fn print_cue(pb: MultiProgress, cmd: CueCommand) -> anyhow::Result<()> {
    let (catalog, _) = scan_chd(&pb, &cmd.input)?;
    let cue_sheet = CueSheet::from_tracks(catalog.tracks());

    match cmd.output {
        Some(output) => {
            std::fs::write(&output, cue_sheet.as_bytes())
                .with_context(|| format!("Failed to write cue sheet to {output:?}"))?;
            info!("Wrote {:?}", output);
        }
        None => std::io::stdout().write_all(cue_sheet.as_bytes())?,
    }

    Ok(())
}

pub fn print_tracks(pb: MultiProgress, cmd: TracksCommand) -> anyhow::Result<()> {
    let (catalog, _) = scan_chd(&pb, &cmd.input)?;

    for track in catalog.tracks() {
        println!(
            "{:>2}  {:<14}  sector {:>6}  {:>6} sectors  {:>10} bytes  {}",
            track.index,
            track.track_type.to_string(),
            track.start_sector,
            track.sector_count(),
            track.byte_length,
            track.name
        );
    }
    println!("{}", catalog.cue_file_name());

    Ok(())
}

/// Opens `input` and walks it once to build the track catalog.
fn scan_chd(
    pb: &MultiProgress,
    input: &Path,
) -> anyhow::Result<(TrackCatalog, ChdCursor<BufReader<File>>)> {
    let basename = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| anyhow!("Cannot derive a base name from {input:?}"))?
        .to_string();

    let mut cursor =
        ChdCursor::open(input).with_context(|| format!("Failed to open CHD image {input:?}"))?;

    let progress = pb.add(ProgressBar::new(0));
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );

    let catalog = TrackCatalog::build(&mut cursor, &basename, &progress)
        .with_context(|| format!("Failed to read the tracks of {input:?}"))?;

    Ok((catalog, cursor))
}
