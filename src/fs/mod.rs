//! Path-level view of a disc: a flat, read-only root holding one `.bin` per track
//! and the cue sheet that stitches them together.

use crate::catalog::{Track, TrackCatalog};
use crate::cd::Msf;
use crate::cue::CueSheet;
use crate::disc::DiscCursor;
use crate::disc::error::{DiscError, DiscResult};
use crate::fs::error::{FsError, FsResult};
use log::debug;

pub mod error;
pub mod fuse;

const FILE_MODE: u32 = 0o100444;
const DIRECTORY_MODE: u32 = 0o40555;
const DIRECTORY_SIZE: u64 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// stat-like attributes of a virtual entry. Everything is owned by root and has
/// no timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub kind: EntryKind,
    pub mode: u32,
    pub size: u64,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
}

impl Attributes {
    fn file(size: u64) -> Self {
        Self {
            kind: EntryKind::File,
            mode: FILE_MODE,
            size,
            nlink: 1,
            uid: 0,
            gid: 0,
        }
    }

    fn directory() -> Self {
        Self {
            kind: EntryKind::Directory,
            mode: DIRECTORY_MODE,
            size: DIRECTORY_SIZE,
            nlink: 1,
            uid: 0,
            gid: 0,
        }
    }

    /// Permission bits without the file type.
    pub fn permissions(&self) -> u16 {
        (self.mode & 0o7777) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn from_flags(flags: i32) -> Self {
        match flags & libc::O_ACCMODE {
            libc::O_WRONLY => AccessMode::WriteOnly,
            libc::O_RDWR => AccessMode::ReadWrite,
            _ => AccessMode::ReadOnly,
        }
    }
}

enum Node<'a> {
    Root,
    Cue,
    Track(&'a Track),
    Missing,
}

/// Serves listing, attribute, open and read requests for one mounted disc.
pub struct DiscFs<C> {
    catalog: TrackCatalog,
    cue_sheet: CueSheet,
    cue_file_name: String,
    cursor: C,
}

impl<C: DiscCursor> DiscFs<C> {
    pub fn new(catalog: TrackCatalog, cursor: C) -> Self {
        let cue_sheet = CueSheet::from_tracks(catalog.tracks());
        let cue_file_name = catalog.cue_file_name();

        Self {
            catalog,
            cue_sheet,
            cue_file_name,
            cursor,
        }
    }

    pub fn cue_sheet(&self) -> &CueSheet {
        &self.cue_sheet
    }

    /// Every regular file in the root, tracks first.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.catalog
            .tracks()
            .iter()
            .map(|track| track.name.as_str())
            .chain(std::iter::once(self.cue_file_name.as_str()))
    }

    /// Entries of the root directory, optionally filtered by a shell glob.
    pub fn list<'a>(
        &'a self,
        path: &str,
        pattern: Option<&str>,
    ) -> FsResult<impl Iterator<Item = &'a str> + use<'a, C>> {
        debug!("list: {path} - {pattern:?}");

        if split_root(path)?.is_some() {
            return Err(FsError::NotFound(path.to_string()));
        }

        let pattern = pattern
            .filter(|pattern| !pattern.is_empty())
            .map(glob::Pattern::new)
            .transpose()?;

        Ok([".", ".."]
            .into_iter()
            .chain(self.file_names())
            .filter(move |name| pattern.as_ref().is_none_or(|p| p.matches(name))))
    }

    pub fn attributes(&self, path: &str) -> FsResult<Attributes> {
        debug!("attributes: {path}");

        Ok(match self.node(path)? {
            Node::Cue => Attributes::file(self.cue_sheet.len() as u64),
            Node::Track(track) => Attributes::file(track.byte_length),
            Node::Root | Node::Missing => Attributes::directory(),
        })
    }

    pub fn open(&self, path: &str, access: AccessMode) -> FsResult<()> {
        debug!("open: {path} - {access:?}");

        match self.node(path)? {
            Node::Cue | Node::Track(_) if access != AccessMode::ReadOnly => {
                Err(FsError::PermissionDenied(path.to_string()))
            }
            Node::Cue | Node::Track(_) => Ok(()),
            Node::Root | Node::Missing => Err(FsError::NotFound(path.to_string())),
        }
    }

    /// Reads up to `length` bytes at `offset`. Reads past the end of a file come
    /// back short rather than failing.
    pub fn read(&mut self, path: &str, length: usize, offset: u64) -> FsResult<Vec<u8>> {
        debug!("read: {path} - {length} - {offset}");

        let name = split_root(path)?.ok_or_else(|| FsError::NotFound(path.to_string()))?;

        if name == self.cue_file_name {
            return Ok(self.cue_sheet.slice(offset, length).to_vec());
        }

        let track = self
            .catalog
            .find(name)
            .ok_or_else(|| FsError::NotFound(path.to_string()))?;

        Ok(read_track(&mut self.cursor, track, offset, length)?)
    }

    fn node(&self, path: &str) -> FsResult<Node<'_>> {
        Ok(match split_root(path)? {
            None => Node::Root,
            Some(name) if name == self.cue_file_name => Node::Cue,
            Some(name) => self.catalog.find(name).map(Node::Track).unwrap_or(Node::Missing),
        })
    }
}

/// Name of a root entry, `None` for the root itself. Anything below the root does
/// not exist.
fn split_root(path: &str) -> FsResult<Option<&str>> {
    let name = path.strip_prefix('/').unwrap_or(path).trim_end_matches('/');
    match name {
        "" | "." | ".." => Ok(None),
        name if name.contains('/') => Err(FsError::NotFound(path.to_string())),
        name => Ok(Some(name)),
    }
}

/// Repositions `cursor` on the sector holding `offset` and gathers sectors until
/// `length` bytes are collected or the track ends.
fn read_track<C: DiscCursor>(
    cursor: &mut C,
    track: &Track,
    offset: u64,
    length: usize,
) -> DiscResult<Vec<u8>> {
    if length == 0 || offset >= track.byte_length {
        return Ok(Vec::new());
    }

    let stride = track.sector_length as u64;
    let sector_index = (offset / stride) as u32;
    let skip = (offset % stride) as usize;

    let lba = track.start_sector + sector_index;
    cursor.set_location(Msf::from_lba(lba).ok_or(DiscError::AddressOutOfRange(lba))?)?;

    let mut buffer = cursor.copy_current_sector()?;
    buffer.drain(..skip.min(buffer.len()));
    let mut event = cursor.advance_position()?;

    while buffer.len() < length && !event.ends_track() {
        buffer.extend_from_slice(&cursor.copy_current_sector()?);
        event = cursor.advance_position()?;
    }

    buffer.truncate(length);
    Ok(buffer)
}
