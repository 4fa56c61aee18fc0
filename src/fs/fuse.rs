//! `fuser` front end translating inode based kernel requests into [`DiscFs`] calls.

use crate::disc::DiscCursor;
use crate::fs::{AccessMode, Attributes, DiscFs, EntryKind};
use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyData, ReplyDirectory, ReplyEntry, ReplyOpen,
    Request,
};
use log::{debug, warn};
use std::ffi::OsStr;
use std::time::{Duration, UNIX_EPOCH};

const ROOT_INODE: u64 = 1;
const FIRST_FILE_INODE: u64 = 2;

/// The image never changes while mounted.
const TTL: Duration = Duration::from_secs(60);

const BLOCK_SIZE: u32 = 512;

/// Mountable filesystem. Inode 1 is the root, files follow in
/// [`DiscFs::file_names`] order.
pub struct TrackFs<C> {
    fs: DiscFs<C>,
    paths: Vec<String>,
}

impl<C: DiscCursor> TrackFs<C> {
    pub fn new(fs: DiscFs<C>) -> Self {
        let paths = fs.file_names().map(|name| format!("/{name}")).collect();
        Self { fs, paths }
    }

    fn path(&self, ino: u64) -> Option<&str> {
        if ino == ROOT_INODE {
            return Some("/");
        }
        let index = ino.checked_sub(FIRST_FILE_INODE)?;
        self.paths.get(usize::try_from(index).ok()?).map(String::as_str)
    }

    fn inode_of(&self, name: &str) -> Option<u64> {
        self.paths
            .iter()
            .position(|path| &path[1..] == name)
            .map(|index| index as u64 + FIRST_FILE_INODE)
    }

    fn file_attr(&self, ino: u64) -> Option<FileAttr> {
        let path = self.path(ino)?;
        match self.fs.attributes(path) {
            Ok(attributes) => Some(to_file_attr(ino, &attributes)),
            Err(e) => {
                warn!("getattr failed for {path}: {e}");
                None
            }
        }
    }
}

fn to_file_attr(ino: u64, attributes: &Attributes) -> FileAttr {
    FileAttr {
        ino,
        size: attributes.size,
        blocks: attributes.size.div_ceil(BLOCK_SIZE as u64),
        atime: UNIX_EPOCH,
        mtime: UNIX_EPOCH,
        ctime: UNIX_EPOCH,
        crtime: UNIX_EPOCH,
        kind: match attributes.kind {
            EntryKind::File => FileType::RegularFile,
            EntryKind::Directory => FileType::Directory,
        },
        perm: attributes.permissions(),
        nlink: attributes.nlink,
        uid: attributes.uid,
        gid: attributes.gid,
        rdev: 0,
        blksize: BLOCK_SIZE,
        flags: 0,
    }
}

impl<C: DiscCursor> Filesystem for TrackFs<C> {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        debug!("lookup: parent={parent}, name={name:?}");

        if parent != ROOT_INODE {
            reply.error(libc::ENOENT);
            return;
        }

        let attr = name
            .to_str()
            .and_then(|name| self.inode_of(name))
            .and_then(|ino| self.file_attr(ino));

        match attr {
            Some(attr) => reply.entry(&TTL, &attr, 0),
            None => reply.error(libc::ENOENT),
        }
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        debug!("getattr: ino={ino}");

        match self.file_attr(ino) {
            Some(attr) => reply.attr(&TTL, &attr),
            None => reply.error(libc::ENOENT),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        debug!("readdir: ino={ino}, offset={offset}");

        if ino != ROOT_INODE {
            reply.error(libc::ENOTDIR);
            return;
        }

        let entries = match self.fs.list("/", None) {
            Ok(entries) => entries,
            Err(e) => {
                reply.error(e.errno());
                return;
            }
        };

        let skip = usize::try_from(offset).unwrap_or(0);
        for (index, name) in entries.enumerate().skip(skip) {
            let (entry_ino, kind) = match name {
                "." | ".." => (ROOT_INODE, FileType::Directory),
                name => match self.inode_of(name) {
                    Some(entry_ino) => (entry_ino, FileType::RegularFile),
                    None => continue,
                },
            };

            // The offset handed back is where the next readdir call resumes.
            if reply.add(entry_ino, index as i64 + 1, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        debug!("open: ino={ino}, flags={flags:#o}");

        let Some(path) = self.path(ino) else {
            reply.error(libc::ENOENT);
            return;
        };

        match self.fs.open(path, AccessMode::from_flags(flags)) {
            Ok(()) => reply.opened(0, 0),
            Err(e) => {
                debug!("open refused for {path}: {e}");
                reply.error(e.errno());
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Some(path) = self.path(ino).map(str::to_owned) else {
            reply.error(libc::ENOENT);
            return;
        };

        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };

        match self.fs.read(&path, size as usize, offset) {
            Ok(data) => reply.data(&data),
            Err(e) => {
                warn!("read of {path} at {offset} failed: {e}");
                reply.error(e.errno());
            }
        }
    }
}
