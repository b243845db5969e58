//-
// Copyright (c) 2023, Jason Lingle
//
// This file is part of Maildirfs.
//
// Maildirfs is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// Maildirfs is distributed in the hope that it will be useful, but WITHOUT ANY
// WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Maildirfs. If not, see <http://www.gnu.org/licenses/>.

//! The `cur` folder of a mailbox, which holds one message per regular file
//! directly inside the mailbox's source directory.
//!
//! Message names follow the maildir convention of `time.unique.host:2,flags`,
//! using the file's modification time for `time` and its name for `unique`.
//! Every message is flagged as seen (`S`).
//!
//! There is deliberately no `,S=<size>` part in the name. Dovecot can use it
//! to avoid a stat, but producing it would require rendering every message
//! just to list the folder.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::node::{Attributes, DirEntry, MessageNode, VirtualNode};
use super::Maildir;
use crate::support::error::Error;
use crate::support::file_ops::{self, ErrorTransforms};
use crate::support::safe_name::is_safe_name;

const INFO_SUFFIX: &str = ":2,S";

#[derive(Clone)]
pub struct MessageDirectoryNode {
    maildir: Arc<Maildir>,
    path: PathBuf,
}

impl MessageDirectoryNode {
    pub fn new(maildir: Arc<Maildir>, path: PathBuf) -> Self {
        MessageDirectoryNode { maildir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attributes(&self) -> Result<Attributes, Error> {
        let md = fs::metadata(&self.path).on_not_found(Error::NotFound)?;
        if !md.is_dir() {
            return Err(Error::NotFound);
        }
        Ok(Attributes::directory(Some(file_ops::mtime_secs(&md))))
    }

    pub fn list_children(&self) -> Result<Vec<DirEntry>, Error> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.path).on_not_found(Error::NotFound)? {
            let entry = entry?;
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(name) => {
                    warn!(
                        "Skipping file with non-UTF-8 name in {}: {:?}",
                        self.path.display(),
                        name
                    );
                    continue;
                }
            };

            // Follow symlinks so that links to regular files are messages
            let md = match fs::metadata(entry.path()) {
                Ok(md) => md,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };

            // Directories are mailboxes of their own, listed by the root.
            // Anything else that is not a regular file (FIFOs, sockets,
            // devices) could block or never end when read.
            if !md.is_file() {
                continue;
            }

            entries.push(DirEntry::file(message_name(
                file_ops::mtime_secs(&md),
                &name,
                self.maildir.host_name(),
            )));
        }

        Ok(entries)
    }

    pub fn lookup(&self, name: &str) -> Result<VirtualNode, Error> {
        let file_name = file_name(name).ok_or(Error::NotFound)?;
        let path = self.path.join(file_name);
        let md = fs::metadata(&path).on_not_found(Error::NotFound)?;
        if !md.is_file() {
            return Err(Error::NotFound);
        }

        Ok(VirtualNode::Message(MessageNode {
            maildir: Arc::clone(&self.maildir),
            path,
        }))
    }
}

/// Produce the name of the message for a file called `file_name` which was
/// last modified at `mtime`.
pub fn message_name(mtime: i64, file_name: &str, host_name: &str) -> String {
    format!("{}.{}.{}{}", mtime, file_name, host_name, INFO_SUFFIX)
}

/// Recover the name of the file from the name of a message.
///
/// Everything up to the first `.` (the time) and from the last `.` onward
/// (host and info) is removed. The time is not checked, so a name produced
/// before the file was last modified still resolves.
pub fn file_name(message_name: &str) -> Option<&str> {
    let (_, rest) = split_once(message_name, '.')?;
    let file_name = match rsplit_once(rest, '.') {
        Some((file_name, _)) => file_name,
        None => rest,
    };

    if is_safe_name(file_name) {
        Some(file_name)
    } else {
        None
    }
}

fn split_once(s: &str, delim: char) -> Option<(&str, &str)> {
    s.find(delim).map(|ix| (&s[..ix], &s[ix + 1..]))
}

fn rsplit_once(s: &str, delim: char) -> Option<(&str, &str)> {
    s.rfind(delim).map(|ix| (&s[..ix], &s[ix + 1..]))
}
