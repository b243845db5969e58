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

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cur::MessageDirectoryNode;
use super::node::{AccessListNode, Attributes, DirEntry, VirtualNode};
use super::Maildir;
use crate::support::error::Error;
use crate::support::file_ops::{self, ErrorTransforms};

pub const CUR: &str = "cur";
pub const NEW: &str = "new";
pub const TMP: &str = "tmp";
pub const ACCESS_LIST: &str = "dovecot-acl";

/// A single maildir, backed by the source directory at `path`.
///
/// Constructing one does not check that the directory exists; that is left to
/// `attributes`.
#[derive(Clone)]
pub struct MailboxNode {
    maildir: Arc<Maildir>,
    path: PathBuf,
}

impl MailboxNode {
    pub fn new(maildir: Arc<Maildir>, path: PathBuf) -> Self {
        MailboxNode { maildir, path }
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

    pub fn lookup(&self, name: &str) -> Result<VirtualNode, Error> {
        match name {
            CUR => Ok(VirtualNode::MessageDirectory(
                MessageDirectoryNode::new(
                    Arc::clone(&self.maildir),
                    self.path.clone(),
                ),
            )),
            NEW | TMP => Ok(VirtualNode::EmptyPlaceholder),
            ACCESS_LIST => Ok(VirtualNode::AccessList(AccessListNode {
                maildir: Arc::clone(&self.maildir),
                path: self.path.clone(),
            })),
            _ => Err(Error::NotFound),
        }
    }

    /// The children of every mailbox, regardless of what the source directory
    /// contains.
    pub fn list_children() -> Vec<DirEntry> {
        vec![
            DirEntry::directory(CUR),
            DirEntry::directory(NEW),
            DirEntry::directory(TMP),
            DirEntry::file(ACCESS_LIST),
        ]
    }
}
