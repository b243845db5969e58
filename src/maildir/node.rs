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

//! The polymorphic virtual tree.
//!
//! A transport walks this tree top-down: it starts from the root node, calls
//! `lookup` once per path component, and then asks the final node for its
//! attributes, its children, or its content.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::cur::MessageDirectoryNode;
use super::mailbox::MailboxNode;
use super::root::RootNode;
use super::Maildir;
use crate::support::error::Error;

pub const DIRECTORY_MODE: u32 = 0o500;
pub const ACCESS_LIST_MODE: u32 = 0o400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: EntryKind::File,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        DirEntry {
            name: name.into(),
            kind: EntryKind::Directory,
        }
    }
}

/// The attributes of a node, as reported to the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attributes {
    pub kind: EntryKind,
    /// Permission bits only.
    pub mode: u32,
    pub size: u64,
    /// Whole-second modification time of the underlying source, if there is
    /// one.
    pub mtime: Option<i64>,
}

impl Attributes {
    pub fn directory(mtime: Option<i64>) -> Self {
        Attributes {
            kind: EntryKind::Directory,
            mode: DIRECTORY_MODE,
            size: 0,
            mtime,
        }
    }
}

/// A message, backed by the regular file at `path`.
#[derive(Clone)]
pub struct MessageNode {
    pub(super) maildir: Arc<Maildir>,
    pub(super) path: PathBuf,
}

/// The `dovecot-acl` file of the mailbox at `path`.
#[derive(Clone)]
pub struct AccessListNode {
    pub(super) maildir: Arc<Maildir>,
    pub(super) path: PathBuf,
}

/// A node of the virtual tree.
#[derive(Clone)]
pub enum VirtualNode {
    Root(RootNode),
    Mailbox(MailboxNode),
    MessageDirectory(MessageDirectoryNode),
    Message(MessageNode),
    AccessList(AccessListNode),
    /// The `new` and `tmp` folders, which are never populated.
    EmptyPlaceholder,
}

impl VirtualNode {
    /// The absolute source path this node represents, if any.
    pub fn source_path(&self) -> Option<&Path> {
        match *self {
            VirtualNode::Root(ref n) => Some(n.path()),
            VirtualNode::Mailbox(ref n) => Some(n.path()),
            VirtualNode::MessageDirectory(ref n) => Some(n.path()),
            VirtualNode::Message(ref n) => Some(&n.path),
            VirtualNode::AccessList(ref n) => Some(&n.path),
            VirtualNode::EmptyPlaceholder => None,
        }
    }

    pub fn attributes(&self) -> Result<Attributes, Error> {
        match *self {
            VirtualNode::Root(ref n) => n.attributes(),
            VirtualNode::Mailbox(ref n) => n.attributes(),
            VirtualNode::MessageDirectory(ref n) => n.attributes(),
            VirtualNode::Message(ref n) => {
                n.maildir.messages().attributes(&n.path)
            }
            VirtualNode::AccessList(ref n) => {
                let size = n.maildir.access_lists().size(&n.path)?;
                Ok(Attributes {
                    kind: EntryKind::File,
                    mode: ACCESS_LIST_MODE,
                    size,
                    mtime: None,
                })
            }
            VirtualNode::EmptyPlaceholder => Ok(Attributes::directory(None)),
        }
    }

    /// Look up the child of this node called `name`.
    ///
    /// This never touches the source tree for the root and mailbox nodes.
    pub fn lookup(&self, name: &str) -> Result<VirtualNode, Error> {
        match *self {
            VirtualNode::Root(ref n) => n.lookup(name),
            VirtualNode::Mailbox(ref n) => n.lookup(name),
            VirtualNode::MessageDirectory(ref n) => n.lookup(name),
            VirtualNode::EmptyPlaceholder => Err(Error::NotFound),
            VirtualNode::Message(_) | VirtualNode::AccessList(_) => {
                Err(Error::NotADirectory)
            }
        }
    }

    pub fn list_children(&self) -> Result<Vec<DirEntry>, Error> {
        match *self {
            VirtualNode::Root(ref n) => n.list_children(),
            VirtualNode::Mailbox(_) => Ok(MailboxNode::list_children()),
            VirtualNode::MessageDirectory(ref n) => n.list_children(),
            VirtualNode::EmptyPlaceholder => Ok(vec![]),
            VirtualNode::Message(_) | VirtualNode::AccessList(_) => {
                Err(Error::NotADirectory)
            }
        }
    }

    pub fn read_content(&self) -> Result<Vec<u8>, Error> {
        match *self {
            VirtualNode::Message(ref n) => n.maildir.messages().read(&n.path),
            VirtualNode::AccessList(ref n) => {
                n.maildir.access_lists().render(&n.path)
            }
            _ => Err(Error::IsADirectory),
        }
    }
}

impl fmt::Debug for VirtualNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match *self {
            VirtualNode::Root(_) => "Root",
            VirtualNode::Mailbox(_) => "Mailbox",
            VirtualNode::MessageDirectory(_) => "MessageDirectory",
            VirtualNode::Message(_) => "Message",
            VirtualNode::AccessList(_) => "AccessList",
            VirtualNode::EmptyPlaceholder => "EmptyPlaceholder",
        };

        match self.source_path() {
            Some(path) => write!(f, "{}({})", kind, path.display()),
            None => write!(f, "{}", kind),
        }
    }
}
