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

//! Presentation of an arbitrary, read-only directory tree as a Maildir++
//! hierarchy.
//!
//! Every directory in the source tree becomes a maildir. Its regular files
//! become messages in `cur`, each synthesised on demand as a MIME message
//! with the file as its base64-encoded body. `new` and `tmp` are always
//! empty. `dovecot-acl` is derived from the `.readers` file in the directory,
//! if there is one.
//!
//! Maildir++ does not nest folders, so the root lists every directory beneath
//! it as a direct child, with names produced by `path_codec`.
//!
//! Nothing here ever writes to the source tree, and all state is in-memory
//! caches which can be rebuilt from the source tree at any time. The source
//! tree may change underneath us at any time; this results in stale or "not
//! found" results until the relevant cache notices, never anything worse.

pub mod access_list;
pub mod cur;
pub mod mailbox;
pub mod message;
pub mod node;
pub mod path_codec;
pub mod root;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use self::node::{Attributes, DirEntry, EntryKind, VirtualNode};

use self::access_list::AccessListRenderer;
use self::message::MessageRenderer;
use self::root::{DirectoryIndex, RootNode};
use crate::support::error::Error;
use crate::support::file_ops::ErrorTransforms;
use crate::support::system_config::MaildirConfig;

/// State shared by every node of one virtual tree.
#[derive(Debug)]
pub struct Maildir {
    source: PathBuf,
    host_name: String,
    messages: MessageRenderer,
    access_lists: AccessListRenderer,
    index: DirectoryIndex,
}

impl Maildir {
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn messages(&self) -> &MessageRenderer {
        &self.messages
    }

    pub fn access_lists(&self) -> &AccessListRenderer {
        &self.access_lists
    }

    pub fn index(&self) -> &DirectoryIndex {
        &self.index
    }
}

/// Handle to a virtual Maildir++ tree over one source directory.
///
/// This is the interface a filesystem transport drives. Paths are virtual
/// paths relative to the root of the tree, e.g.
/// `.Work.Projects/cur/1700000000.report.pdf.localhost:2,S`; the empty path
/// is the root itself.
///
/// It is cheap to clone, and all clones share the same caches.
#[derive(Clone, Debug)]
pub struct MaildirFs {
    maildir: Arc<Maildir>,
}

impl MaildirFs {
    pub fn new(source: &Path, config: &MaildirConfig) -> Result<Self, Error> {
        config.validate()?;

        let source = source.canonicalize().on_not_found(Error::NotFound)?;
        if !fs::metadata(&source)?.is_dir() {
            return Err(Error::NotADirectory);
        }

        Ok(MaildirFs {
            maildir: Arc::new(Maildir {
                source,
                host_name: config.host_name.clone(),
                messages: MessageRenderer::new(config),
                access_lists: AccessListRenderer::new(),
                index: DirectoryIndex::new(),
            }),
        })
    }

    /// The canonical path of the source directory.
    pub fn source(&self) -> &Path {
        self.maildir.source()
    }

    pub fn root(&self) -> VirtualNode {
        VirtualNode::Root(RootNode::new(Arc::clone(&self.maildir)))
    }

    /// Find the node at `path` by looking up each component in turn.
    pub fn resolve(&self, path: &str) -> Result<VirtualNode, Error> {
        path.split('/')
            .filter(|c| !c.is_empty())
            .try_fold(self.root(), |node, name| node.lookup(name))
    }

    pub fn get_attributes(&self, path: &str) -> Result<Attributes, Error> {
        self.resolve(path)?.attributes()
    }

    pub fn lookup(
        &self,
        parent: &str,
        name: &str,
    ) -> Result<VirtualNode, Error> {
        self.resolve(parent)?.lookup(name)
    }

    pub fn list_children(&self, path: &str) -> Result<Vec<DirEntry>, Error> {
        self.resolve(path)?.list_children()
    }

    pub fn read_content(&self, path: &str) -> Result<Vec<u8>, Error> {
        self.resolve(path)?.read_content()
    }
}
