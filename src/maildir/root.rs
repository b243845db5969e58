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

//! The root of the virtual tree.
//!
//! The root is the maildir of the source directory itself, plus a sibling
//! folder for every directory anywhere beneath it. Finding those requires
//! walking the whole source tree, so the result is cached until the source
//! directory's own modification time advances.
//!
//! That only catches directories being added to or removed from the top
//! level. Changes deeper in the tree are picked up whenever something else
//! triggers a rebuild; mail clients list folders periodically, so the lag is
//! tolerable.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use super::mailbox::MailboxNode;
use super::node::{Attributes, DirEntry, VirtualNode};
use super::path_codec;
use super::Maildir;
use crate::support::error::Error;
use crate::support::file_ops::{self, ErrorTransforms};
use crate::support::mtime_cache::CacheEntry;

/// The flattened list of every directory beneath the source root.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    cache: Mutex<Option<CacheEntry<Vec<DirEntry>>>>,
}

impl DirectoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return a folder entry for every directory beneath `source`, rebuilding
    /// the index first if `source` has been modified since it was last built.
    pub fn list(&self, source: &Path) -> Result<Vec<DirEntry>, Error> {
        let md = fs::metadata(source).on_not_found(Error::NotFound)?;
        let mtime = file_ops::mtime_secs(&md);

        let mut cache = self
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(ref entry) = *cache {
            if entry.is_fresh(mtime) {
                return Ok(entry.value.clone());
            }
        }

        debug!("Rebuilding folder index of {}", source.display());
        let folders = walk(source)?;
        debug!("Found {} folders under {}", folders.len(), source.display());
        *cache = Some(CacheEntry {
            value: folders.clone(),
            mtime,
        });
        Ok(folders)
    }
}

/// Walk the tree under `source` and produce a folder entry for every
/// directory in it, in preorder with siblings sorted by name.
///
/// Symlinks to directories are not followed. Subdirectories which cannot be
/// read (for example because they were removed mid-walk) are skipped along
/// with everything beneath them.
fn walk(source: &Path) -> Result<Vec<DirEntry>, Error> {
    let mut folders = Vec::new();
    let mut stack: Vec<(PathBuf, Vec<String>)> = Vec::new();

    push_children(&mut stack, source, &[], subdirectories(source)?);

    while let Some((path, segments)) = stack.pop() {
        folders.push(DirEntry::directory(path_codec::encode_segments(
            segments.iter().map(String::as_str),
        )));

        match subdirectories(&path) {
            Ok(children) => {
                push_children(&mut stack, &path, &segments, children)
            }
            Err(e) => warn!(
                "Not indexing folders beneath {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(folders)
}

fn push_children(
    stack: &mut Vec<(PathBuf, Vec<String>)>,
    parent: &Path,
    parent_segments: &[String],
    children: Vec<String>,
) {
    // Reversed so that the first child is popped first
    for name in children.into_iter().rev() {
        let mut segments = parent_segments.to_vec();
        let path = parent.join(&name);
        segments.push(name);
        stack.push((path, segments));
    }
}

/// Return the sorted names of the directories directly within `dir`.
fn subdirectories(dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(name) => warn!(
                "Skipping directory with non-UTF-8 name in {}: {:?}",
                dir.display(),
                name
            ),
        }
    }

    names.sort();
    Ok(names)
}

/// The root node, backed by the source directory itself.
#[derive(Clone)]
pub struct RootNode {
    maildir: Arc<Maildir>,
}

impl RootNode {
    pub fn new(maildir: Arc<Maildir>) -> Self {
        RootNode { maildir }
    }

    pub fn path(&self) -> &Path {
        self.maildir.source()
    }

    fn mailbox(&self, path: PathBuf) -> MailboxNode {
        MailboxNode::new(Arc::clone(&self.maildir), path)
    }

    pub fn attributes(&self) -> Result<Attributes, Error> {
        self.mailbox(self.path().to_owned()).attributes()
    }

    /// Look up `name`, which is either one of the root maildir's own children
    /// or an encoded folder name.
    ///
    /// Folders are not checked for existence here; a folder that does not
    /// exist fails at its first attribute query instead.
    pub fn lookup(&self, name: &str) -> Result<VirtualNode, Error> {
        let root = self.mailbox(self.path().to_owned());
        if let Ok(node) = root.lookup(name) {
            return Ok(node);
        }

        let segments =
            path_codec::decode_segments(name).ok_or(Error::NotFound)?;
        let mut path = self.path().to_owned();
        path.extend(segments);
        Ok(VirtualNode::Mailbox(self.mailbox(path)))
    }

    pub fn list_children(&self) -> Result<Vec<DirEntry>, Error> {
        let mut children = MailboxNode::list_children();
        children.extend(self.maildir.index().list(self.path())?);
        Ok(children)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::maildir::node::EntryKind;

    fn names(entries: &[DirEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn walk_flattens_every_depth() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(root.path().join("A/B/C")).unwrap();
        fs::create_dir_all(root.path().join("A/b.d")).unwrap();
        fs::create_dir_all(root.path().join("Z")).unwrap();
        fs::write(root.path().join("A/file.txt"), b"").unwrap();
        fs::write(root.path().join("top.txt"), b"").unwrap();

        let folders = walk(root.path()).unwrap();
        assert_eq!(
            vec![".A", ".A.B", ".A.B.C", ".A.b\\.d", ".Z"],
            names(&folders)
        );
        assert!(folders.iter().all(|f| EntryKind::Directory == f.kind));
    }

    #[test]
    fn walk_does_not_follow_symlinks() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(".", root.path().join("real/loop"))
            .unwrap();

        assert_eq!(vec![".real"], names(&walk(root.path()).unwrap()));
    }

    #[test]
    fn walk_of_missing_root_fails() {
        let root = tempfile::TempDir::new().unwrap();
        assert!(walk(&root.path().join("nx")).is_err());
    }

    #[test]
    fn index_rebuilds_only_when_root_mtime_advances() {
        let root = tempfile::TempDir::new().unwrap();
        fs::create_dir(root.path().join("A")).unwrap();
        file_ops::set_mtime(root.path(), 1_600_000_000);

        let index = DirectoryIndex::new();
        assert_eq!(vec![".A"], names(&index.list(root.path()).unwrap()));

        // A deeper change does not touch the root's mtime
        fs::create_dir(root.path().join("A/B")).unwrap();
        file_ops::set_mtime(root.path(), 1_600_000_000);
        assert_eq!(vec![".A"], names(&index.list(root.path()).unwrap()));

        fs::create_dir(root.path().join("C")).unwrap();
        file_ops::set_mtime(root.path(), 1_600_000_001);
        assert_eq!(
            vec![".A", ".A.B", ".C"],
            names(&index.list(root.path()).unwrap())
        );
    }
}
