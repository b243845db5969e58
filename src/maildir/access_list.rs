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

//! Synthesis of Dovecot ACL files from `.readers` marker files.
//!
//! Each non-blank line of the marker names one identity, which is granted
//! lookup and read rights on the mailbox. A directory without a marker grants
//! nothing to anyone.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::mtime_cache::MtimeCache;

pub const MARKER_FILE: &str = ".readers";

#[derive(Debug, Default)]
pub struct AccessListRenderer {
    rendered: MtimeCache<Vec<u8>>,
}

impl AccessListRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render the access list for the mailbox at `dir`.
    pub fn render(&self, dir: &Path) -> Result<Vec<u8>, Error> {
        let marker = marker_path(dir);
        // Follow symlinks, since the read below does too
        let md = match fs::metadata(&marker) {
            Ok(md) => md,
            Err(e) if std::io::ErrorKind::NotFound == e.kind() => {
                return Ok(Vec::new())
            }
            // The mailbox directory itself may be a file or missing
            Err(e) if Some(nix::libc::ENOTDIR) == e.raw_os_error() => {
                return Ok(Vec::new())
            }
            Err(e) => return Err(e.into()),
        };

        self.rendered
            .get_or_compute(&marker, file_ops::mtime_secs(&md), || {
                debug!("Rendering access list from {}", marker.display());
                // The marker may vanish between the stat and the read
                let data = fs::read(&marker).ignore_not_found()?;
                Ok(render_access_list(&marker, &data))
            })
    }

    /// Return the size of the rendered access list for the mailbox at `dir`.
    pub fn size(&self, dir: &Path) -> Result<u64, Error> {
        self.render(dir).map(|acl| acl.len() as u64)
    }
}

fn marker_path(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE)
}

/// Render the content of a marker file, `data`, into an access list.
///
/// Every line is trimmed of ASCII whitespace and, unless blank, granted
/// read access verbatim. `marker` is only used for diagnostics.
pub fn render_access_list(marker: &Path, data: &[u8]) -> Vec<u8> {
    let mut acl = Vec::new();
    for (ix, line) in data.split(|&b| b'\n' == b).enumerate() {
        let line = trim_ascii(line);
        if line.is_empty() {
            continue;
        }

        if std::str::from_utf8(line).is_err() {
            warn!(
                "{}:{}: identity is not UTF-8",
                marker.display(),
                ix + 1
            );
        }

        acl.extend_from_slice(b"user=");
        acl.extend_from_slice(line);
        acl.extend_from_slice(b" lr\n");
    }

    acl
}

fn trim_ascii(mut s: &[u8]) -> &[u8] {
    while let Some((first, rest)) = s.split_first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    while let Some((last, rest)) = s.split_last() {
        if !last.is_ascii_whitespace() {
            break;
        }
        s = rest;
    }
    s
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::support::file_ops::set_mtime;

    fn render(data: &[u8]) -> String {
        String::from_utf8_lossy(&render_access_list(
            Path::new(MARKER_FILE),
            data,
        ))
        .into_owned()
    }

    #[test]
    fn render_examples() {
        assert_eq!("user=bob lr\nuser=alice lr\n", render(b"bob\n\nalice\n"));
        assert_eq!("user=bob lr\n", render(b"  bob \t\r\n   \n"));
        assert_eq!("user=carol lr\n", render(b"carol"));
        assert_eq!("", render(b""));
        assert_eq!("", render(b"\n\n \n"));
    }

    #[test]
    fn every_line_is_passed_through() {
        assert_eq!(
            "user=bob smith lr\nuser=alice lr\n",
            render(b"bob smith\nalice\n")
        );
        assert_eq!(
            b"user=\xff\xfe lr\nuser=bob lr\n".to_vec(),
            render_access_list(Path::new(MARKER_FILE), b" \xff\xfe\r\nbob")
        );
    }

    #[test]
    fn missing_marker_is_empty() {
        let root = tempfile::TempDir::new().unwrap();
        let renderer = AccessListRenderer::new();
        assert_eq!(Vec::<u8>::new(), renderer.render(root.path()).unwrap());
        assert_eq!(0, renderer.size(root.path()).unwrap());
        assert_eq!(
            Vec::<u8>::new(),
            renderer.render(&root.path().join("nx")).unwrap()
        );
        // Absence never populates the cache
        assert_eq!(0, renderer.rendered.len());
    }

    #[test]
    fn rendered_list_is_cached_until_mtime_advances() {
        let root = tempfile::TempDir::new().unwrap();
        let marker = root.path().join(MARKER_FILE);
        fs::write(&marker, b"bob\n").unwrap();
        set_mtime(&marker, 1_600_000_000);

        let renderer = AccessListRenderer::new();
        assert_eq!(
            b"user=bob lr\n".to_vec(),
            renderer.render(root.path()).unwrap()
        );

        fs::write(&marker, b"bob\nalice\n").unwrap();
        set_mtime(&marker, 1_600_000_000);
        assert_eq!(
            b"user=bob lr\n".to_vec(),
            renderer.render(root.path()).unwrap()
        );

        set_mtime(&marker, 1_600_000_060);
        assert_eq!(
            b"user=bob lr\nuser=alice lr\n".to_vec(),
            renderer.render(root.path()).unwrap()
        );
        assert_eq!(26, renderer.size(root.path()).unwrap());

        fs::remove_file(&marker).unwrap();
        assert_eq!(Vec::<u8>::new(), renderer.render(root.path()).unwrap());
    }

    #[test]
    fn symlinked_marker_follows_target() {
        let root = tempfile::TempDir::new().unwrap();
        let target = root.path().join("readers.txt");
        fs::write(&target, b"bob\n").unwrap();
        set_mtime(&target, 1_600_000_000);
        std::os::unix::fs::symlink(&target, root.path().join(MARKER_FILE))
            .unwrap();

        let renderer = AccessListRenderer::new();
        assert_eq!(
            b"user=bob lr\n".to_vec(),
            renderer.render(root.path()).unwrap()
        );

        fs::write(&target, b"alice\n").unwrap();
        set_mtime(&target, 1_600_000_060);
        assert_eq!(
            b"user=alice lr\n".to_vec(),
            renderer.render(root.path()).unwrap()
        );
    }
}
