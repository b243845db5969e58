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

//! Read-only views of the virtual tree for administrators.

use std::io::Write;

use chrono::prelude::*;
use log::warn;

use crate::maildir::mailbox::{ACCESS_LIST, CUR};
use crate::maildir::{EntryKind, MaildirFs};
use crate::support::error::Error;

fn kind_char(kind: EntryKind) -> char {
    match kind {
        EntryKind::Directory => 'd',
        EntryKind::File => '-',
    }
}

pub fn ls(
    fs: &MaildirFs,
    path: &str,
    out: &mut impl Write,
) -> Result<(), Error> {
    for entry in fs.list_children(path)? {
        writeln!(out, "{} {}", kind_char(entry.kind), entry.name)?;
    }
    Ok(())
}

pub fn stat(
    fs: &MaildirFs,
    path: &str,
    out: &mut impl Write,
) -> Result<(), Error> {
    let attrs = fs.get_attributes(path)?;
    writeln!(
        out,
        "kind:  {}",
        match attrs.kind {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
        }
    )?;
    writeln!(out, "mode:  {:04o}", attrs.mode)?;
    writeln!(out, "size:  {}", attrs.size)?;
    match attrs.mtime.and_then(|t| Utc.timestamp_opt(t, 0).single()) {
        Some(mtime) => writeln!(out, "mtime: {}", mtime.to_rfc3339())?,
        None => writeln!(out, "mtime: -")?,
    }
    Ok(())
}

pub fn cat(
    fs: &MaildirFs,
    path: &str,
    out: &mut impl Write,
) -> Result<(), Error> {
    out.write_all(&fs.read_content(path)?)?;
    out.flush()?;
    Ok(())
}

/// Print every folder in the root listing, followed by its messages (with
/// their sizes) and the size of its access list.
///
/// Folders which cannot be examined are reported and skipped.
pub fn tree(fs: &MaildirFs, out: &mut impl Write) -> Result<(), Error> {
    let mut folders = vec![String::new()];
    folders.extend(
        fs.list_children("")?
            .into_iter()
            .filter(|e| {
                EntryKind::Directory == e.kind && e.name.starts_with('.')
            })
            .map(|e| e.name),
    );

    for folder in folders {
        if let Err(e) = tree_folder(fs, &folder, out) {
            if let Error::Io(_) = e {
                return Err(e);
            }
            warn!("Skipping folder {:?}: {}", folder, e);
        }
    }

    Ok(())
}

fn tree_folder(
    fs: &MaildirFs,
    folder: &str,
    out: &mut impl Write,
) -> Result<(), Error> {
    let prefix = if folder.is_empty() {
        String::new()
    } else {
        format!("{}/", folder)
    };

    let acl_size =
        fs.get_attributes(&format!("{}{}", prefix, ACCESS_LIST))?.size;
    let cur = format!("{}{}", prefix, CUR);
    let messages = fs.list_children(&cur)?;

    writeln!(
        out,
        "{} ({} messages, {} {} bytes)",
        if folder.is_empty() { "(root)" } else { folder },
        messages.len(),
        ACCESS_LIST,
        acl_size
    )?;
    for message in messages {
        match fs.get_attributes(&format!("{}/{}", cur, message.name)) {
            Ok(attrs) => writeln!(out, "  {} {}", attrs.size, message.name)?,
            Err(e) => writeln!(out, "  ? {} ({})", message.name, e)?,
        }
    }

    Ok(())
}
