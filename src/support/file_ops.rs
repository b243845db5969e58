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

//! Miscellaneous functions for working with files in the source tree.

use std::fs;
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};

use chrono::prelude::*;

use crate::support::error::Error;

/// Return the whole-second modification time of `md`.
///
/// This is the timestamp every cache in the crate is keyed on.
pub fn mtime_secs(md: &fs::Metadata) -> i64 {
    md.mtime()
}

/// Convert a whole-second UNIX timestamp into a date in the local time zone.
///
/// Returns `None` if the timestamp is not representable.
pub fn local_date(secs: i64) -> Option<DateTime<FixedOffset>> {
    Local
        .timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.with_timezone(dt.offset()))
}

/// Return the permission bits of `md` with everything that would imply
/// writability or executability removed.
pub fn read_only_mode(md: &fs::Metadata) -> u32 {
    md.permissions().mode() & 0o444
}

pub trait IgnoreKinds {
    fn ignore_not_found(self) -> Self;
}

impl<R: Default> IgnoreKinds for Result<R, io::Error> {
    fn ignore_not_found(self) -> Self {
        match self {
            Ok(r) => Ok(r),
            Err(e) if io::ErrorKind::NotFound == e.kind() => Ok(R::default()),
            Err(e) => Err(e),
        }
    }
}

pub trait ErrorTransforms {
    type Coerced;
    fn on_not_found(self, error: Error) -> Self::Coerced;
}

impl<R, E: Into<Error>> ErrorTransforms for Result<R, E> {
    type Coerced = Result<R, Error>;

    fn on_not_found(self, error: Error) -> Result<R, Error> {
        match self.map_err(|e| e.into()) {
            Err(Error::Io(e)) if io::ErrorKind::NotFound == e.kind() => {
                Err(error)
            }
            // ENOTDIR means some ancestor of the path is a file, which for
            // our purposes means the path does not exist.
            Err(Error::Io(e))
                if Some(nix::libc::ENOTDIR) == e.raw_os_error() =>
            {
                Err(error)
            }
            s => s,
        }
    }
}

/// Set both the access and modification times of `path` to `secs`.
#[cfg(test)]
pub fn set_mtime(path: &std::path::Path, secs: i64) {
    use nix::sys::time::{TimeVal, TimeValLike};

    let time = TimeVal::seconds(secs);
    nix::sys::stat::utimes(path, &time, &time).unwrap();
}
