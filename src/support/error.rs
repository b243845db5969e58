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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such mailbox, message, or file")]
    NotFound,
    #[error("Not a directory")]
    NotADirectory,
    #[error("Is a directory")]
    IsADirectory,
    #[error("Bad configuration: {0}")]
    BadConfig(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Return the errno a filesystem transport should report for this error.
    pub fn errno(&self) -> i32 {
        match *self {
            Error::NotFound => nix::libc::ENOENT,
            Error::NotADirectory => nix::libc::ENOTDIR,
            Error::IsADirectory => nix::libc::EISDIR,
            Error::BadConfig(_) => nix::libc::EINVAL,
            Error::Io(ref e) => e.raw_os_error().unwrap_or(nix::libc::EIO),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn errno_mapping() {
        assert_eq!(nix::libc::ENOENT, Error::NotFound.errno());
        assert_eq!(nix::libc::EISDIR, Error::IsADirectory.errno());
        assert_eq!(
            nix::libc::EACCES,
            Error::Io(io::Error::from_raw_os_error(nix::libc::EACCES))
                .errno()
        );
        assert_eq!(
            nix::libc::EIO,
            Error::Io(io::Error::new(io::ErrorKind::Other, "boom")).errno()
        );
    }
}
