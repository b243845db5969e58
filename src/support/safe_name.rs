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

/// Determine whether `name` is safe to join onto a path as a single segment.
///
/// Names that arrive from the consumer of the virtual tree (mailbox names
/// after decoding, message file names after reversal) pass through this
/// before they are ever joined onto the source root. It excludes empty names
/// and anything that would cause directory traversal.
///
/// Leading dots are fine; hidden files and directories in the source tree are
/// exposed like any other.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && "." != name
        && ".." != name
        && name.find('/').is_none()
        && name.find('\0').is_none()
}
