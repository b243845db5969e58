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

//! Conversion between relative paths in the source tree and Maildir++ folder
//! names.
//!
//! Maildir++ has no nested folders. A folder at `Work/Projects` is instead a
//! sibling of every other folder, named `.Work.Projects`. Literal dots in path
//! segments are escaped as `\.`, and literal backslashes as `\\`, so that
//! every name maps back to exactly one path.
//!
//! Decoding scans left to right and treats a backslash together with the
//! character after it as one unit. Anything `encode` could not have produced
//! from a real directory entry is rejected.

use crate::support::safe_name::is_safe_name;

/// Encode the `/`-separated relative path `path` as a folder name.
///
/// Empty segments (from doubled or trailing slashes) are ignored.
pub fn encode(path: &str) -> String {
    encode_segments(path.split('/').filter(|s| !s.is_empty()))
}

/// Encode a sequence of path segments as a folder name.
pub fn encode_segments<'a>(
    segments: impl IntoIterator<Item = &'a str>,
) -> String {
    let mut name = String::new();
    for segment in segments {
        name.push('.');
        for c in segment.chars() {
            if '.' == c || '\\' == c {
                name.push('\\');
            }
            name.push(c);
        }
    }

    if name.is_empty() {
        name.push('.');
    }

    name
}

/// Decode a folder name into its path segments.
///
/// Returns `None` if `name` is not something `encode` produces.
pub fn decode_segments(name: &str) -> Option<Vec<String>> {
    let mut chars = name.chars();
    if Some('.') != chars.next() {
        return None;
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ '.') | Some(escaped @ '\\') => {
                    current.push(escaped)
                }
                _ => return None,
            },
            '.' => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);

    if segments.iter().all(|s| is_safe_name(s)) {
        Some(segments)
    } else {
        None
    }
}

/// Decode a folder name into a `/`-separated relative path.
///
/// Returns `None` if `name` is not something `encode` produces.
pub fn decode(name: &str) -> Option<String> {
    decode_segments(name).map(|segments| segments.join("/"))
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn encode_examples() {
        assert_eq!(".Work", encode("Work"));
        assert_eq!(".Work.Projects", encode("Work/Projects"));
        assert_eq!(".a\\.b", encode("a.b"));
        assert_eq!(".x.a\\.b.y", encode("x/a.b/y"));
        assert_eq!(".\\.hidden", encode(".hidden"));
        assert_eq!(".back\\\\slash", encode("back\\slash"));
        assert_eq!(".Work.Projects", encode("Work//Projects/"));
        assert_eq!(".Ünïcödé.郵便", encode("Ünïcödé/郵便"));
    }

    #[test]
    fn decode_examples() {
        assert_eq!(Some("Work".to_owned()), decode(".Work"));
        assert_eq!(Some("Work/Projects".to_owned()), decode(".Work.Projects"));
        assert_eq!(Some("a.b".to_owned()), decode(".a\\.b"));
        assert_eq!(Some("x/a.b/y".to_owned()), decode(".x.a\\.b.y"));
        assert_eq!(Some(".hidden".to_owned()), decode(".\\.hidden"));
        assert_eq!(Some("back\\slash".to_owned()), decode(".back\\\\slash"));
        // An escaped backslash followed by a separator
        assert_eq!(Some("a\\/b".to_owned()), decode(".a\\\\.b"));
    }

    #[test]
    fn decode_rejects_malformed_names() {
        assert_eq!(None, decode(""));
        assert_eq!(None, decode("."));
        assert_eq!(None, decode("Work"));
        assert_eq!(None, decode("cur"));
        assert_eq!(None, decode("..Work"));
        assert_eq!(None, decode(".Work..Projects"));
        assert_eq!(None, decode(".Work."));
        assert_eq!(None, decode(".Work\\"));
        assert_eq!(None, decode(".Wo\\rk"));
        assert_eq!(None, decode(".a/b"));
        // Traversal
        assert_eq!(None, decode(".\\.\\."));
        assert_eq!(None, decode(".foo.\\.\\..bar"));
        assert_eq!(None, decode(".\\."));
    }

    fn segment() -> impl Strategy<Value = String> {
        "[^/\\x00]{1,12}".prop_filter("unsafe segment", |s| is_safe_name(s))
    }

    proptest! {
        #[test]
        fn dot_free_paths_round_trip(
            segments in prop::collection::vec("[^/.\\x00]{1,12}", 1..5)
        ) {
            let path = segments.join("/");
            prop_assert_eq!(Some(path.clone()), decode(&encode(&path)));
        }

        #[test]
        fn all_valid_paths_round_trip(
            segments in prop::collection::vec(segment(), 1..5)
        ) {
            let path = segments.join("/");
            let name = encode(&path);
            prop_assert!(name.starts_with('.'));
            prop_assert_eq!(Some(path), decode(&name));
        }

        #[test]
        fn decoded_names_re_encode_identically(name in "\\.[a-z.\\\\]{0,16}") {
            if let Some(path) = decode(&name) {
                prop_assert_eq!(name, encode(&path));
            }
        }
    }
}
