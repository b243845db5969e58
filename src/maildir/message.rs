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

//! Synthesis of a mail message from an ordinary file.
//!
//! The message is a single-part MIME entity whose body is the file's content
//! in base64. It carries just enough structure for a mail server to accept
//! it: the date is the file's modification time, the subject is its name,
//! and the sender is taken from the first path segment that looks like an
//! email address.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::prelude::*;
use log::debug;

use super::node::{Attributes, EntryKind};
use crate::support::error::Error;
use crate::support::file_ops::{self, ErrorTransforms};
use crate::support::mtime_cache::MtimeCache;
use crate::support::system_config::MaildirConfig;

/// RFC 2045 limits encoded lines to 76 characters.
const BASE64_LINE_LENGTH: usize = 76;

/// Renders messages and remembers their sizes.
///
/// Only the size of a rendered message is cached. Reads always render from
/// scratch, which means an attribute query followed by a read renders twice,
/// but keeps memory proportional to the number of files rather than their
/// total size.
#[derive(Debug)]
pub struct MessageRenderer {
    fallback_from: String,
    inline_extensions: Vec<String>,
    sizes: MtimeCache<u64>,
}

impl MessageRenderer {
    pub fn new(config: &MaildirConfig) -> Self {
        MessageRenderer {
            fallback_from: config.fallback_from.clone(),
            inline_extensions: config
                .inline_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            sizes: MtimeCache::new(),
        }
    }

    /// Read and render the message for the file at `path`.
    pub fn read(&self, path: &Path) -> Result<Vec<u8>, Error> {
        let md = stat_file(path)?;
        self.render_file(path, &md)
    }

    /// Return the attributes of the message for the file at `path`.
    ///
    /// The size is that of the rendered message, which is cached until the
    /// file's modification time advances.
    pub fn attributes(&self, path: &Path) -> Result<Attributes, Error> {
        let md = stat_file(path)?;
        let mtime = file_ops::mtime_secs(&md);
        let size = self.sizes.get_or_compute(path, mtime, || {
            debug!("Rendering {} to determine its size", path.display());
            self.render_file(path, &md).map(|msg| msg.len() as u64)
        })?;

        Ok(Attributes {
            kind: EntryKind::File,
            mode: file_ops::read_only_mode(&md),
            size,
            mtime: Some(mtime),
        })
    }

    fn render_file(
        &self,
        path: &Path,
        md: &fs::Metadata,
    ) -> Result<Vec<u8>, Error> {
        let body = fs::read(path).on_not_found(Error::NotFound)?;
        let date = file_ops::local_date(file_ops::mtime_secs(md));
        Ok(self.render(path, &body, date))
    }

    /// Render the message for a file at `path` whose content is `body` and
    /// which was last modified at `date`.
    ///
    /// This is a pure function of its inputs.
    pub fn render(
        &self,
        path: &Path,
        body: &[u8],
        date: Option<DateTime<FixedOffset>>,
    ) -> Vec<u8> {
        let base_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut headers = String::new();
        // Writing to a String cannot fail, so the results are ignored
        let _ = writeln!(
            headers,
            "Content-Disposition: {}",
            self.content_disposition(path, &base_name)
        );
        let _ = writeln!(headers, "Content-Transfer-Encoding: base64");
        let _ = writeln!(headers, "Content-Type: {}", content_type(path));
        if let Some(date) = date {
            let _ = writeln!(headers, "Date: {}", date.to_rfc2822());
        }
        let _ = writeln!(headers, "From: {}", self.from(path));
        let _ = writeln!(
            headers,
            "Subject: {}",
            encode_header_text(&base_name)
        );
        headers.push('\n');

        let mut message = headers.into_bytes();
        message.extend_from_slice(&encode_body(body));
        message
    }

    fn is_inline(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
            .map_or(false, |ext| self.inline_extensions.contains(&ext))
    }

    fn content_disposition(&self, path: &Path, base_name: &str) -> String {
        if self.is_inline(path) {
            "inline".to_owned()
        } else {
            format!("attachment; filename={}", quote_parameter(base_name))
        }
    }

    fn from(&self, path: &Path) -> String {
        path.iter()
            .map(|segment| segment.to_string_lossy())
            .find(|segment| segment.contains('@'))
            .map(|segment| segment.into_owned())
            .unwrap_or_else(|| self.fallback_from.clone())
    }
}

/// Stat `path`, which must be a regular file (or a symlink to one).
fn stat_file(path: &Path) -> Result<fs::Metadata, Error> {
    let md = fs::metadata(path).on_not_found(Error::NotFound)?;
    if !md.is_file() {
        return Err(Error::NotFound);
    }
    Ok(md)
}

fn content_type(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| mime_guess::from_ext(ext).first())
        .map(|mime| mime.essence_str().to_owned())
        .unwrap_or_else(|| "application/octet-stream".to_owned())
}

/// Encode `body` as base64, wrapped at `BASE64_LINE_LENGTH`.
///
/// There is no line break after the final line.
fn encode_body(body: &[u8]) -> Vec<u8> {
    let encoded = base64::encode(body);
    let encoded = encoded.as_bytes();

    let mut wrapped = Vec::with_capacity(
        encoded.len() + encoded.len() / BASE64_LINE_LENGTH,
    );
    for (ix, line) in encoded.chunks(BASE64_LINE_LENGTH).enumerate() {
        if ix > 0 {
            wrapped.push(b'\n');
        }
        wrapped.extend_from_slice(line);
    }
    wrapped
}

/// Whether `s` is an RFC 2045 token and can be used as a parameter value
/// without quoting.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b > b' ' && b < 0x7F && !b"()<>@,;:\\\"/[]?=".contains(&b)
        })
}

fn quote_parameter(s: &str) -> String {
    if is_token(s) {
        return s.to_owned();
    }

    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\r' | '\n' => quoted.push(' '),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Make `s` safe to use as unstructured header text.
///
/// Pure ASCII without control characters is passed through as is. Anything
/// else becomes a single RFC 2047 encoded word.
fn encode_header_text(s: &str) -> String {
    if s.bytes().all(|b| b >= b' ' && b < 0x7F) {
        s.to_owned()
    } else {
        format!("=?UTF-8?B?{}?=", base64::encode(s))
    }
}

#[cfg(test)]
mod test {
    use std::path::PathBuf;

    use super::*;
    use crate::support::file_ops::set_mtime;

    fn renderer() -> MessageRenderer {
        MessageRenderer::new(&MaildirConfig::default())
    }

    fn date() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3600)
            .unwrap()
            .timestamp_opt(1_700_000_000, 0)
            .unwrap()
    }

    fn split(message: &[u8]) -> (String, String) {
        let message = std::str::from_utf8(message).unwrap();
        let (headers, body) = message.split_at(message.find("\n\n").unwrap());
        (headers.to_owned(), body[2..].to_owned())
    }

    #[test]
    fn render_inline_text() {
        let message = renderer().render(
            Path::new("/src/alice@example.com/welcome.txt"),
            b"Hi",
            Some(date()),
        );
        let (headers, body) = split(&message);
        assert_eq!(
            "Content-Disposition: inline\n\
             Content-Transfer-Encoding: base64\n\
             Content-Type: text/plain\n\
             Date: Tue, 14 Nov 2023 23:13:20 +0100\n\
             From: alice@example.com\n\
             Subject: welcome.txt",
            headers
        );
        assert_eq!(b"Hi".to_vec(), base64::decode(&body).unwrap());
    }

    #[test]
    fn render_attachment() {
        let message = renderer().render(
            Path::new("/src/reports/Q3 report.pdf"),
            b"%PDF",
            None,
        );
        let (headers, _) = split(&message);
        assert_eq!(
            "Content-Disposition: attachment; filename=\"Q3 report.pdf\"\n\
             Content-Transfer-Encoding: base64\n\
             Content-Type: application/pdf\n\
             From: no-reply@example.com\n\
             Subject: Q3 report.pdf",
            headers
        );

        let message =
            renderer().render(Path::new("/src/data.bin"), b"", None);
        let (headers, body) = split(&message);
        assert!(headers.starts_with(
            "Content-Disposition: attachment; filename=data.bin\n"
        ));
        assert!(headers.contains("Content-Type: application/octet-stream\n"));
        assert_eq!("", body);
    }

    #[test]
    fn inline_extensions() {
        let r = renderer();
        assert!(r.is_inline(Path::new("a.txt")));
        assert!(r.is_inline(Path::new("a.TXT")));
        assert!(r.is_inline(Path::new("a.md")));
        assert!(r.is_inline(Path::new("a.html")));
        assert!(!r.is_inline(Path::new("a.pdf")));
        assert!(!r.is_inline(Path::new("txt")));

        let r = MessageRenderer::new(&MaildirConfig {
            inline_extensions: vec![".csv".to_owned()],
            ..MaildirConfig::default()
        });
        assert!(r.is_inline(Path::new("a.csv")));
        assert!(!r.is_inline(Path::new("a.txt")));
    }

    #[test]
    fn from_uses_first_address_segment() {
        let r = renderer();
        assert_eq!(
            "bob@example.com",
            r.from(Path::new("/srv/bob@example.com/x@y/file"))
        );
        assert_eq!(
            "x@y.txt",
            r.from(Path::new("/srv/plain/x@y.txt"))
        );
        assert_eq!("no-reply@example.com", r.from(Path::new("/srv/file")));
    }

    #[test]
    fn body_is_wrapped_at_76() {
        let data: Vec<u8> = (0..=255u8).collect();
        let body = encode_body(&data);
        let body = std::str::from_utf8(&body).unwrap();
        let lines: Vec<&str> = body.split('\n').collect();
        assert!(lines.len() > 1);
        for line in &lines[..lines.len() - 1] {
            assert_eq!(76, line.len());
        }
        assert!(lines[lines.len() - 1].len() <= 76);
        assert!(!body.ends_with('\n'));
        assert_eq!(data, base64::decode(&body.replace('\n', "")).unwrap());

        // Exactly one line's worth: 57 bytes encode to 76 characters
        let body = encode_body(&[0u8; 57]);
        assert_eq!(76, body.len());
    }

    #[test]
    fn non_ascii_subject_is_encoded() {
        let message =
            renderer().render(Path::new("/src/Grüße.txt"), b"", None);
        let (headers, _) = split(&message);
        assert!(headers.ends_with(&format!(
            "Subject: =?UTF-8?B?{}?=",
            base64::encode("Grüße.txt")
        )));
    }

    #[test]
    fn parameter_quoting() {
        assert_eq!("report.pdf", quote_parameter("report.pdf"));
        assert_eq!("\"a b\"", quote_parameter("a b"));
        assert_eq!("\"a\\\"b\"", quote_parameter("a\"b"));
        assert_eq!("\"a;b\"", quote_parameter("a;b"));
    }

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn read_and_attributes_agree() {
        let root = tempfile::TempDir::new().unwrap();
        let path = write_file(root.path(), "notes.md", b"# Notes\n");
        let r = renderer();

        let content = r.read(&path).unwrap();
        let attrs = r.attributes(&path).unwrap();
        assert_eq!(EntryKind::File, attrs.kind);
        assert_eq!(content.len() as u64, attrs.size);

        // Rendering is idempotent
        assert_eq!(content, r.read(&path).unwrap());
        assert_eq!(attrs, r.attributes(&path).unwrap());
    }

    #[test]
    fn size_is_cached_until_mtime_advances() {
        let root = tempfile::TempDir::new().unwrap();
        let path = write_file(root.path(), "a.txt", b"short");
        set_mtime(&path, 1_600_000_000);
        let r = renderer();

        let initial = r.attributes(&path).unwrap();
        assert_eq!(Some(1_600_000_000), initial.mtime);

        // Same mtime: the cached (now stale) size is returned
        fs::write(&path, b"a considerably longer body").unwrap();
        set_mtime(&path, 1_600_000_000);
        assert_eq!(initial.size, r.attributes(&path).unwrap().size);

        set_mtime(&path, 1_600_000_001);
        let updated = r.attributes(&path).unwrap();
        assert_eq!(r.read(&path).unwrap().len() as u64, updated.size);
        assert!(updated.size > initial.size);
    }

    #[test]
    fn missing_file_is_not_found() {
        let root = tempfile::TempDir::new().unwrap();
        let r = renderer();
        let path = root.path().join("gone.txt");
        assert_matches!(Err(Error::NotFound), r.read(&path));
        assert_matches!(Err(Error::NotFound), r.attributes(&path));
        assert_matches!(Err(Error::NotFound), r.attributes(root.path()));
    }

    #[test]
    fn fifo_is_not_found() {
        let root = tempfile::TempDir::new().unwrap();
        let path = root.path().join("pipe");
        nix::unistd::mkfifo(&path, nix::sys::stat::Mode::S_IRWXU).unwrap();
        let r = renderer();
        assert_matches!(Err(Error::NotFound), r.attributes(&path));
        assert_matches!(Err(Error::NotFound), r.read(&path));
    }
}
