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

use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// The system-wide configuration for Maildirfs.
///
/// This is stored in a file named `maildirfs.toml`, which is typically found
/// under `/etc/maildirfs` or `/usr/local/etc/maildirfs`. Every key is
/// optional.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// How the synthetic maildir is presented.
    #[serde(default)]
    pub maildir: MaildirConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MaildirConfig {
    /// The host token embedded in the name of every message.
    ///
    /// It must not contain `.`, `/`, or `:`, since those delimit the other
    /// parts of the message name.
    pub host_name: String,

    /// The `From` address used for files with no path segment containing an
    /// `@`.
    pub fallback_from: String,

    /// File extensions (without the leading dot, case-insensitive) whose
    /// messages are marked for inline display rather than as attachments.
    pub inline_extensions: Vec<String>,
}

impl Default for MaildirConfig {
    fn default() -> Self {
        MaildirConfig {
            host_name: "localhost".to_owned(),
            fallback_from: "no-reply@example.com".to_owned(),
            inline_extensions: vec![
                "txt".to_owned(),
                "md".to_owned(),
                "html".to_owned(),
            ],
        }
    }
}

impl MaildirConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.host_name.is_empty() {
            return Err(Error::BadConfig("host_name is empty".to_owned()));
        }

        if self
            .host_name
            .contains(|c: char| '.' == c || '/' == c || ':' == c)
        {
            return Err(Error::BadConfig(format!(
                "host_name {:?} must not contain '.', '/', or ':'",
                self.host_name
            )));
        }

        if self.fallback_from.trim().is_empty() {
            return Err(Error::BadConfig("fallback_from is empty".to_owned()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let config: SystemConfig = toml::from_str("").unwrap();
        assert_eq!("localhost", config.maildir.host_name);
        assert_eq!("no-reply@example.com", config.maildir.fallback_from);
        assert_eq!(
            vec!["txt", "md", "html"],
            config.maildir.inline_extensions
        );
        config.maildir.validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let config: SystemConfig = toml::from_str(
            "[maildir]\n\
             host_name = \"archive\"\n\
             inline_extensions = [\"txt\", \"csv\"]\n",
        )
        .unwrap();
        assert_eq!("archive", config.maildir.host_name);
        assert_eq!("no-reply@example.com", config.maildir.fallback_from);
        assert_eq!(vec!["txt", "csv"], config.maildir.inline_extensions);
        config.maildir.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_host_names() {
        for bad in &["", "mail.example.com", "a/b", "a:b"] {
            let config = MaildirConfig {
                host_name: (*bad).to_owned(),
                ..MaildirConfig::default()
            };
            assert_matches!(Err(Error::BadConfig(_)), config.validate());
        }
    }

    #[test]
    fn validate_rejects_empty_fallback() {
        let config = MaildirConfig {
            fallback_from: "  ".to_owned(),
            ..MaildirConfig::default()
        };
        assert_matches!(Err(Error::BadConfig(_)), config.validate());
    }
}
