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

use std::fs;
use std::path::{Path, PathBuf};

use log::error;
use structopt::StructOpt;

use super::inspect;
use crate::maildir::MaildirFs;
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "/etc/maildirfs/maildirfs.toml",
    "/usr/local/etc/maildirfs/maildirfs.toml",
];

/// Inspect the Maildir++ hierarchy Maildirfs presents for a directory tree.
///
/// None of these commands mount anything or modify the source directory.
/// Virtual paths are relative to the root of the hierarchy and use `/` as the
/// separator, e.g. `.Work.Projects/cur`. The empty path is the root.
#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// List the children of a folder.
    Ls(PathSubcommand),
    /// Show the attributes of a node.
    Stat(PathSubcommand),
    /// Write the content of a message or access list to standard output.
    Cat(PathSubcommand),
    /// Show every folder with its messages and access list.
    Tree(CommonOptions),
}

#[derive(StructOpt, Default)]
pub(super) struct CommonOptions {
    /// The `maildirfs.toml` to use [default:
    /// /etc/maildirfs/maildirfs.toml or
    /// /usr/local/etc/maildirfs/maildirfs.toml if present, otherwise built-in
    /// defaults]
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Log debugging information.
    #[structopt(short, long)]
    verbose: bool,

    /// The directory to present as a maildir.
    #[structopt(parse(from_os_str))]
    source: PathBuf,
}

#[derive(StructOpt)]
pub(super) struct PathSubcommand {
    #[structopt(flatten)]
    common: CommonOptions,

    /// The virtual path to operate on [default: the root]
    path: Option<String>,
}

impl PathSubcommand {
    fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }
}

impl Command {
    fn common_options(&self) -> &CommonOptions {
        match *self {
            Command::Ls(ref c) | Command::Stat(ref c) | Command::Cat(ref c) => {
                &c.common
            }
            Command::Tree(ref c) => c,
        }
    }
}

// Use this rather than panicking so that errors go to syslog when relevant
macro_rules! fatal {
    ($ex:ident, $($stuff:tt)*) => {{
        error!($($stuff)*);
        crate::support::sysexits::$ex.exit()
    }}
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    // Nothing here needs privileges, and the source tree is exposed wholesale,
    // so running as root would only increase the attack surface.
    if nix::unistd::geteuid().is_root() {
        eprintln!("Refusing to run as root");
        EX_NOPERM.exit();
    }

    let common = cmd.common_options();
    let (system_config, config_path) = load_config(common.config.as_deref());
    init_logging(config_path.as_deref(), common.verbose);

    let fs = match MaildirFs::new(&common.source, &system_config.maildir) {
        Ok(fs) => fs,
        Err(Error::BadConfig(msg)) => fatal!(EX_CONFIG, "{}", msg),
        Err(e) => fatal!(
            EX_NOINPUT,
            "Cannot use '{}' as source: {}",
            common.source.display(),
            e
        ),
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match cmd {
        Command::Ls(ref c) => inspect::ls(&fs, c.path(), &mut out),
        Command::Stat(ref c) => inspect::stat(&fs, c.path(), &mut out),
        Command::Cat(ref c) => inspect::cat(&fs, c.path(), &mut out),
        Command::Tree(_) => inspect::tree(&fs, &mut out),
    };

    if let Err(e) = result {
        error!("{}", e);
        exit_code(&e).exit();
    }
}

fn exit_code(e: &Error) -> Sysexit {
    match *e {
        Error::NotFound => EX_NOINPUT,
        Error::NotADirectory | Error::IsADirectory => EX_USAGE,
        Error::BadConfig(_) => EX_CONFIG,
        Error::Io(_) => EX_IOERR,
    }
}

/// Load the system configuration, returning it along with the path it was
/// loaded from, if any.
fn load_config(explicit: Option<&Path>) -> (SystemConfig, Option<PathBuf>) {
    let path = match explicit {
        Some(path) => path.to_owned(),
        None => match DEFAULT_CONFIG_PATHS
            .iter()
            .map(Path::new)
            .find(|p| p.is_file())
        {
            Some(path) => path.to_owned(),
            None => return (SystemConfig::default(), None),
        },
    };

    let system_config_toml = match fs::read(&path) {
        Ok(data) => data,
        Err(e) => {
            eprintln!("Error reading '{}': {}", path.display(), e);
            EX_CONFIG.exit();
        }
    };

    match toml::from_slice(&system_config_toml) {
        Ok(config) => (config, Some(path)),
        Err(e) => {
            eprintln!("Error in config file at '{}': {}", path.display(), e);
            EX_CONFIG.exit()
        }
    }
}

fn init_logging(config_path: Option<&Path>, verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log(level);
        return;
    }

    let log_config_file = config_path
        .and_then(Path::parent)
        .map(|dir| dir.join("logging.toml"))
        .filter(|f| f.is_file());

    if let Some(log_config_file) = log_config_file {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_DAEMON,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        match syslog::unix(formatter) {
            Ok(logger) => {
                if log::set_boxed_logger(Box::new(syslog::BasicLogger::new(
                    logger,
                )))
                .is_ok()
                {
                    log::set_max_level(level);
                }
            }
            // Nowhere to log to; carry on without logging rather than
            // failing a read-only query.
            Err(e) => eprintln!("Failed to connect to syslog: {}", e),
        }
    }
}
