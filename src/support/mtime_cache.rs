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

//! Caches of values derived from files in the source tree, keyed on the
//! modification time of the file they were derived from.
//!
//! Entries are never invalidated proactively. A lookup which observes a
//! modification time newer than the one recorded in the entry recomputes the
//! value and overwrites the entry. Entries are also never evicted, so memory
//! use grows with the number of distinct paths ever seen.
//!
//! Each cache is guarded by a single mutex which is held for the whole
//! check-compute-store sequence. This serialises unrelated keys as well, but
//! guarantees that two concurrent misses on the same key compute the value
//! once rather than racing to store it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::support::error::Error;

/// A derived value along with the source modification time observed when it
/// was computed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub mtime: i64,
}

impl<T> CacheEntry<T> {
    /// Whether this entry is still valid for a source whose modification
    /// time is currently `mtime`.
    pub fn is_fresh(&self, mtime: i64) -> bool {
        self.mtime >= mtime
    }
}

/// A map from source path to `CacheEntry`.
#[derive(Debug)]
pub struct MtimeCache<T> {
    entries: Mutex<HashMap<PathBuf, CacheEntry<T>>>,
}

impl<T> Default for MtimeCache<T> {
    fn default() -> Self {
        MtimeCache {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<T: Clone> MtimeCache<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the value cached for `path`, or compute and store it if there
    /// is none or it predates `mtime`.
    ///
    /// If `compute` fails, the cache is left unchanged and the error is
    /// returned.
    pub fn get_or_compute(
        &self,
        path: &Path,
        mtime: i64,
        compute: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut entries = self.lock();
        if let Some(entry) = entries.get(path) {
            if entry.is_fresh(mtime) {
                return Ok(entry.value.clone());
            }
        }

        let value = compute()?;
        entries.insert(
            path.to_owned(),
            CacheEntry {
                value: value.clone(),
                mtime,
            },
        );
        Ok(value)
    }

    /// Return the entry currently stored for `path`, regardless of whether it
    /// is fresh.
    pub fn peek(&self, path: &Path) -> Option<CacheEntry<T>> {
        self.lock().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, CacheEntry<T>>> {
        // Entries are inserted whole, so a panic elsewhere while the lock was
        // held cannot have left a partial entry behind.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
