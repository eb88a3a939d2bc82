//! Build-scoped include cache.
//!
//! Pages commonly share the same header, navigation and footer fragments, so
//! each include target is read from disk once per build and served from
//! memory afterwards. The cache lives for exactly one build: it is created
//! by the driver, lent to the include transform for every file, and dropped
//! when the build ends. Entries are never invalidated mid-build.
//!
//! ## Keys
//!
//! Entries are keyed by the resolved primary path of an
//! [`IncludeTarget`](crate::paths::IncludeTarget), so `/includes/nav`,
//! `/includes/nav.html` and `includes/nav` all share one entry. When the
//! primary path doesn't exist yet (the `x/index.html` form before pages are
//! moved), the flat fallback is read and stored under the primary key.
//!
//! Failed reads are not cached.

use crate::paths::IncludeTarget;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IncludeError {
    #[error("Cannot read include {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Include text by resolved path, plus hit/read counters.
#[derive(Debug, Default)]
pub struct IncludeCache {
    entries: HashMap<PathBuf, String>,
    stats: CacheStats,
}

/// Summary of include cache activity for a build.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups served from memory.
    pub hits: u32,
    /// Lookups that read the disk.
    pub reads: u32,
}

impl CacheStats {
    pub fn total(&self) -> u32 {
        self.hits + self.reads
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} read ({} total)",
                self.hits,
                self.reads,
                self.total()
            )
        } else {
            write!(f, "{} read", self.reads)
        }
    }
}

/// Outcome of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub text: String,
    /// True when no disk read was needed.
    pub cached: bool,
}

impl IncludeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text for `target`, reading it on first use.
    pub fn get(&mut self, target: &IncludeTarget) -> Result<Lookup, IncludeError> {
        if let Some(text) = self.entries.get(&target.primary) {
            self.stats.hits += 1;
            return Ok(Lookup {
                text: text.clone(),
                cached: true,
            });
        }

        let text = read_target(target)?;
        self.stats.reads += 1;
        self.entries.insert(target.primary.clone(), text.clone());
        Ok(Lookup {
            text,
            cached: false,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}

fn read_target(target: &IncludeTarget) -> Result<String, IncludeError> {
    match fs::read_to_string(&target.primary) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => match &target.fallback {
            Some(fallback) => fs::read_to_string(fallback).map_err(|source| IncludeError::Read {
                path: fallback.clone(),
                source,
            }),
            None => Err(IncludeError::Read {
                path: target.primary.clone(),
                source: err,
            }),
        },
        Err(source) => Err(IncludeError::Read {
            path: target.primary.clone(),
            source,
        }),
    }
}
