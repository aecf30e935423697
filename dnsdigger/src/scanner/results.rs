//! Result partition.
//!
//! While the pool runs, outcomes accumulate in a [`ScanState`] behind the
//! scanner's single lock. Once every worker has been joined the state is
//! split into a [`ScanReport`]: the ordered found / not found sequences, the
//! updated cache, and a few counters.
use crate::cache::ResultCache;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What a worker does with a name it just took off the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Nobody has tested the name yet; the caller now owns its lookup.
    Lookup,
    /// The cache already holds the outcome.
    Cached(bool),
    /// Another worker is resolving the same name right now.
    InFlight,
}

/// Shared mutable state of a run. Only ever touched under the scanner lock.
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    pub(crate) cache: ResultCache,
    pub(crate) found: Vec<String>,
    pub(crate) not_found: Vec<String>,
    pub(crate) cache_hits: usize,
    /// Names claimed for a lookup that has not been recorded yet.
    in_flight: HashSet<String>,
    /// Names already appended to `found` or `not_found`.
    reported: HashSet<String>,
}

impl ScanState {
    pub(crate) fn new(cache: ResultCache) -> Self {
        Self {
            cache,
            ..Default::default()
        }
    }

    /// Checks the cache and reserves the lookup of `fqc` in one step, so a
    /// name is resolved at most once per run even when it is queued twice.
    pub(crate) fn claim(&mut self, fqc: &str) -> Claim {
        if let Some(resolved) = self.cache.get(fqc) {
            self.cache_hits += 1;
            return Claim::Cached(resolved);
        }

        if self.in_flight.insert(fqc.to_string()) {
            Claim::Lookup
        } else {
            Claim::InFlight
        }
    }

    /// Stores a fresh resolver outcome in the cache and the matching sequence.
    pub(crate) fn record(&mut self, fqc: &str, resolved: bool) {
        self.in_flight.remove(fqc);
        self.cache.insert(fqc, resolved);
        self.push_outcome(fqc, resolved);
    }

    /// Appends a cached outcome to the output sequences without touching the
    /// cache. Returns `false` if the name was already reported.
    pub(crate) fn report_cached(&mut self, fqc: &str, resolved: bool) -> bool {
        self.push_outcome(fqc, resolved)
    }

    fn push_outcome(&mut self, fqc: &str, resolved: bool) -> bool {
        if !self.reported.insert(fqc.to_string()) {
            return false;
        }

        if resolved {
            self.found.push(fqc.to_string());
        } else {
            self.not_found.push(fqc.to_string());
        }
        true
    }

    pub(crate) fn into_report(self, unclaimed: usize) -> ScanReport {
        let stats = ScanStats {
            resolved: self.found.len(),
            unresolved: self.not_found.len(),
            cache_hits: self.cache_hits,
            unclaimed,
        };

        ScanReport {
            results: ScanResults {
                found: self.found,
                not_found: self.not_found,
            },
            cache: self.cache,
            stats,
        }
    }
}

/// Found / not found names in the order workers confirmed them.
///
/// The order is stable for a given run; across runs it depends on scheduling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResults {
    pub found: Vec<String>,
    pub not_found: Vec<String>,
}

impl ScanResults {
    pub fn is_empty(&self) -> bool {
        self.found.is_empty() && self.not_found.is_empty()
    }

    /// Total number of names in both sequences.
    pub fn len(&self) -> usize {
        self.found.len() + self.not_found.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Names appended to `found` during the run.
    pub resolved: usize,
    /// Names appended to `not_found` during the run.
    pub unresolved: usize,
    /// Names skipped because the cache already knew them.
    pub cache_hits: usize,
    /// Labels never claimed because the run was cancelled.
    pub unclaimed: usize,
}

/// Everything a finished (or interrupted) run produced.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub results: ScanResults,
    pub cache: ResultCache,
    pub stats: ScanStats,
}
