// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Worker Count
//!
//! Validated pool width for the concurrent stages. The extract engine fans
//! out one task per configured source but bounds how many of them run at
//! once: the pool width is `min(sources, 2 * available_parallelism)`.
//! Extraction is I/O-heavy, so oversubscribing the cores by a factor of two
//! keeps the pool busy while downloads and queries block.
//!
//! The transform engine sizes its pool differently (one worker per
//! non-empty source-model bucket); it uses [`WorkerCount::new`] directly.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated count of parallel workers for a pipeline stage.
///
/// A worker count is always at least one; a pool of width zero cannot make
/// progress and is treated as a caller bug rather than a configuration
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerCount(usize);

impl WorkerCount {
    /// Creates a worker count, clamping zero up to one
    pub fn new(count: usize) -> Self {
        Self(count.max(1))
    }

    /// Computes the extract pool width for `source_count` sources on this
    /// machine: `min(source_count, 2 * available_parallelism)`.
    pub fn for_sources(source_count: usize) -> Self {
        Self::bounded(source_count, detected_parallelism())
    }

    /// Computes `min(task_count, 2 * parallelism)` with an explicit
    /// parallelism figure. Split out from [`Self::for_sources`] so the
    /// bound is testable on any machine.
    pub fn bounded(task_count: usize, parallelism: usize) -> Self {
        let ceiling = parallelism.max(1).saturating_mul(2);
        Self::new(task_count.min(ceiling))
    }

    /// Gets the worker count value
    pub fn count(&self) -> usize {
        self.0
    }
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} workers", self.0)
    }
}

impl From<usize> for WorkerCount {
    fn from(count: usize) -> Self {
        Self::new(count)
    }
}

impl From<WorkerCount> for usize {
    fn from(count: WorkerCount) -> Self {
        count.0
    }
}

/// Detects hardware parallelism, defaulting to 4 when detection fails
fn detected_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_clamps_to_one() {
        assert_eq!(WorkerCount::new(0).count(), 1);
    }

    /// Few sources: the pool is sized by the source count, not the machine.
    #[test]
    fn test_bounded_by_task_count() {
        assert_eq!(WorkerCount::bounded(3, 8).count(), 3);
        assert_eq!(WorkerCount::bounded(1, 8).count(), 1);
    }

    /// Many sources: the pool is capped at twice the core count.
    #[test]
    fn test_bounded_by_twice_parallelism() {
        assert_eq!(WorkerCount::bounded(100, 8).count(), 16);
        assert_eq!(WorkerCount::bounded(17, 8).count(), 16);
    }

    #[test]
    fn test_bounded_survives_degenerate_parallelism() {
        // Detection reporting zero cores must not produce a zero-width pool
        assert_eq!(WorkerCount::bounded(5, 0).count(), 2);
    }

    #[test]
    fn test_for_sources_never_exceeds_source_count() {
        for n in 1..=4 {
            assert!(WorkerCount::for_sources(n).count() <= n);
        }
    }

    #[test]
    fn test_display_and_conversions() {
        let count = WorkerCount::new(8);
        assert_eq!(format!("{}", count), "8 workers");

        let from_usize: WorkerCount = 6.into();
        assert_eq!(from_usize.count(), 6);

        let to_usize: usize = count.into();
        assert_eq!(to_usize, 8);
    }
}
