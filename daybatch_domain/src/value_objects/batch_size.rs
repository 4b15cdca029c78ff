// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Batch Size
//!
//! Number of rows the loader submits to the store per insert call. The
//! batch size is the only backpressure control inside a day: smaller
//! batches bound per-insert memory, larger batches amortize driver
//! round-trips.

use crate::error::EtlError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default rows per store insert
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Validated per-table insert batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BatchSize(usize);

impl BatchSize {
    /// Creates a batch size.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] for a zero batch size.
    pub fn new(size: usize) -> Result<Self, EtlError> {
        if size == 0 {
            return Err(EtlError::invalid_config("batchSize must be greater than zero"));
        }
        Ok(Self(size))
    }

    /// Gets the batch size value
    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(DEFAULT_BATCH_SIZE)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} rows", self.0)
    }
}
