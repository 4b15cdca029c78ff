// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Source Records
//!
//! Records as extractors emit them: parsed but not yet normalized. Each
//! record carries its source-model tag, which the transform engine uses to
//! bucket records and select the registered transformer.
//!
//! Timestamps are epoch milliseconds as received from the feed; missing
//! numeric fields use the NaN sentinel and missing strings stay empty.
//! Normalization of those sentinels is transformer business.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag identifying the concrete source model of a record.
///
/// The transformer registry is keyed on this tag; an extracted record whose
/// tag has no registered transformer fails the transform stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SourceModel {
    Trade,
    Quote,
}

impl SourceModel {
    /// Stable identifier used in logs and registry diagnostics
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceModel::Trade => "trade",
            SourceModel::Quote => "quote",
        }
    }
}

impl fmt::Display for SourceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw trade print as parsed from a source file or cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    pub symbol: String,
    pub venue: String,
    pub price: f64,
    pub quantity: i64,
    /// Feed receive timestamp, epoch milliseconds
    pub receive_time: i64,
}

/// A raw top-of-book quote as parsed from a source file or cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    pub symbol: String,
    pub venue: String,
    pub bid: f64,
    pub ask: f64,
    pub bid_size: i64,
    pub ask_size: i64,
    /// Feed receive timestamp, epoch milliseconds
    pub receive_time: i64,
}

/// A record produced by an extractor, tagged with its source model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SourceRecord {
    Trade(RawTrade),
    Quote(RawQuote),
}

impl SourceRecord {
    /// Gets the source-model tag of this record
    pub fn model(&self) -> SourceModel {
        match self {
            SourceRecord::Trade(_) => SourceModel::Trade,
            SourceRecord::Quote(_) => SourceModel::Quote,
        }
    }
}
