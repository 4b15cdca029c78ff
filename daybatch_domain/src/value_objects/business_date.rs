// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Business Date and Date Range
//!
//! The calendar date under process, together with the closed date range a
//! run covers. A business date appears in three distinct textual renderings,
//! each pinned to one collaborator:
//!
//! - **`YYYYMMDD`** - the compact CLI form (`--from 20250101`)
//! - **`YYYY-MM-DD`** - filesystem prefixes and scratch directories
//! - **`yyyy.MM.dd`** - the literal used in store count queries
//!
//! Keeping all three renderings on one type prevents the formats from
//! drifting apart across the extract, load, and validate stages.
//!
//! [`DateRange`] validates `from <= to` at construction and iterates the
//! inclusive range strictly in order, which is the only order the range
//! orchestrator is allowed to process days in.

use crate::error::EtlError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The calendar date a daily pipeline run processes.
///
/// Wraps a [`NaiveDate`]; the pipeline has no use for time zones because a
/// business date is a partition key, not an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BusinessDate(NaiveDate);

impl BusinessDate {
    /// Creates a business date from an already-validated calendar date
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Parses the compact `YYYYMMDD` form used on the command line.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidInput`] when the string is not eight
    /// digits or does not name a real calendar date.
    pub fn parse_compact(s: &str) -> Result<Self, EtlError> {
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Self)
            .map_err(|_| {
                EtlError::invalid_input(format!(
                    "'{}' is not a valid date; expected YYYYMMDD",
                    s
                ))
            })
    }

    /// Creates a business date from year, month, and day components
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, EtlError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Self)
            .ok_or_else(|| {
                EtlError::invalid_input(format!(
                    "{:04}-{:02}-{:02} is not a valid calendar date",
                    year, month, day
                ))
            })
    }

    /// Gets the underlying calendar date
    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// Renders the compact `YYYYMMDD` form
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Renders the `YYYY-MM-DD` form used in filesystem prefixes and
    /// scratch directory names
    pub fn fs_segment(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Renders the `yyyy.MM.dd` literal used in store count queries
    pub fn store_literal(&self) -> String {
        format!(
            "{:04}.{:02}.{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }

    /// Gets the next calendar day, if representable
    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl fmt::Display for BusinessDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fs_segment())
    }
}

impl From<NaiveDate> for BusinessDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// A closed, inclusive range of business dates.
///
/// Construction enforces `from <= to`; iteration yields every date in
/// ascending order, `from` and `to` included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    from: BusinessDate,
    to: BusinessDate,
}

impl DateRange {
    /// Creates a validated date range.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidInput`] when `from > to`. A run over an
    /// inverted range executes zero days.
    pub fn new(from: BusinessDate, to: BusinessDate) -> Result<Self, EtlError> {
        if from > to {
            return Err(EtlError::invalid_input(format!(
                "from date {} is after to date {}",
                from, to
            )));
        }
        Ok(Self { from, to })
    }

    /// Gets the first date of the range
    pub fn from(&self) -> BusinessDate {
        self.from
    }

    /// Gets the last date of the range
    pub fn to(&self) -> BusinessDate {
        self.to
    }

    /// Number of days in the range (`from == to` counts as one)
    pub fn len_days(&self) -> u64 {
        (self.to.as_naive() - self.from.as_naive()).num_days() as u64 + 1
    }

    /// Iterates the range in ascending order, both ends included
    pub fn iter(&self) -> DateRangeIter {
        DateRangeIter {
            next: Some(self.from),
            last: self.to,
        }
    }
}

impl<'a> IntoIterator for &'a DateRange {
    type Item = BusinessDate;
    type IntoIter = DateRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`DateRange`], strictly ascending
pub struct DateRangeIter {
    next: Option<BusinessDate>,
    last: BusinessDate,
}

impl Iterator for DateRangeIter {
    type Item = BusinessDate;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current < self.last {
            current.succ()
        } else {
            None
        };
        Some(current)
    }
}
