// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Transformer Port
//!
//! Maps one source model to one target model, 1:1 per input record. A
//! transformer is stateless and shared: the registry holds a single
//! instance per source model and the transform engine calls it from
//! blocking worker threads, so implementations must be `Send + Sync` and
//! keep no per-run state.
//!
//! Field mappings, null handling, and sentinel policy (NaN for missing
//! doubles, empty for missing strings) are transformer-private, but every
//! field named in the target's `column_order` must come out populated.

use crate::error::EtlError;
use crate::records::{DataType, SourceModel, SourceRecord, TargetRecord};
use crate::value_objects::BusinessDate;

/// A source-model to target-model mapping.
pub trait Transformer: Send + Sync {
    /// The source model this transformer consumes
    fn source_model(&self) -> SourceModel;

    /// The target model this transformer produces
    fn data_type(&self) -> DataType;

    /// Maps a bucket of records of [`Self::source_model`] into target
    /// records, preserving input order. The business date becomes the
    /// partition date on every output row.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::TransformError`] for any record the mapping
    /// cannot express; the engine fails the whole stage on the first
    /// transformer error (fail-fast).
    fn transform(
        &self,
        input: Vec<SourceRecord>,
        business_date: BusinessDate,
    ) -> Result<Vec<TargetRecord>, EtlError>;
}
