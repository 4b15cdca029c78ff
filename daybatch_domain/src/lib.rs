// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Daybatch Domain
//!
//! The daybatch domain represents the core business logic of the batch ETL
//! driver. It is completely independent of external concerns such as object
//! storage clients, database drivers, configuration files, or the CLI.
//!
//! ## Module Structure
//!
//! - `entities` - Mutable objects with identity across the day run:
//!   [`EtlContext`], [`DayResult`], [`RunSummary`]
//! - `value_objects` - Immutable, self-validating values:
//!   [`BusinessDate`], [`DateRange`], [`WorkerCount`], [`BatchSize`],
//!   [`MemoryBudget`]
//! - `records` - The closed, tagged record model flowing through the
//!   pipeline: [`SourceRecord`] (extractor output) and [`TargetRecord`]
//!   (store input), plus the columnar batch types
//! - `services` - Port traits the infrastructure implements:
//!   [`Extractor`], [`Transformer`], [`StoreDriver`]
//! - `settings` - Resolved run configuration carried by the context
//! - `error` - The domain error type [`EtlError`]
//!
//! ## Core Business Rules
//!
//! The domain layer enforces the pipeline's invariants:
//!
//! ### Counter Rules
//! - `0 <= transformed_count <= extracted_count`
//! - `0 <= loaded_count <= transformed_count`
//!
//! ### Stage Rules
//! - The per-day stage only advances forward until it reaches
//!   `Completed` or `Failed`; it never regresses
//! - A failed day always carries an end timestamp
//! - The store connection is attached by Load and detached by Clean
//!
//! ### Record Rules
//! - Every target record declares a `data_type` the loader can route
//!   to a table, and a `column_order` the columnar conversion follows

pub mod entities;
pub mod error;
pub mod records;
pub mod services;
pub mod settings;
pub mod value_objects;

// Re-export commonly used types
pub use entities::{DayResult, EtlContext, RunSummary, Stage, StageFailure};
pub use error::EtlError;
pub use records::{
    ColumnValue, ColumnarBatch, DataType, SourceModel, SourceRecord, TargetRecord,
};
pub use services::{Extractor, StoreConnection, StoreDriver, Transformer};
pub use settings::RunSettings;
pub use value_objects::{BatchSize, BusinessDate, DateRange, MemoryBudget, WorkerCount};
