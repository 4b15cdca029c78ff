// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Record Model
//!
//! The closed, tagged record model flowing through the pipeline. Extractors
//! emit [`SourceRecord`]s, transformers map them 1:1 into [`TargetRecord`]s,
//! and the loader converts target records into [`ColumnarBatch`]es for the
//! store.
//!
//! Model dispatch is deliberately a closed sum rather than trait objects or
//! reflection: the set of source and target models is fixed at compile time,
//! registries key on the [`SourceModel`] / [`DataType`] tags, and each
//! target model declares a static `column_order` table the columnar
//! conversion walks in ordinal order.

pub mod column;
pub mod source;
pub mod target;

pub use column::{Column, ColumnValue, ColumnarBatch};
pub use source::{RawQuote, RawTrade, SourceModel, SourceRecord};
pub use target::{DataType, QuoteRow, TargetRecord, TradeRow};
