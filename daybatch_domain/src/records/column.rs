// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Columnar Batch
//!
//! The row-to-columnar pivot the loader hands to the store driver: one
//! parallel value vector per declared column, in `column_order` ordinal
//! order. The store's `insert_batch` contract receives exactly this shape.

use crate::error::EtlError;
use crate::records::target::TargetRecord;
use crate::value_objects::BusinessDate;

/// A single cell value in a column vector.
///
/// `Null` is the explicit absent marker; the loader also accepts NaN inside
/// `Float64` as the missing-double sentinel the transformers emit.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Int64(i64),
    Float64(f64),
    Utf8(Option<String>),
    Date(BusinessDate),
    Null,
}

/// A named column vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: &'static str,
    values: Vec<ColumnValue>,
}

impl Column {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn values(&self) -> &[ColumnValue] {
        &self.values
    }
}

/// A batch of rows pivoted into parallel column vectors for one table.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarBatch {
    table: String,
    columns: Vec<Column>,
    rows: usize,
}

impl ColumnarBatch {
    /// Pivots a slice of target records into a columnar batch.
    ///
    /// All records must share one data type; the loader groups records by
    /// routed table before batching, so a mixed batch is a driver bug.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InternalError`] for an empty or mixed-type
    /// batch.
    pub fn from_records(table: &str, records: &[TargetRecord]) -> Result<Self, EtlError> {
        let first = records.first().ok_or_else(|| {
            EtlError::internal_error("cannot build a columnar batch from zero records")
        })?;
        let data_type = first.data_type();
        if let Some(stray) = records.iter().find(|r| r.data_type() != data_type) {
            return Err(EtlError::internal_error(format!(
                "mixed batch for table '{}': {} and {}",
                table,
                data_type,
                stray.data_type()
            )));
        }

        let order = TargetRecord::column_order_for(data_type);
        let mut columns = Vec::with_capacity(order.len());
        for field in order {
            let values = records.iter().map(|r| r.column_value(field)).collect();
            columns.push(Column {
                name: field,
                values,
            });
        }

        Ok(Self {
            table: table.to_string(),
            columns,
            rows: records.len(),
        })
    }

    /// Gets the destination table name
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Gets the column vectors in declared ordinal order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Number of rows in the batch
    pub fn rows(&self) -> usize {
        self.rows
    }
}
