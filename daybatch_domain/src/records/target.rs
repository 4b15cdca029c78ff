// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Target Records
//!
//! Records in the shape the analytical store receives them. Every target
//! model declares:
//!
//! - a [`DataType`] discriminator the loader routes to a table name, and
//! - a static `column_order` table (field name -> ordinal position) the
//!   columnar conversion walks when building per-column vectors.
//!
//! The column tables are the compile-time replacement for the reflective
//! field access a dynamic-language implementation would use: adding a field
//! to a row without adding it to the table is a compile-visible smell in
//! review, and the conversion never has to inspect the struct at runtime.
//!
//! Sentinels: missing doubles are NaN, missing strings are empty. The
//! transformers guarantee that every field named in `column_order` is
//! populated, sentinel or not.

use crate::error::EtlError;
use crate::records::column::ColumnValue;
use crate::value_objects::BusinessDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator used to route a target record to its store table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataType {
    Trade,
    Quote,
}

impl DataType {
    /// Stable identifier used in routing tables, logs, and configuration
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Trade => "trade",
            DataType::Quote => "quote",
        }
    }

    /// All data types the loader can route. Used to build routing tables.
    pub fn all() -> &'static [DataType] {
        &[DataType::Trade, DataType::Quote]
    }

    /// Name of the business-date column in this model's `column_order`;
    /// the validator's count query filters on it.
    pub fn date_column(&self) -> &'static str {
        match self {
            DataType::Trade => "tradeDate",
            DataType::Quote => "quoteDate",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared column order for trade rows
const TRADE_COLUMNS: &[&str] = &[
    "symbol",
    "venue",
    "price",
    "quantity",
    "tradeDate",
    "receiveTime",
];

/// Declared column order for quote rows
const QUOTE_COLUMNS: &[&str] = &[
    "symbol",
    "venue",
    "bid",
    "ask",
    "bidSize",
    "askSize",
    "quoteDate",
    "receiveTime",
];

/// A normalized trade row ready for columnar loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRow {
    symbol: String,
    venue: String,
    price: f64,
    quantity: i64,
    trade_date: BusinessDate,
    receive_time: i64,
}

impl TradeRow {
    pub fn new(
        symbol: String,
        venue: String,
        price: f64,
        quantity: i64,
        trade_date: BusinessDate,
        receive_time: i64,
    ) -> Self {
        Self {
            symbol,
            venue,
            price,
            quantity,
            trade_date,
            receive_time,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn receive_time(&self) -> i64 {
        self.receive_time
    }

    pub fn trade_date(&self) -> BusinessDate {
        self.trade_date
    }

    fn column_value(&self, field: &str) -> ColumnValue {
        match field {
            "symbol" => ColumnValue::Utf8(Some(self.symbol.clone())),
            "venue" => ColumnValue::Utf8(Some(self.venue.clone())),
            "price" => ColumnValue::Float64(self.price),
            "quantity" => ColumnValue::Int64(self.quantity),
            "tradeDate" => ColumnValue::Date(self.trade_date),
            "receiveTime" => ColumnValue::Int64(self.receive_time),
            _ => ColumnValue::Null,
        }
    }
}

/// A normalized quote row ready for columnar loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    symbol: String,
    venue: String,
    bid: f64,
    ask: f64,
    bid_size: i64,
    ask_size: i64,
    quote_date: BusinessDate,
    receive_time: i64,
}

impl QuoteRow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: String,
        venue: String,
        bid: f64,
        ask: f64,
        bid_size: i64,
        ask_size: i64,
        quote_date: BusinessDate,
        receive_time: i64,
    ) -> Self {
        Self {
            symbol,
            venue,
            bid,
            ask,
            bid_size,
            ask_size,
            quote_date,
            receive_time,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn receive_time(&self) -> i64 {
        self.receive_time
    }

    pub fn quote_date(&self) -> BusinessDate {
        self.quote_date
    }

    fn column_value(&self, field: &str) -> ColumnValue {
        match field {
            "symbol" => ColumnValue::Utf8(Some(self.symbol.clone())),
            "venue" => ColumnValue::Utf8(Some(self.venue.clone())),
            "bid" => ColumnValue::Float64(self.bid),
            "ask" => ColumnValue::Float64(self.ask),
            "bidSize" => ColumnValue::Int64(self.bid_size),
            "askSize" => ColumnValue::Int64(self.ask_size),
            "quoteDate" => ColumnValue::Date(self.quote_date),
            "receiveTime" => ColumnValue::Int64(self.receive_time),
            _ => ColumnValue::Null,
        }
    }
}

/// A record in store shape, tagged with its target model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetRecord {
    Trade(TradeRow),
    Quote(QuoteRow),
}

impl TargetRecord {
    /// Gets the routing discriminator for this record
    pub fn data_type(&self) -> DataType {
        match self {
            TargetRecord::Trade(_) => DataType::Trade,
            TargetRecord::Quote(_) => DataType::Quote,
        }
    }

    /// Gets the declared column order for this record's model
    pub fn column_order(&self) -> &'static [&'static str] {
        Self::column_order_for(self.data_type())
    }

    /// Gets the declared column order for a data type
    pub fn column_order_for(data_type: DataType) -> &'static [&'static str] {
        match data_type {
            DataType::Trade => TRADE_COLUMNS,
            DataType::Quote => QUOTE_COLUMNS,
        }
    }

    /// Gets the value of a declared column. Fields absent from the model
    /// contribute [`ColumnValue::Null`].
    pub fn column_value(&self, field: &str) -> ColumnValue {
        match self {
            TargetRecord::Trade(row) => row.column_value(field),
            TargetRecord::Quote(row) => row.column_value(field),
        }
    }

    /// Gets the business date this record is partitioned under
    pub fn business_date(&self) -> BusinessDate {
        match self {
            TargetRecord::Trade(row) => row.trade_date,
            TargetRecord::Quote(row) => row.quote_date,
        }
    }

    /// Extracts the loader's sort key from a named field.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] when the field is not
    /// declared for this model or is not a sortable integer column.
    pub fn sort_value(&self, field: &str) -> Result<i64, EtlError> {
        match self.column_value(field) {
            ColumnValue::Int64(v) => Ok(v),
            ColumnValue::Null => Err(EtlError::invalid_config(format!(
                "sort field '{}' is not declared for data type '{}'",
                field,
                self.data_type()
            ))),
            other => Err(EtlError::invalid_config(format!(
                "sort field '{}' has non-sortable type {:?}",
                field, other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(receive_time: i64) -> TargetRecord {
        TargetRecord::Trade(TradeRow::new(
            "ABCD".to_string(),
            "XNAS".to_string(),
            10.25,
            300,
            BusinessDate::from_ymd(2025, 1, 1).unwrap(),
            receive_time,
        ))
    }

    #[test]
    fn test_column_order_covers_every_declared_field() {
        let record = trade(42);
        for field in record.column_order() {
            assert!(
                !matches!(record.column_value(field), ColumnValue::Null),
                "declared column '{}' produced Null",
                field
            );
        }
    }

    #[test]
    fn test_undeclared_field_contributes_null() {
        assert!(matches!(trade(1).column_value("askSize"), ColumnValue::Null));
    }

    #[test]
    fn test_data_type_routes_by_variant() {
        assert_eq!(trade(1).data_type(), DataType::Trade);
        assert_eq!(trade(1).data_type().as_str(), "trade");
    }

    #[test]
    fn test_sort_value_default_field() {
        assert_eq!(trade(1234).sort_value("receiveTime").unwrap(), 1234);
    }

    #[test]
    fn test_sort_value_rejects_unknown_and_non_integer_fields() {
        let record = trade(1);
        assert_eq!(
            record.sort_value("nope").unwrap_err().category(),
            "configuration"
        );
        assert_eq!(
            record.sort_value("price").unwrap_err().category(),
            "configuration"
        );
    }

    #[test]
    fn test_serde_roundtrip_for_spill_format() {
        let record = trade(99);
        let line = serde_json::to_string(&record).unwrap();
        let back: TargetRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(record, back);
    }
}
