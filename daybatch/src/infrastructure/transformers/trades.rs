// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Trade Transformer
//!
//! Maps raw trade prints to store-shaped trade rows. Normalization here is
//! deliberately small: symbols are uppercased, missing venues become the
//! empty-string sentinel, and a missing price stays NaN. Anything the
//! mapping cannot express at all - a record of the wrong model reaching
//! this bucket - is a transform error.

use daybatch_domain::records::TradeRow;
use daybatch_domain::{
    BusinessDate, DataType, EtlError, SourceModel, SourceRecord, TargetRecord, Transformer,
};

/// `SourceModel::Trade` -> `DataType::Trade`, 1:1.
#[derive(Debug, Default)]
pub struct TradeTransformer;

impl TradeTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for TradeTransformer {
    fn source_model(&self) -> SourceModel {
        SourceModel::Trade
    }

    fn data_type(&self) -> DataType {
        DataType::Trade
    }

    fn transform(
        &self,
        input: Vec<SourceRecord>,
        business_date: BusinessDate,
    ) -> Result<Vec<TargetRecord>, EtlError> {
        input
            .into_iter()
            .map(|record| match record {
                SourceRecord::Trade(raw) => Ok(TargetRecord::Trade(TradeRow::new(
                    raw.symbol.to_uppercase(),
                    raw.venue,
                    raw.price,
                    raw.quantity,
                    business_date,
                    raw.receive_time,
                ))),
                other => Err(EtlError::transform_error(format!(
                    "trade transformer received a '{}' record",
                    other.model()
                ))),
            })
            .collect()
    }
}
