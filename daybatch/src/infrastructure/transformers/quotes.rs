// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Quote Transformer
//!
//! Maps raw top-of-book quotes to store-shaped quote rows, 1:1. Same
//! sentinel policy as trades: NaN doubles pass through, strings stay as
//! received (uppercased symbol).

use daybatch_domain::records::QuoteRow;
use daybatch_domain::{
    BusinessDate, DataType, EtlError, SourceModel, SourceRecord, TargetRecord, Transformer,
};

/// `SourceModel::Quote` -> `DataType::Quote`, 1:1.
#[derive(Debug, Default)]
pub struct QuoteTransformer;

impl QuoteTransformer {
    pub fn new() -> Self {
        Self
    }
}

impl Transformer for QuoteTransformer {
    fn source_model(&self) -> SourceModel {
        SourceModel::Quote
    }

    fn data_type(&self) -> DataType {
        DataType::Quote
    }

    fn transform(
        &self,
        input: Vec<SourceRecord>,
        business_date: BusinessDate,
    ) -> Result<Vec<TargetRecord>, EtlError> {
        input
            .into_iter()
            .map(|record| match record {
                SourceRecord::Quote(raw) => Ok(TargetRecord::Quote(QuoteRow::new(
                    raw.symbol.to_uppercase(),
                    raw.venue,
                    raw.bid,
                    raw.ask,
                    raw.bid_size,
                    raw.ask_size,
                    business_date,
                    raw.receive_time,
                ))),
                other => Err(EtlError::transform_error(format!(
                    "quote transformer received a '{}' record",
                    other.model()
                ))),
            })
            .collect()
    }
}
