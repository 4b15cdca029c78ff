// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Database Extractor
//!
//! The cursor-style source protocol: render the configured SQL template
//! with the business date, execute it through the [`SqlSourceClient`]
//! port, and iterate the cursor into model records. The `${date}`
//! placeholder renders as `YYYY-MM-DD`.
//!
//! Row mapping follows the same sentinel policy as file parsing: missing
//! doubles become NaN, missing sizes become zero, and a missing
//! `receive_time` fails the row (it is the sort key downstream).

use async_trait::async_trait;
use daybatch_domain::records::{RawQuote, RawTrade};
use daybatch_domain::services::extractor::{SourceContext, SqlSourceClient};
use daybatch_domain::services::Extractor;
use daybatch_domain::settings::SourceSettings;
use daybatch_domain::{BusinessDate, EtlError, SourceModel, SourceRecord};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Placeholder substituted with the business date in SQL templates
pub const DATE_PLACEHOLDER: &str = "${date}";

/// Extractor for database-style sources.
pub struct SqlExtractor {
    name: String,
    category: String,
    model: SourceModel,
    template: String,
    client: Arc<dyn SqlSourceClient>,
}

impl SqlExtractor {
    /// Builds the extractor from a source's settings and a client.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] when the source lacks a
    /// SQL template or a parsable `model` property.
    pub fn from_settings(
        settings: &SourceSettings,
        client: Arc<dyn SqlSourceClient>,
    ) -> Result<Self, EtlError> {
        let template = settings.sql_template.clone().ok_or_else(|| {
            EtlError::invalid_config(format!(
                "source '{}' is database-typed but has no sql template",
                settings.name
            ))
        })?;
        let model = match settings.properties.get("model").map(String::as_str) {
            Some("trade") => SourceModel::Trade,
            Some("quote") => SourceModel::Quote,
            Some(other) => {
                return Err(EtlError::invalid_config(format!(
                    "unknown source model '{}'",
                    other
                )))
            }
            None => {
                return Err(EtlError::invalid_config(
                    "database source requires a 'model' property",
                ))
            }
        };
        Ok(Self {
            name: settings.name.clone(),
            category: settings.category.clone(),
            model,
            template,
            client,
        })
    }

    /// Renders the template for a business date
    pub fn render(&self, date: BusinessDate) -> String {
        self.template.replace(DATE_PLACEHOLDER, &date.fs_segment())
    }
}

#[async_trait]
impl Extractor for SqlExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        &self.category
    }

    async fn setup(&mut self, _ctx: &SourceContext) -> Result<(), EtlError> {
        Ok(())
    }

    async fn validate(&self, _ctx: &SourceContext) -> Result<(), EtlError> {
        if !self.template.contains(DATE_PLACEHOLDER) {
            return Err(EtlError::invalid_config(format!(
                "source '{}': sql template has no {} placeholder",
                self.name, DATE_PLACEHOLDER
            )));
        }
        Ok(())
    }

    async fn extract(&mut self, ctx: &SourceContext) -> Result<Vec<SourceRecord>, EtlError> {
        let sql = self.render(ctx.business_date());
        debug!(
            category = "extract",
            event = "query_rendered",
            source = %self.name,
            "executing rendered template"
        );
        let rows = self.client.query(&sql).await?;
        rows.iter()
            .enumerate()
            .map(|(index, row)| {
                row_to_record(self.model, row).map_err(|err| {
                    EtlError::source_error(format!(
                        "source '{}' row {}: {}",
                        self.name, index, err
                    ))
                })
            })
            .collect()
    }

    async fn cleanup(&mut self) {
        // The cursor is the Vec the client returned; nothing held open.
    }
}

/// Maps one cursor row onto the source model.
fn row_to_record(model: SourceModel, row: &Map<String, Value>) -> Result<SourceRecord, String> {
    match model {
        SourceModel::Trade => Ok(SourceRecord::Trade(RawTrade {
            symbol: string_field(row, "symbol"),
            venue: string_field(row, "venue"),
            price: double_field(row, "price"),
            quantity: size_field(row, "quantity"),
            receive_time: required_i64(row, "receive_time")?,
        })),
        SourceModel::Quote => Ok(SourceRecord::Quote(RawQuote {
            symbol: string_field(row, "symbol"),
            venue: string_field(row, "venue"),
            bid: double_field(row, "bid"),
            ask: double_field(row, "ask"),
            bid_size: size_field(row, "bid_size"),
            ask_size: size_field(row, "ask_size"),
            receive_time: required_i64(row, "receive_time")?,
        })),
    }
}

fn string_field(row: &Map<String, Value>, name: &str) -> String {
    row.get(name)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn double_field(row: &Map<String, Value>, name: &str) -> f64 {
    row.get(name).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

fn size_field(row: &Map<String, Value>, name: &str) -> i64 {
    row.get(name).and_then(Value::as_i64).unwrap_or(0)
}

fn required_i64(row: &Map<String, Value>, name: &str) -> Result<i64, String> {
    row.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| format!("{} is required", name))
}
