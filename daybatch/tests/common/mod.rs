// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Shared fixtures for the integration suites: a scripted extractor
//! driven by source properties, registry builders around the in-memory
//! store, and settings constructors.

use async_trait::async_trait;
use daybatch::infrastructure::registries::{
    ExtractorRegistry, Registries, StoreRegistry, TransformerRegistry,
};
use daybatch::infrastructure::stores::memory::MemoryStoreDriver;
use daybatch::infrastructure::transformers::{QuoteTransformer, TradeTransformer};
use daybatch_domain::records::RawTrade;
use daybatch_domain::services::extractor::SourceContext;
use daybatch_domain::services::Extractor;
use daybatch_domain::settings::{
    LoaderSettings, RunSettings, SourceSettings, TargetSettings, ValidationSettings,
};
use daybatch_domain::{
    BatchSize, BusinessDate, ColumnarBatch, EtlError, SourceRecord, StoreConnection, StoreDriver,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Extractor scripted through its source's properties:
/// - `records`: trades emitted per day
/// - `fail_on`: compact date on which extract fails
/// - `fail`: always fail
/// - `delay_ms`: sleep inside extract
pub struct ScriptedExtractor {
    name: String,
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        "ticks"
    }

    async fn setup(&mut self, _ctx: &SourceContext) -> Result<(), EtlError> {
        Ok(())
    }

    async fn validate(&self, _ctx: &SourceContext) -> Result<(), EtlError> {
        Ok(())
    }

    async fn extract(&mut self, ctx: &SourceContext) -> Result<Vec<SourceRecord>, EtlError> {
        let props = &ctx.settings().properties;
        if let Some(delay) = props.get("delay_ms") {
            tokio::time::sleep(Duration::from_millis(delay.parse().unwrap())).await;
        }
        if props.contains_key("fail") {
            return Err(EtlError::source_error(format!("{} exploded", self.name)));
        }
        if let Some(fail_on) = props.get("fail_on") {
            if *fail_on == ctx.business_date().compact() {
                return Err(EtlError::source_error(format!(
                    "{} exploded on {}",
                    self.name, fail_on
                )));
            }
        }
        let count: usize = props
            .get("records")
            .map(|v| v.parse().unwrap())
            .unwrap_or(0);
        Ok((0..count)
            .map(|i| {
                SourceRecord::Trade(RawTrade {
                    symbol: format!("{}-{}", self.name, i),
                    venue: "XNAS".to_string(),
                    price: 1.0 + i as f64,
                    quantity: 10,
                    receive_time: i as i64,
                })
            })
            .collect())
    }

    async fn cleanup(&mut self) {}
}

/// A driver that reports one row fewer than the store actually holds,
/// for the validation-mismatch scenario.
#[derive(Clone)]
pub struct MiscountingDriver {
    pub inner: MemoryStoreDriver,
}

struct MiscountingConnection {
    inner: Box<dyn StoreConnection>,
}

#[async_trait]
impl StoreConnection for MiscountingConnection {
    async fn execute_script(&self, script: &str) -> Result<(), EtlError> {
        self.inner.execute_script(script).await
    }
    async fn insert_batch(&self, batch: &ColumnarBatch) -> Result<(), EtlError> {
        self.inner.insert_batch(batch).await
    }
    async fn run_scalar_query(&self, query: &str) -> Result<i64, EtlError> {
        let count = self.inner.run_scalar_query(query).await?;
        Ok((count - 1).max(0))
    }
    async fn close(&mut self) -> Result<(), EtlError> {
        self.inner.close().await
    }
}

#[async_trait]
impl StoreDriver for MiscountingDriver {
    fn store_type(&self) -> &str {
        "memory"
    }
    async fn connect(
        &self,
        target: &TargetSettings,
    ) -> Result<Box<dyn StoreConnection>, EtlError> {
        Ok(Box::new(MiscountingConnection {
            inner: self.inner.connect(target).await?,
        }))
    }
}

/// Registries with scripted extractors and an arbitrary store driver
pub fn scripted_registries(driver: Arc<dyn StoreDriver>) -> Registries {
    let mut extractors = ExtractorRegistry::new();
    extractors.register(
        "scripted",
        Arc::new(|settings: &SourceSettings| {
            Ok(Box::new(ScriptedExtractor {
                name: settings.name.clone(),
            }) as Box<dyn Extractor>)
        }),
    );

    let mut transformers = TransformerRegistry::new();
    transformers.register(Arc::new(TradeTransformer::new()));
    transformers.register(Arc::new(QuoteTransformer::new()));

    let mut stores = StoreRegistry::new();
    stores.register(driver);

    Registries {
        extractors: Arc::new(extractors),
        transformers: Arc::new(transformers),
        stores: Arc::new(stores),
    }
}

/// One scripted source with the given properties
pub fn scripted_source(name: &str, props: &[(&str, &str)]) -> SourceSettings {
    SourceSettings {
        name: name.to_string(),
        source_type: "scripted".to_string(),
        connection_string: None,
        category: "ticks".to_string(),
        properties: props
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        sql_template: None,
        db: None,
        object_store: None,
    }
}

/// Run settings over scripted sources with the memory target
pub fn run_settings(sources: Vec<SourceSettings>, scratch: &std::path::Path) -> Arc<RunSettings> {
    run_settings_with_loader(sources, scratch, LoaderSettings::default())
}

/// Same, with explicit loader tuning (spill thresholds, timeout)
pub fn run_settings_with_loader(
    sources: Vec<SourceSettings>,
    scratch: &std::path::Path,
    loader: LoaderSettings,
) -> Arc<RunSettings> {
    Arc::new(RunSettings {
        sources,
        target: TargetSettings {
            store_type: "memory".to_string(),
            connection_string: "localhost:8848".to_string(),
            batch_size: BatchSize::default(),
            properties: HashMap::new(),
        },
        loader,
        validation: ValidationSettings::default(),
        scratch_root: scratch.to_path_buf(),
        app_dir: scratch.to_path_buf(),
    })
}

pub fn date(compact: &str) -> BusinessDate {
    BusinessDate::parse_compact(compact).unwrap()
}
