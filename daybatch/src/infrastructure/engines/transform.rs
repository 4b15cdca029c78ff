// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent Transform Engine
//!
//! Buckets the extracted records by source-model tag (per-tag insertion
//! order preserved), then runs one worker per non-empty bucket on the
//! blocking thread pool - transformation is pure CPU work, so it stays off
//! the async reactor.
//!
//! ## Fail-Fast
//!
//! The first bucket whose transformer errors fails the whole stage; the
//! remaining tasks are cancelled best-effort (a blocking task already on a
//! thread runs to completion, but its output is discarded). An extracted
//! model with no registered transformer fails its bucket's task, which
//! fails the stage the same way.
//!
//! Zero non-empty buckets means the day extracted nothing; the stage
//! fails with "no data" and the day fails - an empty day is a data
//! problem, not a quiet success.

use daybatch_domain::{EtlContext, EtlError, SourceModel, SourceRecord, TargetRecord};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::infrastructure::logging::events;
use crate::infrastructure::registries::TransformerRegistry;

/// The transform stage implementation.
pub struct ConcurrentTransformEngine {
    registry: Arc<TransformerRegistry>,
}

impl ConcurrentTransformEngine {
    pub fn new(registry: Arc<TransformerRegistry>) -> Self {
        Self { registry }
    }

    /// Transforms the context's extracted buffer into target records,
    /// setting `transformed_count`.
    pub async fn run(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let started = std::time::Instant::now();
        let date = ctx.business_date();
        let input = ctx.take_extracted();

        // Partition by tag, preserving per-tag insertion order
        let mut buckets: BTreeMap<SourceModel, Vec<SourceRecord>> = BTreeMap::new();
        for record in input {
            buckets.entry(record.model()).or_default().push(record);
        }

        if buckets.is_empty() {
            return Err(EtlError::transform_error("no data"));
        }

        let bucket_count = buckets.len();
        debug!(
            category = "transform",
            event = "fan_out",
            bucket_count,
            "transforming {} buckets",
            bucket_count
        );

        // One blocking worker per non-empty bucket
        let mut join_set: JoinSet<Result<Vec<TargetRecord>, EtlError>> = JoinSet::new();
        for (model, records) in buckets {
            let registry = Arc::clone(&self.registry);
            join_set.spawn_blocking(move || {
                let transformer = registry.get(model)?;
                transformer.transform(records, date)
            });
        }

        let mut outputs: Vec<TargetRecord> = Vec::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(Ok(records)) => outputs.extend(records),
                Ok(Err(error)) => {
                    // Fail fast: surface the first error, cancel the rest
                    join_set.abort_all();
                    return Err(error);
                }
                Err(join_error) => {
                    join_set.abort_all();
                    return Err(EtlError::internal_error(format!(
                        "transform worker died: {}",
                        join_error
                    )));
                }
            }
        }

        let total = outputs.len();
        ctx.record_transformation(outputs)?;
        events::transform_finished(date, bucket_count, total, started.elapsed());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybatch_domain::records::{RawQuote, RawTrade};
    use daybatch_domain::settings::{
        LoaderSettings, RunSettings, TargetSettings, ValidationSettings,
    };
    use daybatch_domain::{BatchSize, BusinessDate, DataType, Transformer};
    use std::collections::HashMap;
    use std::path::PathBuf;

    use crate::infrastructure::transformers::{QuoteTransformer, TradeTransformer};

    /// A transformer that always fails; used to exercise fail-fast.
    struct ExplodingTransformer;

    impl Transformer for ExplodingTransformer {
        fn source_model(&self) -> SourceModel {
            SourceModel::Quote
        }

        fn data_type(&self) -> DataType {
            DataType::Quote
        }

        fn transform(
            &self,
            _input: Vec<SourceRecord>,
            _business_date: BusinessDate,
        ) -> Result<Vec<TargetRecord>, EtlError> {
            Err(EtlError::transform_error("quote mapping exploded"))
        }
    }

    fn settings() -> Arc<RunSettings> {
        Arc::new(RunSettings {
            sources: Vec::new(),
            target: TargetSettings {
                store_type: "memory".to_string(),
                connection_string: "localhost:0".to_string(),
                batch_size: BatchSize::default(),
                properties: HashMap::new(),
            },
            loader: LoaderSettings::default(),
            validation: ValidationSettings::default(),
            scratch_root: PathBuf::from("/tmp/daybatch-transform-test"),
            app_dir: PathBuf::from("/tmp/daybatch-transform-test"),
        })
    }

    fn context_with(records: Vec<SourceRecord>) -> EtlContext {
        let mut ctx = EtlContext::new(BusinessDate::from_ymd(2025, 1, 1).unwrap(), settings());
        ctx.record_extraction(records);
        ctx
    }

    fn trade(symbol: &str, receive_time: i64) -> SourceRecord {
        SourceRecord::Trade(RawTrade {
            symbol: symbol.to_string(),
            venue: "XNAS".to_string(),
            price: 10.0,
            quantity: 5,
            receive_time,
        })
    }

    fn quote(symbol: &str, receive_time: i64) -> SourceRecord {
        SourceRecord::Quote(RawQuote {
            symbol: symbol.to_string(),
            venue: "XNAS".to_string(),
            bid: 9.9,
            ask: 10.1,
            bid_size: 100,
            ask_size: 200,
            receive_time,
        })
    }

    fn full_registry() -> Arc<TransformerRegistry> {
        let mut registry = TransformerRegistry::new();
        registry.register(Arc::new(TradeTransformer::new()));
        registry.register(Arc::new(QuoteTransformer::new()));
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_transforms_mixed_models_preserving_per_tag_order() {
        let engine = ConcurrentTransformEngine::new(full_registry());
        let mut ctx = context_with(vec![
            trade("T1", 10),
            quote("Q1", 11),
            trade("T2", 12),
            quote("Q2", 13),
        ]);

        engine.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.transformed_count(), 4);

        let transformed = ctx.take_transformed();
        // Per-tag order preserved: T1 before T2, Q1 before Q2
        let trades: Vec<i64> = transformed
            .iter()
            .filter(|r| r.data_type() == DataType::Trade)
            .map(|r| r.sort_value("receiveTime").unwrap())
            .collect();
        let quotes: Vec<i64> = transformed
            .iter()
            .filter(|r| r.data_type() == DataType::Quote)
            .map(|r| r.sort_value("receiveTime").unwrap())
            .collect();
        assert_eq!(trades, vec![10, 12]);
        assert_eq!(quotes, vec![11, 13]);
    }

    #[tokio::test]
    async fn test_no_data_fails_the_stage() {
        let engine = ConcurrentTransformEngine::new(full_registry());
        let mut ctx = context_with(vec![]);

        let err = engine.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.category(), "transform");
        assert!(err.to_string().contains("no data"));
    }

    #[tokio::test]
    async fn test_missing_transformer_fails_the_stage() {
        // Only trades registered; quotes present in the input
        let mut registry = TransformerRegistry::new();
        registry.register(Arc::new(TradeTransformer::new()));
        let engine = ConcurrentTransformEngine::new(Arc::new(registry));
        let mut ctx = context_with(vec![trade("T1", 1), quote("Q1", 2)]);

        let err = engine.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.category(), "transform");
        assert!(err.to_string().contains("no transformer"));
    }

    #[tokio::test]
    async fn test_fail_fast_surfaces_the_bucket_error() {
        let mut registry = TransformerRegistry::new();
        registry.register(Arc::new(TradeTransformer::new()));
        registry.register(Arc::new(ExplodingTransformer));
        let engine = ConcurrentTransformEngine::new(Arc::new(registry));
        let mut ctx = context_with(vec![trade("T1", 1), quote("Q1", 2)]);

        let err = engine.run(&mut ctx).await.unwrap_err();
        assert_eq!(err.category(), "transform");
        assert!(err.to_string().contains("exploded"));
    }

    /// The mapping is 1:1, so the counter invariant holds structurally.
    #[tokio::test]
    async fn test_counts_are_one_to_one() {
        let engine = ConcurrentTransformEngine::new(full_registry());
        let mut ctx = context_with((0..50).map(|i| trade("T", i)).collect());

        engine.run(&mut ctx).await.unwrap();
        assert_eq!(ctx.extracted_count(), 50);
        assert_eq!(ctx.transformed_count(), 50);
    }
}
