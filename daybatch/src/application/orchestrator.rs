// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Range Orchestrator
//!
//! Walks the inclusive date range strictly in order, running one daily
//! pipeline per date with a fresh context each time. The first failing
//! day halts the range: later dates are never attempted, and the run
//! summary names the failing date, stage, and cause.
//!
//! The orchestrator validates `from <= to` on entry and owns nothing
//! else about process lifecycle - the lock is acquired by the binary
//! before the orchestrator exists, and one run performs exactly one
//! lock acquisition.

use daybatch_domain::entities::FirstFailure;
use daybatch_domain::{BusinessDate, DateRange, DayResult, EtlError, RunSettings, RunSummary};
use std::sync::Arc;
use tracing::info;

use crate::application::daily_pipeline::DailyPipeline;

/// A run's aggregate summary plus its per-day results.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub days: Vec<DayResult>,
}

/// Drives the daily pipeline across a date range.
pub struct RangeOrchestrator {
    pipeline: DailyPipeline,
}

impl RangeOrchestrator {
    pub fn new(pipeline: DailyPipeline) -> Self {
        Self { pipeline }
    }

    /// Runs every date in `[from, to]` until the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidInput`] when `from > to`; zero days run
    /// in that case. Day failures do *not* surface here - they end up in
    /// the report's summary.
    pub async fn run(
        &self,
        from: BusinessDate,
        to: BusinessDate,
        settings: Arc<RunSettings>,
    ) -> Result<RunReport, EtlError> {
        let range = DateRange::new(from, to)?;
        let started_at = chrono::Utc::now();
        info!(
            category = "run",
            event = "range_started",
            from = %range.from(),
            to = %range.to(),
            total_days = range.len_days(),
            "processing {} through {}",
            range.from(),
            range.to()
        );

        let mut days: Vec<DayResult> = Vec::new();
        let mut first_failure: Option<FirstFailure> = None;

        for date in range.iter() {
            let result = self.pipeline.run_day(date, Arc::clone(&settings)).await;
            let failed = result.failure().map(|failure| FirstFailure {
                date,
                stage: failure.stage(),
                message: failure.error().to_string(),
            });
            days.push(result);

            if let Some(failure) = failed {
                first_failure = Some(failure);
                break;
            }
        }

        let success_days = days.iter().filter(|day| day.is_success()).count() as u64;
        let summary = RunSummary::new(
            days.len() as u64,
            success_days,
            first_failure,
            started_at,
            chrono::Utc::now(),
        );
        info!(
            category = "run",
            event = "range_finished",
            total_days = summary.total_days(),
            success_count = summary.success_days(),
            "{}",
            summary
        );
        Ok(RunReport { summary, days })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use daybatch_bootstrap::CancellationToken;
    use daybatch_domain::records::RawTrade;
    use daybatch_domain::services::extractor::SourceContext;
    use daybatch_domain::services::Extractor;
    use daybatch_domain::settings::{
        LoaderSettings, SourceSettings, TargetSettings, ValidationSettings,
    };
    use daybatch_domain::{BatchSize, SourceRecord, Stage};
    use std::collections::HashMap;
    use std::sync::Arc;

    use crate::infrastructure::registries::{
        ExtractorRegistry, Registries, StoreRegistry, TransformerRegistry,
    };
    use crate::infrastructure::stores::memory::MemoryStoreDriver;
    use crate::infrastructure::transformers::{QuoteTransformer, TradeTransformer};

    /// Emits two records per day, failing on a configured date.
    struct PerDayExtractor {
        fail_on: Option<BusinessDate>,
    }

    #[async_trait]
    impl Extractor for PerDayExtractor {
        fn name(&self) -> &str {
            "per-day"
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
            if Some(ctx.business_date()) == self.fail_on {
                return Err(EtlError::source_error("scripted day failure"));
            }
            Ok((0..2)
                .map(|i| {
                    SourceRecord::Trade(RawTrade {
                        symbol: format!("S{}", i),
                        venue: "XNAS".to_string(),
                        price: 1.0,
                        quantity: 1,
                        receive_time: i,
                    })
                })
                .collect())
        }
        async fn cleanup(&mut self) {}
    }

    fn orchestrator(fail_on: Option<&str>) -> (RangeOrchestrator, MemoryStoreDriver) {
        let fail_on = fail_on.map(|d| BusinessDate::parse_compact(d).unwrap());
        let driver = MemoryStoreDriver::new();

        let mut extractors = ExtractorRegistry::new();
        extractors.register(
            "per-day",
            Arc::new(move |_settings: &SourceSettings| {
                Ok(Box::new(PerDayExtractor { fail_on }) as Box<dyn Extractor>)
            }),
        );
        let mut transformers = TransformerRegistry::new();
        transformers.register(Arc::new(TradeTransformer::new()));
        transformers.register(Arc::new(QuoteTransformer::new()));
        let mut stores = StoreRegistry::new();
        stores.register(Arc::new(driver.clone()));

        let registries = Registries {
            extractors: Arc::new(extractors),
            transformers: Arc::new(transformers),
            stores: Arc::new(stores),
        };
        let pipeline = DailyPipeline::new(&registries, CancellationToken::new());
        (RangeOrchestrator::new(pipeline), driver)
    }

    fn settings() -> Arc<RunSettings> {
        Arc::new(RunSettings {
            sources: vec![SourceSettings {
                name: "per-day".to_string(),
                source_type: "per-day".to_string(),
                connection_string: None,
                category: "ticks".to_string(),
                properties: HashMap::new(),
                sql_template: None,
                db: None,
                object_store: None,
            }],
            target: TargetSettings {
                store_type: "memory".to_string(),
                connection_string: "localhost:0".to_string(),
                batch_size: BatchSize::default(),
                properties: HashMap::new(),
            },
            loader: LoaderSettings::default(),
            validation: ValidationSettings::default(),
            scratch_root: std::env::temp_dir().join("daybatch-orchestrator-test"),
            app_dir: std::env::temp_dir().join("daybatch-orchestrator-test"),
        })
    }

    fn date(compact: &str) -> BusinessDate {
        BusinessDate::parse_compact(compact).unwrap()
    }

    #[tokio::test]
    async fn test_single_day_range_runs_exactly_one_day() {
        let (orchestrator, _driver) = orchestrator(None);
        let report = orchestrator
            .run(date("20250101"), date("20250101"), settings())
            .await
            .unwrap();
        assert_eq!(report.summary.total_days(), 1);
        assert_eq!(report.summary.success_days(), 1);
        assert!(report.summary.is_success());
    }

    #[tokio::test]
    async fn test_range_runs_every_day_in_order() {
        let (orchestrator, driver) = orchestrator(None);
        let report = orchestrator
            .run(date("20250101"), date("20250103"), settings())
            .await
            .unwrap();
        assert_eq!(report.summary.total_days(), 3);
        assert_eq!(report.summary.success_days(), 3);
        assert_eq!(report.days.len(), 3);
        for day in &report.days {
            assert_eq!(day.extracted_count(), 2);
            assert_eq!(day.transformed_count(), 2);
            assert_eq!(day.loaded_count(), 2);
        }
        assert_eq!(driver.row_count("trades"), 6);
    }

    #[tokio::test]
    async fn test_failure_halts_the_range() {
        let (orchestrator, driver) = orchestrator(Some("20250102"));
        let report = orchestrator
            .run(date("20250101"), date("20250103"), settings())
            .await
            .unwrap();

        assert_eq!(report.summary.total_days(), 2);
        assert_eq!(report.summary.success_days(), 1);
        let failure = report.summary.first_failure().unwrap();
        assert_eq!(failure.date, date("20250102"));
        assert_eq!(failure.stage, Stage::Extract);
        // Day 3 never ran: only day 1's rows exist
        assert_eq!(driver.row_count("trades"), 2);
    }

    #[tokio::test]
    async fn test_inverted_range_runs_zero_days() {
        let (orchestrator, driver) = orchestrator(None);
        let err = orchestrator
            .run(date("20250107"), date("20250101"), settings())
            .await
            .unwrap_err();
        assert_eq!(err.category(), "input");
        assert_eq!(driver.row_count("trades"), 0);
    }
}
