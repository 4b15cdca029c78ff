// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Concurrent Extract Engine
//!
//! Fans one task out per configured source, bounds how many run at once,
//! enforces the stage-level deadline, and aggregates the results into the
//! day context at a single-threaded join point.
//!
//! ## Pool Bound
//!
//! At most `W = min(sources, 2 * available_parallelism)` extractor
//! lifecycles are in flight at any moment; the bound is a semaphore each
//! task acquires before resolving its extractor.
//!
//! ## Lifecycle Totality
//!
//! Each task drives `setup -> validate -> extract` and then runs
//! `cleanup()` exactly once - after success, after failure, and after
//! cancellation alike. The engine-internal stage token is the only thing
//! that interrupts a task, and it interrupts between awaits, never around
//! the cleanup call.
//!
//! ## Outcome Classification
//!
//! - every source succeeded: stage passes
//! - some failed but records exist: **partial success** - failures are
//!   logged with counts and the stage still passes
//! - failures and zero aggregate records: the stage fails, first error
//!   surfaced as the cause
//! - deadline reached: pending tasks are cancelled, stage fails with a
//!   timeout error after a bounded grace period
//! - run cancelled (signal): same wind-down, stage fails as cancelled
//!
//! Record order is preserved within one source's output; order across
//! sources is a concurrency artifact and deliberately unspecified.

use daybatch_bootstrap::CancellationToken;
use daybatch_domain::services::extractor::{SourceContext, TempFileRegistry};
use daybatch_domain::{EtlContext, EtlError, SourceRecord, WorkerCount};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::infrastructure::logging::events;
use crate::infrastructure::registries::ExtractorRegistry;

/// Grace period granted to in-flight tasks after a cancel or timeout, so
/// extractor `cleanup` can finish before the engine abandons the stage
const WIND_DOWN_GRACE: Duration = Duration::from_secs(10);

/// The extract stage implementation.
pub struct ConcurrentExtractEngine {
    registry: Arc<ExtractorRegistry>,
}

impl ConcurrentExtractEngine {
    pub fn new(registry: Arc<ExtractorRegistry>) -> Self {
        Self { registry }
    }

    /// Runs extraction for the context's business date, mutating the
    /// context with the aggregated records, counters, and temp files.
    ///
    /// Scratch files downloaded before a failure are still registered on
    /// the context, so best-effort cleanup can remove them.
    pub async fn run(
        &self,
        ctx: &mut EtlContext,
        cancel: &CancellationToken,
    ) -> Result<(), EtlError> {
        let started = std::time::Instant::now();
        let sources = ctx.settings().sources.clone();
        if sources.is_empty() {
            return Err(EtlError::invalid_input(
                "at least one source must be configured",
            ));
        }

        let date = ctx.business_date();
        let scratch_root = ctx.settings().scratch_root.clone();
        let deadline = ctx.settings().loader.timeout;
        let workers = WorkerCount::for_sources(sources.len());
        debug!(
            category = "extract",
            event = "fan_out",
            source_count = sources.len(),
            workers = workers.count(),
            "extracting {} with {}",
            date,
            workers
        );

        // Stage-internal token: tasks wind down when it cancels, whether
        // the trigger was the deadline or an external signal.
        let stage_token = CancellationToken::new();
        let temp_files = TempFileRegistry::new();
        let semaphore = Arc::new(Semaphore::new(workers.count()));
        let mut join_set: JoinSet<(String, Result<Vec<SourceRecord>, EtlError>)> = JoinSet::new();

        for source in sources.iter().cloned() {
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            let token = stage_token.clone();
            let source_ctx = SourceContext::new(
                date,
                source,
                scratch_root.clone(),
                temp_files.clone(),
            );
            join_set.spawn(async move {
                let name = source_ctx.settings().name.clone();
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (name, Err(EtlError::cancelled("extract pool closed")));
                    }
                };
                let result = run_one_source(registry, &source_ctx, &token).await;
                (name, result)
            });
        }

        let deadline_at = tokio::time::Instant::now() + deadline;
        let mut records: Vec<SourceRecord> = Vec::new();
        let mut success_count = 0usize;
        let mut failures: Vec<(String, EtlError)> = Vec::new();

        loop {
            let joined = tokio::select! {
                joined = join_set.join_next() => joined,
                _ = tokio::time::sleep_until(deadline_at) => {
                    self.wind_down(&mut join_set, &stage_token).await;
                    ctx.add_temp_files(temp_files.drain());
                    return Err(EtlError::timeout(format!(
                        "extract exceeded the {}s global timeout",
                        deadline.as_secs()
                    )));
                }
                _ = cancel.cancelled() => {
                    self.wind_down(&mut join_set, &stage_token).await;
                    ctx.add_temp_files(temp_files.drain());
                    return Err(EtlError::cancelled("extract interrupted by shutdown"));
                }
            };

            match joined {
                None => break,
                Some(Ok((name, Ok(source_records)))) => {
                    debug!(
                        category = "extract",
                        event = "source_succeeded",
                        source = %name,
                        total_records = source_records.len(),
                        "source '{}' produced {} records",
                        name,
                        source_records.len()
                    );
                    success_count += 1;
                    records.extend(source_records);
                }
                Some(Ok((name, Err(error)))) => {
                    warn!(
                        category = "extract",
                        event = "source_failed",
                        source = %name,
                        error_details = %error,
                        "source '{}' failed: {}",
                        name,
                        error
                    );
                    failures.push((name, error));
                }
                Some(Err(join_error)) => {
                    failures.push((
                        "<worker>".to_string(),
                        EtlError::internal_error(format!("extract worker died: {}", join_error)),
                    ));
                }
            }
        }

        // Single-threaded join point: aggregate into the context
        ctx.add_temp_files(temp_files.drain());

        let total_records = records.len();
        if !failures.is_empty() && total_records == 0 {
            let (first_source, first_error) = &failures[0];
            return Err(EtlError::source_error(format!(
                "all extractors failed; first failure from '{}': {}",
                first_source, first_error
            )));
        }

        ctx.record_extraction(records);
        events::extract_finished(
            date,
            sources.len(),
            success_count,
            failures.len(),
            total_records,
            started.elapsed(),
        );
        if !failures.is_empty() {
            info!(
                category = "extract",
                event = "partial_success",
                success_count,
                failure_count = failures.len(),
                total_records,
                "extract continued with partial results"
            );
        }
        Ok(())
    }

    /// Cancels pending tasks and waits a bounded grace period for their
    /// cleanups to finish, aborting whatever remains.
    async fn wind_down(
        &self,
        join_set: &mut JoinSet<(String, Result<Vec<SourceRecord>, EtlError>)>,
        stage_token: &CancellationToken,
    ) {
        stage_token.cancel();
        let drained = tokio::time::timeout(WIND_DOWN_GRACE, async {
            while join_set.join_next().await.is_some() {}
        })
        .await;
        if drained.is_err() {
            warn!(
                category = "extract",
                event = "wind_down_timeout",
                "extract workers did not stop within the grace period; aborting"
            );
            join_set.abort_all();
        }
    }
}

/// Drives one extractor lifecycle. `cleanup` runs on every exit path,
/// exactly once.
async fn run_one_source(
    registry: Arc<ExtractorRegistry>,
    ctx: &SourceContext,
    token: &CancellationToken,
) -> Result<Vec<SourceRecord>, EtlError> {
    let mut extractor = registry.create(ctx.settings())?;

    let work = async {
        extractor.setup(ctx).await?;
        extractor.validate(ctx).await?;
        extractor.extract(ctx).await
    };

    let result = tokio::select! {
        result = work => result,
        _ = token.cancelled() => Err(EtlError::cancelled(format!(
            "source '{}' cancelled",
            ctx.settings().name
        ))),
    };

    // The select dropped the lifecycle future, so the extractor borrow is
    // back; cleanup is unconditional.
    extractor.cleanup().await;
    result
}
