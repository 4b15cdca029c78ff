// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Daily Pipeline
//!
//! Drives the five stages of one business day in fixed order:
//!
//! ```text
//! Extract -> Transform -> Load -> Validate -> Clean
//! ```
//!
//! The pipeline owns the day's [`EtlContext`] and is its only writer.
//! Before each stage it advances the context's stage machine, which
//! doubles as the dependency check (Validate, for instance, refuses to
//! begin without the store connection Load attached).
//!
//! ## Failure Discipline
//!
//! The first failing stage ends the day: the pipeline runs best-effort
//! cleanup (temp files always; the store connection when Load opened
//! one), stamps the context `Failed` with its end time, and reports a
//! [`StageFailure`] naming the stage and cause. The validation verdict
//! settled by Validate is never overwritten by cleanup.
//!
//! The full Clean stage runs exactly when Load succeeded - on the
//! success path, and on a Validate failure via the best-effort route,
//! which finds the same connection and the same temp files.

use async_trait::async_trait;
use daybatch_bootstrap::CancellationToken;
use daybatch_domain::{
    BusinessDate, DayResult, EtlContext, EtlError, RunSettings, Stage, StageFailure,
};
use std::sync::Arc;

use crate::infrastructure::clean::cleaner::Cleaner;
use crate::infrastructure::engines::extract::ConcurrentExtractEngine;
use crate::infrastructure::engines::transform::ConcurrentTransformEngine;
use crate::infrastructure::load::columnar_loader::ColumnarLoader;
use crate::infrastructure::logging::events;
use crate::infrastructure::registries::Registries;
use crate::infrastructure::validate::validator::Validator;

/// One slot of the fixed stage sequence.
///
/// The dependency pre-check lives on the context's stage machine -
/// `begin_stage` refuses an out-of-order or under-provisioned
/// transition - so an implementation only declares its position and
/// executes.
#[async_trait]
trait PipelineStage: Send + Sync {
    /// The stage-machine position this implementation fills
    fn stage(&self) -> Stage;

    /// Executes the stage against the context
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError>;
}

struct ExtractStage {
    engine: ConcurrentExtractEngine,
    cancel: CancellationToken,
}

#[async_trait]
impl PipelineStage for ExtractStage {
    fn stage(&self) -> Stage {
        Stage::Extract
    }
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        self.engine.run(ctx, &self.cancel).await
    }
}

struct TransformStage {
    engine: ConcurrentTransformEngine,
}

#[async_trait]
impl PipelineStage for TransformStage {
    fn stage(&self) -> Stage {
        Stage::Transform
    }
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        self.engine.run(ctx).await
    }
}

struct LoadStage {
    loader: ColumnarLoader,
}

#[async_trait]
impl PipelineStage for LoadStage {
    fn stage(&self) -> Stage {
        Stage::Load
    }
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        self.loader.run(ctx).await
    }
}

struct ValidateStage {
    validator: Validator,
}

#[async_trait]
impl PipelineStage for ValidateStage {
    fn stage(&self) -> Stage {
        Stage::Validate
    }
    async fn execute(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        self.validator.run(ctx).await
    }
}

/// The fixed five-stage pipeline for one day: four fallible stages in
/// sequence, then Clean.
pub struct DailyPipeline {
    stages: [Box<dyn PipelineStage>; 4],
    clean: Cleaner,
}

impl DailyPipeline {
    /// Wires the stages against one registry set and a cancellation token
    pub fn new(registries: &Registries, cancel: CancellationToken) -> Self {
        Self {
            stages: [
                Box::new(ExtractStage {
                    engine: ConcurrentExtractEngine::new(Arc::clone(&registries.extractors)),
                    cancel,
                }),
                Box::new(TransformStage {
                    engine: ConcurrentTransformEngine::new(Arc::clone(&registries.transformers)),
                }),
                Box::new(LoadStage {
                    loader: ColumnarLoader::new(Arc::clone(&registries.stores)),
                }),
                Box::new(ValidateStage {
                    validator: Validator::new(),
                }),
            ],
            clean: Cleaner::new(),
        }
    }

    /// Runs one business day to a [`DayResult`]. Never panics, never
    /// leaks: every exit path has attempted cleanup.
    pub async fn run_day(&self, date: BusinessDate, settings: Arc<RunSettings>) -> DayResult {
        let mut ctx = EtlContext::new(date, settings);
        events::day_started(date);

        match self.execute_stages(&mut ctx).await {
            Ok(()) => {
                let result = DayResult::succeeded(
                    date,
                    ctx.extracted_count(),
                    ctx.transformed_count(),
                    ctx.loaded_count(),
                    ctx.elapsed(),
                );
                events::day_completed(
                    date,
                    result.extracted_count(),
                    result.transformed_count(),
                    result.loaded_count(),
                    result.duration(),
                );
                result
            }
            Err(failure) => {
                // Best-effort cleanup: temp files always, the store
                // connection when one was opened. The verdict stays as
                // Validate left it.
                self.clean.run(&mut ctx).await;
                ctx.fail();
                events::day_failed(date, failure.stage(), failure.error());
                DayResult::failed(
                    date,
                    ctx.extracted_count(),
                    ctx.transformed_count(),
                    ctx.loaded_count(),
                    ctx.validation_passed(),
                    failure,
                    ctx.elapsed(),
                )
            }
        }
    }

    async fn execute_stages(&self, ctx: &mut EtlContext) -> Result<(), StageFailure> {
        for stage in &self.stages {
            let tag = stage.stage();
            // Pre-check and transition in one move: the stage machine
            // refuses out-of-order or under-provisioned starts
            ctx.begin_stage(tag)
                .map_err(|error| StageFailure::new(tag, error))?;
            stage
                .execute(ctx)
                .await
                .map_err(|error| StageFailure::new(tag, error))?;
        }

        // Clean runs iff Load succeeded; on this path it has
        ctx.begin_stage(Stage::Clean)
            .map_err(|error| StageFailure::new(Stage::Clean, error))?;
        self.clean.run(ctx).await;
        ctx.complete()
            .map_err(|error| StageFailure::new(Stage::Clean, error))?;
        Ok(())
    }
}
