// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # ETL Context Entity
//!
//! The `EtlContext` is the single carrier of all inter-stage data for one
//! business day. Every stage reads from it and writes back to it; there is
//! no out-of-band state between stages.
//!
//! ## Ownership Discipline
//!
//! The daily pipeline owns the context and is its only writer. Concurrent
//! extract and transform workers fill private per-task buffers; their
//! results are aggregated into the context at a single-threaded join
//! point. This replaces the defensive builder-copy pattern a shared-object
//! model would need - ownership makes the single-writer rule structural.
//!
//! ## Stage Machine
//!
//! ```text
//! NotStarted -> Extract -> Transform -> Load -> Validate -> Clean -> Completed
//!                   \__________\___________\________\___________\--> Failed
//! ```
//!
//! The stage only advances forward; [`EtlContext::begin_stage`] rejects
//! out-of-order transitions, and the terminal states are `Completed` and
//! `Failed`. A failed context always carries an end timestamp.
//!
//! ## Counter Invariants
//!
//! `0 <= transformed_count <= extracted_count` and
//! `0 <= loaded_count <= transformed_count` hold on every observable
//! transition; the mutators enforce them and refuse violating updates.

use crate::error::EtlError;
use crate::records::{SourceRecord, TargetRecord};
use crate::services::StoreConnection;
use crate::settings::RunSettings;
use crate::value_objects::BusinessDate;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Pipeline stage of a day run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    NotStarted,
    Extract,
    Transform,
    Load,
    Validate,
    Clean,
    Completed,
    Failed,
}

impl Stage {
    /// Uppercase identifier used in reports and event logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::NotStarted => "NOT_STARTED",
            Stage::Extract => "EXTRACT",
            Stage::Transform => "TRANSFORM",
            Stage::Load => "LOAD",
            Stage::Validate => "VALIDATE",
            Stage::Clean => "CLEAN",
            Stage::Completed => "COMPLETED",
            Stage::Failed => "FAILED",
        }
    }

    /// Terminal stages accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Completed | Stage::Failed)
    }

    /// The stage that must be current before this one may begin
    fn predecessor(&self) -> Option<Stage> {
        match self {
            Stage::Extract => Some(Stage::NotStarted),
            Stage::Transform => Some(Stage::Extract),
            Stage::Load => Some(Stage::Transform),
            Stage::Validate => Some(Stage::Load),
            Stage::Clean => Some(Stage::Validate),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-day mutable carrier of stage counters, staged data buffers, the
/// shared store connection, and the validation verdict.
///
/// Created fresh for every day by the daily pipeline and destroyed when
/// the day ends; never shared across days.
pub struct EtlContext {
    // Identity
    business_date: BusinessDate,

    // Configuration carried through the day
    settings: Arc<RunSettings>,

    // Stage machine
    stage: Stage,

    // Staged data
    extracted: Vec<SourceRecord>,
    transformed: Vec<TargetRecord>,

    // Counters
    extracted_count: u64,
    transformed_count: u64,
    loaded_count: u64,

    // Validation verdict
    validation_passed: Option<bool>,
    validation_errors: Vec<String>,

    // Resources
    temp_files: Vec<PathBuf>,
    store: Option<Box<dyn StoreConnection>>,
    cleanup_performed: bool,

    // Timing (monotonic)
    started_at: Instant,
    ended_at: Option<Instant>,
}

impl EtlContext {
    /// Creates a fresh context for one business day
    pub fn new(business_date: BusinessDate, settings: Arc<RunSettings>) -> Self {
        Self {
            business_date,
            settings,
            stage: Stage::NotStarted,
            extracted: Vec::new(),
            transformed: Vec::new(),
            extracted_count: 0,
            transformed_count: 0,
            loaded_count: 0,
            validation_passed: None,
            validation_errors: Vec::new(),
            temp_files: Vec::new(),
            store: None,
            cleanup_performed: false,
            started_at: Instant::now(),
            ended_at: None,
        }
    }

    pub fn business_date(&self) -> BusinessDate {
        self.business_date
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    pub fn settings_arc(&self) -> Arc<RunSettings> {
        Arc::clone(&self.settings)
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Advances the stage machine into `stage`.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::MissingDependency`] when the current stage is
    /// not the required predecessor, or when Validate begins without a
    /// store connection.
    pub fn begin_stage(&mut self, stage: Stage) -> Result<(), EtlError> {
        let expected = stage.predecessor().ok_or_else(|| {
            EtlError::internal_error(format!("{} is not a runnable stage", stage))
        })?;
        if self.stage != expected {
            return Err(EtlError::missing_dependency(format!(
                "cannot begin {} from {}; requires {}",
                stage, self.stage, expected
            )));
        }
        if stage == Stage::Validate && self.store.is_none() {
            return Err(EtlError::missing_dependency(
                "validate requires the store connection opened by load",
            ));
        }
        self.stage = stage;
        Ok(())
    }

    /// Marks the day failed and stamps the end time. Idempotent once the
    /// context is terminal.
    pub fn fail(&mut self) {
        if !self.stage.is_terminal() {
            self.stage = Stage::Failed;
            self.ended_at = Some(Instant::now());
        }
    }

    /// Marks the day completed. Only legal from Clean.
    pub fn complete(&mut self) -> Result<(), EtlError> {
        if self.stage != Stage::Clean {
            return Err(EtlError::internal_error(format!(
                "cannot complete from {}",
                self.stage
            )));
        }
        self.stage = Stage::Completed;
        self.ended_at = Some(Instant::now());
        Ok(())
    }

    // ---- extract ------------------------------------------------------

    /// Stores the aggregated extract output and sets `extracted_count`
    pub fn record_extraction(&mut self, records: Vec<SourceRecord>) {
        self.extracted_count = records.len() as u64;
        self.extracted = records;
    }

    /// Hands the extracted buffer to the transform stage, leaving the
    /// counter in place
    pub fn take_extracted(&mut self) -> Vec<SourceRecord> {
        std::mem::take(&mut self.extracted)
    }

    pub fn extracted_count(&self) -> u64 {
        self.extracted_count
    }

    // ---- transform ----------------------------------------------------

    /// Stores the transform output and sets `transformed_count`.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InternalError`] if the update would violate
    /// `transformed_count <= extracted_count`.
    pub fn record_transformation(&mut self, records: Vec<TargetRecord>) -> Result<(), EtlError> {
        let count = records.len() as u64;
        if count > self.extracted_count {
            return Err(EtlError::internal_error(format!(
                "transformed count {} exceeds extracted count {}",
                count, self.extracted_count
            )));
        }
        self.transformed_count = count;
        self.transformed = records;
        Ok(())
    }

    /// Hands the transformed buffer to the load stage, leaving the counter
    /// in place
    pub fn take_transformed(&mut self) -> Vec<TargetRecord> {
        std::mem::take(&mut self.transformed)
    }

    pub fn transformed_count(&self) -> u64 {
        self.transformed_count
    }

    // ---- load ---------------------------------------------------------

    /// Records the number of rows the store accepted.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InternalError`] if the update would violate
    /// `loaded_count <= transformed_count`.
    pub fn record_loaded(&mut self, count: u64) -> Result<(), EtlError> {
        if count > self.transformed_count {
            return Err(EtlError::internal_error(format!(
                "loaded count {} exceeds transformed count {}",
                count, self.transformed_count
            )));
        }
        self.loaded_count = count;
        Ok(())
    }

    pub fn loaded_count(&self) -> u64 {
        self.loaded_count
    }

    /// Attaches the store connection opened by the load stage
    pub fn attach_store(&mut self, connection: Box<dyn StoreConnection>) {
        self.store = Some(connection);
    }

    /// Gets the store connection, if one is attached
    pub fn store(&self) -> Option<&dyn StoreConnection> {
        self.store.as_deref()
    }

    /// Detaches the store connection for closing
    pub fn take_store(&mut self) -> Option<Box<dyn StoreConnection>> {
        self.store.take()
    }

    // ---- validate -----------------------------------------------------

    /// Appends one validation rule failure message
    pub fn add_validation_error(&mut self, message: String) {
        self.validation_errors.push(message);
    }

    /// Settles the verdict from the accumulated rule failures and returns
    /// whether validation passed
    pub fn finalize_validation(&mut self) -> bool {
        let passed = self.validation_errors.is_empty();
        self.validation_passed = Some(passed);
        passed
    }

    pub fn validation_passed(&self) -> Option<bool> {
        self.validation_passed
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    // ---- clean --------------------------------------------------------

    /// Registers scratch files for end-of-day deletion
    pub fn add_temp_files(&mut self, paths: Vec<PathBuf>) {
        self.temp_files.extend(paths);
    }

    /// Drains the temp-file list for deletion. A second drain yields
    /// nothing, which is what makes cleanup idempotent.
    pub fn take_temp_files(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.temp_files)
    }

    pub fn temp_files(&self) -> &[PathBuf] {
        &self.temp_files
    }

    pub fn mark_cleanup_performed(&mut self) {
        self.cleanup_performed = true;
    }

    pub fn cleanup_performed(&self) -> bool {
        self.cleanup_performed
    }

    // ---- timing -------------------------------------------------------

    /// Elapsed wall time: up to now while running, frozen once terminal
    pub fn elapsed(&self) -> Duration {
        match self.ended_at {
            Some(end) => end.duration_since(self.started_at),
            None => self.started_at.elapsed(),
        }
    }

    /// Whether the end timestamp has been stamped
    pub fn has_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

impl fmt::Debug for EtlContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EtlContext")
            .field("business_date", &self.business_date)
            .field("stage", &self.stage)
            .field("extracted_count", &self.extracted_count)
            .field("transformed_count", &self.transformed_count)
            .field("loaded_count", &self.loaded_count)
            .field("validation_passed", &self.validation_passed)
            .field("temp_files", &self.temp_files.len())
            .field("store_attached", &self.store.is_some())
            .field("cleanup_performed", &self.cleanup_performed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::records::{ColumnarBatch, RawTrade, SourceRecord};
    use crate::settings::{LoaderSettings, RunSettings, TargetSettings, ValidationSettings};
    use crate::value_objects::BatchSize;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct NoopConnection;

    #[async_trait]
    impl StoreConnection for NoopConnection {
        async fn execute_script(&self, _script: &str) -> Result<(), EtlError> {
            Ok(())
        }
        async fn insert_batch(&self, _batch: &ColumnarBatch) -> Result<(), EtlError> {
            Ok(())
        }
        async fn run_scalar_query(&self, _query: &str) -> Result<i64, EtlError> {
            Ok(0)
        }
        async fn close(&mut self) -> Result<(), EtlError> {
            Ok(())
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
            scratch_root: PathBuf::from("/tmp/daybatch-test"),
            app_dir: PathBuf::from("/tmp/daybatch-test"),
        })
    }

    fn context() -> EtlContext {
        EtlContext::new(BusinessDate::from_ymd(2025, 1, 1).unwrap(), settings())
    }

    fn one_trade() -> SourceRecord {
        SourceRecord::Trade(RawTrade {
            symbol: "ABCD".to_string(),
            venue: "XNAS".to_string(),
            price: 1.0,
            quantity: 1,
            receive_time: 1,
        })
    }

    #[test]
    fn test_stage_advances_only_forward() {
        let mut ctx = context();
        assert_eq!(ctx.stage(), Stage::NotStarted);
        ctx.begin_stage(Stage::Extract).unwrap();
        ctx.begin_stage(Stage::Transform).unwrap();

        // Regression and skipping are both rejected
        assert!(ctx.begin_stage(Stage::Extract).is_err());
        assert!(ctx.begin_stage(Stage::Validate).is_err());
        assert_eq!(ctx.stage(), Stage::Transform);
    }

    #[test]
    fn test_validate_requires_store_connection() {
        let mut ctx = context();
        ctx.begin_stage(Stage::Extract).unwrap();
        ctx.begin_stage(Stage::Transform).unwrap();
        ctx.begin_stage(Stage::Load).unwrap();

        let err = ctx.begin_stage(Stage::Validate).unwrap_err();
        assert_eq!(err.category(), "dependency");

        ctx.attach_store(Box::new(NoopConnection));
        ctx.begin_stage(Stage::Validate).unwrap();
    }

    #[test]
    fn test_failed_context_has_end_time_and_stays_failed() {
        let mut ctx = context();
        ctx.begin_stage(Stage::Extract).unwrap();
        ctx.fail();
        assert_eq!(ctx.stage(), Stage::Failed);
        assert!(ctx.has_ended());

        // A second fail does not restamp or resurrect the context
        let frozen = ctx.elapsed();
        ctx.fail();
        assert_eq!(ctx.stage(), Stage::Failed);
        assert_eq!(ctx.elapsed(), frozen);
    }

    #[test]
    fn test_counter_invariants_enforced() {
        let mut ctx = context();
        ctx.record_extraction(vec![one_trade(), one_trade()]);
        assert_eq!(ctx.extracted_count(), 2);

        // transformed > extracted is refused
        let too_many = vec![
            crate::records::TargetRecord::Trade(crate::records::TradeRow::new(
                "A".to_string(),
                "X".to_string(),
                1.0,
                1,
                BusinessDate::from_ymd(2025, 1, 1).unwrap(),
                1,
            ));
            3
        ];
        assert!(ctx.record_transformation(too_many.clone()).is_err());

        ctx.record_transformation(too_many[..2].to_vec()).unwrap();
        assert_eq!(ctx.transformed_count(), 2);

        assert!(ctx.record_loaded(3).is_err());
        ctx.record_loaded(2).unwrap();
        assert_eq!(ctx.loaded_count(), 2);
    }

    #[test]
    fn test_complete_only_from_clean() {
        let mut ctx = context();
        assert!(ctx.complete().is_err());

        ctx.begin_stage(Stage::Extract).unwrap();
        ctx.begin_stage(Stage::Transform).unwrap();
        ctx.begin_stage(Stage::Load).unwrap();
        ctx.attach_store(Box::new(NoopConnection));
        ctx.begin_stage(Stage::Validate).unwrap();
        ctx.begin_stage(Stage::Clean).unwrap();
        ctx.complete().unwrap();
        assert_eq!(ctx.stage(), Stage::Completed);
        assert!(ctx.has_ended());
    }

    #[test]
    fn test_validation_verdict() {
        let mut ctx = context();
        assert_eq!(ctx.validation_passed(), None);
        ctx.add_validation_error("store=4, expected(transformed)=5".to_string());
        assert!(!ctx.finalize_validation());
        assert_eq!(ctx.validation_passed(), Some(false));
        assert_eq!(ctx.validation_errors().len(), 1);
    }

    #[test]
    fn test_temp_file_drain_is_idempotent() {
        let mut ctx = context();
        ctx.add_temp_files(vec![PathBuf::from("/tmp/a"), PathBuf::from("/tmp/b")]);
        assert_eq!(ctx.take_temp_files().len(), 2);
        assert!(ctx.take_temp_files().is_empty());
    }
}
