// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Day and Run Results
//!
//! What the pipeline reports upward: one [`DayResult`] per attempted day
//! and one [`RunSummary`] per invocation. A failed day names its stage and
//! cause in a [`StageFailure`]; the run summary carries the first failure
//! only, because the orchestrator halts the range there.

use crate::entities::etl_context::Stage;
use crate::error::EtlError;
use crate::value_objects::BusinessDate;
use std::fmt;
use std::time::Duration;

/// A stage-attributed error: which stage failed, and why.
#[derive(Debug, Clone)]
pub struct StageFailure {
    stage: Stage,
    error: EtlError,
}

impl StageFailure {
    pub fn new(stage: Stage, error: EtlError) -> Self {
        Self { stage, error }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn error(&self) -> &EtlError {
        &self.error
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} failed: {}", self.stage, self.error)
    }
}

/// Outcome of one attempted day.
#[derive(Debug, Clone)]
pub struct DayResult {
    date: BusinessDate,
    extracted_count: u64,
    transformed_count: u64,
    loaded_count: u64,
    validation_passed: Option<bool>,
    failure: Option<StageFailure>,
    duration: Duration,
}

impl DayResult {
    /// Builds a success result from the final counters
    pub fn succeeded(
        date: BusinessDate,
        extracted_count: u64,
        transformed_count: u64,
        loaded_count: u64,
        duration: Duration,
    ) -> Self {
        Self {
            date,
            extracted_count,
            transformed_count,
            loaded_count,
            validation_passed: Some(true),
            failure: None,
            duration,
        }
    }

    /// Builds a failure result carrying the stage attribution
    pub fn failed(
        date: BusinessDate,
        extracted_count: u64,
        transformed_count: u64,
        loaded_count: u64,
        validation_passed: Option<bool>,
        failure: StageFailure,
        duration: Duration,
    ) -> Self {
        Self {
            date,
            extracted_count,
            transformed_count,
            loaded_count,
            validation_passed,
            failure: Some(failure),
            duration,
        }
    }

    pub fn date(&self) -> BusinessDate {
        self.date
    }

    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn extracted_count(&self) -> u64 {
        self.extracted_count
    }

    pub fn transformed_count(&self) -> u64 {
        self.transformed_count
    }

    pub fn loaded_count(&self) -> u64 {
        self.loaded_count
    }

    pub fn validation_passed(&self) -> Option<bool> {
        self.validation_passed
    }

    pub fn failure(&self) -> Option<&StageFailure> {
        self.failure.as_ref()
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

/// The first failing day of a run.
#[derive(Debug, Clone)]
pub struct FirstFailure {
    pub date: BusinessDate,
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for FirstFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.date, self.stage, self.message)
    }
}

/// Aggregate outcome of one range invocation.
#[derive(Debug, Clone)]
pub struct RunSummary {
    total_days: u64,
    success_days: u64,
    first_failure: Option<FirstFailure>,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: chrono::DateTime<chrono::Utc>,
}

impl RunSummary {
    pub fn new(
        total_days: u64,
        success_days: u64,
        first_failure: Option<FirstFailure>,
        started_at: chrono::DateTime<chrono::Utc>,
        ended_at: chrono::DateTime<chrono::Utc>,
    ) -> Self {
        Self {
            total_days,
            success_days,
            first_failure,
            started_at,
            ended_at,
        }
    }

    /// Days attempted (the failed day counts; days after it do not)
    pub fn total_days(&self) -> u64 {
        self.total_days
    }

    pub fn success_days(&self) -> u64 {
        self.success_days
    }

    pub fn first_failure(&self) -> Option<&FirstFailure> {
        self.first_failure.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }

    pub fn started_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.started_at
    }

    pub fn ended_at(&self) -> chrono::DateTime<chrono::Utc> {
        self.ended_at
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.first_failure {
            None => write!(
                f,
                "run succeeded: {}/{} days",
                self.success_days, self.total_days
            ),
            Some(failure) => write!(
                f,
                "run failed: {}/{} days succeeded; first failure {}",
                self.success_days, self.total_days, failure
            ),
        }
    }
}
