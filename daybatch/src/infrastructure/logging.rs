// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Structured Event Log
//!
//! Helpers that keep the event-log field names consistent across stages.
//! Every record carries `category` and `event`; counters and
//! `duration_ms` appear where the stage has them, `error_details` on
//! failures. The JSON rendering (plus `timestamp` and `level`) comes from
//! the subscriber the bootstrap installs.

pub mod events {
    use daybatch_domain::{BusinessDate, Stage};
    use std::time::Duration;
    use tracing::{error, info};

    /// One day started
    pub fn day_started(date: BusinessDate) {
        info!(
            category = "pipeline",
            event = "day_started",
            business_date = %date,
            "processing {}",
            date
        );
    }

    /// One day finished cleanly
    pub fn day_completed(
        date: BusinessDate,
        extracted: u64,
        transformed: u64,
        loaded: u64,
        duration: Duration,
    ) {
        info!(
            category = "pipeline",
            event = "day_completed",
            business_date = %date,
            extracted_count = extracted,
            transformed_count = transformed,
            loaded_count = loaded,
            duration_ms = duration.as_millis() as u64,
            "completed {}",
            date
        );
    }

    /// One day failed at a stage
    pub fn day_failed(date: BusinessDate, stage: Stage, error: &dyn std::fmt::Display) {
        error!(
            category = "pipeline",
            event = "day_failed",
            business_date = %date,
            stage = %stage,
            error_details = %error,
            "{} failed at {}: {}",
            date,
            stage,
            error
        );
    }

    /// Extract stage aggregate
    pub fn extract_finished(
        date: BusinessDate,
        source_count: usize,
        success_count: usize,
        failure_count: usize,
        total_records: usize,
        duration: Duration,
    ) {
        info!(
            category = "extract",
            event = "stage_finished",
            business_date = %date,
            source_count,
            success_count,
            failure_count,
            total_records,
            duration_ms = duration.as_millis() as u64,
            "extracted {} records from {}/{} sources",
            total_records,
            success_count,
            source_count
        );
    }

    /// Transform stage aggregate
    pub fn transform_finished(
        date: BusinessDate,
        bucket_count: usize,
        total_records: usize,
        duration: Duration,
    ) {
        info!(
            category = "transform",
            event = "stage_finished",
            business_date = %date,
            bucket_count,
            total_records,
            duration_ms = duration.as_millis() as u64,
            "transformed {} records across {} buckets",
            total_records,
            bucket_count
        );
    }

    /// Load stage aggregate
    pub fn load_finished(
        date: BusinessDate,
        total_records: u64,
        batches: usize,
        spilled: bool,
        duration: Duration,
    ) {
        info!(
            category = "load",
            event = "stage_finished",
            business_date = %date,
            total_records,
            batches,
            spilled,
            duration_ms = duration.as_millis() as u64,
            "loaded {} rows in {} batches",
            total_records,
            batches
        );
    }
}
