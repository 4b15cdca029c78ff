// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! End-to-end runs over scripted sources and the in-memory store: the
//! committed contract scenarios, driven through the real orchestrator
//! and all five stages.

mod common;

use common::{
    date, run_settings, run_settings_with_loader, scripted_registries, scripted_source,
    MiscountingDriver,
};
use daybatch::infrastructure::stores::memory::MemoryStoreDriver;
use daybatch::{DailyPipeline, RangeOrchestrator};
use daybatch_bootstrap::{CancellationToken, ExitCode};
use daybatch_domain::settings::LoaderSettings;
use daybatch_domain::{ColumnValue, MemoryBudget, Stage};
use std::sync::Arc;
use std::time::Duration;

fn orchestrator_with(driver: MemoryStoreDriver) -> RangeOrchestrator {
    let registries = scripted_registries(Arc::new(driver));
    RangeOrchestrator::new(DailyPipeline::new(&registries, CancellationToken::new()))
}

/// Scenario: single-day success with three records end to end.
#[tokio::test]
async fn single_day_success() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![scripted_source("ticks", &[("records", "3")])],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(report.summary.is_success());
    assert_eq!(report.summary.total_days(), 1);
    assert_eq!(report.summary.success_days(), 1);

    let day = &report.days[0];
    assert_eq!(day.extracted_count(), 3);
    assert_eq!(day.transformed_count(), 3);
    assert_eq!(day.loaded_count(), 3);
    assert_eq!(day.validation_passed(), Some(true));

    assert_eq!(driver.row_count("trades"), 3);
    assert_eq!(ExitCode::from_run_summary(&report.summary), ExitCode::Success);
}

/// Scenario: three-day range, two records per day, all succeed.
#[tokio::test]
async fn range_success() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![scripted_source("ticks", &[("records", "2")])],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250103"), settings)
        .await
        .unwrap();

    assert_eq!(report.summary.total_days(), 3);
    assert_eq!(report.summary.success_days(), 3);
    for day in &report.days {
        assert_eq!(day.extracted_count(), 2);
        assert_eq!(day.transformed_count(), 2);
        assert_eq!(day.loaded_count(), 2);
    }
    assert_eq!(driver.row_count("trades"), 6);
}

/// Scenario: day two fails at extract; day three never starts.
#[tokio::test]
async fn second_day_failure_halts_the_range() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![scripted_source(
            "ticks",
            &[("records", "2"), ("fail_on", "20250102")],
        )],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250103"), settings)
        .await
        .unwrap();

    assert_eq!(report.summary.total_days(), 2);
    assert_eq!(report.summary.success_days(), 1);
    let failure = report.summary.first_failure().unwrap();
    assert_eq!(failure.date, date("20250102"));
    assert_eq!(failure.stage, Stage::Extract);

    // Only day one's rows made it in
    assert_eq!(driver.row_count("trades"), 2);
    assert_eq!(
        ExitCode::from_run_summary(&report.summary),
        ExitCode::EtlFailure
    );
}

/// Scenario: inverted range runs zero days and reports an input error.
#[tokio::test]
async fn inverted_range_is_rejected() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![scripted_source("ticks", &[("records", "2")])],
        scratch.path(),
    );

    let err = orchestrator
        .run(date("20250107"), date("20250101"), settings)
        .await
        .unwrap_err();

    assert_eq!(err.category(), "input");
    assert!(err.to_string().contains("after"));
    assert_eq!(driver.row_count("trades"), 0);
    assert_eq!(ExitCode::from_startup_error(&err), ExitCode::InputError);
}

/// Scenario: the store reports 4 where 5 were loaded; the day fails at
/// Validate with both comparison messages, and Clean still runs.
#[tokio::test]
async fn validation_mismatch_fails_the_day() {
    let scratch = tempfile::tempdir().unwrap();
    let inner = MemoryStoreDriver::new();
    let registries = scripted_registries(Arc::new(MiscountingDriver {
        inner: inner.clone(),
    }));
    let orchestrator =
        RangeOrchestrator::new(DailyPipeline::new(&registries, CancellationToken::new()));
    let settings = run_settings(
        vec![scripted_source("ticks", &[("records", "5")])],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(!report.summary.is_success());
    let failure = report.summary.first_failure().unwrap();
    assert_eq!(failure.stage, Stage::Validate);
    assert!(failure.message.contains("store=4, expected(transformed)=5"));

    let day = &report.days[0];
    assert_eq!(day.validation_passed(), Some(false));
    // The loader really wrote 5 rows; only the count query lied
    assert_eq!(inner.row_count("trades"), 5);
}

/// One of two sources fails while the other produces records: partial
/// success, the day continues and completes.
#[tokio::test]
async fn partial_extract_success_continues_the_day() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![
            scripted_source("good", &[("records", "4")]),
            scripted_source("bad", &[("fail", "1")]),
        ],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(report.summary.is_success());
    assert_eq!(report.days[0].extracted_count(), 4);
    assert_eq!(driver.row_count("trades"), 4);
}

/// Both sources fail: the day fails at Extract.
#[tokio::test]
async fn all_sources_failing_fails_the_day() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings(
        vec![
            scripted_source("bad1", &[("fail", "1")]),
            scripted_source("bad2", &[("fail", "1")]),
        ],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(!report.summary.is_success());
    let failure = report.summary.first_failure().unwrap();
    assert_eq!(failure.stage, Stage::Extract);
    assert!(failure.message.contains("all extractors failed"));
    assert_eq!(driver.row_count("trades"), 0);
}

/// The global extract timeout fails the day at Extract.
#[tokio::test]
async fn extract_timeout_fails_the_day() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    let settings = run_settings_with_loader(
        vec![scripted_source(
            "slow",
            &[("records", "1"), ("delay_ms", "5000")],
        )],
        scratch.path(),
        LoaderSettings {
            timeout: Duration::from_millis(50),
            ..LoaderSettings::default()
        },
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(!report.summary.is_success());
    let failure = report.summary.first_failure().unwrap();
    assert_eq!(failure.stage, Stage::Extract);
    assert!(failure.message.contains("timeout"));
    assert_eq!(driver.row_count("trades"), 0);
}

/// An input over the memory budget takes the external merge path and
/// the store still observes rows in sort-key order.
#[tokio::test]
async fn over_budget_load_spills_and_stays_sorted() {
    let scratch = tempfile::tempdir().unwrap();
    let driver = MemoryStoreDriver::new();
    let orchestrator = orchestrator_with(driver.clone());
    // Budget of 600 bytes at the 500 B estimate: single-record runs
    let settings = run_settings_with_loader(
        vec![
            scripted_source("a", &[("records", "3")]),
            scripted_source("b", &[("records", "3")]),
        ],
        scratch.path(),
        LoaderSettings {
            memory_budget: MemoryBudget::from_bytes(600).unwrap(),
            ..LoaderSettings::default()
        },
    );

    let report = orchestrator
        .run(date("20250101"), date("20250101"), settings)
        .await
        .unwrap();

    assert!(report.summary.is_success(), "{}", report.summary);
    assert_eq!(report.days[0].loaded_count(), 6);

    let times: Vec<i64> = driver
        .column_values("trades", "receiveTime")
        .into_iter()
        .map(|value| match value {
            ColumnValue::Int64(t) => t,
            other => panic!("unexpected value {:?}", other),
        })
        .collect();
    let mut sorted = times.clone();
    sorted.sort();
    assert_eq!(times, sorted, "store must observe sort-key order");

    // Spill files were the sorter's own resource and are gone
    assert!(!scratch.path().join("2025-01-01").join("sort").exists());
}

/// Counter monotonicity on every successful day:
/// extracted >= transformed >= loaded >= 0.
#[tokio::test]
async fn counters_are_monotone_on_success() {
    let scratch = tempfile::tempdir().unwrap();
    let orchestrator = orchestrator_with(MemoryStoreDriver::new());
    let settings = run_settings(
        vec![
            scripted_source("a", &[("records", "3")]),
            scripted_source("b", &[("records", "5")]),
        ],
        scratch.path(),
    );

    let report = orchestrator
        .run(date("20250101"), date("20250102"), settings)
        .await
        .unwrap();

    for day in &report.days {
        assert!(day.extracted_count() >= day.transformed_count());
        assert!(day.transformed_count() >= day.loaded_count());
    }
}
