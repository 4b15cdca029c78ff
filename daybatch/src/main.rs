// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Daybatch CLI
//!
//! Entry point for the batch ETL driver:
//!
//! ```bash
//! daybatch --from 20250101 --to 20250103 --config /etc/daybatch.ini
//! ```
//!
//! Startup order matters and is fixed:
//!
//! 1. parse and validate arguments (exit 1 on bad input)
//! 2. initialize logging
//! 3. load and resolve configuration (exit 4 on malformed config)
//! 4. acquire the process lock under the configured app dir (exit 2
//!    when another run holds it) - nothing touches sources or the store
//!    before this point
//! 5. install signal handlers, build registries, run the orchestrator
//! 6. render the report and map the outcome to the exit code
//!    (0 success, 3 any stage failure, 1 inverted range)
//!
//! The lock is released when the guard drops, on every exit path.

use daybatch::{DailyPipeline, RangeOrchestrator, Registries, RunReport};
use daybatch_bootstrap::{
    cli, logger, ExitCode, ProcessLock, ShutdownCoordinator,
};
use std::sync::Arc;
use tracing::{debug, info};

use daybatch::infrastructure::config::settings_loader;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let args = match cli::parse_and_validate() {
        Ok(args) => args,
        Err(error) => {
            eprintln!("daybatch: {}", error);
            return ExitCode::from_startup_error(&error).into();
        }
    };

    logger::init(args.verbose);
    debug!(
        category = "lifecycle",
        event = "starting",
        "daybatch starting for {}..{}",
        args.from,
        args.to
    );

    let settings = match settings_loader::load_settings(&args.config) {
        Ok(settings) => Arc::new(settings),
        Err(error) => {
            eprintln!("daybatch: {}", error);
            return ExitCode::from_startup_error(&error).into();
        }
    };

    // At-most-one run per installation: everything after this line is
    // protected by the lock until the guard drops.
    let _lock = match ProcessLock::acquire(&settings.app_dir) {
        Ok(lock) => lock,
        Err(error) => {
            eprintln!("daybatch: {}", error);
            return ExitCode::from_startup_error(&error).into();
        }
    };
    info!(
        category = "lifecycle",
        event = "lock_acquired",
        "process lock held at {}",
        _lock.path().display()
    );

    let coordinator = ShutdownCoordinator::default();
    let signal_task = coordinator.install_signal_handlers();

    let registries = Registries::standard();
    let pipeline = DailyPipeline::new(&registries, coordinator.token());
    let orchestrator = RangeOrchestrator::new(pipeline);

    let report = match orchestrator.run(args.from, args.to, settings).await {
        Ok(report) => report,
        Err(error) => {
            eprintln!("daybatch: {}", error);
            return ExitCode::from_startup_error(&error).into();
        }
    };

    signal_task.abort();
    render_report(&report);
    ExitCode::from_run_summary(&report.summary).into()
}

/// Human-readable end-of-run block; the structured events already went
/// to the log.
fn render_report(report: &RunReport) {
    for day in &report.days {
        match day.failure() {
            None => println!(
                "{}: ok  extracted={} transformed={} loaded={} ({} ms)",
                day.date(),
                day.extracted_count(),
                day.transformed_count(),
                day.loaded_count(),
                day.duration().as_millis()
            ),
            Some(failure) => println!(
                "{}: FAILED at {}: {}",
                day.date(),
                failure.stage(),
                failure.error()
            ),
        }
    }
    println!("{}", report.summary);
}
