// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Logging Initialization
//!
//! Installs the global tracing subscriber. Events are emitted as JSON
//! records carrying the observability contract's fields (`timestamp`,
//! `level`, `category`, `event`, counters, `duration_ms`,
//! `error_details`); the stage code supplies those fields on each event,
//! this module only decides format and level.
//!
//! `--verbose` switches the default level from INFO to DEBUG;
//! `DAYBATCH_LOG` overrides both with a full `EnvFilter` directive when
//! operators need targeted filtering.

use tracing_subscriber::EnvFilter;

/// Environment variable consulted for a full filter directive
pub const LOG_FILTER_ENV: &str = "DAYBATCH_LOG";

/// Installs the global JSON subscriber.
///
/// Safe to call once per process; a second call is ignored so tests that
/// share a process can each attempt initialization.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_span_list(false)
        .finish();

    // Ignore AlreadyInit: the first initializer wins
    let _ = tracing::subscriber::set_global_default(subscriber);
}
