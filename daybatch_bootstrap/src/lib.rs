// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Bootstrap Module
//!
//! The bootstrap module sits **outside** the application layers (domain,
//! application, infrastructure) and owns the entry-point concerns:
//!
//! - **Argument parsing** - CLI parsing and date-format validation
//! - **Exit codes** - the committed 0/1/2/3/4/5 mapping
//! - **Process lock** - the exclusive `.etl.lock` guaranteeing at most
//!   one concurrent run per installation
//! - **Signal handling** - SIGINT/SIGTERM propagated as cancellation
//! - **Shutdown coordination** - cancellation token + grace period
//! - **Logging init** - structured JSON event output via tracing
//!
//! ## Key Design Principles
//!
//! 1. **Separation from application layers** - bootstrap may reach into
//!    every layer; no layer reaches back into bootstrap.
//! 2. **Fail before work** - lock contention, bad dates, and unreadable
//!    configuration are all decided before the first stage runs.
//! 3. **Release on every exit path** - the process lock is tied to an
//!    owned file handle and released on drop, including on panic and
//!    signal-driven shutdown.
//!
//! ## Module Structure
//!
//! - `cli` - clap parser and validated argument set
//! - `exit_code` - process exit code enumeration and mapping
//! - `process_lock` - exclusive advisory file lock
//! - `shutdown` - cancellation token, coordinator, signal wiring
//! - `logger` - tracing subscriber initialization

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod process_lock;
pub mod shutdown;

// Re-export commonly used types
pub use cli::{parse_and_validate, ValidatedCli};
pub use exit_code::ExitCode;
pub use process_lock::ProcessLock;
pub use shutdown::{CancellationToken, ShutdownCoordinator};
