// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! The committed process exit codes:
//!
//! - **0** - success
//! - **1** - input error (CLI arguments, inverted date range)
//! - **2** - concurrent execution rejected (lock held)
//! - **3** - ETL failure (any stage, any day)
//! - **4** - malformed configuration
//! - **5** - unexpected error
//!
//! Configuration problems map to 4 only when they surface at parse time,
//! before any day runs; a config problem discovered mid-run (say, an
//! unregistered transformer) failed a day and is therefore a 3. That split
//! is why startup errors and run outcomes map through separate functions.

use daybatch_domain::{EtlError, RunSummary};
use std::fmt;

/// Process exit codes for the daybatch CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful run (0)
    #[default]
    Success = 0,

    /// Invalid CLI input or date range (1)
    InputError = 1,

    /// Another run holds the process lock (2)
    LockHeld = 2,

    /// A stage failed on some day (3)
    EtlFailure = 3,

    /// Missing or unparseable configuration (4)
    ConfigError = 4,

    /// Anything the other codes do not cover (5)
    Unexpected = 5,
}

impl ExitCode {
    /// Convert to i32 for use with std::process::exit
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Maps an error raised *before* the orchestrator started: argument
    /// parsing, lock acquisition, configuration loading.
    pub fn from_startup_error(error: &EtlError) -> Self {
        match error {
            EtlError::InvalidInput(_) => ExitCode::InputError,
            EtlError::LockContention(_) => ExitCode::LockHeld,
            EtlError::InvalidConfiguration(_) => ExitCode::ConfigError,
            _ => ExitCode::Unexpected,
        }
    }

    /// Maps the orchestrator's aggregate outcome
    pub fn from_run_summary(summary: &RunSummary) -> Self {
        if summary.is_success() {
            ExitCode::Success
        } else {
            ExitCode::EtlFailure
        }
    }

    /// Get human-readable description of exit code
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::InputError => "Invalid input or date range",
            ExitCode::LockHeld => "Concurrent execution rejected",
            ExitCode::EtlFailure => "ETL stage failure",
            ExitCode::ConfigError => "Malformed configuration",
            ExitCode::Unexpected => "Unexpected error",
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.description())
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}
