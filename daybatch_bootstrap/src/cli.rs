// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # CLI Parsing and Validation
//!
//! Parses the invocation surface and validates argument *formats* before
//! the core runs. Range ordering (`from <= to`) is deliberately not
//! checked here: it is a business rule the range orchestrator owns, so it
//! lives next to the iteration it guards.
//!
//! ```text
//! daybatch --from 20250101 --to 20250103 --config /etc/daybatch.ini
//! ```
//!
//! Clap handles `--help` and `--version` itself and exits the process
//! before validation runs.

use clap::Parser;
use daybatch_domain::{BusinessDate, EtlError};
use std::path::PathBuf;

/// Raw clap surface.
#[derive(Parser, Debug)]
#[command(
    name = "daybatch",
    version,
    about = "Batch ETL driver: runs the daily extract/transform/load/validate/clean pipeline over a date range"
)]
pub struct Cli {
    /// First business date to process, inclusive (YYYYMMDD)
    #[arg(long, value_name = "YYYYMMDD")]
    pub from: String,

    /// Last business date to process, inclusive (YYYYMMDD)
    #[arg(long, value_name = "YYYYMMDD")]
    pub to: String,

    /// Path to the INI configuration file
    #[arg(long, value_name = "PATH")]
    pub config: PathBuf,

    /// Enable debug-level logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Arguments after format validation.
#[derive(Debug, Clone)]
pub struct ValidatedCli {
    pub from: BusinessDate,
    pub to: BusinessDate,
    pub config: PathBuf,
    pub verbose: bool,
}

/// Parses the process arguments and validates date formats.
///
/// # Errors
///
/// Returns [`EtlError::InvalidInput`] when a date flag is not a real
/// `YYYYMMDD` date.
pub fn parse_and_validate() -> Result<ValidatedCli, EtlError> {
    validate(Cli::parse())
}

/// Parses an explicit argument list. Used by tests.
pub fn parse_and_validate_from<I, T>(args: I) -> Result<ValidatedCli, EtlError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::try_parse_from(args)
        .map_err(|e| EtlError::invalid_input(e.to_string()))?;
    validate(cli)
}

fn validate(cli: Cli) -> Result<ValidatedCli, EtlError> {
    let from = BusinessDate::parse_compact(&cli.from)
        .map_err(|e| EtlError::invalid_input(format!("--from: {}", e)))?;
    let to = BusinessDate::parse_compact(&cli.to)
        .map_err(|e| EtlError::invalid_input(format!("--to: {}", e)))?;
    Ok(ValidatedCli {
        from,
        to,
        config: cli.config,
        verbose: cli.verbose,
    })
}
