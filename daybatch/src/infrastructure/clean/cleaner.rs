// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Cleaner
//!
//! Releases the day's resources: deletes every registered scratch file
//! and closes the store connection when one is attached. Cleanup never
//! fails a day - missing or undeletable files and a failing close are
//! logged as warnings and swallowed.
//!
//! The same routine serves both exits: the normal Clean stage after a
//! successful Validate, and the best-effort cleanup the pipeline runs
//! when an earlier stage failed. It is idempotent - the context's
//! temp-file list and connection slot drain on first use, so a second
//! invocation finds nothing to do.

use daybatch_domain::EtlContext;
use tracing::{debug, warn};

/// The clean stage implementation.
#[derive(Debug, Default)]
pub struct Cleaner;

impl Cleaner {
    pub fn new() -> Self {
        Self
    }

    /// Deletes temp files, closes the store connection if present, and
    /// marks cleanup performed. Infallible by contract.
    pub async fn run(&self, ctx: &mut EtlContext) {
        let date = ctx.business_date();
        let paths = ctx.take_temp_files();
        let mut removed = 0usize;
        for path in &paths {
            match tokio::fs::remove_file(path).await {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    debug!(
                        category = "clean",
                        event = "temp_file_already_gone",
                        "{} was already removed",
                        path.display()
                    );
                }
                Err(err) => {
                    warn!(
                        category = "clean",
                        event = "temp_file_unremovable",
                        error_details = %err,
                        "could not remove {}",
                        path.display()
                    );
                }
            }
        }

        if let Some(mut connection) = ctx.take_store() {
            if let Err(err) = connection.close().await {
                warn!(
                    category = "clean",
                    event = "store_close_failed",
                    error_details = %err,
                    "store connection close failed"
                );
            }
        }

        ctx.mark_cleanup_performed();
        debug!(
            category = "clean",
            event = "stage_finished",
            business_date = %date,
            total_records = paths.len(),
            "removed {}/{} temp files",
            removed,
            paths.len()
        );
    }
}
