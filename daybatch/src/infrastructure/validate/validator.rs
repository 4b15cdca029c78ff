// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Validator
//!
//! Decides the day's verdict by comparing what the store actually holds
//! against the stage counters. The count query filters each routed table
//! on its business-date column using the `yyyy.MM.dd` literal and sums
//! across tables; the sum must equal both `transformed_count` and
//! `extracted_count`.
//!
//! Two failure families stay distinct:
//!
//! - **rule failure** - counts disagree; the verdict is false and the
//!   stage fails with the collected messages
//! - **system failure** - the query itself could not execute; the stage
//!   fails without settling a verdict, because nothing was decided
//!
//! The validator reads through the same connection the loader attached
//! to the context; it opens nothing of its own.

use daybatch_domain::settings::ValidationRule;
use daybatch_domain::{DataType, EtlContext, EtlError};
use tracing::{debug, warn};

use crate::infrastructure::load::table_router::TableRouter;

/// The validate stage implementation.
#[derive(Debug, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Runs the enabled rules and settles `validation_passed`.
    pub async fn run(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let date_literal = ctx.business_date().store_literal();
        let router = TableRouter::from_target(&ctx.settings().target);
        let rules = ctx.settings().validation.rules.clone();

        // Query phase: immutable borrow of the attached connection
        let store_total = {
            let connection = ctx.store().ok_or_else(|| {
                EtlError::missing_dependency("validate requires the store connection opened by load")
            })?;

            let mut total: i64 = 0;
            for data_type in DataType::all() {
                let table = router.route(*data_type)?;
                let query = format!(
                    "select count(*) from {} where {} = {}",
                    table,
                    data_type.date_column(),
                    date_literal
                );
                let count = connection
                    .run_scalar_query(&query)
                    .await
                    .map_err(|err| {
                        EtlError::ValidationSystem(format!(
                            "count query on '{}' failed: {}",
                            table, err
                        ))
                    })?;
                debug!(
                    category = "validate",
                    event = "table_counted",
                    table = %table,
                    count,
                    "{} holds {} rows for {}",
                    table,
                    count,
                    date_literal
                );
                total += count;
            }
            total
        };

        for rule in rules {
            match rule {
                ValidationRule::CountMatch => {
                    let transformed = ctx.transformed_count() as i64;
                    let extracted = ctx.extracted_count() as i64;
                    if store_total != transformed {
                        ctx.add_validation_error(format!(
                            "store={}, expected(transformed)={}",
                            store_total, transformed
                        ));
                    }
                    if store_total != extracted {
                        ctx.add_validation_error(format!(
                            "store={}, expected(extracted)={}",
                            store_total, extracted
                        ));
                    }
                }
            }
        }

        if ctx.finalize_validation() {
            Ok(())
        } else {
            let errors = ctx.validation_errors().to_vec();
            warn!(
                category = "validate",
                event = "verdict_failed",
                failure_count = errors.len(),
                error_details = %errors.join("; "),
                "validation failed"
            );
            Err(EtlError::ValidationFailed(errors))
        }
    }
}
