// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Entities
//!
//! Mutable objects with identity across a run: the per-day [`EtlContext`]
//! the stages read and write, and the result aggregates ([`DayResult`],
//! [`RunSummary`]) the orchestrator reports.

pub mod day_result;
pub mod etl_context;

pub use day_result::{DayResult, FirstFailure, RunSummary, StageFailure};
pub use etl_context::{EtlContext, Stage};
