// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Error System
//!
//! This module provides the error type shared by every layer of the daybatch
//! driver. Each variant represents one failure family the pipeline can
//! encounter, from CLI input problems through extractor, transformer, loader,
//! and validation failures, down to cancellation and timeouts.
//!
//! ## Error Categories
//!
//! - **InvalidInput** - bad CLI arguments or an inverted date range
//! - **InvalidConfiguration** - missing or unparseable configuration,
//!   unregistered extractors/transformers, unknown target tables
//! - **LockContention** - the process lock is held by another run
//! - **SourceError** - any extractor-side failure (connect, list,
//!   download, parse)
//! - **TransformError** - any transformer-side failure
//! - **LoadError** - store connect, script execution, or batch insert
//!   failure
//! - **ValidationFailed** - rule failure: stored counts disagree with the
//!   stage counters (carries the individual rule messages)
//! - **ValidationSystem** - the validation query itself could not execute;
//!   kept distinct from rule failure
//! - **MissingDependency** - a stage pre-check found the context in an
//!   unexpected shape (e.g. Validate without a store connection)
//! - **TimeoutError / Cancelled** - the stage deadline fired or the run
//!   was interrupted
//!
//! Cleanup problems are deliberately *not* an error variant: the cleaner
//! logs warnings and never fails a day whose earlier stages passed.
//!
//! ## Recovery
//!
//! The driver performs no automatic retry. Errors propagate from the stage
//! that produced them through the daily pipeline to the range orchestrator,
//! which halts the run and reports the first failing date.

use thiserror::Error;

/// Domain-specific errors for the daybatch ETL driver.
///
/// Every variant carries a human-readable message. Stage attribution is not
/// encoded here; the daily pipeline wraps errors into
/// [`StageFailure`](crate::entities::StageFailure) records that name the
/// stage alongside the cause.
#[derive(Error, Debug, Clone)]
pub enum EtlError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Concurrent run rejected: {0}")]
    LockContention(String),

    #[error("Source error: {0}")]
    SourceError(String),

    #[error("Transform error: {0}")]
    TransformError(String),

    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Validation query error: {0}")]
    ValidationSystem(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Store error: {0}")]
    StoreError(String),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl EtlError {
    /// Creates a new input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates a new configuration error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Creates a new source error
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::SourceError(msg.into())
    }

    /// Creates a new transform error
    pub fn transform_error(msg: impl Into<String>) -> Self {
        Self::TransformError(msg.into())
    }

    /// Creates a new load error
    pub fn load_error(msg: impl Into<String>) -> Self {
        Self::LoadError(msg.into())
    }

    /// Creates a new store error
    pub fn store_error(msg: impl Into<String>) -> Self {
        Self::StoreError(msg.into())
    }

    /// Creates a new missing-dependency error
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    /// Creates a new timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::TimeoutError(msg.into())
    }

    /// Creates a new cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Creates a new internal error
    pub fn internal_error(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    /// Checks whether this error is a validation *rule* failure, as opposed
    /// to a validation query that could not execute.
    pub fn is_rule_failure(&self) -> bool {
        matches!(self, EtlError::ValidationFailed(_))
    }

    /// Gets the error category used in event logs and exit-code mapping
    pub fn category(&self) -> &'static str {
        match self {
            EtlError::InvalidInput(_) => "input",
            EtlError::InvalidConfiguration(_) => "configuration",
            EtlError::LockContention(_) => "concurrency",
            EtlError::SourceError(_) => "source",
            EtlError::TransformError(_) => "transform",
            EtlError::LoadError(_) => "load",
            EtlError::ValidationFailed(_) => "validation",
            EtlError::ValidationSystem(_) => "validation-system",
            EtlError::MissingDependency(_) => "dependency",
            EtlError::StoreError(_) => "store",
            EtlError::IoError(_) => "io",
            EtlError::SerializationError(_) => "serialization",
            EtlError::TimeoutError(_) => "timeout",
            EtlError::Cancelled(_) => "cancellation",
            EtlError::InternalError(_) => "internal",
        }
    }
}

// Implement conversion from standard library errors
impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        EtlError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        EtlError::SerializationError(err.to_string())
    }
}
