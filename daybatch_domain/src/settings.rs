// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resolved Run Settings
//!
//! The configuration shape the pipeline actually consumes. Parsing the INI
//! file (and validating its raw field values) is infrastructure business;
//! by the time a [`RunSettings`] exists, every value in it is usable as-is.
//! The context carries these settings through the day, so the stages never
//! re-read configuration from disk.

use crate::value_objects::{BatchSize, MemoryBudget};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default per-file size ceiling for object-storage sources: 100 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default global extract timeout: 1800 seconds
pub const DEFAULT_EXTRACT_TIMEOUT: Duration = Duration::from_secs(1800);

/// Default loader sort field
pub const DEFAULT_SORT_FIELD: &str = "receiveTime";

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub sources: Vec<SourceSettings>,
    pub target: TargetSettings,
    pub loader: LoaderSettings,
    pub validation: ValidationSettings,
    /// Root for per-day scratch directories and sort spill files
    pub scratch_root: PathBuf,
    /// Application directory holding the lock file
    pub app_dir: PathBuf,
}

/// One configured source.
///
/// `source_type` selects the extractor factory in the registry; the
/// optional `object_store` / `db` blocks carry the connector-specific
/// options, and `properties` passes through anything the concrete
/// extractor wants beyond them.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub name: String,
    pub source_type: String,
    pub connection_string: Option<String>,
    pub category: String,
    pub properties: HashMap<String, String>,
    pub sql_template: Option<String>,
    pub db: Option<DbSourceSettings>,
    pub object_store: Option<ObjectStoreSettings>,
}

/// Connection options for database-style sources.
#[derive(Debug, Clone)]
pub struct DbSourceSettings {
    pub url: String,
    pub user: String,
    pub password: String,
}

/// Connection and listing options for object-storage-style sources.
#[derive(Debug, Clone)]
pub struct ObjectStoreSettings {
    pub bucket: String,
    pub region: String,
    pub endpoint: String,
    pub prefix: String,
    pub secret_id: String,
    pub secret_key: String,
    /// Per-file size ceiling; any listed object above this fails the source
    pub max_file_size: u64,
}

impl ObjectStoreSettings {
    pub fn with_defaults(bucket: String, region: String, endpoint: String) -> Self {
        Self {
            bucket,
            region,
            endpoint,
            prefix: String::new(),
            secret_id: String::new(),
            secret_key: String::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// The configured analytical store target.
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Selects the store driver in the registry
    pub store_type: String,
    /// `host:port` form
    pub connection_string: String,
    pub batch_size: BatchSize,
    pub properties: HashMap<String, String>,
}

/// Loader tuning knobs.
#[derive(Debug, Clone)]
pub struct LoaderSettings {
    pub sort_field: String,
    pub memory_budget: MemoryBudget,
    /// Fixed per-record byte estimate used for the spill decision
    pub record_size_estimate: u64,
    /// Global extract-stage timeout
    pub timeout: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            memory_budget: MemoryBudget::default(),
            record_size_estimate: crate::value_objects::memory_budget::DEFAULT_RECORD_SIZE_ESTIMATE,
            timeout: DEFAULT_EXTRACT_TIMEOUT,
        }
    }
}

/// One enabled validation rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationRule {
    /// Stored row count must equal the transformed and extracted counters
    CountMatch,
}

/// The enabled validation rule set.
#[derive(Debug, Clone)]
pub struct ValidationSettings {
    pub rules: Vec<ValidationRule>,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            rules: vec![ValidationRule::CountMatch],
        }
    }
}
