// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Extractor Port
//!
//! The contract every source connector implements, plus the per-task
//! context the extract engine hands to it.
//!
//! ## Lifecycle
//!
//! An extractor exposes a four-step lifecycle:
//!
//! ```text
//! setup -> validate -> extract -> cleanup
//! ```
//!
//! The lifecycle is total: `cleanup` runs on *every* exit path - success,
//! failure, and cancellation - and the concurrent engine invokes it exactly
//! once per task. Implementations must keep `cleanup` idempotent and safe
//! to call after any earlier step failed.
//!
//! ## Ordering
//!
//! The records returned by `extract` are in the source's declared emission
//! order; the engine preserves that order within the source and makes no
//! promise across sources.

use crate::error::EtlError;
use crate::records::SourceRecord;
use crate::settings::SourceSettings;
use crate::value_objects::BusinessDate;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Serialized sink for scratch-file paths created by concurrent extract
/// tasks.
///
/// Extract workers download into distinct per-file paths but register every
/// path here; the engine drains the registry into the context's temp-file
/// list at the single-threaded join point, which is what keeps the context
/// single-writer.
#[derive(Debug, Clone, Default)]
pub struct TempFileRegistry {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl TempFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one scratch file for end-of-day cleanup
    pub fn register(&self, path: PathBuf) {
        let mut paths = self
            .paths
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        paths.push(path);
    }

    /// Drains all registered paths, leaving the registry empty
    pub fn drain(&self) -> Vec<PathBuf> {
        let mut paths = self
            .paths
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        std::mem::take(&mut *paths)
    }

    /// Number of currently registered paths
    pub fn len(&self) -> usize {
        self.paths
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Everything one extract task needs: the business date, its source's
/// settings, the scratch root, and the shared temp-file registry.
#[derive(Debug, Clone)]
pub struct SourceContext {
    business_date: BusinessDate,
    settings: SourceSettings,
    scratch_root: PathBuf,
    temp_files: TempFileRegistry,
}

impl SourceContext {
    pub fn new(
        business_date: BusinessDate,
        settings: SourceSettings,
        scratch_root: PathBuf,
        temp_files: TempFileRegistry,
    ) -> Self {
        Self {
            business_date,
            settings,
            scratch_root,
            temp_files,
        }
    }

    pub fn business_date(&self) -> BusinessDate {
        self.business_date
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }

    pub fn temp_files(&self) -> &TempFileRegistry {
        &self.temp_files
    }

    /// Scratch directory for this date and category:
    /// `{scratch_root}/{YYYY-MM-DD}/{category}/`
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_root
            .join(self.business_date.fs_segment())
            .join(&self.settings.category)
    }

    /// Object listing prefix for this date and category:
    /// `{category}/{YYYY-MM-DD}/`
    pub fn object_prefix(&self) -> String {
        format!(
            "{}/{}/",
            self.settings.category,
            self.business_date.fs_segment()
        )
    }
}

/// A source connector.
///
/// One instance serves exactly one task on one day; the registry hands the
/// engine a fresh extractor per use, so implementations may keep mutable
/// per-run state without synchronization.
#[async_trait]
pub trait Extractor: Send {
    /// Short name for logs and error messages
    fn name(&self) -> &str;

    /// Source category; also the first segment of listing prefixes
    fn category(&self) -> &str;

    /// Acquires connections and prepares scratch space
    async fn setup(&mut self, ctx: &SourceContext) -> Result<(), EtlError>;

    /// Verifies the source is usable before extraction starts
    async fn validate(&self, ctx: &SourceContext) -> Result<(), EtlError>;

    /// Produces this source's records in declared emission order
    async fn extract(&mut self, ctx: &SourceContext) -> Result<Vec<SourceRecord>, EtlError>;

    /// Releases whatever `setup`/`extract` acquired. Must be idempotent
    /// and safe after any failure; never fails the task.
    async fn cleanup(&mut self);
}

/// Listing entry returned by an object-storage client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
}

/// Minimal object-storage surface the object-store extractor needs.
///
/// Real implementations wrap a vendor SDK; tests script listings and
/// downloads in memory.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    /// Lists objects under a prefix, in the store's listing order
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, EtlError>;

    /// Downloads one object to a local path, returning the byte count
    async fn download(&self, key: &str, dest: &Path) -> Result<u64, EtlError>;
}

/// Minimal SQL surface the database extractor needs: execute a rendered
/// statement, iterate the cursor, hand rows back as JSON objects.
#[async_trait]
pub trait SqlSourceClient: Send + Sync {
    async fn query(
        &self,
        sql: &str,
    ) -> Result<Vec<serde_json::Map<String, serde_json::Value>>, EtlError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SourceSettings;
    use std::collections::HashMap;

    fn settings(category: &str) -> SourceSettings {
        SourceSettings {
            name: "test".to_string(),
            source_type: "scripted".to_string(),
            connection_string: None,
            category: category.to_string(),
            properties: HashMap::new(),
            sql_template: None,
            db: None,
            object_store: None,
        }
    }

    #[test]
    fn test_scratch_dir_and_prefix_layout() {
        let ctx = SourceContext::new(
            BusinessDate::from_ymd(2025, 1, 2).unwrap(),
            settings("ticks"),
            PathBuf::from("/tmp/scratch"),
            TempFileRegistry::new(),
        );
        assert_eq!(
            ctx.scratch_dir(),
            PathBuf::from("/tmp/scratch/2025-01-02/ticks")
        );
        assert_eq!(ctx.object_prefix(), "ticks/2025-01-02/");
    }

    #[test]
    fn test_temp_file_registry_serializes_and_drains() {
        let registry = TempFileRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.register(PathBuf::from(format!("/tmp/f{}", i)));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
        let drained = registry.drain();
        assert_eq!(drained.len(), 8);
        assert!(registry.is_empty());
    }
}
