// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Object-Storage Extractor
//!
//! The bucket-style source protocol:
//!
//! 1. list objects under `{category}/{YYYY-MM-DD}/`
//! 2. enforce the per-file size ceiling - one oversized object fails the
//!    whole source before anything downloads
//! 3. download each object into `{scratch}/{YYYY-MM-DD}/{category}/`,
//!    registering every path for end-of-day cleanup
//! 4. stream-parse each file into model records
//! 5. concatenate in listing order and hand the records back
//!
//! One parse failure fails the source. The extractor is generic over the
//! [`ObjectStoreClient`] port; [`FsObjectStoreClient`] serves `file://`
//! endpoints for local runs and tests, and vendor SDK clients slot in
//! through the same port.

use async_trait::async_trait;
use daybatch_domain::services::extractor::{ObjectInfo, ObjectStoreClient, SourceContext};
use daybatch_domain::services::Extractor;
use daybatch_domain::settings::{ObjectStoreSettings, SourceSettings};
use daybatch_domain::{EtlError, SourceRecord};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::extractors::parser::LineRecordParser;

/// Extractor for object-storage-style sources.
pub struct ObjectStoreExtractor {
    name: String,
    category: String,
    options: ObjectStoreSettings,
    parser: LineRecordParser,
    client: Arc<dyn ObjectStoreClient>,
}

impl ObjectStoreExtractor {
    /// Builds the extractor from a source's settings and a client.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] when the source lacks
    /// an object-store block or a parsable `model` property.
    pub fn from_settings(
        settings: &SourceSettings,
        client: Arc<dyn ObjectStoreClient>,
    ) -> Result<Self, EtlError> {
        let options = settings.object_store.clone().ok_or_else(|| {
            EtlError::invalid_config(format!(
                "source '{}' is object_store-typed but has no cos options",
                settings.name
            ))
        })?;
        let parser = LineRecordParser::from_properties(&settings.properties)?;
        Ok(Self {
            name: settings.name.clone(),
            category: settings.category.clone(),
            options,
            parser,
            client,
        })
    }
}

#[async_trait]
impl Extractor for ObjectStoreExtractor {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> &str {
        &self.category
    }

    async fn setup(&mut self, ctx: &SourceContext) -> Result<(), EtlError> {
        tokio::fs::create_dir_all(ctx.scratch_dir())
            .await
            .map_err(|err| {
                EtlError::source_error(format!(
                    "cannot create scratch dir {}: {}",
                    ctx.scratch_dir().display(),
                    err
                ))
            })
    }

    async fn validate(&self, _ctx: &SourceContext) -> Result<(), EtlError> {
        if self.category.is_empty() {
            return Err(EtlError::invalid_config(format!(
                "source '{}' has an empty category",
                self.name
            )));
        }
        if self.options.max_file_size == 0 {
            return Err(EtlError::invalid_config(format!(
                "source '{}' has a zero max file size",
                self.name
            )));
        }
        Ok(())
    }

    async fn extract(&mut self, ctx: &SourceContext) -> Result<Vec<SourceRecord>, EtlError> {
        let prefix = ctx.object_prefix();
        let objects = self.client.list_objects(&prefix).await?;
        debug!(
            category = "extract",
            event = "objects_listed",
            source = %self.name,
            source_count = objects.len(),
            "{} objects under {}",
            objects.len(),
            prefix
        );

        // Ceiling check before any download: one oversized file fails the source
        for object in &objects {
            if object.size > self.options.max_file_size {
                return Err(EtlError::source_error(format!(
                    "object '{}' is {} bytes, over the {} byte ceiling",
                    object.key, object.size, self.options.max_file_size
                )));
            }
        }

        let scratch = ctx.scratch_dir();
        let mut records = Vec::new();
        for object in &objects {
            let dest = scratch.join(sanitized_file_name(&object.key, &prefix));
            self.client.download(&object.key, &dest).await?;
            ctx.temp_files().register(dest.clone());

            let parser = self.parser.clone();
            let parsed = tokio::task::spawn_blocking(move || parser.parse_file(&dest))
                .await
                .map_err(|err| {
                    EtlError::internal_error(format!("parse worker died: {}", err))
                })??;
            records.extend(parsed);
        }
        Ok(records)
    }

    async fn cleanup(&mut self) {
        // Downloads are the day's temp files and belong to the Clean
        // stage; the extractor itself holds nothing to release.
    }
}

/// Flattens an object key into a scratch file name, keeping the part
/// below the listing prefix and replacing path separators.
fn sanitized_file_name(key: &str, prefix: &str) -> String {
    let below = key.strip_prefix(prefix).unwrap_or(key);
    below.replace('/', "_")
}

/// `file://` client: an object store rooted at a local directory, used
/// by local runs and the integration suite. Listing order is name order,
/// which makes emission order deterministic.
pub struct FsObjectStoreClient {
    root: PathBuf,
}

impl FsObjectStoreClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Builds the client from a source's endpoint, accepting only
    /// `file://` endpoints.
    pub fn from_settings(settings: &SourceSettings) -> Result<Self, EtlError> {
        let endpoint = settings
            .object_store
            .as_ref()
            .map(|os| os.endpoint.as_str())
            .unwrap_or_default();
        match endpoint.strip_prefix("file://") {
            Some(root) if !root.is_empty() => Ok(Self::new(root)),
            _ => Err(EtlError::invalid_config(format!(
                "source '{}': unsupported object-store endpoint '{}' (expected file://<dir>)",
                settings.name, endpoint
            ))),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for FsObjectStoreClient {
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectInfo>, EtlError> {
        let dir = self.root.join(prefix);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            // An absent prefix is an empty listing, not an error
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                return Err(EtlError::source_error(format!(
                    "cannot list {}: {}",
                    dir.display(),
                    err
                )))
            }
        };

        let mut objects = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|err| {
            EtlError::source_error(format!("listing {} failed: {}", dir.display(), err))
        })? {
            let metadata = entry.metadata().await.map_err(|err| {
                EtlError::source_error(format!("stat failed: {}", err))
            })?;
            if metadata.is_file() {
                objects.push(ObjectInfo {
                    key: format!("{}{}", prefix, entry.file_name().to_string_lossy()),
                    size: metadata.len(),
                });
            }
        }
        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    async fn download(&self, key: &str, dest: &Path) -> Result<u64, EtlError> {
        tokio::fs::copy(self.root.join(key), dest)
            .await
            .map_err(|err| {
                EtlError::source_error(format!("download of '{}' failed: {}", key, err))
            })
    }
}
