// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Registries
//!
//! Startup-built tables mapping configuration tags to implementations:
//!
//! - [`ExtractorRegistry`]: source-config `type` -> factory yielding a
//!   *fresh* extractor per task (extractors keep per-run state)
//! - [`TransformerRegistry`]: source-model tag -> *shared* stateless
//!   transformer
//! - [`StoreRegistry`]: target `type` -> store driver
//!
//! Lookups are lazy: an unregistered key fails with a configuration error
//! at the point of use, not at startup. A config naming an unknown source
//! type therefore fails the extract stage of the first day, which is the
//! committed behavior for config problems discovered mid-run.

use daybatch_domain::services::Extractor;
use daybatch_domain::settings::SourceSettings;
use daybatch_domain::{EtlError, SourceModel, StoreDriver, Transformer};
use std::collections::HashMap;
use std::sync::Arc;

use crate::infrastructure::extractors::object_store::{FsObjectStoreClient, ObjectStoreExtractor};
use crate::infrastructure::stores::memory::MemoryStoreDriver;
use crate::infrastructure::transformers::{QuoteTransformer, TradeTransformer};

/// Factory producing a fresh extractor for one task.
///
/// Factories may reject a configuration they cannot serve (for example an
/// object-store endpoint scheme with no client available); that surfaces
/// as a configuration error at use.
pub type ExtractorFactory =
    Arc<dyn Fn(&SourceSettings) -> Result<Box<dyn Extractor>, EtlError> + Send + Sync>;

/// Maps source-config types to extractor factories.
#[derive(Default)]
pub struct ExtractorRegistry {
    factories: HashMap<String, ExtractorFactory>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under a source-config type
    pub fn register(&mut self, source_type: impl Into<String>, factory: ExtractorFactory) {
        self.factories.insert(source_type.into(), factory);
    }

    /// Resolves the factory for a source and creates a fresh extractor.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] for an unregistered
    /// source type, or whatever the factory itself rejects.
    pub fn create(&self, settings: &SourceSettings) -> Result<Box<dyn Extractor>, EtlError> {
        let factory = self.factories.get(&settings.source_type).ok_or_else(|| {
            EtlError::invalid_config(format!(
                "source '{}' names unregistered extractor type '{}'",
                settings.name, settings.source_type
            ))
        })?;
        factory(settings)
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

/// Maps source-model tags to shared transformers.
#[derive(Default)]
pub struct TransformerRegistry {
    by_model: HashMap<SourceModel, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transformer under its declared source model
    pub fn register(&mut self, transformer: Arc<dyn Transformer>) {
        self.by_model.insert(transformer.source_model(), transformer);
    }

    /// Resolves the transformer for a source model.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::TransformError`] when no transformer is
    /// registered for the model; the transform engine fails that bucket's
    /// task with it.
    pub fn get(&self, model: SourceModel) -> Result<Arc<dyn Transformer>, EtlError> {
        self.by_model.get(&model).cloned().ok_or_else(|| {
            EtlError::transform_error(format!(
                "no transformer registered for source model '{}'",
                model
            ))
        })
    }
}

/// Maps target store types to drivers.
#[derive(Default)]
pub struct StoreRegistry {
    drivers: HashMap<String, Arc<dyn StoreDriver>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: Arc<dyn StoreDriver>) {
        self.drivers.insert(driver.store_type().to_string(), driver);
    }

    /// Resolves the driver for a target store type.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] for an unregistered
    /// store type.
    pub fn get(&self, store_type: &str) -> Result<Arc<dyn StoreDriver>, EtlError> {
        self.drivers.get(store_type).cloned().ok_or_else(|| {
            EtlError::invalid_config(format!(
                "target names unregistered store type '{}'",
                store_type
            ))
        })
    }
}

/// The full registry set one run works against.
#[derive(Clone)]
pub struct Registries {
    pub extractors: Arc<ExtractorRegistry>,
    pub transformers: Arc<TransformerRegistry>,
    pub stores: Arc<StoreRegistry>,
}

impl Registries {
    /// Builds the standard production registrations: the object-store
    /// extractor over the filesystem client, the trade and quote
    /// transformers, and the in-memory store driver.
    pub fn standard() -> Self {
        let mut extractors = ExtractorRegistry::new();
        extractors.register(
            "object_store",
            Arc::new(|settings: &SourceSettings| {
                let client = FsObjectStoreClient::from_settings(settings)?;
                ObjectStoreExtractor::from_settings(settings, Arc::new(client))
                    .map(|e| Box::new(e) as Box<dyn Extractor>)
            }),
        );

        let mut transformers = TransformerRegistry::new();
        transformers.register(Arc::new(TradeTransformer::new()));
        transformers.register(Arc::new(QuoteTransformer::new()));

        let mut stores = StoreRegistry::new();
        stores.register(Arc::new(MemoryStoreDriver::new()));

        Self {
            extractors: Arc::new(extractors),
            transformers: Arc::new(transformers),
            stores: Arc::new(stores),
        }
    }
}
