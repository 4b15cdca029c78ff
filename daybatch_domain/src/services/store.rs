// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Store Port
//!
//! The analytical-store surface the loader, validator, and cleaner share.
//! A [`StoreDriver`] is the registered factory for its store type; a
//! [`StoreConnection`] is the opaque handle Load opens, Validate reads
//! through, and Clean closes. Access is strictly sequential by stage order,
//! so the connection needs no internal locking for the pipeline's sake.
//!
//! The driver makes no transactional promise: a failed batch insert fails
//! the load stage and nothing is rolled back. Whatever atomicity exists is
//! the store's own business.

use crate::error::EtlError;
use crate::records::ColumnarBatch;
use crate::settings::TargetSettings;
use async_trait::async_trait;

/// An open connection to the analytical store.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    /// Executes a DDL/utility script, e.g. to materialize target tables
    async fn execute_script(&self, script: &str) -> Result<(), EtlError>;

    /// Inserts one columnar batch into a table. The batch's column vectors
    /// arrive in the target model's declared `column_order`.
    async fn insert_batch(&self, batch: &ColumnarBatch) -> Result<(), EtlError>;

    /// Runs a single scalar select, returning the value as an integer
    async fn run_scalar_query(&self, query: &str) -> Result<i64, EtlError>;

    /// Closes the connection. Idempotent: closing twice is a no-op.
    async fn close(&mut self) -> Result<(), EtlError>;
}

/// Factory for connections to one store type.
#[async_trait]
pub trait StoreDriver: Send + Sync {
    /// The store type identifier this driver registers under
    fn store_type(&self) -> &str;

    /// Opens a connection using the configured target options
    async fn connect(
        &self,
        target: &TargetSettings,
    ) -> Result<Box<dyn StoreConnection>, EtlError>;
}
