// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Columnar Loader
//!
//! Delivers the day's transformed records into the analytical store:
//!
//! 1. **Sort** by the configured key (default `receiveTime`, ascending,
//!    stable). The algorithm is picked by estimated size - `records x
//!    record_size_estimate` bytes against the memory budget - choosing
//!    the in-memory stable sort or the external K-way merge.
//! 2. **Route** each record's `data_type` to its table.
//! 3. **Pivot** rows into per-column vectors in declared `column_order`.
//! 4. **Insert** per-table batches of `batchSize` rows through the store
//!    port. A failed batch fails the stage; nothing is rolled back -
//!    transactional semantics are the store's own affair.
//!
//! The store connection opened here is attached to the context: Validate
//! reads through it, Clean closes it.

use daybatch_domain::{ColumnarBatch, EtlContext, EtlError, StoreConnection, TargetRecord};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

use crate::infrastructure::load::external_sort::{sort_in_memory, ExternalSorter};
use crate::infrastructure::load::table_router::TableRouter;
use crate::infrastructure::logging::events;
use crate::infrastructure::registries::StoreRegistry;

/// The load stage implementation.
pub struct ColumnarLoader {
    stores: Arc<StoreRegistry>,
}

impl ColumnarLoader {
    pub fn new(stores: Arc<StoreRegistry>) -> Self {
        Self { stores }
    }

    /// Sorts, routes, pivots, and inserts the transformed buffer, then
    /// records `loaded_count` and attaches the store connection.
    pub async fn run(&self, ctx: &mut EtlContext) -> Result<(), EtlError> {
        let started = std::time::Instant::now();
        let date = ctx.business_date();
        let records = ctx.take_transformed();

        let loader_cfg = ctx.settings().loader.clone();
        let target = ctx.settings().target.clone();
        let scratch_root = ctx.settings().scratch_root.clone();
        let router = TableRouter::from_target(&target);

        // Route every record once up front: an unroutable tag must fail
        // before anything is inserted, and the table set is needed for DDL.
        let mut tables: BTreeSet<String> = BTreeSet::new();
        for record in &records {
            tables.insert(router.route(record.data_type())?.to_string());
        }

        let driver = self.stores.get(&target.store_type)?;
        let connection = driver
            .connect(&target)
            .await
            .map_err(|err| EtlError::load_error(format!("store connect failed: {}", err)))?;

        for table in &tables {
            connection
                .execute_script(&format!("create table if not exists {}", table))
                .await
                .map_err(|err| {
                    EtlError::load_error(format!("materializing table '{}' failed: {}", table, err))
                })?;
        }

        let estimate = records.len() as u64 * loader_cfg.record_size_estimate;
        let spilled = !loader_cfg.memory_budget.fits(estimate);
        debug!(
            category = "load",
            event = "sort_selected",
            total_records = records.len(),
            estimated_bytes = estimate,
            spilled,
            "sorting {} records by '{}' ({})",
            records.len(),
            loader_cfg.sort_field,
            if spilled { "external merge" } else { "in-memory" }
        );

        let sorted: Box<dyn Iterator<Item = Result<TargetRecord, EtlError>> + Send> = if spilled {
            let run_capacity = loader_cfg
                .memory_budget
                .records_per_run(loader_cfg.record_size_estimate);
            let sort_dir = scratch_root.join(date.fs_segment()).join("sort");
            let sorter = ExternalSorter::new(&sort_dir, run_capacity, &loader_cfg.sort_field);
            Box::new(sorter.sort(records)?)
        } else {
            Box::new(sort_in_memory(records, &loader_cfg.sort_field)?.into_iter().map(Ok))
        };

        // Attach the connection before inserting: if a batch fails, the
        // handle is already on the context for best-effort cleanup to close.
        ctx.attach_store(connection);

        // Per-table accumulation; the store observes records in sort-key
        // order within each table because the stream is globally sorted.
        let batch_size = target.batch_size.get();
        let mut pending: HashMap<String, Vec<TargetRecord>> = HashMap::new();
        let mut loaded: u64 = 0;
        let mut batches = 0usize;
        {
            let connection = ctx
                .store()
                .ok_or_else(|| EtlError::internal_error("store connection vanished"))?;

            for item in sorted {
                let record = item?;
                let table = router.route(record.data_type())?.to_string();
                let buffer = pending.entry(table.clone()).or_default();
                buffer.push(record);
                if buffer.len() >= batch_size {
                    let full = std::mem::take(buffer);
                    loaded += flush_batch(connection, &table, full).await?;
                    batches += 1;
                }
            }

            for (table, buffer) in pending {
                if !buffer.is_empty() {
                    loaded += flush_batch(connection, &table, buffer).await?;
                    batches += 1;
                }
            }
        }

        ctx.record_loaded(loaded)?;
        events::load_finished(date, loaded, batches, spilled, started.elapsed());
        Ok(())
    }
}

/// Pivots one table batch and submits it.
async fn flush_batch(
    connection: &dyn StoreConnection,
    table: &str,
    records: Vec<TargetRecord>,
) -> Result<u64, EtlError> {
    let rows = records.len() as u64;
    let batch = ColumnarBatch::from_records(table, &records)?;
    connection.insert_batch(&batch).await.map_err(|err| {
        EtlError::load_error(format!("batch insert into '{}' failed: {}", table, err))
    })?;
    Ok(rows)
}
