// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # In-Memory Store Driver
//!
//! A process-local columnar store behind the store port. Tables are kept
//! as row vectors of column values; `execute_script` understands just
//! enough DDL to materialize a table, and `run_scalar_query` evaluates
//! the one query shape the validator issues:
//!
//! ```text
//! select count(*) from <table> where <column> = <literal>
//! ```
//!
//! All connections from one driver share the driver's tables, which is
//! what lets the validator count what the loader inserted and lets tests
//! inspect the store after a run.

use async_trait::async_trait;
use daybatch_domain::settings::TargetSettings;
use daybatch_domain::{ColumnValue, ColumnarBatch, EtlError, StoreConnection, StoreDriver};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One stored table: column names plus rows of values.
#[derive(Debug, Default, Clone)]
struct StoredTable {
    columns: Vec<String>,
    rows: Vec<Vec<ColumnValue>>,
}

#[derive(Debug, Default)]
struct StoreState {
    tables: Mutex<HashMap<String, StoredTable>>,
}

/// The `memory` store driver.
#[derive(Debug, Default, Clone)]
pub struct MemoryStoreDriver {
    state: Arc<StoreState>,
}

impl MemoryStoreDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total rows currently stored in a table. Test/inspection helper.
    pub fn row_count(&self, table: &str) -> usize {
        self.state
            .tables
            .lock()
            .get(table)
            .map(|t| t.rows.len())
            .unwrap_or(0)
    }

    /// Values of one column in insertion order. Test/inspection helper.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<ColumnValue> {
        let tables = self.state.tables.lock();
        let Some(stored) = tables.get(table) else {
            return Vec::new();
        };
        let Some(index) = stored.columns.iter().position(|c| c == column) else {
            return Vec::new();
        };
        stored.rows.iter().map(|row| row[index].clone()).collect()
    }
}

#[async_trait]
impl StoreDriver for MemoryStoreDriver {
    fn store_type(&self) -> &str {
        "memory"
    }

    async fn connect(
        &self,
        _target: &TargetSettings,
    ) -> Result<Box<dyn StoreConnection>, EtlError> {
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A connection sharing its driver's tables.
struct MemoryConnection {
    state: Arc<StoreState>,
    closed: AtomicBool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), EtlError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(EtlError::store_error("connection is closed"));
        }
        Ok(())
    }
}

#[async_trait]
impl StoreConnection for MemoryConnection {
    async fn execute_script(&self, script: &str) -> Result<(), EtlError> {
        self.ensure_open()?;
        // Recognized: "create table [if not exists] <name>"
        let tokens: Vec<&str> = script.split_whitespace().collect();
        match tokens.as_slice() {
            ["create", "table", "if", "not", "exists", name, ..]
            | ["create", "table", name, ..] => {
                self.state
                    .tables
                    .lock()
                    .entry((*name).to_string())
                    .or_default();
                Ok(())
            }
            [] => Ok(()),
            _ => Err(EtlError::store_error(format!(
                "unsupported script: {}",
                script
            ))),
        }
    }

    async fn insert_batch(&self, batch: &ColumnarBatch) -> Result<(), EtlError> {
        self.ensure_open()?;
        let mut tables = self.state.tables.lock();
        let stored = tables.entry(batch.table().to_string()).or_default();

        let column_names: Vec<String> = batch
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        if stored.columns.is_empty() {
            stored.columns = column_names;
        } else if stored.columns != column_names {
            return Err(EtlError::store_error(format!(
                "column mismatch on '{}': table has {:?}, batch has {:?}",
                batch.table(),
                stored.columns,
                column_names
            )));
        }

        // Pivot the parallel column vectors back into rows
        for row_index in 0..batch.rows() {
            let row: Vec<ColumnValue> = batch
                .columns()
                .iter()
                .map(|column| column.values()[row_index].clone())
                .collect();
            stored.rows.push(row);
        }
        Ok(())
    }

    async fn run_scalar_query(&self, query: &str) -> Result<i64, EtlError> {
        self.ensure_open()?;
        let (table, filter) = parse_count_query(query)?;
        let tables = self.state.tables.lock();
        let Some(stored) = tables.get(&table) else {
            return Ok(0);
        };
        match filter {
            None => Ok(stored.rows.len() as i64),
            Some((column, literal)) => {
                let Some(index) = stored.columns.iter().position(|c| *c == column) else {
                    return Err(EtlError::store_error(format!(
                        "unknown column '{}' in '{}'",
                        column, table
                    )));
                };
                let count = stored
                    .rows
                    .iter()
                    .filter(|row| render(&row[index]) == literal)
                    .count();
                Ok(count as i64)
            }
        }
    }

    async fn close(&mut self) -> Result<(), EtlError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Renders a cell the way query literals are written
fn render(value: &ColumnValue) -> String {
    match value {
        ColumnValue::Int64(v) => v.to_string(),
        ColumnValue::Float64(v) => v.to_string(),
        ColumnValue::Utf8(Some(s)) => s.clone(),
        ColumnValue::Utf8(None) | ColumnValue::Null => String::new(),
        ColumnValue::Date(d) => d.store_literal(),
    }
}

/// Parses `select count(*) from <table> [where <column> = <literal>]`
fn parse_count_query(query: &str) -> Result<(String, Option<(String, String)>), EtlError> {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    match tokens.as_slice() {
        ["select", "count(*)", "from", table] => Ok(((*table).to_string(), None)),
        ["select", "count(*)", "from", table, "where", column, "=", literal] => Ok((
            (*table).to_string(),
            Some(((*column).to_string(), (*literal).to_string())),
        )),
        _ => Err(EtlError::store_error(format!(
            "unsupported query: {}",
            query
        ))),
    }
}
