// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Table Router
//!
//! Maps a target record's `data_type` discriminator to its store table.
//! Defaults route trades to `trades` and quotes to `quotes`; a target's
//! `table.<data-type>` property overrides the table name per type. A tag
//! the routing table does not know fails the load with a configuration
//! error.

use daybatch_domain::settings::TargetSettings;
use daybatch_domain::{DataType, EtlError};
use std::collections::HashMap;

/// Registered `data_type` -> table-name routes.
#[derive(Debug, Clone)]
pub struct TableRouter {
    routes: HashMap<DataType, String>,
}

impl TableRouter {
    /// Builds the router from defaults plus any `table.<type>` overrides
    /// in the target properties.
    pub fn from_target(target: &TargetSettings) -> Self {
        let mut routes = HashMap::new();
        routes.insert(DataType::Trade, "trades".to_string());
        routes.insert(DataType::Quote, "quotes".to_string());

        for data_type in DataType::all() {
            let key = format!("table.{}", data_type);
            if let Some(name) = target.properties.get(&key) {
                routes.insert(*data_type, name.clone());
            }
        }
        Self { routes }
    }

    /// Resolves the table for a data type.
    ///
    /// # Errors
    ///
    /// Returns [`EtlError::InvalidConfiguration`] for an unrouted tag.
    pub fn route(&self, data_type: DataType) -> Result<&str, EtlError> {
        self.routes
            .get(&data_type)
            .map(String::as_str)
            .ok_or_else(|| {
                EtlError::invalid_config(format!(
                    "no target table registered for data type '{}'",
                    data_type
                ))
            })
    }

    /// All routed (data type, table) pairs
    pub fn routes(&self) -> impl Iterator<Item = (DataType, &str)> {
        self.routes.iter().map(|(dt, table)| (*dt, table.as_str()))
    }
}
