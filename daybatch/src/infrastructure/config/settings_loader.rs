// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # INI Settings Loader
//!
//! Reads the run configuration from an INI file and resolves it into the
//! domain's [`RunSettings`]. The file names its sources in `[app]` and
//! describes each in its own section:
//!
//! ```ini
//! [app]
//! scratch_root = /var/tmp/daybatch
//! app_dir = /var/lib/daybatch
//! sources = ticks
//!
//! [source_ticks]
//! type = object_store
//! category = ticks
//! model = trade
//! cos.endpoint = file:///srv/feeds
//! cos.bucket = ticks
//! cos.max_file_size = 104857600
//!
//! [target]
//! type = memory
//! connection_string = localhost:8848
//! batch_size = 1000
//!
//! [loader]
//! sort_field = receiveTime
//! memory_budget_bytes = 536870912
//!
//! [validation]
//! rules = count_match
//! ```
//!
//! Key lookup is spelling-tolerant: `sortField`, `sort_field`, and
//! `sort.field` name the same option, so both the camelCase dialect and
//! the snake_case dialect load. Consumed keys are removed; whatever
//! remains in a source or target section passes through verbatim as
//! `properties` for the concrete adapter (`ddb.host` and friends land
//! there).
//!
//! Every failure here is a configuration error with a field-level
//! message, surfaced before the lock-protected run begins: exit 4.

use config::{Config, File, FileFormat};
use daybatch_domain::settings::{
    DbSourceSettings, LoaderSettings, ObjectStoreSettings, RunSettings, SourceSettings,
    TargetSettings, ValidationRule, ValidationSettings, DEFAULT_MAX_FILE_SIZE,
};
use daybatch_domain::{BatchSize, EtlError, MemoryBudget};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

type Section = HashMap<String, String>;
type RawConfig = HashMap<String, Section>;

/// Loads and resolves the configuration file.
pub fn load_settings(path: &Path) -> Result<RunSettings, EtlError> {
    let path_str = path.to_string_lossy();
    let raw = Config::builder()
        .add_source(File::new(path_str.as_ref(), FileFormat::Ini))
        .build()
        .map_err(|err| EtlError::invalid_config(format!("cannot read {}: {}", path_str, err)))?;
    let table: RawConfig = raw
        .try_deserialize()
        .map_err(|err| EtlError::invalid_config(format!("cannot parse {}: {}", path_str, err)))?;
    build_settings(table)
}

/// Resolves an already-parsed section table. Split from file reading so
/// tests can feed literal tables.
pub fn build_settings(mut table: RawConfig) -> Result<RunSettings, EtlError> {
    let mut app = take_section(&mut table, "app").unwrap_or_default();
    let scratch_root = consume(&mut app, "scratch_root")
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("daybatch"));
    let app_dir = consume(&mut app, "app_dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let source_names: Vec<String> = consume(&mut app, "sources")
        .map(|list| {
            list.split(',')
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut sources = Vec::with_capacity(source_names.len());
    for name in &source_names {
        let section = take_section(&mut table, &format!("source_{}", name)).ok_or_else(|| {
            EtlError::invalid_config(format!(
                "app.sources names '{}' but no [source_{}] section exists",
                name, name
            ))
        })?;
        sources.push(build_source(name, section)?);
    }

    let target_section = take_section(&mut table, "target")
        .ok_or_else(|| EtlError::invalid_config("missing [target] section"))?;
    let target = build_target(target_section)?;

    let loader = build_loader(take_section(&mut table, "loader").unwrap_or_default())?;
    let validation = build_validation(take_section(&mut table, "validation").unwrap_or_default())?;

    Ok(RunSettings {
        sources,
        target,
        loader,
        validation,
        scratch_root,
        app_dir,
    })
}

fn build_source(name: &str, mut section: Section) -> Result<SourceSettings, EtlError> {
    let source_type = consume(&mut section, "type").ok_or_else(|| {
        EtlError::invalid_config(format!("source '{}': missing 'type'", name))
    })?;
    let category = consume(&mut section, "category").unwrap_or_else(|| name.to_string());
    let connection_string = consume(&mut section, "connection_string");
    let sql_template = consume(&mut section, "sql_template");

    let object_store = build_object_store(name, &source_type, &mut section)?;
    let db = build_db(&mut section);

    Ok(SourceSettings {
        name: name.to_string(),
        source_type,
        connection_string,
        category,
        properties: section,
        sql_template,
        db,
        object_store,
    })
}

fn build_object_store(
    name: &str,
    source_type: &str,
    section: &mut Section,
) -> Result<Option<ObjectStoreSettings>, EtlError> {
    let endpoint = consume(section, "cos.endpoint");
    let bucket = consume(section, "cos.bucket");
    let region = consume(section, "cos.region");
    let prefix = consume(section, "cos.prefix");
    let secret_id = consume(section, "cos.secret_id");
    let secret_key = consume(section, "cos.secret_key");
    let max_file_size = match consume(section, "cos.max_file_size") {
        Some(raw) => parse_u64(&raw, &format!("source '{}': cos.max_file_size", name))?,
        None => DEFAULT_MAX_FILE_SIZE,
    };

    let any_present = endpoint.is_some() || bucket.is_some() || region.is_some();
    if source_type == "object_store" && endpoint.is_none() {
        return Err(EtlError::invalid_config(format!(
            "source '{}': object_store type requires cos.endpoint",
            name
        )));
    }
    if !any_present {
        return Ok(None);
    }
    Ok(Some(ObjectStoreSettings {
        bucket: bucket.unwrap_or_default(),
        region: region.unwrap_or_default(),
        endpoint: endpoint.unwrap_or_default(),
        prefix: prefix.unwrap_or_default(),
        secret_id: secret_id.unwrap_or_default(),
        secret_key: secret_key.unwrap_or_default(),
        max_file_size,
    }))
}

fn build_db(section: &mut Section) -> Option<DbSourceSettings> {
    let url = consume(section, "db.url")?;
    Some(DbSourceSettings {
        url,
        user: consume(section, "db.user").unwrap_or_default(),
        password: consume(section, "db.password").unwrap_or_default(),
    })
}

fn build_target(mut section: Section) -> Result<TargetSettings, EtlError> {
    let store_type = consume(&mut section, "type")
        .ok_or_else(|| EtlError::invalid_config("target: missing 'type'"))?;
    let connection_string = consume(&mut section, "connection_string")
        .ok_or_else(|| EtlError::invalid_config("target: missing 'connection_string'"))?;
    if !connection_string.contains(':') {
        return Err(EtlError::invalid_config(format!(
            "target: connection_string '{}' is not host:port",
            connection_string
        )));
    }
    let batch_size = match consume(&mut section, "batch_size") {
        Some(raw) => {
            let parsed = parse_u64(&raw, "target: batch_size")? as usize;
            BatchSize::new(parsed)?
        }
        None => BatchSize::default(),
    };
    Ok(TargetSettings {
        store_type,
        connection_string,
        batch_size,
        properties: section,
    })
}

fn build_loader(mut section: Section) -> Result<LoaderSettings, EtlError> {
    let defaults = LoaderSettings::default();
    let sort_field = consume(&mut section, "sort_field").unwrap_or(defaults.sort_field);
    let memory_budget = match consume(&mut section, "memory_budget_bytes") {
        Some(raw) => MemoryBudget::from_bytes(parse_u64(&raw, "loader: memory_budget_bytes")?)?,
        None => defaults.memory_budget,
    };
    let record_size_estimate = match consume(&mut section, "record_size_estimate") {
        Some(raw) => parse_u64(&raw, "loader: record_size_estimate")?,
        None => defaults.record_size_estimate,
    };
    let timeout = match consume(&mut section, "timeout_seconds") {
        Some(raw) => Duration::from_secs(parse_u64(&raw, "loader: timeout_seconds")?),
        None => defaults.timeout,
    };
    Ok(LoaderSettings {
        sort_field,
        memory_budget,
        record_size_estimate,
        timeout,
    })
}

fn build_validation(mut section: Section) -> Result<ValidationSettings, EtlError> {
    let rules = match consume(&mut section, "rules") {
        None => ValidationSettings::default().rules,
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .map(|rule| match normalize(rule).as_str() {
                "countmatch" => Ok(ValidationRule::CountMatch),
                _ => Err(EtlError::invalid_config(format!(
                    "validation: unknown rule '{}'",
                    rule
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
    };
    Ok(ValidationSettings { rules })
}

/// Case-, separator-, and dialect-insensitive key form: `sortField`,
/// `sort_field`, and `sort.field` all normalize to `sortfield`.
fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| !matches!(c, '.' | '_' | '-'))
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Removes and returns the value for a logical key, matching any spelling
fn consume(section: &mut Section, logical_key: &str) -> Option<String> {
    let wanted = normalize(logical_key);
    let found = section
        .keys()
        .find(|key| normalize(key) == wanted)?
        .clone();
    section.remove(&found)
}

/// Removes and returns a section, matching any spelling of its name
fn take_section(table: &mut RawConfig, logical_name: &str) -> Option<Section> {
    let wanted = normalize(logical_name);
    let found = table
        .keys()
        .find(|name| normalize(name) == wanted)?
        .clone();
    table.remove(&found)
}

fn parse_u64(raw: &str, field: &str) -> Result<u64, EtlError> {
    raw.parse()
        .map_err(|_| EtlError::invalid_config(format!("{} must be an integer, got '{}'", field, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn section(pairs: &[(&str, &str)]) -> Section {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn minimal_table() -> RawConfig {
        let mut table = RawConfig::new();
        table.insert(
            "app".to_string(),
            section(&[("sources", "ticks"), ("scratch_root", "/tmp/db-scratch")]),
        );
        table.insert(
            "source_ticks".to_string(),
            section(&[
                ("type", "object_store"),
                ("model", "trade"),
                ("cos.endpoint", "file:///srv/feeds"),
                ("cos.bucket", "ticks"),
            ]),
        );
        table.insert(
            "target".to_string(),
            section(&[("type", "memory"), ("connection_string", "localhost:8848")]),
        );
        table
    }

    #[test]
    fn test_minimal_config_resolves_with_defaults() {
        let settings = build_settings(minimal_table()).unwrap();
        assert_eq!(settings.sources.len(), 1);

        let source = &settings.sources[0];
        assert_eq!(source.source_type, "object_store");
        assert_eq!(source.category, "ticks");
        let os = source.object_store.as_ref().unwrap();
        assert_eq!(os.endpoint, "file:///srv/feeds");
        assert_eq!(os.max_file_size, 100 * 1024 * 1024);
        // Unconsumed keys pass through as properties
        assert_eq!(source.properties.get("model").unwrap(), "trade");

        assert_eq!(settings.target.store_type, "memory");
        assert_eq!(settings.target.batch_size.get(), 1000);
        assert_eq!(settings.loader.sort_field, "receiveTime");
        assert_eq!(settings.loader.timeout, Duration::from_secs(1800));
        assert_eq!(
            settings.validation.rules,
            vec![ValidationRule::CountMatch]
        );
    }

    #[test]
    fn test_camel_case_dialect_loads_too() {
        let mut table = minimal_table();
        table.insert(
            "loader".to_string(),
            section(&[
                ("sortField", "receiveTime"),
                ("memoryBudgetBytes", "1048576"),
                ("recordSizeEstimate", "250"),
                ("timeoutSeconds", "60"),
            ]),
        );
        let mut target = section(&[
            ("type", "memory"),
            ("connectionString", "localhost:8848"),
            ("batchSize", "500"),
            ("ddb.host", "localhost"),
        ]);
        target.insert("ddb.port".to_string(), "8848".to_string());
        table.insert("target".to_string(), target);

        let settings = build_settings(table).unwrap();
        assert_eq!(settings.loader.memory_budget.bytes(), 1_048_576);
        assert_eq!(settings.loader.record_size_estimate, 250);
        assert_eq!(settings.loader.timeout, Duration::from_secs(60));
        assert_eq!(settings.target.batch_size.get(), 500);
        // ddb.* stays in properties for the driver
        assert_eq!(settings.target.properties.get("ddb.host").unwrap(), "localhost");
    }

    #[test]
    fn test_missing_source_section_is_field_level_error() {
        let mut table = minimal_table();
        table.insert(
            "app".to_string(),
            section(&[("sources", "ticks, ghosts")]),
        );
        let err = build_settings(table).unwrap_err();
        assert_eq!(err.category(), "configuration");
        assert!(err.to_string().contains("ghosts"));
    }

    #[test]
    fn test_missing_target_rejected() {
        let mut table = minimal_table();
        table.remove("target");
        assert!(build_settings(table).is_err());
    }

    #[test]
    fn test_bad_connection_string_rejected() {
        let mut table = minimal_table();
        table.insert(
            "target".to_string(),
            section(&[("type", "memory"), ("connection_string", "no-port")]),
        );
        let err = build_settings(table).unwrap_err();
        assert!(err.to_string().contains("host:port"));
    }

    #[test]
    fn test_object_store_source_requires_endpoint() {
        let mut table = minimal_table();
        table.insert(
            "source_ticks".to_string(),
            section(&[("type", "object_store"), ("model", "trade")]),
        );
        let err = build_settings(table).unwrap_err();
        assert!(err.to_string().contains("cos.endpoint"));
    }

    #[test]
    fn test_unknown_validation_rule_rejected() {
        let mut table = minimal_table();
        table.insert("validation".to_string(), section(&[("rules", "row_hash")]));
        let err = build_settings(table).unwrap_err();
        assert!(err.to_string().contains("row_hash"));
    }

    #[test]
    fn test_db_source_options() {
        let mut table = minimal_table();
        table.insert("app".to_string(), section(&[("sources", "orders")]));
        table.remove("source_ticks");
        table.insert(
            "source_orders".to_string(),
            section(&[
                ("type", "database"),
                ("model", "trade"),
                ("sql_template", "select * from orders where d = '${date}'"),
                ("db.url", "jdbc:postgresql://localhost/orders"),
                ("db.user", "etl"),
                ("db.password", "secret"),
            ]),
        );
        let settings = build_settings(table).unwrap();
        let db = settings.sources[0].db.as_ref().unwrap();
        assert_eq!(db.url, "jdbc:postgresql://localhost/orders");
        assert_eq!(db.user, "etl");
        assert!(settings.sources[0].sql_template.is_some());
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let mut table = minimal_table();
        table.insert(
            "target".to_string(),
            section(&[
                ("type", "memory"),
                ("connection_string", "localhost:8848"),
                ("batch_size", "0"),
            ]),
        );
        assert!(build_settings(table).is_err());
    }

    /// End-to-end through the config crate's INI reader.
    #[test]
    fn test_load_settings_from_ini_file() {
        let mut file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        writeln!(
            file,
            "[app]\n\
             sources = ticks\n\
             scratch_root = /tmp/daybatch-scratch\n\
             \n\
             [source_ticks]\n\
             type = object_store\n\
             model = trade\n\
             cos.endpoint = file:///srv/feeds\n\
             \n\
             [target]\n\
             type = memory\n\
             connection_string = localhost:8848\n\
             \n\
             [loader]\n\
             timeout_seconds = 120\n"
        )
        .unwrap();

        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.sources.len(), 1);
        assert_eq!(settings.loader.timeout, Duration::from_secs(120));
        assert_eq!(settings.scratch_root, PathBuf::from("/tmp/daybatch-scratch"));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_settings(Path::new("/nonexistent/daybatch.ini")).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
