// /////////////////////////////////////////////////////////////////////////////
// Daybatch ETL
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Delimited File Parser
//!
//! Streams a downloaded source file into model records, one line at a
//! time. The line layouts are fixed per model:
//!
//! ```text
//! trade: symbol,venue,price,quantity,receive_time
//! quote: symbol,venue,bid,ask,bid_size,ask_size,receive_time
//! ```
//!
//! Empty double fields become the NaN sentinel and empty integer size
//! fields become zero; `receive_time` is the sort key and must be
//! present. Any malformed line fails the file, and a failed file fails
//! its whole source.

use daybatch_domain::records::{RawQuote, RawTrade};
use daybatch_domain::{EtlError, SourceModel, SourceRecord};
use std::io::BufRead;
use std::path::Path;

/// Parser for one source's delimited files.
#[derive(Debug, Clone)]
pub struct LineRecordParser {
    model: SourceModel,
    delimiter: char,
}

impl LineRecordParser {
    pub fn new(model: SourceModel, delimiter: char) -> Self {
        Self { model, delimiter }
    }

    /// Builds a parser from a source's free-form properties:
    /// `model` (`trade` | `quote`, required) and `delimiter` (optional,
    /// default `,`).
    pub fn from_properties(
        properties: &std::collections::HashMap<String, String>,
    ) -> Result<Self, EtlError> {
        let model = match properties.get("model").map(String::as_str) {
            Some("trade") => SourceModel::Trade,
            Some("quote") => SourceModel::Quote,
            Some(other) => {
                return Err(EtlError::invalid_config(format!(
                    "unknown source model '{}'",
                    other
                )))
            }
            None => {
                return Err(EtlError::invalid_config(
                    "object-storage source requires a 'model' property",
                ))
            }
        };
        let delimiter = properties
            .get("delimiter")
            .and_then(|d| d.chars().next())
            .unwrap_or(',');
        Ok(Self { model, delimiter })
    }

    pub fn model(&self) -> SourceModel {
        self.model
    }

    /// Parses a whole file, streaming line by line.
    pub fn parse_file(&self, path: &Path) -> Result<Vec<SourceRecord>, EtlError> {
        let file = std::fs::File::open(path).map_err(|err| {
            EtlError::source_error(format!("cannot open {}: {}", path.display(), err))
        })?;
        let reader = std::io::BufReader::new(file);

        let mut records = Vec::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| {
                EtlError::source_error(format!(
                    "read error in {} at line {}: {}",
                    path.display(),
                    index + 1,
                    err
                ))
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let record = self.parse_line(trimmed).map_err(|err| {
                EtlError::source_error(format!(
                    "parse error in {} at line {}: {}",
                    path.display(),
                    index + 1,
                    err
                ))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    fn parse_line(&self, line: &str) -> Result<SourceRecord, String> {
        let fields: Vec<&str> = line.split(self.delimiter).map(str::trim).collect();
        match self.model {
            SourceModel::Trade => {
                if fields.len() != 5 {
                    return Err(format!("expected 5 fields, found {}", fields.len()));
                }
                Ok(SourceRecord::Trade(RawTrade {
                    symbol: fields[0].to_string(),
                    venue: fields[1].to_string(),
                    price: parse_double(fields[2])?,
                    quantity: parse_size(fields[3])?,
                    receive_time: parse_required_i64(fields[4], "receive_time")?,
                }))
            }
            SourceModel::Quote => {
                if fields.len() != 7 {
                    return Err(format!("expected 7 fields, found {}", fields.len()));
                }
                Ok(SourceRecord::Quote(RawQuote {
                    symbol: fields[0].to_string(),
                    venue: fields[1].to_string(),
                    bid: parse_double(fields[2])?,
                    ask: parse_double(fields[3])?,
                    bid_size: parse_size(fields[4])?,
                    ask_size: parse_size(fields[5])?,
                    receive_time: parse_required_i64(fields[6], "receive_time")?,
                }))
            }
        }
    }
}

/// Empty doubles become the NaN sentinel
fn parse_double(field: &str) -> Result<f64, String> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field
        .parse()
        .map_err(|_| format!("'{}' is not a number", field))
}

/// Empty sizes become zero
fn parse_size(field: &str) -> Result<i64, String> {
    if field.is_empty() {
        return Ok(0);
    }
    field
        .parse()
        .map_err(|_| format!("'{}' is not an integer", field))
}

fn parse_required_i64(field: &str, name: &str) -> Result<i64, String> {
    if field.is_empty() {
        return Err(format!("{} is required", name));
    }
    field
        .parse()
        .map_err(|_| format!("'{}' is not a valid {}", field, name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parses_trades_in_emission_order() {
        let file = write_temp("ABCD,XNAS,10.5,100,1\nEFGH,ARCX,11.0,200,2\n");
        let parser = LineRecordParser::new(SourceModel::Trade, ',');
        let records = parser.parse_file(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        match &records[0] {
            SourceRecord::Trade(t) => {
                assert_eq!(t.symbol, "ABCD");
                assert_eq!(t.receive_time, 1);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_empty_double_is_nan_and_empty_size_is_zero() {
        let file = write_temp("ABCD,XNAS,,,5\n");
        let parser = LineRecordParser::new(SourceModel::Trade, ',');
        let records = parser.parse_file(file.path()).unwrap();
        match &records[0] {
            SourceRecord::Trade(t) => {
                assert!(t.price.is_nan());
                assert_eq!(t.quantity, 0);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_blank_lines_and_comments_skipped() {
        let file = write_temp("# header\n\nABCD,XNAS,1.0,1,1\n");
        let parser = LineRecordParser::new(SourceModel::Trade, ',');
        assert_eq!(parser.parse_file(file.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_line_fails_the_file_with_location() {
        let file = write_temp("ABCD,XNAS,1.0,1,1\nBAD LINE\n");
        let parser = LineRecordParser::new(SourceModel::Trade, ',');
        let err = parser.parse_file(file.path()).unwrap_err();
        assert_eq!(err.category(), "source");
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_missing_receive_time_is_rejected() {
        let file = write_temp("ABCD,XNAS,1.0,1,\n");
        let parser = LineRecordParser::new(SourceModel::Trade, ',');
        let err = parser.parse_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("receive_time"));
    }

    #[test]
    fn test_quote_layout_and_custom_delimiter() {
        let file = write_temp("ABCD|XNAS|9.9|10.1|100|200|7\n");
        let parser = LineRecordParser::new(SourceModel::Quote, '|');
        let records = parser.parse_file(file.path()).unwrap();
        match &records[0] {
            SourceRecord::Quote(q) => {
                assert_eq!(q.bid, 9.9);
                assert_eq!(q.ask_size, 200);
                assert_eq!(q.receive_time, 7);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_from_properties_requires_model() {
        let err = LineRecordParser::from_properties(&std::collections::HashMap::new()).unwrap_err();
        assert_eq!(err.category(), "configuration");
    }
}
