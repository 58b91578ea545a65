// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reading rows from CSV and JSON files.

use super::IngestError;
use crate::db::Fields;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Load rows from `path`, choosing the parser by file extension.
pub fn load_file(path: &Path) -> Result<Vec<Fields>, IngestError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("csv") => parse_csv(path),
        Some("json") => parse_json(path),
        _ => Err(IngestError::UnsupportedFormat(path.to_path_buf())),
    }
}

/// Parse a CSV file with a header row. Every cell is kept as a string;
/// cells missing from short rows become `null`.
pub fn parse_csv(path: &Path) -> Result<Vec<Fields>, IngestError> {
    let csv_err = |source| IngestError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(UTF8_BOM) } else { h };
            h.to_string()
        })
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let row: Fields = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let cell = record
                    .get(i)
                    .map_or(Value::Null, |v| Value::String(v.to_string()));
                (header.clone(), cell)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Parse a JSON array of objects, or an object with an `items` array.
pub fn parse_json(path: &Path) -> Result<Vec<Fields>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data: Value =
        serde_json::from_reader(BufReader::new(file)).map_err(|source| IngestError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    rows_from_json(data)
}

fn rows_from_json(data: Value) -> Result<Vec<Fields>, IngestError> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("items") {
            Some(Value::Array(items)) => items,
            _ => return Err(IngestError::JsonShape),
        },
        _ => return Err(IngestError::JsonShape),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(row) => Ok(row),
            _ => Err(IngestError::NotAnObject(index)),
        })
        .collect()
}
