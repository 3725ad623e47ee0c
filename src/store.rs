//! In-memory tabular store.
//!
//! Loads delimited text into a named relation and executes read queries
//! against it through the embedded Polars SQL context. One active relation
//! at a time; reloading under an existing name is a destructive replace.

use crate::error::{EngineError, Result};
use crate::schema::{sanitize_table_name, ColumnInfo, ColumnKind, TableSchema};
use polars::prelude::*;
use polars::sql::SQLContext;
use std::collections::HashMap;
use tracing::{debug, info};

/// A result row: column name -> JSON value. Column order lives in
/// [`QueryResult::columns`].
pub type Row = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub schema: TableSchema,
    pub row_count: usize,
}

pub struct TableStore {
    ctx: SQLContext,
    active: Option<TableSchema>,
}

impl Default for TableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TableStore {
    pub fn new() -> Self {
        Self {
            ctx: SQLContext::new(),
            active: None,
        }
    }

    /// The schema of the most recently loaded relation, if any.
    pub fn active_schema(&self) -> Option<&TableSchema> {
        self.active.as_ref()
    }

    /// Load CSV text into a named relation, replacing any relation with the
    /// same name. Column kinds are inferred from the first data row only:
    /// a column is Numeric if that row's value parses as a finite number.
    pub fn load_csv(&mut self, content: &str, table_name: &str) -> Result<LoadSummary> {
        let name = sanitize_table_name(table_name);
        // Excel exports often carry a BOM
        let content = content.trim_start_matches('\u{feff}');

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| EngineError::Ingestion(format!("Failed to read CSV header: {}", e)))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let mut records: Vec<csv::StringRecord> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| EngineError::Ingestion(format!("Malformed CSV row: {}", e)))?;
            if record.iter().all(|f| f.is_empty()) {
                continue;
            }
            records.push(record);
        }

        if records.is_empty() {
            return Err(EngineError::Ingestion("Empty CSV".to_string()));
        }

        let columns: Vec<ColumnInfo> = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let sample = records[0].get(idx).unwrap_or("");
                let kind = if parse_finite(sample).is_some() {
                    ColumnKind::Numeric
                } else {
                    ColumnKind::Text
                };
                ColumnInfo {
                    name: header.clone(),
                    kind,
                }
            })
            .collect();

        let mut series: Vec<Series> = Vec::with_capacity(columns.len());
        for (idx, col) in columns.iter().enumerate() {
            match col.kind {
                ColumnKind::Numeric => {
                    let values: Vec<Option<f64>> = records
                        .iter()
                        .map(|r| r.get(idx).and_then(parse_finite))
                        .collect();
                    series.push(Series::new(&col.name, values));
                }
                ColumnKind::Text => {
                    let values: Vec<Option<String>> = records
                        .iter()
                        .map(|r| r.get(idx).map(|v| v.to_string()))
                        .collect();
                    series.push(Series::new(&col.name, values));
                }
            }
        }

        let df = DataFrame::new(series)?;
        let row_count = df.height();
        self.ctx.register(&name, df.lazy());

        let schema = TableSchema {
            name: name.clone(),
            columns,
        };
        self.active = Some(schema.clone());

        info!("Loaded {} rows into \"{}\"", row_count, name);
        Ok(LoadSummary { schema, row_count })
    }

    /// Execute a read query. Only the text up to the first semicolon runs;
    /// anything after a statement separator is discarded.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let clean = sql.split(';').next().unwrap_or("").trim();
        if clean.is_empty() {
            return Err(EngineError::Query("Empty statement".to_string()));
        }
        debug!("Executing SQL: {}", clean);

        let df = self
            .ctx
            .execute(clean)
            .map_err(|e| EngineError::Query(e.to_string()))?
            .collect()
            .map_err(|e| EngineError::Query(e.to_string()))?;

        let columns: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let rows = dataframe_to_rows(&df)?;

        debug!("Result count: {}", rows.len());
        Ok(QueryResult { columns, rows })
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Convert a DataFrame into JSON rows keyed by column name.
fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<Row>> {
    let column_names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut rows = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row_map = Row::new();
        for col_name in &column_names {
            let series = df.column(col_name)?;
            row_map.insert(col_name.clone(), series_value_to_json(series, row_idx)?);
        }
        rows.push(row_map);
    }
    Ok(rows)
}

fn series_value_to_json(series: &Series, row_idx: usize) -> Result<serde_json::Value> {
    if series.is_null().get(row_idx).unwrap_or(false) {
        return Ok(serde_json::Value::Null);
    }

    let any_val = series
        .get(row_idx)
        .map_err(|e| EngineError::Query(format!("Failed to read value: {}", e)))?;

    match series.dtype() {
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            if let Ok(val) = any_val.try_extract::<i64>() {
                Ok(serde_json::Value::Number(serde_json::Number::from(val)))
            } else {
                Ok(serde_json::Value::Null)
            }
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            if let Ok(val) = any_val.try_extract::<u64>() {
                Ok(serde_json::Value::Number(serde_json::Number::from(val)))
            } else {
                Ok(serde_json::Value::Null)
            }
        }
        DataType::Float32 | DataType::Float64 => {
            if let Ok(val) = any_val.try_extract::<f64>() {
                Ok(serde_json::Number::from_f64(val)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null))
            } else {
                Ok(serde_json::Value::Null)
            }
        }
        DataType::Boolean => {
            if let AnyValue::Boolean(b) = any_val {
                Ok(serde_json::Value::Bool(b))
            } else {
                Ok(serde_json::Value::Null)
            }
        }
        DataType::String => {
            if let Some(s) = any_val.get_str() {
                Ok(serde_json::Value::String(s.to_string()))
            } else {
                Ok(serde_json::Value::String(any_val.to_string()))
            }
        }
        _ => Ok(serde_json::Value::String(format!("{}", any_val))),
    }
}
