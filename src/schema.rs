//! Schema registry for the active relation.
//!
//! Tracks the table name and typed column list inferred at ingestion time.
//! The context string built here is the only schema knowledge the prompt
//! builder and the router ever see.

use serde::{Deserialize, Serialize};

/// Inferred column kind. Inference is first-data-row-only: a column is
/// Numeric if the first row's value parses as a finite number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
}

/// The active relation's name and column list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Schema context string handed to the prompt builder,
    /// e.g. `Table "sales" columns: (Date TEXT, Amount REAL)`.
    pub fn context_string(&self) -> String {
        let cols: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let ty = match c.kind {
                    ColumnKind::Numeric => "REAL",
                    ColumnKind::Text => "TEXT",
                };
                format!("{} {}", c.name, ty)
            })
            .collect();
        format!("Table \"{}\" columns: ({})", self.name, cols.join(", "))
    }
}

/// Sanitize a relation name to identifier-safe characters.
pub fn sanitize_table_name(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
