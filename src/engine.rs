//! Insight engine orchestration.
//!
//! Owns the single active relation and the completion provider session,
//! and runs each question to completion: route, then either the
//! deterministic forecast path or the query synthesis path, converging on
//! result packaging. Exactly one path runs per question.

use crate::error::{EngineError, Result};
use crate::extract::extract_statement;
use crate::forecast::{create_forecast, select_forecast_columns, DEFAULT_HORIZON};
use crate::llm::CompletionProvider;
use crate::prompt::build_sql_prompt;
use crate::router::{full_history_sql, route, RoutingDecision};
use crate::schema::TableSchema;
use crate::store::{LoadSummary, Row, TableStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Token budget for a single completion. Local inference is
/// latency-sensitive; runaway generation must be capped.
pub const MAX_COMPLETION_TOKENS: u32 = 256;

/// Tag guiding (but not performing) presentation rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualHint {
    Line,
    Bar,
    Single,
    Table,
    Text,
}

/// The sole value crossing the core/presentation boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResponse {
    pub success: bool,
    /// Narrative of which path was taken and why.
    pub thought: String,
    /// The statement that ran, if any.
    pub sql: Option<String>,
    /// Column order for `rows`.
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub visual_hint: VisualHint,
}

pub struct InsightEngine {
    store: TableStore,
    provider: Option<Arc<dyn CompletionProvider>>,
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightEngine {
    pub fn new() -> Self {
        Self {
            store: TableStore::new(),
            provider: None,
        }
    }

    pub fn with_provider(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            store: TableStore::new(),
            provider: Some(provider),
        }
    }

    pub fn attach_provider(&mut self, provider: Arc<dyn CompletionProvider>) {
        self.provider = Some(provider);
    }

    /// Load CSV text as the active relation, replacing any previous one.
    pub fn load_csv(&mut self, content: &str, table_name: &str) -> Result<LoadSummary> {
        self.store.load_csv(content, table_name)
    }

    pub fn active_schema(&self) -> Option<&TableSchema> {
        self.store.active_schema()
    }

    /// Answer one question against the active relation.
    ///
    /// Every recoverable failure (bad statement, unusable model output,
    /// too little data to forecast) degrades to a structured response;
    /// only a missing dependency surfaces as `Err`.
    pub async fn answer(&mut self, question: &str) -> Result<EngineResponse> {
        let schema = self
            .store
            .active_schema()
            .cloned()
            .ok_or_else(|| EngineError::NotInitialized("no table loaded".to_string()))?;

        info!("Processing question: {}", question);

        match route(question) {
            RoutingDecision::Forecast { matched } => self.answer_forecast(question, &schema, &matched),
            RoutingDecision::General => self.answer_general(question, &schema).await,
        }
    }

    /// Forecast path: full-history retrieval plus least-squares
    /// extrapolation, no model in the loop.
    fn answer_forecast(
        &mut self,
        question: &str,
        schema: &TableSchema,
        matched: &[String],
    ) -> Result<EngineResponse> {
        let sql = full_history_sql(&schema.name);
        let mut thought = format!(
            "[Intent Router] User asked to \"{}\".\n\n**Routing Decision**: Detected \"Forecasting\" intent (matched: {}). \
             Bypassing LLM for the **Direct Math Engine** to ensure 0% hallucinations.",
            question,
            matched.join(", ")
        );

        let result = match self.store.query(&sql) {
            Ok(result) => result,
            Err(e) => {
                warn!("Full-history retrieval failed: {}", e);
                thought.push_str(&format!("\n\n[System] History retrieval failed: {}", e));
                return Ok(EngineResponse {
                    success: true,
                    thought,
                    sql: Some(sql),
                    columns: schema.column_names(),
                    rows: vec![],
                    visual_hint: VisualHint::Line,
                });
            }
        };

        if result.rows.is_empty() {
            // Valid "no data yet" outcome, not an error
            thought.push_str("\n\n[System] The table has no rows yet; nothing to extrapolate.");
            return Ok(EngineResponse {
                success: true,
                thought,
                sql: Some(sql),
                columns: result.columns,
                rows: vec![],
                visual_hint: VisualHint::Line,
            });
        }

        let (time_col, value_col) = select_forecast_columns(&result.columns, &result.rows[0]);
        info!("Running forecast on columns: {}, {}", time_col, value_col);

        let mut rows = result.rows;
        match create_forecast(&rows, &time_col, &value_col, DEFAULT_HORIZON) {
            Ok(forecast) => {
                thought.push_str(&format!(
                    "\n\n**Math Engine Result**: {}\n\n**Strategy**: Calculated linear regression \
                     locally over \"{}\". Found a {} trend with {:.0}% confidence.",
                    forecast.explanation,
                    value_col,
                    forecast.trend,
                    forecast.confidence * 100.0
                ));
                rows.extend(forecast.points);
            }
            Err(e) => {
                // History still renders; only the extrapolation is skipped
                warn!("Forecast skipped: {}", e);
                thought.push_str(&format!(
                    "\n\n[System] Forecast unavailable ({}). Returning raw history only.",
                    e
                ));
            }
        }

        Ok(EngineResponse {
            success: true,
            thought,
            sql: Some(sql),
            columns: result.columns,
            rows,
            visual_hint: VisualHint::Line,
        })
    }

    /// General path: prompt the provider, extract one statement, execute.
    async fn answer_general(&mut self, question: &str, schema: &TableSchema) -> Result<EngineResponse> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| {
                EngineError::NotInitialized(
                    "completion provider not attached; load a model first".to_string(),
                )
            })?
            .clone();

        let prompt = build_sql_prompt(question, schema);
        let raw = provider.complete(&prompt, MAX_COMPLETION_TOKENS).await?;
        info!("Raw model response: {} chars", raw.len());

        let mut thought = raw.clone();
        let sql = match extract_statement(&raw) {
            Some(sql) => sql,
            None => {
                // Recoverable: keep the raw text visible to the operator
                warn!("No executable statement found in model output");
                return Ok(EngineResponse {
                    success: true,
                    thought,
                    sql: None,
                    columns: vec![],
                    rows: vec![],
                    visual_hint: VisualHint::Text,
                });
            }
        };

        info!("Executing generated SQL: {}", sql);
        match self.store.query(&sql) {
            Ok(result) => {
                thought.push_str(&format!(
                    "\n\n[System] Executed SQL. Found {} rows.",
                    result.rows.len()
                ));
                let visual_hint = if result.rows.len() == 1 && result.columns.len() == 1 {
                    VisualHint::Single
                } else if !result.rows.is_empty() {
                    VisualHint::Table
                } else {
                    VisualHint::Text
                };
                Ok(EngineResponse {
                    success: true,
                    thought,
                    sql: Some(sql),
                    columns: result.columns,
                    rows: result.rows,
                    visual_hint,
                })
            }
            Err(e) => {
                // Surfaced verbatim, never swallowed
                thought.push_str(&format!("\n\n[System] SQL Error: {}", e));
                Ok(EngineResponse {
                    success: true,
                    thought,
                    sql: Some(sql),
                    columns: vec![],
                    rows: vec![],
                    visual_hint: VisualHint::Text,
                })
            }
        }
    }
}
