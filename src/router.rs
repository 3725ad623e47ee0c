//! Intent router.
//!
//! Classifies a question before any model inference happens. A fixed
//! trigger set routes forecasting requests to the deterministic math
//! engine; everything else falls through to query synthesis. Precision
//! over recall: a forecasting question phrased without a trigger word is
//! allowed to fall through, but a recognized one never reaches the model.

use tracing::info;

/// Lexical cues that bypass the language model.
pub const TRIGGER_KEYWORDS: [&str; 5] = ["predict", "forecast", "trend", "future", "projection"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingDecision {
    /// Deterministic forecast path; carries the trigger words that matched.
    Forecast { matched: Vec<String> },
    /// Query synthesis through the completion provider.
    General,
}

/// Classify a question by case-insensitive substring match against the
/// trigger set. Any match suffices; order is irrelevant.
pub fn route(question: &str) -> RoutingDecision {
    let lower = question.to_lowercase();
    let matched: Vec<String> = TRIGGER_KEYWORDS
        .iter()
        .filter(|k| lower.contains(*k))
        .map(|k| k.to_string())
        .collect();

    if matched.is_empty() {
        RoutingDecision::General
    } else {
        info!("Forecast intent detected ({}), bypassing LLM", matched.join(", "));
        RoutingDecision::Forecast { matched }
    }
}

/// The statement the router synthesizes for the forecast path: full
/// unfiltered history. Trend extraction needs every row; filtering here
/// would corrupt the regression.
pub fn full_history_sql(table: &str) -> String {
    format!("SELECT * FROM \"{}\";", table)
}
