//! Deterministic trend forecasting.
//!
//! Ordinary least-squares regression over a row sequence: the row position
//! is the independent variable, the parsed value column is the dependent
//! one. No model, no sampling — the same input always yields the same
//! forecast.

use crate::error::{EngineError, Result};
use crate::store::Row;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Number of synthetic future points generated by default.
pub const DEFAULT_HORIZON: usize = 6;

/// Row key marking a synthetic forecast point.
pub const FORECAST_FLAG: &str = "isForecast";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Increasing => write!(f, "increasing"),
            Trend::Decreasing => write!(f, "decreasing"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    pub trend: Trend,
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination of the fit. Exactly 1.0 for a constant
    /// series; may be negative when the fit is worse than the mean.
    pub confidence: f64,
    pub explanation: String,
    /// Synthetic future points, labeled `Forecast N` and flagged with
    /// [`FORECAST_FLAG`].
    pub points: Vec<Row>,
}

/// Pick the (time, value) columns for a forecast over `columns`.
///
/// Time column: first name containing a date-like token, else the first
/// column. Value column: first other column whose sampled value parses as a
/// finite number, else the second column unconditionally — which may be
/// non-numeric; the regression then sees no valid points and fails with
/// insufficient data.
pub fn select_forecast_columns(columns: &[String], sample: &Row) -> (String, String) {
    const DATE_TOKENS: [&str; 5] = ["date", "time", "year", "month", "day"];

    let time_col = columns
        .iter()
        .find(|c| {
            let lower = c.to_lowercase();
            DATE_TOKENS.iter().any(|t| lower.contains(t))
        })
        .or_else(|| columns.first())
        .cloned()
        .unwrap_or_default();

    let value_col = columns
        .iter()
        .filter(|c| **c != time_col)
        .find(|c| sample.get(c.as_str()).and_then(json_to_finite).is_some())
        .or_else(|| columns.get(1))
        .or_else(|| columns.first())
        .cloned()
        .unwrap_or_default();

    (time_col, value_col)
}

/// Least-squares trend fit and extrapolation.
///
/// Rows whose value column does not parse as a finite number are discarded;
/// fewer than 2 surviving points is an explicit insufficient-data failure,
/// never a degenerate regression.
pub fn create_forecast(
    rows: &[Row],
    time_col: &str,
    value_col: &str,
    horizon: usize,
) -> Result<ForecastResult> {
    let ys: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.get(value_col).and_then(json_to_finite))
        .collect();

    let n = ys.len();
    if n < 2 {
        return Err(EngineError::InsufficientData(format!(
            "need at least 2 numeric points in column \"{}\", found {}",
            value_col, n
        )));
    }

    let n_f = n as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_xx = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let slope = (n_f * sum_xy - sum_x * sum_y) / (n_f * sum_xx - sum_x * sum_x);
    let intercept = (sum_y - slope * sum_x) / n_f;

    let y_mean = sum_y / n_f;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let y_pred = slope * i as f64 + intercept;
        ss_res += (y - y_pred).powi(2);
        ss_tot += (y - y_mean).powi(2);
    }
    // Constant series: total variance is zero, a flat line fits it exactly
    let confidence = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    let trend = if slope > 0.0 {
        Trend::Increasing
    } else if slope < 0.0 {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    let points: Vec<Row> = (0..horizon)
        .map(|i| {
            let x = (n + i) as f64;
            let mut row = Row::new();
            row.insert(
                time_col.to_string(),
                serde_json::Value::String(format!("Forecast {}", i + 1)),
            );
            row.insert(
                value_col.to_string(),
                serde_json::Number::from_f64(slope * x + intercept)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null),
            );
            row.insert(FORECAST_FLAG.to_string(), serde_json::Value::Bool(true));
            row
        })
        .collect();

    let explanation = format!(
        "Analysis shows a **{}** trend with a confidence of {:.1}%.",
        trend,
        confidence * 100.0
    );
    info!(
        "Forecast over {} points: trend={}, slope={:.4}, r2={:.4}",
        n, trend, slope, confidence
    );

    Ok(ForecastResult {
        trend,
        slope,
        intercept,
        confidence,
        explanation,
        points,
    })
}

fn json_to_finite(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}
