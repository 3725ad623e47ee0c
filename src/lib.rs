//! Local natural-language question answering over tabular data.
//!
//! A question over a loaded CSV relation is either answered by a
//! deterministic forecasting procedure or translated into SQL by a local
//! language model, executed against the embedded store, and packaged into
//! a single structured response. Everything runs on the local machine;
//! the only endpoint involved is the local inference server.

pub mod engine;
pub mod error;
pub mod extract;
pub mod forecast;
pub mod llm;
pub mod prompt;
pub mod router;
pub mod schema;
pub mod store;

pub use engine::{EngineResponse, InsightEngine, VisualHint};
pub use error::{EngineError, Result};
