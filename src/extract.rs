//! Statement extraction from raw model output.
//!
//! Small local models wrap their SQL in markdown, narration, or both. The
//! extractor is an ordered chain of strategies, most reliable first:
//!
//! 1. a fenced ```sql code block, taken verbatim;
//! 2. otherwise the text after the last `SQL:` label (so SELECT keywords
//!    inside the preceding "Thought" narration are never matched), or the
//!    whole text when no label is present, scanned for the first SELECT up
//!    to a terminator (semicolon, blank line, or end of text).
//!
//! The surviving candidate is then cleaned: trailing explanatory prose is
//! truncated, only the text up to the first semicolon is kept, and residual
//! backticks are stripped. No candidate means extraction failed — a
//! recoverable outcome, not an error.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref FENCED_SQL: Regex = Regex::new(r"(?i)```sql\s*([\s\S]*?)\s*```").unwrap();
    static ref SQL_LABEL: Regex = Regex::new(r"(?i)SQL:\s*").unwrap();
    static ref SELECT_STMT: Regex = Regex::new(r"(?is)(SELECT\s.+?)(?:;|\n[ \t]*\n|\z)").unwrap();
    static ref PROSE_START: Regex = Regex::new(r"(?i)\n\s*(This|Here|Note|The query)").unwrap();
}

/// Extract exactly one executable statement from model output, or `None`
/// when nothing usable is present. Deterministic: the same input always
/// yields the same statement.
pub fn extract_statement(text: &str) -> Option<String> {
    let candidate = from_fenced_block(text).or_else(|| from_statement_text(text))?;
    Some(finalize(&candidate))
}

/// Strategy 1: fenced code block explicitly tagged as SQL.
fn from_fenced_block(text: &str) -> Option<String> {
    let captures = FENCED_SQL.captures(text)?;
    let raw = captures.get(1)?.as_str().trim();
    if raw.is_empty() {
        return None;
    }
    debug!("Extracted statement from fenced code block");
    Some(raw.to_string())
}

/// Strategies 2+3: restrict to text after the last `SQL:` label when one is
/// present, then match the first SELECT up to a terminator. When a label
/// exists but nothing follows it, extraction fails rather than falling back
/// to the narration above the label.
fn from_statement_text(text: &str) -> Option<String> {
    let scope = match SQL_LABEL.find_iter(text).last() {
        Some(label) => &text[label.end()..],
        None => text,
    };

    let captures = SELECT_STMT.captures(scope)?;
    let raw = captures.get(1)?.as_str().trim();
    if raw.is_empty() {
        return None;
    }
    debug!("Extracted statement from response text");
    Some(raw.to_string())
}

/// Final cleanup applied to whichever strategy fired.
fn finalize(candidate: &str) -> String {
    let mut sql = candidate.to_string();

    // Loose matching sometimes drags in the model's explanation
    if let Some(m) = PROSE_START.find(&sql) {
        sql = sql[..m.start()].trim().to_string();
    }

    // Keep only the first statement; drop anything chained after it
    match sql.find(';') {
        Some(idx) => sql.truncate(idx + 1),
        None => sql.push(';'),
    }

    sql.replace('`', "").trim().to_string()
}
