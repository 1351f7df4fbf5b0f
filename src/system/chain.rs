use thiserror::Error;
use tracing::debug;

use super::source::{Source, SourceReader};

/// Why one candidate's output was rejected. Never escapes a collector.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("no {0} found in output")]
    Missing(&'static str),

    #[error("expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("{field} is not a valid number: {value:?}")]
    Invalid { field: &'static str, value: String },
}

impl ParseError {
    pub fn invalid(field: &'static str, value: &str) -> Self {
        ParseError::Invalid {
            field,
            value: value.to_string(),
        }
    }
}

type Parser<'a, T> = Box<dyn Fn(&str) -> Result<T, ParseError> + 'a>;

pub struct Candidate<'a, T> {
    pub source: Source,
    parse: Parser<'a, T>,
}

impl<'a, T> Candidate<'a, T> {
    pub fn new(source: Source, parse: impl Fn(&str) -> Result<T, ParseError> + 'a) -> Self {
        Self {
            source,
            parse: Box::new(parse),
        }
    }
}

/// Reads and parses candidates in order, returning the first accepted value.
///
/// Every candidate is attempted at most once. Read, parse and validation
/// failures are logged and treated alike.
pub async fn first_success<R, T>(
    reader: &R,
    metric: &str,
    candidates: Vec<Candidate<'_, T>>,
) -> Option<T>
where
    R: SourceReader,
{
    for (attempt, candidate) in candidates.iter().enumerate() {
        if attempt > 0 {
            debug!(metric, source = %candidate.source, "falling back");
        }
        let raw = match reader.read(&candidate.source).await {
            Ok(raw) => raw,
            Err(err) => {
                debug!(metric, source = %candidate.source, error = %err, "source unavailable");
                continue;
            }
        };
        match (candidate.parse)(&raw) {
            Ok(value) => {
                debug!(metric, source = %candidate.source, "resolved");
                return Some(value);
            }
            Err(err) => {
                debug!(metric, source = %candidate.source, error = %err, "output rejected");
            }
        }
    }
    debug!(metric, "every candidate exhausted");
    None
}

pub fn first_line(raw: &str) -> Result<&str, ParseError> {
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(ParseError::Missing("data line"))
}
