use std::{fmt, time::Duration};

use crate::request::GraphQlRequest;

/// Failures surfaced while executing a request, before any assertion runs.
///
/// Assertion failures are deliberately not part of this enum: a failed
/// check panics at the call site with an [`AssertionMismatch`] report, so a
/// test that wants to verify execution behavior can still `match` on the
/// execution outcome.
#[derive(Debug, thiserror::Error)]
pub enum TesterError {
    #[error("cannot execute a request without a query")]
    MissingQuery,

    #[error("no response after {elapsed:?} for {request:?}")]
    ResponseTimeout {
        elapsed: Duration,
        request: Box<GraphQlRequest>,
    },

    #[error("unexpected {status} response: {reason}")]
    Transport {
        status: http::StatusCode,
        headers: http::HeaderMap,
        reason: String,
    },

    #[error("could not decode response: {reason}")]
    Decode { reason: String, snippet: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Everything a failed response assertion knows, rendered into the panic
/// message: the queried path, what was expected there, what was actually
/// found, the checks that already ran on the same response, and the full
/// document.
#[derive(Debug)]
pub struct AssertionMismatch {
    pub path: String,
    pub expected: String,
    pub actual: String,
    pub checks: Vec<String>,
    pub document: String,
}

impl fmt::Display for AssertionMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "assertion failed at path `{}`", self.path)?;
        writeln!(f, "  expected: {}", self.expected)?;
        writeln!(f, "  actual: {}", self.actual)?;
        if !self.checks.is_empty() {
            writeln!(f, "checks so far on this response:")?;
            for check in &self.checks {
                writeln!(f, "  - {check}")?;
            }
        }
        write!(f, "response document:\n{}", self.document)
    }
}
