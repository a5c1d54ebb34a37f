//! Threat detection subsystem.
//!
//! # Data Flow
//! ```text
//! Request parts + buffered body
//!     → request.rs (InterceptedRequest snapshot)
//!     → xss.rs / sql.rs (pattern scan over each surface)
//!     → Verdict::Allowed | Verdict::Blocked(Threat)
//! ```
//!
//! # Design Decisions
//! - Detectors are pure: no HTTP context, no I/O, trivially unit-testable
//! - First match wins; the verdict names the surface and the pattern that fired
//! - Query strings are scanned raw and percent-decoded

pub mod request;
pub mod sql;
pub mod xss;

use regex::Regex;
use serde::Serialize;

pub use request::InterceptedRequest;
pub use sql::SqlInjectionDetector;
pub use xss::XssDetector;

/// Kind of attack a detector looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatCategory {
    Xss,
    SqlInjection,
}

impl ThreatCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatCategory::Xss => "xss",
            ThreatCategory::SqlInjection => "sql_injection",
        }
    }

    /// Text returned to the client when a request is blocked.
    pub fn description(&self) -> &'static str {
        match self {
            ThreatCategory::Xss => "XSS Detected in Request",
            ThreatCategory::SqlInjection => "SQL Injection detected. Your request is blocked.",
        }
    }
}

impl std::fmt::Display for ThreatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A positive detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Threat {
    pub category: ThreatCategory,
    /// Surface that matched, e.g. `query`, `header:referer`, `cookie:session`, `body`.
    pub field: String,
    /// Name of the pattern that matched.
    pub pattern: &'static str,
}

/// Outcome of scanning one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allowed,
    Blocked(Threat),
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked(_))
    }
}

/// A request classifier.
pub trait Detector: Send + Sync {
    fn category(&self) -> ThreatCategory;

    fn scan(&self, request: &InterceptedRequest) -> Verdict;
}

/// Named, compiled patterns for one category.
pub(crate) struct PatternSet {
    category: ThreatCategory,
    patterns: Vec<(&'static str, Regex)>,
}

impl PatternSet {
    pub(crate) fn new(
        category: ThreatCategory,
        sources: &[(&'static str, &str)],
    ) -> Result<Self, regex::Error> {
        let patterns = sources
            .iter()
            .map(|(name, source)| Regex::new(source).map(|re| (*name, re)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { category, patterns })
    }

    /// First pattern matching `text`, reported against `field`.
    pub(crate) fn check(&self, field: &str, text: &str) -> Option<Threat> {
        if text.trim().is_empty() {
            return None;
        }
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(name, _)| Threat {
                category: self.category,
                field: field.to_string(),
                pattern: name,
            })
    }

    /// Scan the query string raw, then each decoded key and value.
    pub(crate) fn check_query(&self, request: &InterceptedRequest) -> Option<Threat> {
        let raw = request.query.as_deref()?;
        self.check("query", raw).or_else(|| {
            request
                .query_pairs()
                .iter()
                .find_map(|(k, v)| self.check("query", k).or_else(|| self.check("query", v)))
        })
    }
}

impl From<Option<Threat>> for Verdict {
    fn from(threat: Option<Threat>) -> Self {
        match threat {
            Some(threat) => Verdict::Blocked(threat),
            None => Verdict::Allowed,
        }
    }
}
