//! Cross-site scripting detection.
//!
//! Scans path, query, header values, cookie values, form fields and the raw
//! body for script tags, script-capable URI schemes and inline event handlers.

use crate::detect::{Detector, InterceptedRequest, PatternSet, ThreatCategory, Verdict};

const PATTERNS: &[(&str, &str)] = &[
    ("script_tag", r"(?is)<script\b.*?>.*?</script\s*>"),
    ("uri_scheme", r"(?i)\b(?:javascript|vbscript|data)\s*:"),
    ("event_handler", r"(?i)<[^>]*\s+on\w+\s*="),
];

pub struct XssDetector {
    patterns: PatternSet,
}

impl XssDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: PatternSet::new(ThreatCategory::Xss, PATTERNS)?,
        })
    }
}

impl Detector for XssDetector {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::Xss
    }

    fn scan(&self, request: &InterceptedRequest) -> Verdict {
        let p = &self.patterns;

        let threat = p
            .check("path", &request.path)
            .or_else(|| p.check("path", &request.decoded_path()))
            .or_else(|| p.check_query(request))
            .or_else(|| {
                request
                    .header_values()
                    .find_map(|(name, value)| p.check(&format!("header:{}", name), &value))
            })
            .or_else(|| {
                request
                    .cookies
                    .iter()
                    .find_map(|(name, value)| p.check(&format!("cookie:{}", name), value))
            })
            .or_else(|| {
                request.form.as_ref().and_then(|fields| {
                    fields
                        .iter()
                        .find_map(|(name, value)| p.check(&format!("form:{}", name), value))
                })
            })
            .or_else(|| p.check("body", &request.body_text()));

        threat.into()
    }
}
