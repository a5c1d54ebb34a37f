//! SQL injection detection.
//!
//! Flags SQL keywords as whole words (any case), comment markers and
//! statement terminators in the query string, and in the body of POST and
//! PUT requests. This is deliberately coarse: free text containing "and" or
//! "or" is blocked too.

use crate::detect::{Detector, InterceptedRequest, PatternSet, ThreatCategory, Verdict};

const PATTERNS: &[(&str, &str)] = &[
    (
        "keyword",
        r"(?i)\b(?:SELECT|INSERT|UPDATE|DELETE|DROP|EXEC|UNION|JOIN|OR|AND)\b",
    ),
    ("comment", r"--|#"),
    ("terminator", r";"),
];

pub struct SqlInjectionDetector {
    patterns: PatternSet,
}

impl SqlInjectionDetector {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            patterns: PatternSet::new(ThreatCategory::SqlInjection, PATTERNS)?,
        })
    }
}

impl Detector for SqlInjectionDetector {
    fn category(&self) -> ThreatCategory {
        ThreatCategory::SqlInjection
    }

    fn scan(&self, request: &InterceptedRequest) -> Verdict {
        let threat = self.patterns.check_query(request).or_else(|| {
            if request.has_body_method() {
                self.patterns.check("body", &request.body_text())
            } else {
                None
            }
        });
        threat.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::Request;

    fn scan(builder: axum::http::request::Builder, body: &'static str) -> Verdict {
        let (parts, _) = builder.body(()).unwrap().into_parts();
        let request = InterceptedRequest::from_parts(&parts, Bytes::from_static(body.as_bytes()));
        SqlInjectionDetector::new().unwrap().scan(&request)
    }

    fn pattern(verdict: Verdict) -> &'static str {
        match verdict {
            Verdict::Blocked(threat) => {
                assert_eq!(threat.category, ThreatCategory::SqlInjection);
                threat.pattern
            }
            Verdict::Allowed => panic!("expected a block"),
        }
    }

    #[test]
    fn test_tautology_in_query() {
        let verdict = scan(Request::get("/users?id=1%20OR%201=1"), "");
        assert_eq!(pattern(verdict), "keyword");
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert!(scan(Request::get("/x?q=union+select+password"), "").is_blocked());
        assert!(scan(Request::get("/x?q=DrOp"), "").is_blocked());
    }

    #[test]
    fn test_keyword_inside_word_is_allowed() {
        assert!(!scan(Request::get("/x?q=selection&sort=ordering&brand=android"), "").is_blocked());
    }

    #[test]
    fn test_comment_and_terminator() {
        assert_eq!(pattern(scan(Request::get("/x?name=admin%27--"), "")), "comment");
        assert_eq!(pattern(scan(Request::get("/x?name=a%23b"), "")), "comment");
        assert_eq!(pattern(scan(Request::get("/x?a=1;b=2"), "")), "terminator");
    }

    #[test]
    fn test_post_body_scanned() {
        let verdict = scan(Request::post("/api/users"), "{\"name\":\"x'; DROP TABLE users\"}");
        assert!(verdict.is_blocked());

        let verdict = scan(Request::put("/api/users/1"), "{\"bio\":\"rock and roll\"}");
        assert_eq!(pattern(verdict), "keyword");
    }

    #[test]
    fn test_get_and_delete_bodies_ignored() {
        assert!(!scan(Request::get("/api/users"), "DROP TABLE users;").is_blocked());
        assert!(!scan(Request::delete("/api/users/1"), "DROP TABLE users;").is_blocked());
    }

    #[test]
    fn test_clean_request_allowed() {
        let verdict = scan(
            Request::post("/api/items?page=2&size=20"),
            "{\"title\":\"Widget\",\"qty\":3}",
        );
        assert_eq!(verdict, Verdict::Allowed);
    }
}
