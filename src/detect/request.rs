//! Request snapshot inspected by the detectors.

use std::borrow::Cow;

use axum::body::Bytes;
use axum::http::{header, request::Parts, HeaderMap, Method};
use percent_encoding::percent_decode_str;

/// Immutable view over everything a detector may scan.
///
/// Built once per guard from the request parts and a buffered body; the
/// live request keeps its own copy of the body.
#[derive(Debug, Clone)]
pub struct InterceptedRequest {
    pub method: Method,
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub cookies: Vec<(String, String)>,
    /// Present only for `application/x-www-form-urlencoded` bodies.
    pub form: Option<Vec<(String, String)>>,
    pub body: Bytes,
}

impl InterceptedRequest {
    pub fn from_parts(parts: &Parts, body: Bytes) -> Self {
        let headers = parts.headers.clone();
        let cookies = parse_cookies(&headers);
        let form = if is_form(&headers) {
            serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body).ok()
        } else {
            None
        };

        Self {
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            query: parts.uri.query().map(str::to_string),
            headers,
            cookies,
            form,
            body,
        }
    }

    /// Body as text, lossily decoded.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Percent-decoded query pairs. Undecodable queries yield nothing here;
    /// the raw string is still scanned.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .and_then(|q| serde_urlencoded::from_str::<Vec<(String, String)>>(q).ok())
            .unwrap_or_default()
    }

    /// Path as routing extractors see it, percent-decoded.
    pub fn decoded_path(&self) -> Cow<'_, str> {
        percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Every header value, lossily decoded, paired with its name.
    pub fn header_values(&self) -> impl Iterator<Item = (&str, Cow<'_, str>)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), String::from_utf8_lossy(value.as_bytes())))
    }

    pub fn has_body_method(&self) -> bool {
        self.method == Method::POST || self.method == Method::PUT
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

fn parse_cookies(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .flat_map(|v| {
            String::from_utf8_lossy(v.as_bytes())
                .split(';')
                .filter_map(|pair| {
                    let (name, value) = pair.split_once('=')?;
                    Some((name.trim().to_string(), value.trim().to_string()))
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
