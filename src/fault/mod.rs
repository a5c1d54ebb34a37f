//! Fault model and exception translation.
//!
//! # Data Flow
//! ```text
//! handler / middleware returns Err(Fault)
//!     → Fault::into_response (status only, fault stored in extensions)
//!     → translator.rs (log, render ErrorEnvelope by environment)
//!     → client
//!
//! panic anywhere below the translator
//!     → translator.rs (catch_unwind → Fault::internal)
//! ```
//!
//! # Design Decisions
//! - Failures are values: handlers return `Result<_, Fault>`
//! - Rendering is centralised so every fault gets the same envelope
//! - Diagnostic detail is decided by environment at render time, not at raise time

pub mod envelope;
pub mod translator;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::backtrace::{Backtrace, BacktraceStatus};
use std::sync::Arc;

use crate::crypto::CodecError;

pub use envelope::{ErrorDetail, ErrorEnvelope};
pub use translator::translate_faults;

/// Category of a fault; fixes the status code and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    NotFound,
    InvalidOperation,
    Unauthorized,
    InvalidArgument,
    Timeout,
    PayloadDecode,
    Internal,
}

impl FaultKind {
    pub fn status(&self) -> StatusCode {
        match self {
            FaultKind::NotFound => StatusCode::NOT_FOUND,
            FaultKind::InvalidOperation => StatusCode::BAD_REQUEST,
            FaultKind::Unauthorized => StatusCode::UNAUTHORIZED,
            FaultKind::InvalidArgument => StatusCode::BAD_REQUEST,
            FaultKind::Timeout => StatusCode::REQUEST_TIMEOUT,
            FaultKind::PayloadDecode => StatusCode::BAD_REQUEST,
            FaultKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "Not Found",
            FaultKind::InvalidOperation => "Invalid Operation",
            FaultKind::Unauthorized => "Unauthorized",
            FaultKind::InvalidArgument => "Invalid Argument",
            FaultKind::Timeout => "Timeout",
            FaultKind::PayloadDecode => "Invalid Payload",
            FaultKind::Internal => "Error",
        }
    }

    /// Message shown in production in place of the fault's own text.
    pub fn public_message(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "The requested resource was not found.",
            FaultKind::InvalidOperation => "The request cannot be processed in the current state.",
            FaultKind::Unauthorized => "You are not authorized to perform this request.",
            FaultKind::InvalidArgument => "One or more request values are invalid.",
            FaultKind::Timeout => "The operation timed out. Please try again later.",
            FaultKind::PayloadDecode => "The encrypted payload could not be decoded.",
            FaultKind::Internal => "An unexpected error occurred. Please try again later.",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::NotFound => "not_found",
            FaultKind::InvalidOperation => "invalid_operation",
            FaultKind::Unauthorized => "unauthorized",
            FaultKind::InvalidArgument => "invalid_argument",
            FaultKind::Timeout => "timeout",
            FaultKind::PayloadDecode => "payload_decode",
            FaultKind::Internal => "internal",
        }
    }
}

/// A failure raised by a handler or by the pipeline itself.
#[derive(Debug, Clone)]
pub struct Fault {
    kind: FaultKind,
    message: String,
    error_type: String,
    inner: Option<String>,
    backtrace: Arc<Backtrace>,
}

impl Fault {
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            error_type: "Fault".to_string(),
            inner: None,
            backtrace: Arc::new(Backtrace::capture()),
        }
    }

    /// Wrap a concrete error, keeping its type name and source message.
    pub fn from_error<E>(kind: FaultKind, err: &E) -> Self
    where
        E: std::error::Error,
    {
        let mut fault = Self::new(kind, err.to_string());
        fault.error_type = std::any::type_name::<E>().to_string();
        fault.inner = err.source().map(|s| s.to_string());
        fault
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FaultKind::NotFound, message)
    }

    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidOperation, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Unauthorized, message)
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(FaultKind::InvalidArgument, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self
    }

    pub fn with_inner(mut self, inner: impl Into<String>) -> Self {
        self.inner = Some(inner.into());
        self
    }

    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn error_type(&self) -> &str {
        &self.error_type
    }

    pub fn inner(&self) -> Option<&str> {
        self.inner.as_deref()
    }

    /// Captured stack, if backtraces are enabled (`RUST_BACKTRACE=1`).
    pub fn stack_trace(&self) -> Option<String> {
        match self.backtrace.status() {
            BacktraceStatus::Captured => Some(self.backtrace.to_string()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.title(), self.message)
    }
}

impl std::error::Error for Fault {}

impl IntoResponse for Fault {
    fn into_response(self) -> Response {
        let mut response = self.status().into_response();
        response.extensions_mut().insert(self);
        response
    }
}

impl From<serde_json::Error> for Fault {
    fn from(err: serde_json::Error) -> Self {
        Fault::from_error(FaultKind::InvalidArgument, &err)
    }
}

impl From<tokio::time::error::Elapsed> for Fault {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Fault::from_error(FaultKind::Timeout, &err)
    }
}

impl From<std::io::Error> for Fault {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::NotFound => FaultKind::NotFound,
            ErrorKind::PermissionDenied => FaultKind::Unauthorized,
            ErrorKind::TimedOut => FaultKind::Timeout,
            ErrorKind::InvalidInput | ErrorKind::InvalidData => FaultKind::InvalidArgument,
            _ => FaultKind::Internal,
        };
        Fault::from_error(kind, &err)
    }
}

impl From<CodecError> for Fault {
    fn from(err: CodecError) -> Self {
        let kind = if err.is_malformed_token() {
            FaultKind::PayloadDecode
        } else {
            FaultKind::Internal
        };
        Fault::from_error(kind, &err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table() {
        assert_eq!(Fault::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(Fault::invalid_operation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Fault::unauthorized("x").status(), StatusCode::UNAUTHORIZED);
        assert_eq!(Fault::invalid_argument("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Fault::timeout("x").status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(Fault::internal("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(FaultKind::Internal.title(), "Error");
    }

    #[test]
    fn test_io_error_mapping() {
        let cases = [
            (std::io::ErrorKind::NotFound, FaultKind::NotFound),
            (std::io::ErrorKind::PermissionDenied, FaultKind::Unauthorized),
            (std::io::ErrorKind::TimedOut, FaultKind::Timeout),
            (std::io::ErrorKind::InvalidData, FaultKind::InvalidArgument),
            (std::io::ErrorKind::BrokenPipe, FaultKind::Internal),
        ];
        for (io_kind, expected) in cases {
            let fault = Fault::from(std::io::Error::new(io_kind, "boom"));
            assert_eq!(fault.kind(), expected);
            assert_eq!(fault.message(), "boom");
            assert!(fault.error_type().ends_with("Error"));
        }
    }

    #[test]
    fn test_json_error_is_invalid_argument() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let fault = Fault::from(err);
        assert_eq!(fault.kind(), FaultKind::InvalidArgument);
        assert!(fault.error_type().contains("serde_json"));
    }

    #[test]
    fn test_codec_error_mapping() {
        assert_eq!(Fault::from(CodecError::Padding).kind(), FaultKind::PayloadDecode);
        assert_eq!(Fault::from(CodecError::MissingKey("active AEAD")).kind(), FaultKind::Internal);
    }

    #[test]
    fn test_into_response_carries_fault() {
        let response = Fault::not_found("item 7").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let fault = response.extensions().get::<Fault>().unwrap();
        assert_eq!(fault.message(), "item 7");
    }
}
