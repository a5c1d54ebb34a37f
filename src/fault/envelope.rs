//! The JSON error envelope returned for every fault.

use serde::{Deserialize, Serialize};

use crate::config::Environment;
use crate::fault::Fault;

/// Uniform error body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub is_error: bool,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub str_message: String,
    pub result: Option<ErrorDetail>,
}

/// Diagnostics attached outside production.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub exception: String,
    pub inner_exception: Option<String>,
    pub trace_id: String,
    pub stack_trace: Option<String>,
}

impl ErrorEnvelope {
    pub fn from_fault(fault: &Fault, environment: Environment, trace_id: &str) -> Self {
        if environment.is_production() {
            return Self {
                is_error: true,
                title: fault.kind().title().to_string(),
                kind: "Error".to_string(),
                str_message: fault.kind().public_message().to_string(),
                result: None,
            };
        }

        Self {
            is_error: true,
            title: fault.kind().title().to_string(),
            kind: "Error".to_string(),
            str_message: fault.message().to_string(),
            result: Some(ErrorDetail {
                exception: fault.error_type().to_string(),
                inner_exception: fault.inner().map(str::to_string),
                trace_id: trace_id.to_string(),
                stack_trace: fault.stack_trace(),
            }),
        }
    }
}
