//! Question answering over the selected text
//!
//! One submission is one `POST {context, question}` exchange. The reply is
//! folded into an [`AskOutcome`] by [`interpret`], which is the only place
//! that knows how status codes and payload fields map onto what the dialog
//! shows.

mod client;
mod service;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use client::{AskTransport, HttpTransport};
pub use service::{AskCompletion, AskService, AskTicket};

/// Shown when asking without a selection
pub const NO_SELECTION_MESSAGE: &str = "Please select some text first";
/// Shown for a failed reply that carries no message of its own
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed";
/// Shown when no usable reply arrived at all
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

pub const DEFAULT_ASK_ENDPOINT: &str = "http://127.0.0.1:8000/api/ask";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 360;

/// Request body
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub context: String,
    pub question: String,
}

impl AskRequest {
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            question: question.into(),
        }
    }
}

/// Response body; both fields are optional on the wire
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw HTTP reply as seen by the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

impl TransportReply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),
}

/// What the dialog ends up showing for one submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AskOutcome {
    Answered(String),
    Failed(String),
}

/// Fold a transport result into an outcome.
///
/// A reply whose body is not the expected JSON counts as a network failure,
/// same as not getting a reply at all.
#[must_use]
pub fn interpret(reply: Result<TransportReply, AskError>) -> AskOutcome {
    let reply = match reply {
        Ok(reply) => reply,
        Err(e) => {
            log::warn!("Ask request failed: {e}");
            return AskOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string());
        }
    };

    let response: AskResponse = match serde_json::from_str(&reply.body) {
        Ok(response) => response,
        Err(e) => {
            log::warn!("Unreadable ask response (status {}): {e}", reply.status);
            return AskOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string());
        }
    };

    let error = response.error.filter(|e| !e.is_empty());
    if !reply.is_success() || error.is_some() {
        log::info!("Ask endpoint reported failure (status {})", reply.status);
        return AskOutcome::Failed(error.unwrap_or_else(|| REQUEST_FAILED_MESSAGE.to_string()));
    }

    AskOutcome::Answered(response.answer.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> Result<TransportReply, AskError> {
        Ok(TransportReply {
            status,
            body: body.to_string(),
        })
    }

    #[test]
    fn request_serializes_both_fields() {
        let json = serde_json::to_string(&AskRequest::new("some text", "")).unwrap();
        assert_eq!(json, r#"{"context":"some text","question":""}"#);
    }

    #[test]
    fn answer_is_used_on_success() {
        assert_eq!(
            interpret(reply(200, r#"{"answer":"X"}"#)),
            AskOutcome::Answered("X".to_string())
        );
    }

    #[test]
    fn missing_answer_is_empty() {
        assert_eq!(interpret(reply(200, "{}")), AskOutcome::Answered(String::new()));
    }

    #[test]
    fn error_field_wins_even_with_success_status() {
        assert_eq!(
            interpret(reply(200, r#"{"answer":"ignored","error":"bad"}"#)),
            AskOutcome::Failed("bad".to_string())
        );
    }

    #[test]
    fn failure_status_uses_payload_or_generic_message() {
        assert_eq!(
            interpret(reply(500, r#"{"error":"bad"}"#)),
            AskOutcome::Failed("bad".to_string())
        );
        assert_eq!(
            interpret(reply(502, r#"{"answer":"X"}"#)),
            AskOutcome::Failed(REQUEST_FAILED_MESSAGE.to_string())
        );
        assert_eq!(
            interpret(reply(400, r#"{"error":""}"#)),
            AskOutcome::Failed(REQUEST_FAILED_MESSAGE.to_string())
        );
    }

    #[test]
    fn transport_or_parse_failure_is_network_error() {
        assert_eq!(
            interpret(Err(AskError::Unreachable("refused".to_string()))),
            AskOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string())
        );
        assert_eq!(
            interpret(reply(500, "<html>Internal Server Error</html>")),
            AskOutcome::Failed(NETWORK_ERROR_MESSAGE.to_string())
        );
    }
}
