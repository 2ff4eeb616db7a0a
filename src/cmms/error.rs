//! Error taxonomy for requests against the maintenance API.

use std::time::Duration;

/// Failure of a single API request.
///
/// Transport and HTTP failures both surface to views as a "request failed"
/// condition; `display_message` is what ends up in the notification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
  /// No response was received
  #[error("network error: {0}")]
  Transport(String),
  /// The request did not complete within the configured timeout
  #[error("request timed out after {}s", .0.as_secs())]
  Timeout(Duration),
  /// The server answered with a non-success status
  #[error("{message}")]
  Status { status: u16, message: String },
  /// The response body did not match the expected shape
  #[error("unexpected response from {path}: {reason}")]
  Decode { path: String, reason: String },
  /// Refused by the client before anything was sent
  #[error("{0}")]
  Invalid(String),
}

impl ApiError {
  /// Build a status error from a raw response body.
  ///
  /// Uses the body's `message` field when the body is a JSON object carrying
  /// a string message, otherwise falls back to a generic message.
  pub fn from_response(status: u16, body: &[u8]) -> Self {
    let message = serde_json::from_slice::<serde_json::Value>(body)
      .ok()
      .and_then(|v| {
        v.get("message")
          .and_then(|m| m.as_str())
          .map(str::trim)
          .filter(|m| !m.is_empty())
          .map(String::from)
      })
      .unwrap_or_else(|| format!("Request failed with status {}", status));

    ApiError::Status { status, message }
  }

  /// True when the server rejected the session.
  pub fn is_unauthorized(&self) -> bool {
    matches!(self, ApiError::Status { status: 401, .. })
  }

  /// Whether an idempotent request may be retried after this error.
  pub fn is_transient(&self) -> bool {
    match self {
      ApiError::Transport(_) | ApiError::Timeout(_) => true,
      ApiError::Status { status, .. } => *status == 429 || *status >= 500,
      ApiError::Decode { .. } | ApiError::Invalid(_) => false,
    }
  }

  /// Human-readable message for notifications.
  pub fn display_message(&self) -> String {
    match self {
      ApiError::Transport(_) => "Unable to reach the server".to_string(),
      ApiError::Timeout(_) => "The server took too long to respond".to_string(),
      ApiError::Status { message, .. } => message.clone(),
      ApiError::Decode { .. } => "The server sent an unexpected response".to_string(),
      ApiError::Invalid(message) => message.clone(),
    }
  }
}
