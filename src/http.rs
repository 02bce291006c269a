//! HTTP utilities for the engine REST API

use std::time::Duration;

use reqwest::{Client, Response};

use crate::config::ConnectionConfig;
use crate::error::{AdapterError, TransportError};

/// Create a reqwest client for one session
///
/// The client is configured with:
/// - the connection's request timeout (engine warmup can take minutes)
/// - 30 second connect timeout
/// - certificate verification unless `verify_certs` is off
pub fn create_client(config: &ConnectionConfig) -> Result<Client, AdapterError> {
    Client::builder()
        .pool_max_idle_per_host(16)
        .pool_idle_timeout(Duration::from_secs(90))
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(30))
        .danger_accept_invalid_certs(!config.verify_certs)
        .build()
        .map_err(|e| AdapterError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Check HTTP response status and return the engine's error if not successful
///
/// Engine errors look like `{"error": {"type": .., "reason": ..}, "status": 400}`;
/// some proxies answer with `{"message": ..}` or plain text instead.
pub async fn check_response(response: Response) -> Result<Response, TransportError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(parse_error_body(status, &body))
}

pub(crate) fn parse_error_body(status: u16, body: &str) -> TransportError {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return TransportError::Api {
            status,
            kind: None,
            reason: body.to_string(),
        };
    };

    let error = json.get("error");
    let kind = error
        .and_then(|e| e.get("type"))
        .and_then(|t| t.as_str())
        .map(|s| s.to_string());
    let reason = error
        .and_then(|e| e.get("reason").and_then(|r| r.as_str()))
        .or_else(|| error.and_then(|e| e.as_str()))
        .or_else(|| json.get("message").and_then(|m| m.as_str()))
        .map(|s| s.to_string())
        .unwrap_or_else(|| body.to_string());

    TransportError::Api {
        status,
        kind,
        reason,
    }
}
