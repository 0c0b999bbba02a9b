//! Shared response handling for the HTTP backends.

use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::warn;

use super::SourceError;

/// Turn a sent request into a JSON payload following the source error policy.
///
/// Timeouts, non-success statuses and undecodable bodies are logged and
/// mapped to `Ok(None)`. `401`/`403` become `Unauthorized`; every other
/// transport failure is returned as an error.
pub(crate) async fn json_or_absent(
    sent: Result<Response, reqwest::Error>,
    what: &'static str,
) -> Result<Option<Value>, SourceError> {
    let response = match sent {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            warn!(request = what, "request timed out");
            return Ok(None);
        }
        Err(e) => return Err(SourceError::Transport(e)),
    };

    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SourceError::Unauthorized {
            status: status.as_u16(),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(
            request = what,
            status = status.as_u16(),
            body = %body.chars().take(200).collect::<String>(),
            "HTTP error"
        );
        return Ok(None);
    }

    match response.json::<Value>().await {
        Ok(Value::Null) => {
            warn!(request = what, "empty response body");
            Ok(None)
        }
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(request = what, error = %e, "could not decode response");
            Ok(None)
        }
    }
}
