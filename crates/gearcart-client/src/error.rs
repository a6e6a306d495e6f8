use thiserror::Error;

/// Shown to the user when the backend did not supply a message of its own.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors returned by the storefront cart API client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status. `message` is the text
    /// extracted from the response body, if it carried one.
    #[error("cart API error (HTTP {status}): {}", .message.as_deref().unwrap_or("no message"))]
    Api {
        status: u16,
        message: Option<String>,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl ClientError {
    /// Text suitable for showing to the shopper: the backend's own message
    /// when one was returned, otherwise [`FALLBACK_MESSAGE`].
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api {
                message: Some(message),
                ..
            } => message.clone(),
            _ => FALLBACK_MESSAGE.to_owned(),
        }
    }

    /// HTTP status of an API-level rejection, if that is what this is.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            ClientError::Deserialize { .. } | ClientError::InvalidBaseUrl(_) => None,
        }
    }
}

/// Pulls a human-readable message out of an error response body.
///
/// Looks for a non-empty `message`, `error`, or `detail` string at the top
/// level, then inside an `error` object.
pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    message_field(&value).or_else(|| value.get("error").and_then(message_field))
}

fn message_field(value: &serde_json::Value) -> Option<String> {
    ["message", "error", "detail"].iter().find_map(|key| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
    })
}
