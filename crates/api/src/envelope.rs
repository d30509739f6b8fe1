//! Response envelope shared by every endpoint.
//!
//! Recovered validation failures are successful at the transport level:
//! the envelope carries the error code and message in an HTTP 200 body.
//! Only the serializer itself failing would produce a non-200.

use axum::Json;
use axum::response::{IntoResponse, Response};
use engine::EngineError;
use serde::Serialize;

/// `{code, success, data?, message?}` result body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub code: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful result wrapping `data`.
    pub fn success(data: T) -> Self {
        Self {
            code: "200".to_string(),
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// A recovered failure with an external code and message.
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }

    /// Missing or unusable caller identity.
    pub fn unauthorized() -> Self {
        Self::error("401", "Unauthorized")
    }
}

impl<T> From<EngineError> for Envelope<T> {
    fn from(err: EngineError) -> Self {
        if let EngineError::Internal(source) = &err {
            tracing::error!(error = %source, "internal error");
        }
        Envelope::error(err.code(), err.to_string())
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_shape() {
        let env = Envelope::success(7);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], "200");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"], 7);
        assert!(json.get("message").is_none());
    }

    #[test]
    fn test_error_shape() {
        let env: Envelope<()> = Envelope::error("404", "Order not found: 3");
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["code"], "404");
        assert_eq!(json["success"], false);
        assert!(json.get("data").is_none());
        assert_eq!(json["message"], "Order not found: 3");
    }

    #[test]
    fn test_engine_error_conversion() {
        let env: Envelope<()> = EngineError::InsufficientStock.into();
        assert_eq!(env.code, "400");
        assert_eq!(env.message.as_deref(), Some("Insufficient stock"));
    }
}
