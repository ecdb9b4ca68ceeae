use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::messaging::RelayFailure;

/// Terminal failure of a single webhook request. Nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// ROBLOX_API_KEY or UNIVERSE_ID is not configured
    #[error("Server configuration error - Missing Roblox credentials")]
    MissingCredentials,

    /// Strict token policy, no token supplied
    #[error("Webhook token required")]
    TokenMissing,

    /// Strict token policy, token did not match
    #[error("Invalid webhook token")]
    TokenInvalid,

    /// MessagingService call failed
    #[error(transparent)]
    Relay(#[from] RelayFailure),
}

impl WebhookError {
    pub fn kind(&self) -> &'static str {
        match self {
            WebhookError::MissingCredentials => "configuration_error",
            WebhookError::TokenMissing => "auth_missing",
            WebhookError::TokenInvalid => "auth_invalid",
            WebhookError::Relay(_) => "relay_error",
        }
    }
}

impl ResponseError for WebhookError {
    fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::TokenMissing => StatusCode::UNAUTHORIZED,
            WebhookError::TokenInvalid => StatusCode::FORBIDDEN,
            WebhookError::MissingCredentials | WebhookError::Relay(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = serde_json::json!({
            "success": false,
            "kind": self.kind(),
            "error": self.to_string(),
        });

        if let WebhookError::Relay(failure) = self {
            if let Some(status) = failure.status() {
                body["status"] = serde_json::json!(status);
            }
            body["details"] = failure
                .details()
                .cloned()
                .unwrap_or_else(|| serde_json::json!("No additional details"));
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            WebhookError::MissingCredentials.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            WebhookError::TokenMissing.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            WebhookError::TokenInvalid.status_code(),
            StatusCode::FORBIDDEN
        );
        let relay = WebhookError::from(RelayFailure::Timeout { timeout_ms: 5000 });
        assert_eq!(relay.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(relay.kind(), "relay_error");
    }

    #[test]
    fn test_config_error_message() {
        assert_eq!(
            WebhookError::MissingCredentials.to_string(),
            "Server configuration error - Missing Roblox credentials"
        );
        assert_eq!(WebhookError::MissingCredentials.kind(), "configuration_error");
    }
}
