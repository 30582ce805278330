use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;
use serde::Serialize;
use x402_gate::types::{Challenge, ChallengeEnvelope};

/// Terminal gate outcome rendered as an HTTP response.
///
/// Rejection messages are deliberately generic: the gate never discloses
/// which verification check failed.
#[derive(Debug, Clone)]
pub struct GateResponse {
    pub status: StatusCode,
    pub body: GateBody,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum GateBody {
    Challenge(ChallengeEnvelope),
    Error {
        error: String,
        #[serde(rename = "idempotencyKey", skip_serializing_if = "Option::is_none")]
        idempotency_key: Option<String>,
    },
}

impl GateResponse {
    /// Fresh challenge on first denial.
    pub fn challenge(challenge: Challenge) -> Self {
        GateResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: GateBody::Challenge(challenge.into()),
        }
    }

    /// Malformed, forged, mismatched, or expired proof.
    pub fn invalid_proof() -> Self {
        GateResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: GateBody::Error {
                error: "Invalid or expired payment proof".to_string(),
                idempotency_key: None,
            },
        }
    }

    /// Verified proof whose nonce was already consumed.
    pub fn nonce_replay() -> Self {
        GateResponse {
            status: StatusCode::PAYMENT_REQUIRED,
            body: GateBody::Error {
                error: "Payment proof replay detected".to_string(),
                idempotency_key: None,
            },
        }
    }

    /// Same idempotency key, different request.
    pub fn idempotency_conflict(key: &str) -> Self {
        GateResponse {
            status: StatusCode::CONFLICT,
            body: GateBody::Error {
                error: "Idempotency key was already used for a different request".to_string(),
                idempotency_key: Some(key.to_string()),
            },
        }
    }

    pub fn body_too_large() -> Self {
        GateResponse {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            body: GateBody::Error {
                error: "Request body too large".to_string(),
                idempotency_key: None,
            },
        }
    }

    pub fn internal(error: impl Into<String>) -> Self {
        GateResponse {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: GateBody::Error {
                error: error.into(),
                idempotency_key: None,
            },
        }
    }
}

impl IntoResponse for GateResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
