use axum::{
    async_trait,
    body::{Bytes, HttpBody},
    extract::{FromRequest, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    BoxError, Json,
};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use crate::domain::BankEvent;
use crate::error::AppError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "X-Bank-Signature";

/// Extractor that verifies the X-Bank-Signature header against the raw
/// request body using HMAC-SHA256.
pub struct VerifiedWebhook {
    pub body: Bytes,
}

impl VerifiedWebhook {
    /// Verify the signature using constant-time comparison
    pub fn verify_signature(secret: &str, body: &[u8], signature_header: &str) -> Result<(), AuthError> {
        let expected_signature =
            hex::decode(signature_header.trim()).map_err(|_| AuthError::InvalidSignatureFormat)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidSecret)?;
        mac.update(body);

        mac.verify_slice(&expected_signature)
            .map_err(|_| AuthError::SignatureMismatch)?;

        Ok(())
    }
}

#[async_trait]
impl<B> FromRequest<AppState, B> for VerifiedWebhook
where
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = AuthError;

    async fn from_request(req: Request<B>, state: &AppState) -> Result<Self, Self::Rejection> {
        let signature = req
            .headers()
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(AuthError::MissingSignature)?;

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|_| AuthError::BodyReadError)?;

        Self::verify_signature(&state.webhook_secret, &body, &signature)?;

        Ok(VerifiedWebhook { body })
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingSignature,
    InvalidSignatureFormat,
    InvalidSecret,
    SignatureMismatch,
    BodyReadError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingSignature => (StatusCode::UNAUTHORIZED, "Missing X-Bank-Signature header"),
            AuthError::InvalidSignatureFormat => (StatusCode::UNAUTHORIZED, "Invalid signature format"),
            AuthError::InvalidSecret => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Invalid webhook secret configuration",
            ),
            AuthError::SignatureMismatch => (StatusCode::UNAUTHORIZED, "Signature verification failed"),
            AuthError::BodyReadError => (StatusCode::BAD_REQUEST, "Failed to read request body"),
        };

        tracing::warn!("Webhook authentication failed: {:?}", self);
        (status, message).into_response()
    }
}

/// Inbound status push from the partner bank.
pub async fn bank_event(
    State(state): State<AppState>,
    webhook: VerifiedWebhook,
) -> Result<impl IntoResponse, AppError> {
    let event: BankEvent = serde_json::from_slice(&webhook.body)
        .map_err(|e| AppError::Validation(format!("invalid bank event: {}", e)))?;

    let body = match event {
        BankEvent::Transaction(event) => {
            let partition = state.lifecycle.reclassify(&event).await?;
            json!({ "status": "applied", "partition": partition })
        }
        BankEvent::Transfer(event) => {
            let transfer = state.transfers.apply_transfer_event(&event).await?;
            json!({ "status": "applied", "transfer_status": transfer.status })
        }
    };

    Ok((StatusCode::OK, Json(body)))
}
