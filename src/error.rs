use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bigdecimal::BigDecimal;
use serde_json::json;
use thiserror::Error;

use crate::bank::BankError;
use crate::domain::EndpointType;
use crate::ports::RepositoryError;
use crate::translation::TranslationGap;
use crate::validation::ValidationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: BigDecimal,
        available: BigDecimal,
    },

    #[error("Transfer limit exceeded: {requested} is above the {limit} limit for aggregator-linked accounts")]
    LimitExceeded { requested: BigDecimal, limit: BigDecimal },

    #[error("Unsupported route: {from} to {to}")]
    UnsupportedRoute { from: EndpointType, to: EndpointType },

    #[error("{message}")]
    BankRejected { code: Option<u32>, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Translation gap: {0}")]
    TranslationGap(#[from] TranslationGap),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InsufficientFunds { .. }
            | AppError::LimitExceeded { .. }
            | AppError::UnsupportedRoute { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BankRejected { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AppError::TranslationGap(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Repository(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller. Infrastructure failures are
    /// reduced to a generic text; the detail only goes to the log.
    fn public_message(&self) -> String {
        match self {
            AppError::Repository(_) | AppError::Internal(_) => "internal error".to_string(),
            AppError::Upstream(_) | AppError::TranslationGap(_) => {
                "upstream service unavailable".to_string()
            }
            other => other.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::InsufficientFunds { .. } => "insufficient_funds",
            AppError::LimitExceeded { .. } => "limit_exceeded",
            AppError::UnsupportedRoute { .. } => "unsupported_route",
            AppError::BankRejected { .. } => "bank_rejected",
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::TranslationGap(_) => "translation_gap",
            AppError::Repository(_) | AppError::Internal(_) => "internal",
            AppError::Upstream(_) => "upstream",
        }
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Repository(other),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<BankError> for AppError {
    fn from(err: BankError) -> Self {
        match err {
            BankError::Rejected { code, message } => AppError::BankRejected { code, message },
            BankError::TransferNotFound(id) => AppError::NotFound(format!("bank transfer {}", id)),
            BankError::Translation(gap) => AppError::TranslationGap(gap),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = json!({
            "error": self.public_message(),
            "kind": self.kind(),
            "status": status.as_u16(),
        });
        if let AppError::BankRejected { code: Some(code), .. } = &self {
            body["bank_code"] = json!(code);
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_status_code() {
        let error = AppError::Validation("source_id: must not be empty".to_string());
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_limit_errors_are_unprocessable() {
        let error = AppError::LimitExceeded {
            requested: BigDecimal::from(1500),
            limit: BigDecimal::from(1000),
        };
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let error = AppError::InsufficientFunds {
            requested: BigDecimal::from(10),
            available: BigDecimal::from(5),
        };
        assert_eq!(error.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_not_found_from_repository() {
        let error: AppError = RepositoryError::NotFound("transfer".to_string()).into();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_database_error_is_hidden() {
        let error: AppError = RepositoryError::Database(sqlx::Error::PoolTimedOut).into();
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.public_message(), "internal error");
    }

    #[test]
    fn test_bank_rejection_keeps_bank_message() {
        let error = AppError::BankRejected {
            code: Some(205),
            message: "Account frozen".to_string(),
        };
        assert_eq!(error.public_message(), "Account frozen");
        assert_eq!(error.status_code(), StatusCode::PAYMENT_REQUIRED);
    }

    #[test]
    fn test_unauthorized_error_status_code() {
        let error = AppError::Unauthorized("account belongs to another business".to_string());
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_translation_gap_response() {
        let error = AppError::TranslationGap(TranslationGap {
            table: "transaction_status",
            code: "NEW_CODE".to_string(),
        });
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unsupported_route_response() {
        let error = AppError::UnsupportedRoute {
            from: EndpointType::Card,
            to: EndpointType::Card,
        };
        let response = error.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
