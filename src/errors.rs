use crate::services::{
    grant_service::GrantError, metadata_store::StoreError, object_store::ObjectStoreError,
    signer::SignatureError,
};
use axum::{
    Json,
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for handler errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = self.status.as_u16(), "{}", self.message);
        }
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

/// Malformed bodies and query strings are client errors with the usual JSON
/// error body, whatever status axum would pick on its own.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<GrantError> for AppError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::InvalidContentType(_) => AppError::bad_request(err.to_string()),
            GrantError::Signing(_) => AppError::internal(err.to_string()),
        }
    }
}

impl From<ObjectStoreError> for AppError {
    fn from(err: ObjectStoreError) -> Self {
        let status = match &err {
            ObjectStoreError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
            ObjectStoreError::AlreadyExists(_) => StatusCode::CONFLICT,
            ObjectStoreError::InvalidObjectKey | ObjectStoreError::MissingContentType => {
                StatusCode::BAD_REQUEST
            }
            ObjectStoreError::Signature(SignatureError::Expired | SignatureError::Mismatch) => {
                StatusCode::FORBIDDEN
            }
            ObjectStoreError::Signature(_)
            | ObjectStoreError::Sqlx(_)
            | ObjectStoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        AppError::new(status, err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::DuplicateId(_) => StatusCode::CONFLICT,
            StoreError::UrlMismatch { .. } | StoreError::BinaryMissing(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        AppError::new(status, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrors;

    #[test]
    fn store_errors_map_to_distinct_statuses() {
        let cases = [
            (StoreError::Validation(ValidationErrors::default()), StatusCode::BAD_REQUEST),
            (StoreError::DuplicateId("a".into()), StatusCode::CONFLICT),
            (StoreError::BinaryMissing("a".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::Unavailable("down".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status, status);
        }
    }

    #[test]
    fn bad_signatures_are_forbidden() {
        let err = ObjectStoreError::Signature(SignatureError::Expired);
        assert_eq!(AppError::from(err).status, StatusCode::FORBIDDEN);
        let err = ObjectStoreError::Signature(SignatureError::MissingSecret);
        assert_eq!(AppError::from(err).status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
