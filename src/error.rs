use axum::{
    body::to_bytes,
    extract::Request,
    http::{
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt::Display;

use crate::schema::ValidationError;

pub type AppResult<T> = Result<T, AppError>;

const INTERNAL_PUBLIC_MESSAGE: &str = "An unexpected error occurred";
const FALLBACK_BODY_LIMIT: usize = 16 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    InternalError,
}

impl ErrorCode {
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST => ErrorCode::ValidationError,
            StatusCode::UNAUTHORIZED => ErrorCode::Unauthorized,
            StatusCode::FORBIDDEN => ErrorCode::Forbidden,
            StatusCode::NOT_FOUND => ErrorCode::NotFound,
            StatusCode::TOO_MANY_REQUESTS => ErrorCode::RateLimited,
            _ => ErrorCode::InternalError,
        }
    }
}

/// Error payload carried in response extensions so the envelope middleware
/// can stamp the request path onto it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<Value>,
}

#[derive(Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: ErrorBody,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(error: ErrorBody, path: Option<String>) -> Self {
        Self {
            success: false,
            error,
            timestamp: Utc::now().to_rfc3339(),
            path,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: ErrorCode,
    message: String,
    details: Option<Value>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            code: ErrorCode::from_status(status),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::unauthorized_with("Not authorized, token failed")
    }

    pub fn unauthorized_with(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(role: &str) -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            format!("Role '{role}' is not authorized to access this resource"),
        )
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn not_found_with(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    pub fn internal<E: Display>(error: E) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?}): {}", self.status, self.code, self.message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.code == ErrorCode::InternalError {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
            INTERNAL_PUBLIC_MESSAGE.to_string()
        } else {
            self.message
        };

        let body = ErrorBody {
            code: self.code,
            message,
            details: self.details,
        };
        let mut response = (self.status, Json(ErrorEnvelope::new(body.clone(), None))).into_response();
        response.extensions_mut().insert(body);
        response
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        let details = match &value {
            ValidationError::MissingFields { collection, fields } => {
                Some(json!({ "collection": collection, "missingFields": fields }))
            }
            _ => None,
        };
        let error = AppError::bad_request(value.to_string());
        match details {
            Some(details) => error.with_details(details),
            None => error,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        match value.kind() {
            JwtErrorKind::ExpiredSignature => AppError::unauthorized_with("Token expired"),
            JwtErrorKind::InvalidToken => AppError::unauthorized_with("Invalid token"),
            _ => AppError::internal(value),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(format!("{value:#}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

/// Rewrites every 4xx/5xx response into the uniform envelope and stamps the
/// request path. Responses built from `AppError` carry their `ErrorBody`;
/// anything else (axum rejections, panics, 405s) is classified by status.
pub async fn envelope_errors(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let error = match parts.extensions.remove::<ErrorBody>() {
        Some(error) => error,
        None => {
            let bytes = to_bytes(body, FALLBACK_BODY_LIMIT).await.unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes).trim().to_string();
            let code = ErrorCode::from_status(status);
            let message = if text.is_empty() || code == ErrorCode::InternalError {
                status
                    .canonical_reason()
                    .unwrap_or(INTERNAL_PUBLIC_MESSAGE)
                    .to_string()
            } else {
                text
            };
            ErrorBody {
                code,
                message,
                details: None,
            }
        }
    };

    let mut rebuilt = (status, Json(ErrorEnvelope::new(error, Some(path)))).into_response();
    for (name, value) in parts.headers.iter() {
        if name != CONTENT_TYPE && name != CONTENT_LENGTH {
            rebuilt.headers_mut().append(name.clone(), value.clone());
        }
    }
    rebuilt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table_matches_error_codes() {
        let cases = [
            (StatusCode::BAD_REQUEST, ErrorCode::ValidationError),
            (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized),
            (StatusCode::FORBIDDEN, ErrorCode::Forbidden),
            (StatusCode::NOT_FOUND, ErrorCode::NotFound),
            (StatusCode::TOO_MANY_REQUESTS, ErrorCode::RateLimited),
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError),
            (StatusCode::CONFLICT, ErrorCode::InternalError),
            (StatusCode::METHOD_NOT_ALLOWED, ErrorCode::InternalError),
        ];
        for (status, code) in cases {
            assert_eq!(ErrorCode::from_status(status), code, "status {status}");
        }
    }

    #[test]
    fn expired_and_invalid_tokens_are_unauthorized() {
        let expired: AppError = jsonwebtoken::errors::Error::from(JwtErrorKind::ExpiredSignature).into();
        assert_eq!(expired.code(), ErrorCode::Unauthorized);

        let invalid: AppError = jsonwebtoken::errors::Error::from(JwtErrorKind::InvalidToken).into();
        assert_eq!(invalid.code(), ErrorCode::Unauthorized);

        let other: AppError = jsonwebtoken::errors::Error::from(JwtErrorKind::InvalidKeyFormat).into();
        assert_eq!(other.code(), ErrorCode::InternalError);
    }

    #[test]
    fn missing_fields_become_validation_details() {
        let error: AppError = ValidationError::MissingFields {
            collection: "citizens".into(),
            fields: vec!["aadhaar".into()],
        }
        .into();
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error.code(), ErrorCode::ValidationError);
        assert_eq!(
            error.details().and_then(|d| d.get("missingFields")),
            Some(&json!(["aadhaar"]))
        );
    }

    #[test]
    fn internal_errors_hide_their_cause() {
        let response = AppError::internal("disk on fire").into_response();
        let body = response.extensions().get::<ErrorBody>().cloned();
        let body = body.expect("error body extension");
        assert_eq!(body.code, ErrorCode::InternalError);
        assert_eq!(body.message, INTERNAL_PUBLIC_MESSAGE);
    }
}
