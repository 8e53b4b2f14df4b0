/*
 * Responsibility
 * - AppError: HTTP-facing error with a JSON body
 * - AuthError: authentication filter outcomes (401 with challenge / 500)
 */
use std::fmt;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::{AuthenticationFailure, Scheme};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }
}

fn error_response(status: StatusCode, code: &'static str, message: String) -> Response {
    let body = ErrorResponse {
        error: ErrorBody { code, message },
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "unauthorized".into(),
            ),
            AppError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", "forbidden".into()),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        error_response(status, code, message)
    }
}

/// `WWW-Authenticate` value: the scheme's wire name, plus `realm="..."`
/// when a realm label is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: Scheme,
    pub realm: Option<String>,
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.realm {
            Some(realm) => write!(f, "{} realm=\"{}\"", self.scheme, realm),
            None => f.write_str(self.scheme.id()),
        }
    }
}

/// Why the authentication filter stopped a call.
///
/// Malformed credentials never show up here: extraction reports them as
/// absent.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no {} credentials supplied", .challenge.scheme)]
    AbsentCredential { challenge: Challenge },

    #[error("{} credentials rejected", .challenge.scheme)]
    InvalidCredential { challenge: Challenge },

    #[error(transparent)]
    Infrastructure(#[from] AuthenticationFailure),
}

impl AuthError {
    /// The "stop processing, respond now" kind, which optional bindings may
    /// swallow. Backend failures are never part of it.
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            AuthError::AbsentCredential { .. } | AuthError::InvalidCredential { .. }
        )
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        match self {
            AuthError::AbsentCredential { challenge }
            | AuthError::InvalidCredential { challenge } => Some(challenge),
            AuthError::Infrastructure(_) => None,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let Some(challenge) = self.challenge() else {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "AUTHENTICATION_BACKEND",
                "authentication backend unavailable".into(),
            );
        };

        // Absent and invalid credentials answer the same way.
        let value = HeaderValue::from_str(&challenge.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static(challenge.scheme.id()));

        let mut response = AppError::Unauthorized.into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, value);
        response
    }
}
