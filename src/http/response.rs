use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use tracing::{debug, error};

use crate::error::AppError;

pub const SERVER_ERROR_MESSAGE: &str = "Server Error";
pub const DUPLICATE_MESSAGE: &str = "Duplicate field value entered";

#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub fn ok<T: Serialize>(data: T) -> Response {
    with_data(StatusCode::OK, data)
}

pub fn created<T: Serialize>(data: T) -> Response {
    with_data(StatusCode::CREATED, data)
}

pub fn message(message: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope {
        success: true,
        data: None,
        message: Some(message.into()),
    };
    (StatusCode::OK, Json(body)).into_response()
}

pub fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    let body: Envelope<()> = Envelope {
        success: false,
        data: None,
        message: Some(message.into()),
    };
    let mut resp = (status, Json(body)).into_response();
    if status == StatusCode::TOO_MANY_REQUESTS {
        resp.headers_mut()
            .insert("retry-after", HeaderValue::from_static("60"));
    }
    resp
}

fn with_data<T: Serialize>(status: StatusCode, data: T) -> Response {
    let body = Envelope {
        success: true,
        data: Some(data),
        message: None,
    };
    (status, Json(body)).into_response()
}

/// Maps an error category to its status code and client-facing message.
pub fn classify(err: &AppError) -> (StatusCode, String) {
    match err {
        AppError::InvalidInput(message) => (StatusCode::BAD_REQUEST, message.clone()),
        AppError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        AppError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
        AppError::PayloadTooLarge(message) => (StatusCode::PAYLOAD_TOO_LARGE, message.clone()),
        AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, err.to_string()),
        AppError::Db(db_err) => classify_db(db_err),
        AppError::Io(_) | AppError::Json(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            SERVER_ERROR_MESSAGE.to_string(),
        ),
    }
}

fn classify_db(err: &DbErr) -> (StatusCode, String) {
    if let Some(SqlErr::UniqueConstraintViolation(_)) = err.sql_err() {
        return (StatusCode::BAD_REQUEST, DUPLICATE_MESSAGE.to_string());
    }
    match err {
        DbErr::RecordNotFound(message) => (StatusCode::NOT_FOUND, format!("Not found: {message}")),
        DbErr::RecordNotUpdated => (
            StatusCode::NOT_FOUND,
            "Not found: record was not updated".to_string(),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            SERVER_ERROR_MESSAGE.to_string(),
        ),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = classify(&self);
        if status.is_server_error() {
            error!(error = %self, status = status.as_u16(), "request failed");
        } else {
            debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        failure(status, message)
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return AppError::PayloadTooLarge(rejection.body_text());
        }
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_map_to_fixed_status_codes() {
        let cases = [
            (AppError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (
                AppError::Db(DbErr::Custom("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(classify(&err).0, expected, "{err}");
        }
    }

    #[test]
    fn server_errors_hide_details() {
        let err = AppError::Db(DbErr::Custom("secret table name".into()));
        assert_eq!(classify(&err).1, SERVER_ERROR_MESSAGE);
    }

    #[test]
    fn not_found_message_names_the_record() {
        let err = AppError::NotFound("daily goal id 7".into());
        assert_eq!(classify(&err).1, "Not found: daily goal id 7");
    }
}
