use actix_web::{
    http::StatusCode, Error as ACTIX_ERROR, HttpResponse, ResponseError,
};
use base64::DecodeError as BASE64_DECODE_ERROR;
use ece::Error as ECE_ERROR;
use jsonwebtoken::errors::Error as JWT_ERROR;
use p256::{elliptic_curve::Error as EC_ERROR, pkcs8::Error as PKCS8_ERROR};
use reqwest::header::{
    InvalidHeaderName as INVALID_HEADER_NAME,
    InvalidHeaderValue as INVALID_HEADER_VALUE,
};
use reqwest::Error as REQWEST_ERROR;
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{
    env::VarError, io::Error as IO_ERROR, num::ParseIntError,
};
use thiserror::Error;
use tokio::sync::AcquireError as ACQUIRE_ERROR;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

use crate::types::ErrorResponse;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    Base64DecodeError(#[from] BASE64_DECODE_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    InvalidHeaderName(#[from] INVALID_HEADER_NAME),

    #[error("{0}")]
    InvalidHeaderValue(#[from] INVALID_HEADER_VALUE),

    #[error("Invalid option {option}")]
    InvalidOption { option: String },

    #[error("{0}")]
    EceError(#[from] ECE_ERROR),

    #[error("{0}")]
    JWT(#[from] JWT_ERROR),

    #[error("{0}")]
    AcquireError(#[from] ACQUIRE_ERROR),

    #[error("Invalid P-256 key: {0}")]
    EllipticCurve(#[from] EC_ERROR),

    #[error("{0}")]
    Pkcs8(#[from] PKCS8_ERROR),

    #[error("{message}")]
    RequestBody { status: StatusCode, message: String },

    #[error("invalid subscription: {0}")]
    InvalidSubscription(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("missing vapid keys")]
    NotConfigured,

    #[error("delivery to {endpoint} failed with status {status}")]
    DeliveryFailure { endpoint: String, status: u16 },

    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidSubscription(_)
            | Error::InvalidPayload(_)
            | Error::JsonError(_) => StatusCode::BAD_REQUEST,

            Error::Unauthorized => StatusCode::UNAUTHORIZED,

            Error::RequestBody { status, .. } => *status,

            Error::UpstreamUnavailable(_) | Error::ReqwestError(_) => {
                StatusCode::BAD_GATEWAY
            },

            Error::NotConfigured
            | Error::DeliveryFailure { .. }
            | Error::ConfigurationError(_)
            | Error::Io(_)
            | Error::URL(_)
            | Error::INT(_)
            | Error::SQL(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::Base64DecodeError(_)
            | Error::SetGlobalDefaultError(_)
            | Error::InvalidHeaderName(_)
            | Error::InvalidHeaderValue(_)
            | Error::InvalidOption { .. }
            | Error::EceError(_)
            | Error::JWT(_)
            | Error::AcquireError(_)
            | Error::EllipticCurve(_)
            | Error::Pkcs8(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error =
            if status.is_server_error() && !matches!(self, Error::NotConfigured) {
                tracing::error!("Request failed: {}", self);
                String::from(status.canonical_reason().unwrap_or("error"))
            } else {
                self.to_string()
            };

        HttpResponse::build(status).json(ErrorResponse { ok: false, error })
    }
}

/// Extractor failures (oversized or unreadable bodies) keep their status but
/// are rendered like every other error.
impl From<ACTIX_ERROR> for Error {
    fn from(error: ACTIX_ERROR) -> Error {
        Error::RequestBody {
            status: error.as_response_error().status_code(),
            message: error.to_string(),
        }
    }
}
