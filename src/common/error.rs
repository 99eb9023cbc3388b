//! Error types for minipoints

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === Account Faults ===
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid points: {0}")]
    InvalidPoints(String),

    #[error("Not enough balance: have {balance}, need {requested}")]
    NotEnoughBalance { balance: i64, requested: i64 },

    #[error("Email already exists: {0}")]
    EmailAlreadyExists(String),

    #[error("Bad initial balance: {0}")]
    BadInit(i64),

    // === Naming Errors ===
    #[error("Service not found: {0}")]
    NotFound(String),

    #[error("Name resolution failed: {0}")]
    Resolution(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Operation timeout: {0}")]
    Timeout(String),

    // === Coordination Errors ===
    #[error("Coordination failed: {0}")]
    Coordination(String),

    // === I/O & Config Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Discriminant for the typed faults a replica sends back over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultKind {
    InvalidEmail,
    InvalidPoints,
    NotEnoughBalance,
    EmailAlreadyExists,
    BadInit,
    Internal,
}

/// JSON error body shared by the replica RPC surface and the public API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultBody {
    pub fault: FaultKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<i64>,
}

impl Error {
    /// Is this a typed account fault (validation or business rule)?
    ///
    /// Faults are surfaced unchanged to the caller; everything else is
    /// infrastructure and collapses into a coordination failure.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            Error::InvalidEmail(_)
                | Error::InvalidPoints(_)
                | Error::NotEnoughBalance { .. }
                | Error::EmailAlreadyExists(_)
                | Error::BadInit(_)
        )
    }

    /// Did the replica fail to answer at all?
    pub fn is_unreachable(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::Resolution(_)
                | Error::ConnectionFailed(_)
                | Error::Timeout(_)
                | Error::Http(_)
        )
    }

    /// Convert to a wire fault body
    pub fn to_fault_body(&self) -> FaultBody {
        let (fault, balance, requested) = match self {
            Error::InvalidEmail(_) => (FaultKind::InvalidEmail, None, None),
            Error::InvalidPoints(_) => (FaultKind::InvalidPoints, None, None),
            Error::NotEnoughBalance { balance, requested } => {
                (FaultKind::NotEnoughBalance, Some(*balance), Some(*requested))
            }
            Error::EmailAlreadyExists(_) => (FaultKind::EmailAlreadyExists, None, None),
            Error::BadInit(value) => (FaultKind::BadInit, Some(*value), None),
            _ => (FaultKind::Internal, None, None),
        };
        FaultBody {
            fault,
            message: self.inner_message(),
            balance,
            requested,
        }
    }

    /// Rebuild a typed error from a wire fault body
    pub fn from_fault_body(body: FaultBody) -> Self {
        match body.fault {
            FaultKind::InvalidEmail => Error::InvalidEmail(body.message),
            FaultKind::InvalidPoints => Error::InvalidPoints(body.message),
            FaultKind::NotEnoughBalance => Error::NotEnoughBalance {
                balance: body.balance.unwrap_or_default(),
                requested: body.requested.unwrap_or_default(),
            },
            FaultKind::EmailAlreadyExists => Error::EmailAlreadyExists(body.message),
            FaultKind::BadInit => Error::BadInit(body.balance.unwrap_or_default()),
            FaultKind::Internal => Error::Internal(body.message),
        }
    }

    fn inner_message(&self) -> String {
        match self {
            Error::InvalidEmail(msg)
            | Error::InvalidPoints(msg)
            | Error::EmailAlreadyExists(msg)
            | Error::Internal(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidEmail(_) => StatusCode::NOT_FOUND,
            Error::InvalidPoints(_) | Error::BadInit(_) | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::NotEnoughBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::EmailAlreadyExists(_) => StatusCode::CONFLICT,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::Coordination(_)
            | Error::NotFound(_)
            | Error::Resolution(_)
            | Error::ConnectionFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = self.to_http_status();
        (status, axum::Json(self.to_fault_body())).into_response()
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout(e.to_string())
        } else if e.is_connect() {
            Error::ConnectionFailed(e.to_string())
        } else {
            Error::Http(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_classification() {
        assert!(Error::InvalidEmail("x".into()).is_fault());
        assert!(Error::NotEnoughBalance { balance: 1, requested: 2 }.is_fault());
        assert!(!Error::ConnectionFailed("down".into()).is_fault());
        assert!(Error::ConnectionFailed("down".into()).is_unreachable());
        assert!(!Error::Coordination("x".into()).is_unreachable());
    }

    #[test]
    fn test_fault_body_keeps_balance_details() {
        let err = Error::NotEnoughBalance {
            balance: 150,
            requested: 200,
        };
        let body = err.to_fault_body();
        assert_eq!(body.fault, FaultKind::NotEnoughBalance);

        match Error::from_fault_body(body) {
            Error::NotEnoughBalance { balance, requested } => {
                assert_eq!(balance, 150);
                assert_eq!(requested, 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_infrastructure_errors_become_internal_faults() {
        let body = Error::Coordination("replica down".into()).to_fault_body();
        assert_eq!(body.fault, FaultKind::Internal);
        assert!(body.message.contains("replica down"));
    }

    #[test]
    fn test_http_status_mapping() {
        use axum::http::StatusCode;
        assert_eq!(
            Error::EmailAlreadyExists("a@b.c".into()).to_http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(Error::BadInit(-1).to_http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::Coordination("x".into()).to_http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
