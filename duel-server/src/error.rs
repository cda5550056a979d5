use warp::http::StatusCode;

use crate::auth::AuthError;
use duel_core::ScoringError;
use duel_types::{ApiError, ApiErrorKind, DuelId};

#[derive(Debug, thiserror::Error)]
pub enum DuelError {
    #[error("Duel {0} not found")]
    NotFound(DuelId),
    #[error("Authentication required: {0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Invalid result: {0}")]
    InvalidResult(#[from] ScoringError),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Persistence failure: {0:#}")]
    Persistence(#[from] anyhow::Error),
}

impl From<AuthError> for DuelError {
    fn from(err: AuthError) -> Self {
        DuelError::Unauthorized(err.to_string())
    }
}

impl DuelError {
    pub fn status(&self) -> StatusCode {
        match self {
            DuelError::NotFound(_) => StatusCode::NOT_FOUND,
            DuelError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            DuelError::Forbidden(_) => StatusCode::FORBIDDEN,
            DuelError::InvalidResult(_) | DuelError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            DuelError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body. Persistence details stay in the logs.
    pub fn to_api_error(&self) -> ApiError {
        match self {
            DuelError::NotFound(_) => ApiError::new(ApiErrorKind::NotFound, self.to_string()),
            DuelError::Unauthorized(_) => {
                ApiError::new(ApiErrorKind::Unauthorized, self.to_string())
            }
            DuelError::Forbidden(_) => ApiError::new(ApiErrorKind::Forbidden, self.to_string()),
            DuelError::InvalidResult(_) | DuelError::InvalidRequest(_) => {
                ApiError::new(ApiErrorKind::InvalidRequest, self.to_string())
            }
            DuelError::Persistence(_) => {
                ApiError::new(ApiErrorKind::Internal, "Internal server error")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            DuelError::NotFound(DuelId::new_v4()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            DuelError::from(AuthError::TokenExpired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            DuelError::Forbidden("not yours".to_string()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            DuelError::from(ScoringError::NoRounds).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_persistence_details_are_not_exposed() {
        let err = DuelError::from(anyhow::anyhow!("database is locked"));
        let body = err.to_api_error();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, ApiErrorKind::Internal);
        assert!(!body.message.contains("locked"));
    }
}
