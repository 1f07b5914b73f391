use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bounty_audit::AuditError;
use bounty_board::BatchError;
use bounty_types::BountyError;

/// Response body shared by every mutating endpoint: `{"ok": value}` or
/// `{"err": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope<T> {
    Ok(T),
    Err(ErrorBody),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    /// Position of the failing operation, for batches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] BountyError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("Missing or empty x-principal header")]
    MissingCaller,

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

fn domain_status(err: &BountyError) -> StatusCode {
    match err {
        BountyError::NotFound(_) => StatusCode::NOT_FOUND,
        BountyError::Unauthorized { .. } => StatusCode::FORBIDDEN,
        BountyError::InvalidState { .. }
        | BountyError::AlreadyCompleted(_)
        | BountyError::CannotCancelClaimed(_)
        | BountyError::AlreadyReleased(_)
        | BountyError::EscrowExists(_)
        | BountyError::NotCompleted(_)
        | BountyError::AlreadyRated { .. } => StatusCode::CONFLICT,
        BountyError::InsufficientFunds { .. }
        | BountyError::ScoreOutOfRange { .. }
        | BountyError::InvalidAmount
        | BountyError::DescriptionTooLong { .. }
        | BountyError::BalanceOverflow(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BountyError::EscrowMissing(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(err) => domain_status(err),
            ApiError::Batch(err) => domain_status(&err.source),
            ApiError::MissingCaller => StatusCode::UNAUTHORIZED,
            ApiError::Audit(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        let (code, index) = match self {
            ApiError::Domain(err) => (err.code(), None),
            ApiError::Batch(err) => (err.source.code(), Some(err.index)),
            ApiError::MissingCaller => ("MissingCaller", None),
            ApiError::Audit(_) => ("AuditFailure", None),
            ApiError::Internal(_) => ("Internal", None),
        };
        ErrorBody {
            code: code.to_string(),
            message: self.to_string(),
            index,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        } else {
            tracing::debug!("Request rejected: {self}");
        }
        (status, Json(Envelope::<()>::Err(self.body()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let ok = serde_json::to_value(Envelope::Ok(1u64)).unwrap();
        assert_eq!(ok, serde_json::json!({ "ok": 1 }));

        let err = ApiError::from(BountyError::NotFound(7));
        let value = serde_json::to_value(Envelope::<()>::Err(err.body())).unwrap();
        assert_eq!(value["err"]["code"], "NotFound");
        assert_eq!(value["err"]["message"], "Task not found: 7");
        assert!(value["err"].get("index").is_none());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(BountyError::AlreadyCompleted(1)).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(BountyError::InvalidAmount).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(ApiError::MissingCaller.status(), StatusCode::UNAUTHORIZED);

        let batch = ApiError::from(BatchError {
            index: 2,
            source: BountyError::NotFound(9),
        });
        assert_eq!(batch.status(), StatusCode::NOT_FOUND);
        assert_eq!(batch.body().index, Some(2));
        assert_eq!(batch.body().code, "NotFound");
    }
}
