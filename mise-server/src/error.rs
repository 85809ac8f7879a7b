use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use mise_core::MiseError;

/// Server-specific error types.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Core engine error: {0}")]
    CoreError(#[from] MiseError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::CoreError(core_err) => match core_err {
                MiseError::UnknownSpace(_) => StatusCode::NOT_FOUND,
                MiseError::AlreadyExists(_) => StatusCode::CONFLICT,
                MiseError::DimensionMismatch { .. }
                | MiseError::InvalidComponentCount { .. }
                | MiseError::InvalidClusterCount { .. }
                | MiseError::InvalidArgument(_)
                | MiseError::Configuration(_) => StatusCode::BAD_REQUEST,
                MiseError::EmptyCluster(_) => StatusCode::UNPROCESSABLE_ENTITY,
                MiseError::UnsupportedOperation(_) => StatusCode::NOT_IMPLEMENTED,
                MiseError::IoError { .. } | MiseError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            ServerError::CoreError(MiseError::UnknownSpace(name)) => format!("Space '{}' not found", name),
            ServerError::CoreError(MiseError::IoError { path, source }) => {
                error!(path = ?path, error = %source, "Core I/O error");
                "Internal server error (I/O)".to_string()
            }
            ServerError::CoreError(MiseError::StorageError(msg)) => {
                error!(error = %msg, "Core storage error");
                format!("Storage error: {}", msg)
            }
            ServerError::CoreError(core_err) => core_err.to_string(),
            ServerError::Internal(msg) => {
                error!(error = %msg, "Internal server error");
                "Internal server error".to_string()
            }
        };

        error!("Responding with status {}: {}", status, error_message);

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_core_errors_map_to_status() {
        let cases = vec![
            (MiseError::UnknownSpace("title".into()), StatusCode::NOT_FOUND),
            (MiseError::AlreadyExists("title".into()), StatusCode::CONFLICT),
            (MiseError::DimensionMismatch { expected: 3, actual: 2 }, StatusCode::BAD_REQUEST),
            (MiseError::InvalidComponentCount { requested: 0, max: 2 }, StatusCode::BAD_REQUEST),
            (MiseError::InvalidClusterCount { requested: 9, max: 4 }, StatusCode::BAD_REQUEST),
            (MiseError::InvalidArgument("k".into()), StatusCode::BAD_REQUEST),
            (MiseError::Configuration("port".into()), StatusCode::BAD_REQUEST),
            (MiseError::EmptyCluster(1), StatusCode::UNPROCESSABLE_ENTITY),
            (MiseError::UnsupportedOperation("tsne".into()), StatusCode::NOT_IMPLEMENTED),
            (MiseError::StorageError("bad header".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                MiseError::IoError {
                    path: PathBuf::from("title.npy"),
                    source: io::Error::new(io::ErrorKind::NotFound, "missing"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (core_err, expected) in cases {
            let err = ServerError::from(core_err);
            assert_eq!(err.status(), expected);
            assert_eq!(err.into_response().status(), expected);
        }
        assert_eq!(
            ServerError::Internal("join".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
