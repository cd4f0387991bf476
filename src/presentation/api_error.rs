// HTTP mapping of pipeline errors: status code plus a plain-language notice
use crate::domain::error::SosError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    Sos(SosError),
    NotFound(String),
    Conflict(String),
}

impl From<SosError> for ApiError {
    fn from(e: SosError) -> Self {
        ApiError::Sos(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Sos(SosError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
            ApiError::Sos(SosError::ResourceUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Sos(SosError::StorageMiss(_)) => StatusCode::NOT_FOUND,
            ApiError::Sos(SosError::RemoteWriteFailure(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Sos(SosError::SensorError(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Sos(SosError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
        }
    }

    fn notice(&self) -> String {
        match self {
            ApiError::Sos(e) => e.notice(),
            ApiError::NotFound(message) | ApiError::Conflict(message) => message.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {:?}", self);
        } else {
            tracing::debug!("request rejected: {:?}", self);
        }
        (status, Json(json!({ "error": self.notice() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::Permission;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(SosError::PermissionDenied(Permission::Location)).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::from(SosError::InvalidInput("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::NotFound("gone".into()).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_body_carries_notice() {
        let response = ApiError::from(SosError::StorageMiss("emergency contacts".into())).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value["error"],
            "No emergency contacts configured. Please add one in Settings."
        );
    }
}
