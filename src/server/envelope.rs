use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::RelayError;

/// Uniform `{code, msg, data}` body returned by every route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub msg: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: StatusCode::OK.as_u16(),
            msg: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            code: status.as_u16(),
            msg: msg.into(),
            data: None,
        }
    }

    /// Failure that still carries a payload.
    pub fn error_with(status: StatusCode, msg: impl Into<String>, data: T) -> Self {
        Self {
            code: status.as_u16(),
            msg: msg.into(),
            data: Some(data),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

/// Handler error rendered as an [`ApiResponse`] without data.
#[derive(Debug)]
pub struct ApiError {
    pub status_code: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status_code = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        Self {
            status_code,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status_code.is_server_error() {
            error!(status = self.status_code.as_u16(), "{}", self.message);
        }
        ApiResponse::<()>::error(self.status_code, self.message).into_response()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_errors_map_to_status() {
        let cases = [
            (RelayError::MissingImage, StatusCode::BAD_REQUEST),
            (RelayError::InvalidRequest("prompt".into()), StatusCode::BAD_REQUEST),
            (RelayError::InvalidAudio("bad".into()), StatusCode::BAD_REQUEST),
            (
                RelayError::Fetch {
                    url: "u".into(),
                    reason: "r".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::UpstreamStatus {
                    status: 500,
                    body: "x".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                RelayError::Connection {
                    endpoint: "e".into(),
                    reason: "refused".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).status_code, expected);
        }
    }

    #[test]
    fn test_ok_envelope_serialization() {
        let json = serde_json::to_value(ApiResponse::ok("fine")).unwrap();
        assert_eq!(json["code"], 200);
        assert_eq!(json["msg"], "success");
        assert_eq!(json["data"], "fine");
    }

    #[test]
    fn test_error_envelope_has_null_data() {
        let json =
            serde_json::to_value(ApiResponse::<String>::error(StatusCode::BAD_REQUEST, "nope")).unwrap();
        assert_eq!(json["code"], 400);
        assert!(json["data"].is_null());
    }
}
