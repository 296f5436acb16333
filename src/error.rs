//! 统一的错误类型：与存储网关共享的错误码及其 JSON 线上格式。

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use tracing::{error, warn};

/// 错误码，与下游服务的 `code` 字段一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "internal_error")]
    Internal,
    #[serde(rename = "invalid_params")]
    InvalidParams,
    #[serde(rename = "unauthorized")]
    NotAuthorized,
    #[serde(rename = "not_exist")]
    NotFound,
    #[serde(rename = "already_exist")]
    AlreadyExists,
    #[serde(rename = "not_match")]
    Mismatch,
}

/// 错误的线上表示：`{"code": ..., "description": ...}`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid params: {0}")]
    InvalidParams(String),
    #[error("not authorized: {0}")]
    NotAuthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("mismatch: {0}")]
    Mismatch(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 构造内部错误：原因只写入日志，不返回给浏览器。
    pub fn internal(context: &str, cause: impl Display) -> Self {
        warn!(error = %cause, "{context}");
        ApiError::Internal(context.to_string())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ApiError::InvalidParams(_) => ErrorCode::InvalidParams,
            ApiError::NotAuthorized(_) => ErrorCode::NotAuthorized,
            ApiError::NotFound(_) => ErrorCode::NotFound,
            ApiError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            ApiError::Mismatch(_) => ErrorCode::Mismatch,
            ApiError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ApiError::InvalidParams(msg)
            | ApiError::NotAuthorized(msg)
            | ApiError::NotFound(msg)
            | ApiError::AlreadyExists(msg)
            | ApiError::Mismatch(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidParams(_) => StatusCode::BAD_REQUEST,
            ApiError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::Mismatch(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            description: self.description().to_string(),
        }
    }
}

impl From<ErrorBody> for ApiError {
    fn from(body: ErrorBody) -> Self {
        let ErrorBody { code, description } = body;
        match code {
            ErrorCode::Internal => ApiError::Internal(description),
            ErrorCode::InvalidParams => ApiError::InvalidParams(description),
            ErrorCode::NotAuthorized => ApiError::NotAuthorized(description),
            ErrorCode::NotFound => ApiError::NotFound(description),
            ErrorCode::AlreadyExists => ApiError::AlreadyExists(description),
            ErrorCode::Mismatch => ApiError::Mismatch(description),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_body();
        error!(code = ?body.code, description = %body.description, "handler error");
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn error_body_uses_gateway_codes() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"code":"not_exist","description":"no such file"}"#)
                .expect("decode");
        assert_eq!(
            ApiError::from(body),
            ApiError::NotFound("no such file".into())
        );
    }

    #[test]
    fn error_body_survives_encode_decode() {
        let errors = [
            ApiError::InvalidParams("bad".into()),
            ApiError::NotAuthorized("who".into()),
            ApiError::NotFound("gone".into()),
            ApiError::AlreadyExists("dup".into()),
            ApiError::Mismatch("pwd".into()),
            ApiError::Internal("boom".into()),
        ];
        for err in errors {
            let encoded = serde_json::to_string(&err.to_body()).expect("encode");
            let decoded: ErrorBody = serde_json::from_str(&encoded).expect("decode");
            let restored = ApiError::from(decoded);
            assert_eq!(restored.code(), err.code());
            assert_eq!(restored.description(), err.description());
        }
    }

    #[test]
    fn unknown_code_is_rejected() {
        let result = serde_json::from_str::<ErrorBody>(r#"{"code":"teapot","description":""}"#);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn into_response_writes_json_with_status() {
        let response = ApiError::AlreadyExists("storage exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body.code, ErrorCode::AlreadyExists);
        assert_eq!(body.description, "storage exists");
    }
}
