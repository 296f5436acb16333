//! HTTP 辅助工具：安全响应头与 panic 恢复。

use axum::body::Body as AxumBody;
use axum::http::{HeaderValue, Request, StatusCode, header};
use axum::response::IntoResponse;
use axum::{middleware, response::Response};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::any::Any;
use tracing::error;

use crate::error::ApiError;

/// 添加基础安全响应头。
pub async fn add_security_headers(
    request: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, StatusCode> {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        axum::http::header::X_FRAME_OPTIONS,
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        axum::http::header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

/// 302 重定向。
pub fn redirect_found(location: &str) -> Result<Response, ApiError> {
    let value = HeaderValue::from_str(location)
        .map_err(|err| ApiError::internal("make redirect", err))?;
    Ok((StatusCode::FOUND, [(header::LOCATION, value)]).into_response())
}

/// URL 路径段与 RFC 5987 参数中需要编码的字符：除非保留字符外全部编码。
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// 对 URL 路径段或 RFC 5987 参数做百分号编码。
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// 附件下载的 `Content-Disposition`，非 ASCII 文件名额外给出 `filename*`。
pub fn attachment_disposition(file_name: &str) -> Result<HeaderValue, ApiError> {
    let plain = file_name
        .chars()
        .all(|c| c.is_ascii_graphic() || c == ' ')
        && !file_name.contains(['"', '\\']);
    let value = if plain {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        let fallback: String = file_name
            .chars()
            .map(|c| {
                if (c.is_ascii_graphic() || c == ' ') && c != '"' && c != '\\' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            encode_component(file_name)
        )
    };
    HeaderValue::from_str(&value).map_err(|err| ApiError::internal("make disposition", err))
}

/// 处理器 panic 时返回内部错误，而不是中断进程。
pub fn recover_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = err.downcast_ref::<String>() {
        msg.as_str()
    } else if let Some(msg) = err.downcast_ref::<&str>() {
        msg
    } else {
        "unknown panic"
    };
    error!(panic = detail, "recover from panic");
    ApiError::Internal("recover from panic".into()).into_response()
}
