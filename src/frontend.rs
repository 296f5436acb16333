//! 嵌入式静态资源与根路径重定向。

use axum::extract::Path;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

use crate::config::COMMON_STORAGE;
use crate::error::ApiError;

#[derive(RustEmbed)]
#[folder = "res"]
/// 页面使用的样式等静态资源。
pub struct Resources;

/// 根路径以 301 重定向到公共存储。
pub async fn index_redirect() -> Response {
    let location = format!("/{COMMON_STORAGE}/");
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response()
}

/// 浏览器自动请求的站点图标：直接 404，不当作存储名转发。
pub async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

/// `/res/*` 资源处理器。
pub async fn serve_resource(Path(path): Path<String>) -> Result<Response, ApiError> {
    let Some(asset) = Resources::get(&path) else {
        return Err(ApiError::NotFound(format!("resource {path}")));
    };
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str())
            .map_err(|_| ApiError::Internal("invalid mime type".into()))?,
    );
    Ok((headers, asset.data.into_owned()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn serves_stylesheet_with_css_mime() {
        let response = serve_resource(Path("style.css".to_string()))
            .await
            .expect("resource");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/css"))
        );
    }

    #[tokio::test]
    async fn unknown_resource_is_not_found() {
        let result = serve_resource(Path("missing.js".to_string())).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn root_redirects_to_common_storage() {
        let response = index_redirect().await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers().get(header::LOCATION),
            Some(&HeaderValue::from_static("/common/"))
        );
    }

    #[tokio::test]
    async fn favicon_is_not_found() {
        assert_eq!(favicon().await, StatusCode::NOT_FOUND);
    }
}
