//! 文件下载、列表、上传、删除与文本分享处理器。

use axum::body::Body as AxumBody;
use axum::extract::rejection::FormRejection;
use axum::extract::{Extension, Form};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::config::TITLE;
use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::http::attachment_disposition;
use crate::multipart::{UploadConfig, build_form, read_file_parts};
use crate::params::StorageParameters;
use crate::views::{DirectoryView, FileRecord, Views};

#[derive(Deserialize)]
pub(crate) struct RemoveForm {
    #[serde(rename = "fileName", default)]
    file_name: String,
}

#[derive(Deserialize)]
pub(crate) struct ShareTextForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
}

/// 将下游响应体流式转发给浏览器，沿用下游的内容类型与长度。
fn stream_response(
    response: reqwest::Response,
    mut headers: HeaderMap,
) -> Result<Response, ApiError> {
    if !headers.contains_key(header::CONTENT_TYPE)
        && let Some(value) = response.headers().get(header::CONTENT_TYPE)
    {
        headers.insert(header::CONTENT_TYPE, value.clone());
    }
    if let Some(length) = response.content_length() {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    Ok((
        StatusCode::OK,
        headers,
        AxumBody::from_stream(response.bytes_stream()),
    )
        .into_response())
}

fn form_params<T>(form: Result<Form<T>, FormRejection>) -> Result<T, ApiError> {
    form.map(|Form(value)| value)
        .map_err(|err| ApiError::InvalidParams(format!("request parameters: {err}")))
}

/// 下载单个文件。
pub async fn get_file(
    Extension(gateway): Extension<Arc<Gateway>>,
    mut jar: CookieJar,
    params: StorageParameters,
) -> (CookieJar, Result<Response, ApiError>) {
    let result = download(&gateway, &mut jar, &params).await;
    (jar, result)
}

async fn download(
    gateway: &Gateway,
    jar: &mut CookieJar,
    params: &StorageParameters,
) -> Result<Response, ApiError> {
    let response = gateway
        .get(jar, &params.storage_name, "file", &params.values())
        .await?;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_DISPOSITION,
        attachment_disposition(params.file_name())?,
    );
    info!(
        storage = %params.storage_name,
        file = params.file_name(),
        "download file"
    );
    stream_response(response, headers)
}

/// 存储自带的 index.html 页面。
pub async fn index_html(
    Extension(gateway): Extension<Arc<Gateway>>,
    mut jar: CookieJar,
    params: StorageParameters,
) -> (CookieJar, Result<Response, ApiError>) {
    let result: Result<Response, ApiError> = async {
        let response = gateway
            .get(&mut jar, &params.storage_name, "index.html", &params.values())
            .await?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        stream_response(response, headers)
    }
    .await;
    (jar, result)
}

/// 列出存储中的文件并渲染目录页。
pub async fn view(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(views): Extension<Arc<Views>>,
    mut jar: CookieJar,
    params: StorageParameters,
) -> (CookieJar, Result<Response, ApiError>) {
    let result = list(&gateway, &views, &mut jar, &params).await;
    (jar, result)
}

async fn list(
    gateway: &Gateway,
    views: &Views,
    jar: &mut CookieJar,
    params: &StorageParameters,
) -> Result<Response, ApiError> {
    let response = gateway
        .get(jar, &params.storage_name, "list", &params.values())
        .await?;
    let files: Vec<FileRecord> = response
        .json()
        .await
        .map_err(|err| ApiError::internal("files json decode error", err))?;
    info!(
        storage = %params.storage_name,
        count = files.len(),
        "list files"
    );

    let html = views.directory(&DirectoryView {
        title: TITLE,
        storage_name: &params.storage_name,
        permanent: params.is_permanent,
        view_permanent_link: !params.is_permanent && !params.is_public,
        files: &files,
    })?;
    Ok(html.into_response())
}

/// 上传文件：重新编码入站 multipart 后转发。
pub async fn upload(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(upload_config): Extension<Arc<UploadConfig>>,
    mut jar: CookieJar,
    params: StorageParameters,
    headers: HeaderMap,
    body: AxumBody,
) -> (CookieJar, Result<StatusCode, ApiError>) {
    let result: Result<StatusCode, ApiError> = async {
        let parts = read_file_parts(&headers, body, &upload_config).await?;
        let names: Vec<String> = parts.iter().map(|part| part.file_name.clone()).collect();
        gateway
            .post_multipart(&mut jar, &params.storage_name, "upload", build_form(parts))
            .await?;
        info!(storage = %params.storage_name, files = ?names, "upload files");
        Ok(StatusCode::OK)
    }
    .await;
    (jar, result)
}

/// 删除文件。
pub async fn remove(
    Extension(gateway): Extension<Arc<Gateway>>,
    mut jar: CookieJar,
    params: StorageParameters,
    form: Result<Form<RemoveForm>, FormRejection>,
) -> (CookieJar, Result<StatusCode, ApiError>) {
    let result: Result<StatusCode, ApiError> = async {
        let RemoveForm { file_name } = form_params(form)?;
        if file_name.is_empty() {
            return Err(ApiError::InvalidParams("file name was not set".into()));
        }
        let params = params.with_file_name(file_name);
        gateway
            .post_form(&mut jar, &params.storage_name, "remove", params.values())
            .await?;
        info!(
            storage = %params.storage_name,
            file = params.file_name(),
            "remove file"
        );
        Ok(StatusCode::OK)
    }
    .await;
    (jar, result)
}

/// 将一段文本保存为存储中的文件。
pub async fn share_text(
    Extension(gateway): Extension<Arc<Gateway>>,
    mut jar: CookieJar,
    params: StorageParameters,
    form: Result<Form<ShareTextForm>, FormRejection>,
) -> (CookieJar, Result<StatusCode, ApiError>) {
    let result: Result<StatusCode, ApiError> = async {
        let ShareTextForm { title, body } = form_params(form)?;
        if title.is_empty() || body.is_empty() {
            return Err(ApiError::InvalidParams(format!(
                "title or body was not set; title = {title} body = {body}"
            )));
        }
        let mut values = params.values();
        values.push(("title", title));
        values.push(("body", body));
        gateway
            .post_form(&mut jar, &params.storage_name, "shareText", values)
            .await?;
        info!(storage = %params.storage_name, "share text");
        Ok(StatusCode::OK)
    }
    .await;
    (jar, result)
}
