//! 上传请求的 multipart 重新编码。

use axum::body::Body as AxumBody;
use axum::http::{HeaderMap, header};
use bytes::Bytes;
use multer::{Constraints, SizeLimit};
use reqwest::multipart::{Form, Part};
use tracing::debug;

use crate::error::ApiError;

/// 上传限制；`max_total_size` 为 0 表示不限制。
#[derive(Debug, Clone, Copy)]
pub struct UploadConfig {
    pub max_total_size: u64,
}

impl UploadConfig {
    fn constraints(&self) -> Constraints {
        let limit = if self.max_total_size > 0 {
            SizeLimit::new().whole_stream(self.max_total_size)
        } else {
            SizeLimit::new()
        };
        Constraints::new().size_limit(limit)
    }
}

/// 一个带文件名的上传分片。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub data: Bytes,
}

fn read_error(context: &str, err: multer::Error) -> ApiError {
    match err {
        multer::Error::StreamSizeExceeded { limit } => {
            debug!(limit, "upload rejected");
            ApiError::InvalidParams("upload size exceeds limit".into())
        }
        err => ApiError::internal(context, err),
    }
}

/// 逐个读取入站 multipart 分片，只保留带文件名的分片。
///
/// 文件名为空的分片视为普通表单字段并丢弃；任何解析错误立即失败。
/// 整个请求体超过 `config` 的上限时以参数错误拒绝。
pub async fn read_file_parts(
    headers: &HeaderMap,
    body: AxumBody,
    config: &UploadConfig,
) -> Result<Vec<FilePart>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Internal("multipart reader".into()))?;
    let boundary = multer::parse_boundary(content_type)
        .map_err(|err| ApiError::internal("multipart reader", err))?;

    let mut multipart =
        multer::Multipart::with_constraints(body.into_data_stream(), boundary, config.constraints());
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| read_error("next part", err))?
    {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!(field = field.name().unwrap_or_default(), "skip non-file part");
                continue;
            }
        };
        let data = field
            .bytes()
            .await
            .map_err(|err| read_error("copy data", err))?;
        debug!(file_name, size = data.len(), "read upload part");
        parts.push(FilePart { file_name, data });
    }
    Ok(parts)
}

/// 以原文件名作为字段名与文件名重新生成 multipart 表单，字段名原样写出。
pub fn build_form(parts: Vec<FilePart>) -> Form {
    parts
        .into_iter()
        .fold(Form::new().percent_encode_noop(), |form, part| {
            let file = Part::stream(part.data).file_name(part.file_name.clone());
            form.part(part.file_name, file)
        })
}
