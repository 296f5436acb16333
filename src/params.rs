//! 从路由上下文提取存储参数。

use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{FromRequestParts, RawPathParams};
use axum::http::request::Parts;

use crate::error::ApiError;

/// 路由级标志，由路由表以 `Extension` 形式挂在每条路由上。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteFlags {
    pub public: bool,
    pub permanent: bool,
}

impl RouteFlags {
    pub const PRIVATE: RouteFlags = RouteFlags {
        public: false,
        permanent: false,
    };
    pub const PUBLIC: RouteFlags = RouteFlags {
        public: true,
        permanent: false,
    };
    pub const PERMANENT: RouteFlags = RouteFlags {
        public: false,
        permanent: true,
    };
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StorageParameters {
    pub storage_name: String,
    pub is_public: bool,
    pub is_permanent: bool,
    pub file_name: Option<String>,
}

impl StorageParameters {
    /// 转为下游查询串或表单的键值对。
    pub fn values(&self) -> Vec<(&'static str, String)> {
        let mut values = vec![("storage", self.storage_name.clone())];
        if self.is_public {
            values.push(("public", "true".to_string()));
        }
        if self.is_permanent {
            values.push(("permanent", "true".to_string()));
        }
        values.push(("file", self.file_name.clone().unwrap_or_default()));
        values
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// 下载时使用的文件名。
    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for StorageParameters
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let params = match RawPathParams::from_request_parts(parts, state).await {
            Ok(params) => Some(params),
            Err(RawPathParamsRejection::MissingPathParams(_)) => None,
            Err(err) => {
                return Err(ApiError::InvalidParams(format!(
                    "request parameters: {err}"
                )));
            }
        };
        let flags = parts
            .extensions
            .get::<RouteFlags>()
            .copied()
            .unwrap_or_default();

        let mut storage_name = String::new();
        let mut file_name = None;
        for (key, value) in params.iter().flat_map(|params| params.iter()) {
            match key {
                "storage" => storage_name = value.to_string(),
                "file" if !value.is_empty() => file_name = Some(value.to_string()),
                _ => {}
            }
        }

        let is_permanent = !storage_name.is_empty() && flags.permanent;
        Ok(StorageParameters {
            storage_name,
            is_public: flags.public,
            is_permanent,
            file_name,
        })
    }
}
