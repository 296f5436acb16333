//! 命令行参数、环境变量与默认配置。

use clap::Parser;
use shadow_rs::formatcp;
use url::Url;

use crate::build;

const VERSION_INFO: &str = formatcp!(
    r#"{}\ncommit_hash: {}\nbuild_time: {}\nbuild_env: {},{}"#,
    build::PKG_VERSION,
    build::SHORT_COMMIT,
    build::BUILD_TIME,
    build::RUST_VERSION,
    build::RUST_CHANNEL
);

/// 视图页标题。
pub const TITLE: &str = "Duplo";
/// 根路径重定向到的公共存储。
pub const COMMON_STORAGE: &str = "common";
pub const TOKEN_COOKIE_PREFIX: &str = "fs_";
pub const TOKEN_HEADER: &str = "X-Token";
pub const DEFAULT_SESSION_EXPIRE_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 0;
/// 上传在转发前整体缓冲于内存，默认上限 512 MiB。
pub const DEFAULT_UPLOAD_MAX_SIZE: u64 = 512 * 1024 * 1024;

/// Web 网关的命令行参数与环境变量配置。
#[derive(Parser, Debug, Clone)]
#[command(name = "duplo-web", version = VERSION_INFO, about = "Duplo web gateway")]
pub struct Args {
    #[arg(
        short = 'b',
        long,
        env = "FS_BIND",
        default_value = "0.0.0.0",
        help = "Bind address"
    )]
    pub host: String,
    #[arg(
        short = 'p',
        long,
        env = "FS_PORT",
        default_value_t = 8080,
        help = "Listen port"
    )]
    pub port: u16,
    #[arg(
        short = 'g',
        long,
        env = "FS_GATEWAY_HOST",
        help = "Base URL of the storage gateway, e.g. http://127.0.0.1:8000"
    )]
    pub gateway_host: String,
    #[arg(
        long,
        env = "FS_SESSION_EXPIRE_PERIOD_SEC",
        default_value_t = DEFAULT_SESSION_EXPIRE_SECS,
        help = "Session cookie lifetime in seconds"
    )]
    pub session_expire_secs: u64,
    #[arg(
        long,
        env = "FS_REQUEST_TIMEOUT_SECS",
        default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS,
        help = "Timeout for gateway requests in seconds (0 to disable)"
    )]
    pub request_timeout_secs: u64,
    #[arg(
        long,
        env = "FS_UPLOAD_MAX_SIZE",
        default_value_t = DEFAULT_UPLOAD_MAX_SIZE,
        help = "Max upload request size in bytes (0 to disable)"
    )]
    pub upload_max_size: u64,
    #[arg(short = 'c', long, env = "FS_TLS_CERT", help = "TLS cert path")]
    pub tls_cert: Option<String>,
    #[arg(short = 'k', long, env = "FS_TLS_KEY", help = "TLS key path")]
    pub tls_key: Option<String>,
}

impl Args {
    /// 校验配置并返回解析后的网关地址。
    pub fn validate(&self) -> Result<Url, String> {
        let gateway = Url::parse(&self.gateway_host)
            .map_err(|err| format!("invalid gateway host {:?}: {err}", self.gateway_host))?;
        if !matches!(gateway.scheme(), "http" | "https") {
            return Err(format!(
                "gateway host must be an http(s) url: {}",
                self.gateway_host
            ));
        }
        if self.session_expire_secs == 0 {
            return Err("invalid session expire period".into());
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err("tls cert and key must be set together".into());
        }
        Ok(gateway)
    }
}
