//! 可选的 TLS 证书加载。

use axum_server::tls_rustls::RustlsConfig;
use tokio::fs;
use tracing::info;

use crate::config::Args;

/// 同时配置证书与私钥时构建 Rustls 配置，否则以 HTTP 提供服务。
pub async fn load_rustls_config(args: &Args) -> Result<Option<RustlsConfig>, std::io::Error> {
    let (Some(cert_path), Some(key_path)) = (&args.tls_cert, &args.tls_key) else {
        return Ok(None);
    };
    let cert = fs::read(cert_path).await?;
    let key = fs::read(key_path).await?;
    info!(cert = %cert_path, "loaded tls certificate");
    RustlsConfig::from_pem(cert, key).await.map(Some)
}
