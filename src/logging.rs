//! 日志初始化：支持 `RUST_LOG` 覆盖，默认 info 级别。

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// 默认过滤规则：请求跨度走 tower_http，出站客户端的连接细节压到 warn。
const DEFAULT_FILTER: &str = "info,tower_http=debug,reqwest=warn,hyper_util=warn";

/// 初始化 tracing 日志订阅。
pub fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
