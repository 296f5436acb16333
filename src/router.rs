//! 路由表：挂载处理器、路由标志与公共中间件。

use axum::extract::{Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{MethodRouter, get};
use axum::{Router, middleware};
use axum_extra::extract::CookieJar;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::http::{add_security_headers, recover_panic};
use crate::multipart::UploadConfig;
use crate::params::{RouteFlags, StorageParameters};
use crate::views::Views;
use crate::{auth, files, frontend};

fn flagged(route: MethodRouter, flags: RouteFlags) -> MethodRouter {
    route.layer(Extension(flags))
}

/// 关键字路由上的 GET：文件名恰好是 `upload` 等关键字时仍然下载该文件。
fn download_named(file: &'static str) -> MethodRouter {
    get(
        move |gateway: Extension<Arc<Gateway>>, jar: CookieJar, params: StorageParameters| {
            files::get_file(gateway, jar, params.with_file_name(file))
        },
    )
}

async fn not_found() -> ApiError {
    ApiError::NotFound("page not found".into())
}

/// 构建完整的应用路由。
pub fn build_router(
    gateway: Arc<Gateway>,
    views: Arc<Views>,
    upload_config: Arc<UploadConfig>,
) -> Router {
    use RouteFlags as F;

    Router::new()
        .route("/", get(frontend::index_redirect))
        .route("/res/{*path}", get(frontend::serve_resource))
        .route("/favicon.ico", get(frontend::favicon))
        .route(
            "/register/",
            flagged(get(auth::register_page).post(auth::register), F::PUBLIC),
        )
        .route(
            "/login/{storage}/",
            flagged(get(auth::login_page).post(auth::login), F::PUBLIC),
        )
        .route("/logout/{storage}/", flagged(get(auth::logout), F::PUBLIC))
        .route(
            "/{storage}/index.html",
            flagged(get(files::index_html), F::PRIVATE),
        )
        .route(
            "/{storage}/permanent/index.html",
            flagged(get(files::index_html), F::PERMANENT),
        )
        .route(
            "/{storage}/permanent/{file}/",
            flagged(get(files::get_file), F::PERMANENT),
        )
        .route(
            "/{storage}/permanent/",
            flagged(get(files::view), F::PERMANENT),
        )
        .route("/{storage}/{file}/", flagged(get(files::get_file), F::PRIVATE))
        .route("/{storage}/", flagged(get(files::view), F::PRIVATE))
        .route("/{storage}", flagged(get(files::view), F::PRIVATE))
        .route(
            "/{storage}/upload/",
            flagged(download_named("upload").post(files::upload), F::PRIVATE),
        )
        .route(
            "/{storage}/permanent/upload/",
            flagged(download_named("upload").post(files::upload), F::PERMANENT),
        )
        .route(
            "/{storage}/remove/",
            flagged(download_named("remove").post(files::remove), F::PRIVATE),
        )
        .route(
            "/{storage}/permanent/remove/",
            flagged(download_named("remove").post(files::remove), F::PERMANENT),
        )
        .route(
            "/{storage}/shareText/",
            flagged(download_named("shareText").post(files::share_text), F::PRIVATE),
        )
        .route(
            "/{storage}/permanent/shareText/",
            flagged(
                download_named("shareText").post(files::share_text),
                F::PERMANENT,
            ),
        )
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(recover_panic))
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let forwarded_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .map(|s| s.split(',').next().unwrap_or("").trim().to_string());
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip().to_string());
                    let client_ip = forwarded_ip
                        .or(connect_ip)
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        env!("CARGO_CRATE_NAME"),
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        )
        .layer(Extension(gateway))
        .layer(Extension(views))
        .layer(Extension(upload_config))
}
