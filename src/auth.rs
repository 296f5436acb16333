//! 登录、注册与登出：向存储网关换取令牌并写入 Cookie。

use axum::extract::rejection::FormRejection;
use axum::extract::{Extension, Form};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::gateway::Gateway;
use crate::http::{encode_component, redirect_found};
use crate::params::StorageParameters;
use crate::session::Token;
use crate::views::{FormView, Views};

const INVALID_CREDENTIALS: &str = "Invalid storage name or password";

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    password: String,
}

fn storage_location(storage: &str) -> String {
    format!("/{}", encode_component(storage))
}

/// 成功响应体即为新令牌：写入 Cookie 并跳转到存储页。
async fn accept_token(
    gateway: &Gateway,
    jar: &mut CookieJar,
    response: reqwest::Response,
    storage: &str,
) -> Result<Response, ApiError> {
    let token = response
        .text()
        .await
        .map_err(|err| ApiError::internal("invalid session token", err))?;
    gateway.tokens().set(jar, &Token::new(token), storage);
    redirect_found(&storage_location(storage))
}

/// 登录页。
pub async fn login_page(
    Extension(views): Extension<Arc<Views>>,
    params: StorageParameters,
) -> Result<Response, ApiError> {
    let form = FormView::new(params.storage_name);
    Ok(views.login(&form)?.into_response())
}

/// 登录已有存储。
pub async fn login(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(views): Extension<Arc<Views>>,
    mut jar: CookieJar,
    params: StorageParameters,
    form: Result<Form<LoginForm>, FormRejection>,
) -> (CookieJar, Result<Response, ApiError>) {
    let result: Result<Response, ApiError> = async {
        let Form(LoginForm { password }) = form
            .map_err(|err| ApiError::InvalidParams(format!("request parameters: {err}")))?;

        let mut view = FormView::new(params.storage_name.clone());
        if params.storage_name.is_empty() {
            view.add_error("name", "Please specify storage name to login");
        }
        if password.is_empty() {
            view.add_error("password", "Please enter password to login");
        }
        if view.has_errors() {
            return Ok(views.login(&view)?.into_response());
        }

        let mut values = params.values();
        values.push(("password", password));
        match gateway
            .post_form(&mut jar, &params.storage_name, "login", values)
            .await
        {
            Ok(response) => {
                info!(storage = %params.storage_name, "login");
                accept_token(&gateway, &mut jar, response, &params.storage_name).await
            }
            Err(ApiError::NotFound(_) | ApiError::Mismatch(_)) => {
                view.add_error("common", INVALID_CREDENTIALS);
                Ok(views.login(&view)?.into_response())
            }
            Err(err) => {
                view.add_error("common", err.description());
                Ok(views.login(&view)?.into_response())
            }
        }
    }
    .await;
    (jar, result)
}

/// 注册页。
pub async fn register_page(Extension(views): Extension<Arc<Views>>) -> Result<Response, ApiError> {
    Ok(views.register(&FormView::default())?.into_response())
}

/// 注册新存储。
pub async fn register(
    Extension(gateway): Extension<Arc<Gateway>>,
    Extension(views): Extension<Arc<Views>>,
    mut jar: CookieJar,
    form: Result<Form<RegisterForm>, FormRejection>,
) -> (CookieJar, Result<Response, ApiError>) {
    let result: Result<Response, ApiError> = async {
        let Form(RegisterForm { name, password }) = form
            .map_err(|err| ApiError::InvalidParams(format!("request parameters: {err}")))?;

        let mut view = FormView::new(name.clone());
        if name.is_empty() {
            view.add_error("name", "please specify storage name");
            return Ok(views.register(&view)?.into_response());
        }

        let values = vec![("storage", name.clone()), ("password", password)];
        match gateway.post_form(&mut jar, &name, "register", values).await {
            Ok(response) => {
                info!(storage = %name, "register storage");
                accept_token(&gateway, &mut jar, response, &name).await
            }
            Err(ApiError::AlreadyExists(_)) => {
                view.add_error("common", "storage with this name already exists");
                Ok(views.register(&view)?.into_response())
            }
            Err(err) => {
                view.add_error("common", err.description());
                Ok(views.register(&view)?.into_response())
            }
        }
    }
    .await;
    (jar, result)
}

/// 登出：清除该存储的令牌并回到登录页。
pub async fn logout(
    Extension(gateway): Extension<Arc<Gateway>>,
    mut jar: CookieJar,
    params: StorageParameters,
) -> (CookieJar, Result<Response, ApiError>) {
    gateway.tokens().clear(&mut jar, &params.storage_name);
    info!(storage = %params.storage_name, "logout");
    let location = format!("/login/{}/", encode_component(&params.storage_name));
    (jar, redirect_found(&location))
}
