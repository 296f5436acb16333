//! 存储网关转发层：构建出站请求、注入令牌、解析响应。

use axum_extra::extract::CookieJar;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{Client, Method, Request, Response};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::config::TOKEN_HEADER;
use crate::error::{ApiError, ErrorBody};
use crate::session::{Token, TokenStore};

/// 出站请求体。
pub enum OutboundBody {
    Empty,
    Form(Vec<(&'static str, String)>),
    Multipart(Form),
}

/// 转发器：持有 HTTP 客户端、网关地址与令牌存储，请求间只读共享。
pub struct Gateway {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
}

impl Gateway {
    pub fn new(
        base_url: Url,
        tokens: Arc<dyn TokenStore>,
        timeout: Option<Duration>,
    ) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Gateway {
            client: builder.build()?,
            base_url,
            tokens,
        })
    }

    pub fn tokens(&self) -> &dyn TokenStore {
        self.tokens.as_ref()
    }

    /// 端点地址：`<gateway-host>/<endpoint>/`。
    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, ApiError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{endpoint}/"))
            .map_err(|err| ApiError::internal("make url", err))
    }

    /// 构建出站请求；存在该存储的令牌时附加 `Authorization: Bearer`。
    pub fn build_request(
        &self,
        jar: &CookieJar,
        storage: &str,
        method: Method,
        endpoint: &str,
        query: &[(&'static str, String)],
        body: OutboundBody,
    ) -> Result<Request, ApiError> {
        let mut builder = self.client.request(method, self.endpoint_url(endpoint)?);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        builder = match body {
            OutboundBody::Empty => builder,
            OutboundBody::Form(values) => builder.form(&values),
            OutboundBody::Multipart(form) => builder.multipart(form),
        };
        if let Some(Token { value }) = self.tokens.get(storage, jar) {
            builder = builder.bearer_auth(value);
        }
        builder
            .build()
            .map_err(|err| ApiError::internal("make request", err))
    }

    /// GET 请求，参数放在查询串中。
    pub async fn get(
        &self,
        jar: &mut CookieJar,
        storage: &str,
        endpoint: &str,
        values: &[(&'static str, String)],
    ) -> Result<Response, ApiError> {
        let request =
            self.build_request(jar, storage, Method::GET, endpoint, values, OutboundBody::Empty)?;
        self.process(request, jar, storage).await
    }

    /// URL 编码表单 POST。
    pub async fn post_form(
        &self,
        jar: &mut CookieJar,
        storage: &str,
        endpoint: &str,
        values: Vec<(&'static str, String)>,
    ) -> Result<Response, ApiError> {
        let request = self.build_request(
            jar,
            storage,
            Method::POST,
            endpoint,
            &[],
            OutboundBody::Form(values),
        )?;
        self.process(request, jar, storage).await
    }

    /// multipart 表单 POST。
    pub async fn post_multipart(
        &self,
        jar: &mut CookieJar,
        storage: &str,
        endpoint: &str,
        form: Form,
    ) -> Result<Response, ApiError> {
        let request = self.build_request(
            jar,
            storage,
            Method::POST,
            endpoint,
            &[],
            OutboundBody::Multipart(form),
        )?;
        self.process(request, jar, storage).await
    }

    /// 执行请求并按状态码分类：200 成功，400 为下游领域错误，其余为内部错误。
    pub async fn process(
        &self,
        request: Request,
        jar: &mut CookieJar,
        storage: &str,
    ) -> Result<Response, ApiError> {
        let method = request.method().clone();
        let path = request.url().path().to_string();
        let response = self
            .client
            .execute(request)
            .await
            .map_err(|err| ApiError::internal("do request", err))?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "gateway response");

        match status.as_u16() {
            200 => {
                if let Some(token) = response
                    .headers()
                    .get(TOKEN_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .filter(|value| !value.is_empty())
                {
                    info!(storage, "refresh session token");
                    self.tokens.set(jar, &Token::new(token), storage);
                }
                Ok(response)
            }
            400 => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|err| ApiError::internal("read error body", err))?;
                let body: ErrorBody = serde_json::from_slice(&bytes)
                    .map_err(|err| ApiError::internal("json decode", err))?;
                Err(ApiError::from(body))
            }
            _ => Err(ApiError::Internal("invalid status code".into())),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::session::CookieTokenStore;
    use axum::http::{HeaderMap, HeaderValue, header};
    use wiremock::matchers::{header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn make_gateway(base: &str) -> Arc<Gateway> {
        let tokens = Arc::new(CookieTokenStore::new(Duration::from_secs(3600), false));
        Arc::new(
            Gateway::new(Url::parse(base).expect("base url"), tokens, None).expect("gateway"),
        )
    }

    pub(crate) fn jar_with(cookie: &str) -> CookieJar {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(cookie).expect("cookie"));
        CookieJar::from_headers(&headers)
    }

    fn values(storage: &str) -> Vec<(&'static str, String)> {
        vec![("storage", storage.to_string()), ("file", String::new())]
    }

    #[test]
    fn endpoint_url_appends_trailing_slash() {
        let gateway = make_gateway("http://storage:8000/");
        assert_eq!(
            gateway.endpoint_url("list").expect("url").as_str(),
            "http://storage:8000/list/"
        );
    }

    #[test]
    fn bearer_attached_only_when_token_stored() {
        let gateway = make_gateway("http://storage:8000");
        let jar = jar_with("fs_acme=tok-abc");

        let with_token = gateway
            .build_request(&jar, "acme", Method::GET, "list", &values("acme"), OutboundBody::Empty)
            .expect("request");
        assert_eq!(
            with_token.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer tok-abc")
        );
        assert_eq!(with_token.url().query(), Some("storage=acme&file="));

        let without_token = gateway
            .build_request(&jar, "other", Method::GET, "list", &values("other"), OutboundBody::Empty)
            .expect("request");
        assert!(without_token.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn form_body_is_url_encoded() {
        let gateway = make_gateway("http://storage:8000");
        let request = gateway
            .build_request(
                &CookieJar::new(),
                "acme",
                Method::POST,
                "shareText",
                &[],
                OutboundBody::Form(vec![
                    ("storage", "acme".into()),
                    ("title", "hello world".into()),
                ]),
            )
            .expect("request");
        assert_eq!(
            request.headers().get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/x-www-form-urlencoded")
        );
        let body = request
            .body()
            .and_then(|body| body.as_bytes())
            .expect("buffered body");
        assert_eq!(body, b"storage=acme&title=hello+world");
        assert!(request.url().query().is_none());
    }

    #[tokio::test]
    async fn ok_with_x_token_refreshes_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list/"))
            .and(query_param("storage", "acme"))
            .and(header_is("authorization", "Bearer old"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("X-Token", "fresh")
                    .set_body_string("[]"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let gateway = make_gateway(&server.uri());
        let mut jar = jar_with("fs_acme=old");
        let response = gateway
            .get(&mut jar, "acme", "list", &values("acme"))
            .await
            .expect("success");
        assert_eq!(response.text().await.expect("body"), "[]");
        assert_eq!(gateway.tokens().get("acme", &jar), Some(Token::new("fresh")));
    }

    #[tokio::test]
    async fn ok_without_x_token_keeps_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let gateway = make_gateway(&server.uri());
        let mut jar = jar_with("fs_acme=old");
        gateway
            .get(&mut jar, "acme", "list", &values("acme"))
            .await
            .expect("success");
        assert_eq!(gateway.tokens().get("acme", &jar), Some(Token::new("old")));
        assert_eq!(jar.iter().count(), 1);
    }

    #[tokio::test]
    async fn bad_request_decodes_domain_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register/"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                r#"{"code":"already_exist","description":"storage exists"}"#,
            ))
            .mount(&server)
            .await;

        let gateway = make_gateway(&server.uri());
        let mut jar = CookieJar::new();
        let result = gateway
            .post_form(&mut jar, "acme", "register", values("acme"))
            .await;
        assert_eq!(
            result.err(),
            Some(ApiError::AlreadyExists("storage exists".into()))
        );
    }

    #[tokio::test]
    async fn bad_request_with_garbage_body_is_internal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("oops"))
            .mount(&server)
            .await;

        let gateway = make_gateway(&server.uri());
        let result = gateway
            .get(&mut CookieJar::new(), "acme", "file", &values("acme"))
            .await;
        assert!(matches!(result, Err(ApiError::Internal(_))));
    }

    #[tokio::test]
    async fn other_statuses_are_internal() {
        for status in [201u16, 401, 404, 409, 500, 503] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(status).set_body_string(
                    r#"{"code":"not_exist","description":"no such file"}"#,
                ))
                .mount(&server)
                .await;

            let gateway = make_gateway(&server.uri());
            let result = gateway
                .get(&mut CookieJar::new(), "acme", "file", &values("acme"))
                .await;
            assert_eq!(
                result.err(),
                Some(ApiError::Internal("invalid status code".into())),
                "status {status}"
            );
        }
    }

    #[tokio::test]
    async fn transport_failure_is_internal() {
        let gateway = make_gateway("http://127.0.0.1:9");
        let result = gateway
            .get(&mut CookieJar::new(), "acme", "list", &values("acme"))
            .await;
        assert_eq!(result.err(), Some(ApiError::Internal("do request".into())));
    }
}
