//! 会话令牌存储：以浏览器 Cookie 保存每个存储的访问令牌。

use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use cookie::time::Duration as CookieDuration;
use std::time::Duration;
use url::form_urlencoded::byte_serialize;

use crate::config::TOKEN_COOKIE_PREFIX;

/// 不透明的访问令牌。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub value: String,
}

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Token {
            value: value.into(),
        }
    }
}

/// 令牌存储能力：按存储名读取、写入、清除令牌。
///
/// 读取使用请求携带的 Cookie，写入与清除记录到响应 Cookie 中。
pub trait TokenStore: Send + Sync {
    fn get(&self, storage: &str, jar: &CookieJar) -> Option<Token>;
    fn set(&self, jar: &mut CookieJar, token: &Token, storage: &str);
    fn clear(&self, jar: &mut CookieJar, storage: &str);
}

#[derive(Debug)]
pub struct CookieTokenStore {
    pub expire_period: Duration,
    pub secure: bool,
}

impl CookieTokenStore {
    pub fn new(expire_period: Duration, secure: bool) -> Self {
        CookieTokenStore {
            expire_period,
            secure,
        }
    }
}

/// 存储名到 Cookie 名的映射，空存储名不对应任何 Cookie。
pub fn cookie_name(storage: &str) -> Option<String> {
    if storage.is_empty() {
        return None;
    }
    let encoded: String = byte_serialize(storage.as_bytes()).collect();
    Some(format!("{TOKEN_COOKIE_PREFIX}{encoded}"))
}

impl TokenStore for CookieTokenStore {
    fn get(&self, storage: &str, jar: &CookieJar) -> Option<Token> {
        let name = cookie_name(storage)?;
        jar.get(&name)
            .map(|cookie| cookie.value())
            .filter(|value| !value.is_empty())
            .map(Token::new)
    }

    fn set(&self, jar: &mut CookieJar, token: &Token, storage: &str) {
        let Some(name) = cookie_name(storage) else {
            return;
        };
        let cookie = Cookie::build((name, token.value.clone()))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .max_age(CookieDuration::seconds(
                i64::try_from(self.expire_period.as_secs()).unwrap_or(i64::MAX),
            ))
            .build();
        *jar = jar.clone().add(cookie);
    }

    fn clear(&self, jar: &mut CookieJar, storage: &str) {
        let Some(name) = cookie_name(storage) else {
            return;
        };
        *jar = jar.clone().remove(Cookie::build((name, "")).path("/").build());
    }
}
