#![allow(dead_code)]
//! WeChat Official Account (公众平台) application token module.
//!
//! Provides the credential type, the base HTTP client and the
//! application-level `access_token` fetch, designed to be extended with
//! more APIs (web OAuth, user info, menu).
//!
//! Design:
//! - `MpAuth` carries the appid + appsecret pair for one Official Account.
//! - `MpClient` handles HTTP and basic error mapping; token caching/refresh
//!   lives in `token_cache` / `token_tool`.
//! - Errors are unified via `Error`.
//!
//! Endpoint:
//! - GET https://api.weixin.qq.com/cgi-bin/token?grant_type=client_credential&appid=APPID&secret=APPSECRET
//!
//! Note: Always refer to the official documentation for the most up-to-date details.

use bytes::Bytes;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

/// Application token endpoint.
pub(crate) const TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/token";

/// Timeout applied to every outbound vendor call.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Credentials for one Official Account: appid + appsecret.
///
/// Immutable for the process lifetime once constructed.
#[derive(Clone, Debug)]
pub struct MpAuth {
    pub app_id: String,
    pub app_secret: String,
}

impl MpAuth {
    pub fn new(app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Read credentials from `WX_APPID` / `WX_APPSECRET`.
    pub fn from_env() -> Result<Self> {
        let app_id =
            std::env::var("WX_APPID").map_err(|_| Error::Config("WX_APPID not set".into()))?;
        let app_secret = std::env::var("WX_APPSECRET")
            .map_err(|_| Error::Config("WX_APPSECRET not set".into()))?;
        Ok(Self { app_id, app_secret })
    }
}

/// Successful application token response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AccessToken {
    /// Access token string
    pub access_token: String,
    /// Expiration in seconds
    pub expires_in: u32,
}

/// WeChat API error response body.
#[derive(Clone, Debug, Deserialize)]
pub struct WxError {
    pub errcode: i64,
    pub errmsg: String,
}

/// Raw token response (either success or error)
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum TokenRawResp {
    Ok(AccessToken),
    Err(WxError),
}

/// Unified error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    /// Vendor-reported business error. The Display form keeps the
    /// `code:<errcode>,<errmsg>` shape surfaced to API consumers.
    #[error("code:{code},{message}")]
    Wx { code: i64, message: String },

    #[error("unexpected response (status {status}): {error}; body: {body}")]
    UnexpectedResponse {
        status: u16,
        error: String,
        body: String,
    },

    #[error("token cache io: {0}")]
    Io(#[from] std::io::Error),

    #[error("token cache json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Base client for the Official Account web-page APIs.
///
/// - Wraps `reqwest::Client`
/// - Provides token fetching (no caching/auto-refresh here)
/// - Easy to extend for more APIs
#[derive(Clone, Debug)]
pub struct MpClient {
    pub(crate) http: reqwest::Client,
}

impl Default for MpClient {
    fn default() -> Self {
        let http = reqwest::Client::builder()
            .gzip(true)
            .timeout(HTTP_TIMEOUT)
            .build()
            .expect("reqwest::Client build must succeed");
        Self { http }
    }
}

impl MpClient {
    /// Use a custom `reqwest::Client`
    pub fn with_http(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Fetch the application-level access_token.
    ///
    /// GET https://api.weixin.qq.com/cgi-bin/token
    /// params: grant_type=client_credential, appid, secret (do not log secrets)
    ///
    /// A vendor `errcode != 0` maps to [`Error::Wx`].
    #[instrument(level = "debug", skip(self, auth))]
    pub async fn get_access_token(&self, auth: &MpAuth) -> Result<AccessToken> {
        let (token, _raw) = self.fetch_access_token(auth).await?;
        Ok(token)
    }

    /// Same as [`get_access_token`](Self::get_access_token) but also returns
    /// the raw vendor JSON, so a cache can persist the response verbatim.
    pub(crate) async fn fetch_access_token(&self, auth: &MpAuth) -> Result<(AccessToken, Bytes)> {
        let mut url = Url::parse(TOKEN_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("grant_type", "client_credential");
            qp.append_pair("appid", &auth.app_id);
            qp.append_pair("secret", &auth.app_secret);
        }
        debug!(
            "requesting application access_token (no secrets), appid hint: {}",
            appid_hint(&auth.app_id)
        );

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<TokenRawResp>(&bytes) {
            Ok(TokenRawResp::Ok(ok)) => Ok((ok, bytes)),
            Ok(TokenRawResp::Err(err)) => Err(Error::Wx {
                code: err.errcode,
                message: err.errmsg,
            }),
            Err(de_err) => Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                error: de_err.to_string(),
                body: redact_body(&bytes),
            }),
        }
    }
}

/// Redact and truncate a response body before it lands in an error message,
/// so a valid token never leaks through logs.
pub(crate) fn redact_body(bytes: &[u8]) -> String {
    let mut body = String::from_utf8_lossy(bytes).to_string();
    if let Ok(mut v) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(obj) = v.as_object_mut() {
            for field in ["access_token", "refresh_token"] {
                if obj.get(field).is_some() {
                    obj.insert(
                        field.to_string(),
                        serde_json::Value::String("[redacted]".into()),
                    );
                }
            }
        }
        if let Ok(s) = serde_json::to_string(&v) {
            body = s;
        }
    }
    if body.len() > 2048 {
        body.truncate(2048);
        body.push_str("...");
    }
    body
}

/// Shorten an appid for logs: keep first 2 and last 2 chars where possible.
pub(crate) fn appid_hint(id: &str) -> String {
    if id.len() <= 4 {
        format!("{}***", id)
    } else {
        format!("{}***{}", &id[..2], &id[id.len().saturating_sub(2)..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wx_error_display_keeps_code_prefix() {
        let e = Error::Wx {
            code: 40001,
            message: "invalid credential".into(),
        };
        assert!(e.to_string().contains("code:40001"));
        assert_eq!(e.to_string(), "code:40001,invalid credential");
    }

    #[test]
    fn token_resp_decodes_success_and_error() {
        let ok = br#"{"access_token":"ACCESS","expires_in":7200}"#;
        match serde_json::from_slice::<TokenRawResp>(ok).expect("decode") {
            TokenRawResp::Ok(t) => {
                assert_eq!(t.access_token, "ACCESS");
                assert_eq!(t.expires_in, 7200);
            }
            TokenRawResp::Err(_) => panic!("expected success arm"),
        }

        let err = br#"{"errcode":40013,"errmsg":"invalid appid"}"#;
        match serde_json::from_slice::<TokenRawResp>(err).expect("decode") {
            TokenRawResp::Err(e) => {
                assert_eq!(e.errcode, 40013);
                assert_eq!(e.errmsg, "invalid appid");
            }
            TokenRawResp::Ok(_) => panic!("expected error arm"),
        }
    }

    #[test]
    fn redact_hides_tokens() {
        let body = br#"{"access_token":"SECRET","expires_in":7200,"extra":1}"#;
        let out = redact_body(body);
        assert!(!out.contains("SECRET"));
        assert!(out.contains("[redacted]"));
    }

    #[test]
    fn appid_hint_never_exposes_middle() {
        assert_eq!(appid_hint("wx12"), "wx12***");
        assert_eq!(appid_hint("wx1234567890"), "wx***90");
    }
}
