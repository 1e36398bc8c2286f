#![allow(dead_code)]
//! Official Account web-page OAuth (网页授权) module.
//!
//! Implements the browser authorization-code flow:
//! 1. Send the user to the vendor authorize page, carrying the current
//!    request URL as the post-authorization redirect target.
//! 2. The vendor redirects back with a `code` query parameter.
//! 3. Exchange the code for a user-scoped access_token + openid.
//!
//! Endpoints:
//! - Authorize (302 for the browser, not a server-side call):
//!   https://open.weixin.qq.com/connect/oauth2/authorize?appid=..&redirect_uri=..&response_type=code&scope=..&state=0#wechat_redirect
//! - Code exchange:
//!   GET https://api.weixin.qq.com/sns/oauth2/access_token?appid=..&secret=..&code=..&grant_type=authorization_code
//!
//! The flow is memoryless across requests except via the token cache and
//! the vendor-issued `code` parameter; [`OAuthGate`] makes the two phases
//! explicit instead of hiding them behind a header() side effect.

use bytes::Bytes;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::token::{Error, MpAuth, MpClient, Result, WxError, appid_hint, redact_body};

/// Vendor authorize page, opened by the user's browser.
pub(crate) const AUTHORIZE_ENDPOINT: &str = "https://open.weixin.qq.com/connect/oauth2/authorize";

/// OAuth code exchange endpoint.
pub(crate) const OAUTH_TOKEN_ENDPOINT: &str = "https://api.weixin.qq.com/sns/oauth2/access_token";

/// Web-page authorization scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OAuthScope {
    /// `snsapi_base`: silent, yields openid only
    #[default]
    Base,
    /// `snsapi_userinfo`: requires user consent, allows profile fetch
    UserInfo,
}

impl OAuthScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthScope::Base => "snsapi_base",
            OAuthScope::UserInfo => "snsapi_userinfo",
        }
    }
}

/// Successful OAuth token response.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct OAuthToken {
    /// User-scoped access token
    pub access_token: String,
    /// Expiration in seconds
    pub expires_in: u32,
    /// Token used to renew the access token (not exercised by this crate)
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Per-user, per-application identifier
    pub openid: String,
    /// Granted scope as reported by the vendor
    #[serde(default)]
    pub scope: Option<String>,
    /// Present only when the account is bound to an open platform
    #[serde(default)]
    pub unionid: Option<String>,
}

/// Raw OAuth token response (either success or error)
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum OAuthRawResp {
    Ok(OAuthToken),
    Err(WxError),
}

/// One inbound HTTP request as the OAuth flow sees it: the request's own
/// URL (scheme + host + path + query) and the optional `code` parameter.
#[derive(Clone, Debug)]
pub struct WebRequest {
    pub current_url: Url,
    pub code: Option<String>,
}

impl WebRequest {
    /// Build from the request URL, pulling `code` out of its query string.
    pub fn new(current_url: Url) -> Self {
        let code = current_url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned());
        Self { current_url, code }
    }
}

/// Outcome of one pass through the OAuth flow for one inbound request.
#[derive(Clone, Debug)]
pub enum OAuthGate {
    /// No usable token and no code: send the browser here and stop
    /// handling the current request.
    Redirect(Url),
    /// A fresh cached token, or one just exchanged from the code.
    Token(OAuthToken),
}

/// Build the vendor authorize URL for the given scope.
///
/// Pure construction; performs no vendor call. The current request URL is
/// the post-authorization redirect target, so the flow resumes on the same
/// route once the vendor appends `code`.
pub fn authorize_url(auth: &MpAuth, redirect_uri: &Url, scope: OAuthScope) -> Result<Url> {
    let mut url = Url::parse(AUTHORIZE_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    {
        let mut qp = url.query_pairs_mut();
        qp.append_pair("appid", &auth.app_id);
        qp.append_pair("redirect_uri", redirect_uri.as_str());
        qp.append_pair("response_type", "code");
        qp.append_pair("scope", scope.as_str());
        qp.append_pair("state", "0");
    }
    url.set_fragment(Some("wechat_redirect"));
    Ok(url)
}

impl MpClient {
    /// Exchange an authorization code for a user-scoped token.
    ///
    /// A vendor `errcode != 0` (e.g. 40029 invalid code, 42003 code
    /// expired) maps to [`Error::Wx`].
    #[instrument(level = "debug", skip(self, auth, code))]
    pub async fn exchange_code(&self, auth: &MpAuth, code: &str) -> Result<OAuthToken> {
        let (token, _raw) = self.fetch_oauth_token(auth, code).await?;
        Ok(token)
    }

    /// Code exchange that also returns the raw vendor JSON for caching.
    pub(crate) async fn fetch_oauth_token(
        &self,
        auth: &MpAuth,
        code: &str,
    ) -> Result<(OAuthToken, Bytes)> {
        let mut url =
            Url::parse(OAUTH_TOKEN_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("appid", &auth.app_id);
            qp.append_pair("secret", &auth.app_secret);
            qp.append_pair("code", code);
            qp.append_pair("grant_type", "authorization_code");
        }
        debug!(
            "exchanging oauth code (no secrets), appid hint: {}",
            appid_hint(&auth.app_id)
        );

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<OAuthRawResp>(&bytes) {
            Ok(OAuthRawResp::Ok(ok)) => Ok((ok, bytes)),
            Ok(OAuthRawResp::Err(err)) => Err(Error::Wx {
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
