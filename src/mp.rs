#![allow(dead_code)]
//! High-level Official Account facade.
//!
//! `WxMp` ties the pieces together: credentials, HTTP client, the two
//! token stores (application + OAuth) and the operations a web app calls:
//! profile fetch over the browser OAuth flow, UnionID profile fetch (single
//! and batch) and menu push.
//!
//! Error policy: every operation returns `Result`; vendor business errors
//! are [`Error::Wx`] regardless of which call produced them, and the caller
//! decides what is fatal. On the profile/menu operations the facade
//! additionally records the formatted message, retrievable via
//! [`WxMp::last_error`], and invalidates the backing token cache when the
//! errcode says the token itself is bad, so the next call refetches.
//!
//! Usage:
//!   let mp = WxMp::new(MpAuth::from_env()?);
//!   match mp.user_info(&request).await? {
//!       UserInfoGate::Redirect(url) => send_302(url),
//!       UserInfoGate::Profile(profile) => render(profile),
//!   }

use std::sync::Mutex;

use reqwest::Url;
use tracing::{instrument, warn};

use crate::errors;
use crate::menu::MenuButton;
use crate::oauth::{OAuthGate, OAuthScope, WebRequest};
use crate::token::{AccessToken, Error, MpAuth, MpClient, Result};
use crate::token_cache::{FileTokenStore, TokenStore};
use crate::token_tool::{cached_access_token, cached_oauth_token};
use crate::user_info::{UserInfoBatchGetRequest, UserProfile};

/// Outcome of the no-target profile fetch for one inbound request.
#[derive(Clone, Debug)]
pub enum UserInfoGate {
    /// The browser must visit the vendor authorize page first.
    Redirect(Url),
    /// The user's profile, fetched with their OAuth token.
    Profile(UserProfile),
}

/// One Official Account with cached tokens.
pub struct WxMp {
    client: MpClient,
    auth: MpAuth,
    app_store: Box<dyn TokenStore>,
    oauth_store: Box<dyn TokenStore>,
    last_error: Mutex<Option<String>>,
}

impl WxMp {
    /// Token caches default to `access_token.json` / `oauth_access_token.json`
    /// in the working directory.
    pub fn new(auth: MpAuth) -> Self {
        Self::with_stores(
            auth,
            Box::new(FileTokenStore::app_default()),
            Box::new(FileTokenStore::oauth_default()),
        )
    }

    /// Use custom token store implementations.
    pub fn with_stores(
        auth: MpAuth,
        app_store: Box<dyn TokenStore>,
        oauth_store: Box<dyn TokenStore>,
    ) -> Self {
        Self {
            client: MpClient::default(),
            auth,
            app_store,
            oauth_store,
            last_error: Mutex::new(None),
        }
    }

    /// Use a custom `MpClient`.
    pub fn with_client(mut self, client: MpClient) -> Self {
        self.client = client;
        self
    }

    /// Cached application-level token.
    pub async fn access_token(&self) -> Result<AccessToken> {
        cached_access_token(&self.client, &self.auth, self.app_store.as_ref()).await
    }

    /// Cached user-level token for one inbound request; may yield a redirect.
    pub async fn oauth_token(&self, request: &WebRequest, scope: OAuthScope) -> Result<OAuthGate> {
        cached_oauth_token(
            &self.client,
            &self.auth,
            self.oauth_store.as_ref(),
            request,
            scope,
        )
        .await
    }

    /// Current user's profile via the browser OAuth flow (scope
    /// `snsapi_userinfo`).
    #[instrument(level = "debug", skip_all)]
    pub async fn user_info(&self, request: &WebRequest) -> Result<UserInfoGate> {
        match self.oauth_token(request, OAuthScope::UserInfo).await? {
            OAuthGate::Redirect(url) => Ok(UserInfoGate::Redirect(url)),
            OAuthGate::Token(token) => {
                match self
                    .client
                    .sns_user_info(&token.access_token, &token.openid)
                    .await
                {
                    Ok(profile) => Ok(UserInfoGate::Profile(profile)),
                    Err(err) => {
                        self.record_soft_failure(&err, self.oauth_store.as_ref())
                            .await;
                        Err(err)
                    }
                }
            }
        }
    }

    /// One user's profile via the UnionID endpoint (application token).
    #[instrument(level = "debug", skip(self))]
    pub async fn user_info_by_openid(&self, openid: &str) -> Result<UserProfile> {
        let token = self.access_token().await?;
        match self.client.user_info(&token.access_token, openid).await {
            Ok(profile) => Ok(profile),
            Err(err) => {
                self.record_soft_failure(&err, self.app_store.as_ref())
                    .await;
                Err(err)
            }
        }
    }

    /// Batch profile fetch via the UnionID endpoint (application token).
    #[instrument(level = "debug", skip_all)]
    pub async fn user_info_batch(&self, openids: &[String]) -> Result<Vec<UserProfile>> {
        let token = self.access_token().await?;
        let req = UserInfoBatchGetRequest::new(openids.iter().cloned());
        match self
            .client
            .user_info_batchget(&token.access_token, &req)
            .await
        {
            Ok(profiles) => Ok(profiles),
            Err(err) => {
                self.record_soft_failure(&err, self.app_store.as_ref())
                    .await;
                Err(err)
            }
        }
    }

    /// Push a menu configuration (application token).
    #[instrument(level = "debug", skip_all)]
    pub async fn create_menu(&self, buttons: &[MenuButton]) -> Result<()> {
        let token = self.access_token().await?;
        match self.client.create_menu(&token.access_token, buttons).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.record_soft_failure(&err, self.app_store.as_ref())
                    .await;
                Err(err)
            }
        }
    }

    /// Last recorded vendor business error (`code:<errcode>,<errmsg>`),
    /// overwritten by each failing call, never accumulated.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Record a vendor business error and, when the errcode says the token
    /// itself is bad, drop the cache that produced it.
    async fn record_soft_failure(&self, err: &Error, used_store: &dyn TokenStore) {
        let Error::Wx { code, message } = err else {
            return;
        };
        warn!("{}", errors::explain(*code, message));
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) =
            Some(format!("code:{code},{message}"));
        if errors::should_refresh_token(*code) {
            if let Err(e) = used_store.invalidate().await {
                warn!("failed to invalidate token cache: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_cache::FileTokenStore;

    fn mp_with_temp_stores() -> (tempfile::TempDir, WxMp) {
        let dir = tempfile::tempdir().expect("tempdir");
        let mp = WxMp::with_stores(
            MpAuth::new("wx0123456789abcdef", "secret"),
            Box::new(FileTokenStore::new(dir.path().join("access_token.json"))),
            Box::new(FileTokenStore::new(
                dir.path().join("oauth_access_token.json"),
            )),
        );
        (dir, mp)
    }

    #[tokio::test]
    async fn user_info_without_code_redirects() {
        let (_dir, mp) = mp_with_temp_stores();
        let request = WebRequest::new(
            Url::parse("https://example.com/userinfo").expect("url"),
        );
        match mp.user_info(&request).await.expect("gate") {
            UserInfoGate::Redirect(url) => {
                assert!(url.query().expect("query").contains("scope=snsapi_userinfo"));
            }
            UserInfoGate::Profile(_) => panic!("expected redirect"),
        }
        assert!(mp.last_error().is_none());
    }

    #[tokio::test]
    async fn soft_failure_records_formatted_error() {
        let (_dir, mp) = mp_with_temp_stores();
        let err = Error::Wx {
            code: 40003,
            message: "invalid openid".into(),
        };
        mp.record_soft_failure(&err, mp.app_store.as_ref()).await;
        let msg = mp.last_error().expect("recorded");
        assert!(msg.contains("code:40003"));
        assert_eq!(msg, "code:40003,invalid openid");
    }

    #[tokio::test]
    async fn last_error_is_overwritten_not_accumulated() {
        let (_dir, mp) = mp_with_temp_stores();
        for (code, message) in [(40003_i64, "invalid openid"), (40018, "invalid button name")] {
            let err = Error::Wx {
                code,
                message: message.into(),
            };
            mp.record_soft_failure(&err, mp.app_store.as_ref()).await;
        }
        assert_eq!(
            mp.last_error().as_deref(),
            Some("code:40018,invalid button name")
        );
    }

    #[tokio::test]
    async fn token_errcode_drops_the_used_cache() {
        let (_dir, mp) = mp_with_temp_stores();
        mp.app_store
            .store(br#"{"access_token":"T","expires_in":7200}"#)
            .await
            .expect("seed");

        // 40003 is not a token problem: cache stays
        let err = Error::Wx {
            code: 40003,
            message: "invalid openid".into(),
        };
        mp.record_soft_failure(&err, mp.app_store.as_ref()).await;
        assert!(mp.app_store.load().await.expect("load").is_some());

        // 40001 is: cache goes
        let err = Error::Wx {
            code: 40001,
            message: "invalid credential".into(),
        };
        mp.record_soft_failure(&err, mp.app_store.as_ref()).await;
        assert!(mp.app_store.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn non_wx_errors_are_not_recorded() {
        let (_dir, mp) = mp_with_temp_stores();
        let err = Error::Config("boom".into());
        mp.record_soft_failure(&err, mp.app_store.as_ref()).await;
        assert!(mp.last_error().is_none());
    }
}
