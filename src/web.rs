#![allow(dead_code)]
//! Web controller for the browser OAuth flow.
//!
//! One route: `GET /userinfo`. The handler rebuilds the inbound request's
//! own URL (it becomes the post-authorization redirect target), lets
//! [`WxMp::user_info`] run the flow, and answers with either a 302 to the
//! vendor authorize page or `{"userinfo": {...}}`.
//!
//! Vendor business errors surface as a 502 with the `code:<errcode>,<errmsg>`
//! text in the `error` field rather than a bare failure value, so callers
//! of the JSON API see why the fetch failed.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{OriginalUri, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::Host;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, error};

use crate::mp::{UserInfoGate, WxMp};
use crate::oauth::WebRequest;
use crate::token::{Error, Result};
use crate::user_info::UserProfile;

/// Shared handler state.
#[derive(Clone)]
pub struct MpState {
    mp: Arc<WxMp>,
}

impl MpState {
    pub fn new(mp: WxMp) -> Self {
        Self { mp: Arc::new(mp) }
    }

    pub fn mp(&self) -> &WxMp {
        &self.mp
    }
}

/// Router exposing `GET /userinfo`.
pub fn router(state: MpState) -> Router {
    Router::new()
        .route("/userinfo", get(userinfo))
        .with_state(state)
}

/// JSON envelope handed back to the caller.
#[derive(Debug, Serialize)]
struct UserInfoResponse {
    userinfo: Option<UserProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn userinfo(
    State(state): State<MpState>,
    Host(host): Host,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> Response {
    let current_url = match request_url(&headers, &host, &uri.to_string()) {
        Ok(url) => url,
        Err(e) => {
            error!("cannot rebuild request url: {e}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    debug!(%current_url, "userinfo request");
    let request = WebRequest::new(current_url);

    match state.mp.user_info(&request).await {
        Ok(UserInfoGate::Redirect(url)) => Redirect::temporary(url.as_str()).into_response(),
        Ok(UserInfoGate::Profile(profile)) => Json(UserInfoResponse {
            userinfo: Some(profile),
            error: None,
        })
        .into_response(),
        Err(err @ Error::Wx { .. }) => (
            StatusCode::BAD_GATEWAY,
            Json(UserInfoResponse {
                userinfo: None,
                error: Some(err.to_string()),
            }),
        )
            .into_response(),
        Err(err) => {
            error!("userinfo failed: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(UserInfoResponse {
                    userinfo: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

/// Rebuild the request's own URL: scheme from `x-forwarded-proto` (set by
/// the fronting proxy) else `http`, host from the Host header, then the
/// original path and query.
fn request_url(headers: &HeaderMap, host: &str, path_and_query: &str) -> Result<Url> {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    Url::parse(&format!("{scheme}://{host}{path_and_query}"))
        .map_err(|e| Error::InvalidUrl(e.to_string()))
}
