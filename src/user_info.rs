#![allow(dead_code)]
//! Official Account user profile APIs.
//!
//! Three fetch paths:
//! - OAuth-scoped (requires an `snsapi_userinfo` token and its openid):
//!   GET https://api.weixin.qq.com/sns/userinfo?access_token=..&openid=..&lang=zh_CN
//! - UnionID endpoint, single (application-level token):
//!   GET https://api.weixin.qq.com/cgi-bin/user/info?access_token=..&openid=..&lang=zh_CN
//! - UnionID endpoint, batch (application-level token):
//!   POST https://api.weixin.qq.com/cgi-bin/user/info/batchget?access_token=ACCESS_TOKEN
//!   Body: {"user_list": [{"openid": "..", "lang": "zh_CN"}, ..]} (max 100 per call)
//!
//! Field notes:
//! - `unionid` appears only for accounts bound to an open platform.
//! - `subscribe`/`subscribe_time`/`remark`/`groupid` come from the UnionID
//!   endpoint only; the sns endpoint never returns them.
//! - An unfollowed user answers the UnionID endpoint with `subscribe: 0`
//!   and little else, so every field is optional for robustness.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::token::{Error, MpClient, Result, WxError, redact_body};

pub(crate) const SNS_USERINFO_ENDPOINT: &str = "https://api.weixin.qq.com/sns/userinfo";
pub(crate) const USERINFO_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/user/info";
pub(crate) const USERINFO_BATCH_ENDPOINT: &str =
    "https://api.weixin.qq.com/cgi-bin/user/info/batchget";

/// Profile language requested from the vendor.
pub(crate) const PROFILE_LANG: &str = "zh_CN";

/// Vendor user profile, passed through with every field optional.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    /// 1 male, 2 female, 0 unknown
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Avatar URL; absent for users without one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headimgurl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privilege: Option<Vec<String>>,
    /// Stable across the application family; may be absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unionid: Option<String>,
    /// UnionID endpoint only: 0 means not following the account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribe_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groupid: Option<i64>,
}

/// One entry of the batchget request body.
#[derive(Clone, Debug, Serialize)]
pub struct UserInfoQuery {
    pub openid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Request body for user/info/batchget.
#[derive(Clone, Debug, Serialize)]
pub struct UserInfoBatchGetRequest {
    pub user_list: Vec<UserInfoQuery>,
}

impl UserInfoBatchGetRequest {
    pub fn new<I, S>(openids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_list: openids
                .into_iter()
                .map(|openid| UserInfoQuery {
                    openid: openid.into(),
                    lang: Some(PROFILE_LANG.to_string()),
                })
                .collect(),
        }
    }
}

/// Response for user/info/batchget.
#[derive(Clone, Debug, Deserialize)]
struct UserInfoBatchGetResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
    #[serde(default)]
    user_info_list: Vec<UserProfile>,
}

/// Decode a profile-shaped body: a present non-zero `errcode` wins over the
/// profile decode, everything else is passed through.
fn decode_profile(status: reqwest::StatusCode, bytes: &[u8]) -> Result<UserProfile> {
    if let Ok(err) = serde_json::from_slice::<WxError>(bytes) {
        if err.errcode != 0 {
            return Err(Error::Wx {
                code: err.errcode,
                message: err.errmsg,
            });
        }
    }
    serde_json::from_slice::<UserProfile>(bytes).map_err(|de_err| Error::UnexpectedResponse {
        status: status.as_u16(),
        error: de_err.to_string(),
        body: redact_body(bytes),
    })
}

impl MpClient {
    /// Fetch the profile behind an OAuth token (scope `snsapi_userinfo`).
    #[instrument(level = "debug", skip(self, oauth_access_token))]
    pub async fn sns_user_info(
        &self,
        oauth_access_token: &str,
        openid: &str,
    ) -> Result<UserProfile> {
        let mut url =
            Url::parse(SNS_USERINFO_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("access_token", oauth_access_token);
            qp.append_pair("openid", openid);
            qp.append_pair("lang", PROFILE_LANG);
        }
        debug!(openid, "sns userinfo request");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        decode_profile(status, &bytes)
    }

    /// Fetch one profile via the UnionID endpoint (application token).
    #[instrument(level = "debug", skip(self, access_token))]
    pub async fn user_info(&self, access_token: &str, openid: &str) -> Result<UserProfile> {
        let mut url =
            Url::parse(USERINFO_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("access_token", access_token);
            qp.append_pair("openid", openid);
            qp.append_pair("lang", PROFILE_LANG);
        }
        debug!(openid, "user_info request");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;
        decode_profile(status, &bytes)
    }

    /// Batch fetch via the UnionID endpoint (application token).
    #[instrument(level = "debug", skip(self, access_token, req))]
    pub async fn user_info_batchget(
        &self,
        access_token: &str,
        req: &UserInfoBatchGetRequest,
    ) -> Result<Vec<UserProfile>> {
        let mut url =
            Url::parse(USERINFO_BATCH_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("access_token", access_token);
        }
        debug!(count = req.user_list.len(), "user_info batchget request");

        let resp = self.http.post(url).json(req).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<UserInfoBatchGetResponse>(&bytes) {
            Ok(ok) => {
                if ok.errcode == 0 {
                    Ok(ok.user_info_list)
                } else {
                    Err(Error::Wx {
                        code: ok.errcode,
                        message: ok.errmsg,
                    })
                }
            }
            Err(de_err) => Err(Error::UnexpectedResponse {
                status: status.as_u16(),
                error: de_err.to_string(),
                body: redact_body(&bytes),
            }),
        }
    }
}
