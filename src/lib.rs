#![doc = r#"
wxmp-rs

WeChat Official Account (公众平台) web-page APIs.

Covers the surface a typical web app needs: application access_token with
file-backed caching, the browser OAuth (authorization-code) flow, user
profile fetch (OAuth-scoped and UnionID, single and batch) and custom menu
push. An optional axum router drives the OAuth flow for inbound requests.

Quick usage:

```ignore
use wxmp_rs::{MpAuth, UserInfoGate, WebRequest, WxMp};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mp = WxMp::new(MpAuth::from_env()?);

    // Application token (cached in ./access_token.json)
    let token = mp.access_token().await?;
    println!("access_token expires in {} seconds", token.expires_in);

    // Profile of the browsing user, via the OAuth flow
    let request = WebRequest::new("https://example.com/userinfo?code=CODE".parse()?);
    match mp.user_info(&request).await? {
        UserInfoGate::Redirect(url) => println!("send the browser to {url}"),
        UserInfoGate::Profile(profile) => println!("nickname: {:?}", profile.nickname),
    }

    Ok(())
}
```
"#]

pub mod errors;
pub mod menu;
pub mod mp;
pub mod oauth;
pub mod token;
pub mod token_cache;
pub mod token_tool;
pub mod user_info;
pub mod web;

pub use menu::{MenuAction, MenuButton};
pub use mp::{UserInfoGate, WxMp};
pub use oauth::{OAuthGate, OAuthScope, OAuthToken, WebRequest};
pub use token::{AccessToken, Error, MpAuth, MpClient, Result};
pub use token_cache::{FileTokenStore, StoredToken, TokenStore};
pub use user_info::UserProfile;
pub use web::{MpState, router};
