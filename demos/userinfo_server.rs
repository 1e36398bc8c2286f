/*!
Example: userinfo server driving the browser OAuth flow

Run:
  WX_APPID=wx... \
  WX_APPSECRET=your_appsecret \
  cargo run --example userinfo_server

The server listens on http://127.0.0.1:3000.
- GET /userinfo: first visit 302s the browser to the WeChat authorize
  page; WeChat redirects back with a code, the handler exchanges it,
  caches the token in ./oauth_access_token.json and answers
  {"userinfo": {...}}.

The /userinfo URL must be reachable by the user's WeChat browser and lie
under the web authorization domain configured in the admin console.
*/

use anyhow::Result;
use dotenvy::dotenv;
use std::net::SocketAddr;
use tracing::info;
use wxmp_rs::{MpAuth, MpState, WxMp, router};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxmp_rs=debug,tower_http=debug".into()),
        )
        .init();

    let mp = WxMp::new(MpAuth::from_env()?);
    let app = router(MpState::new(mp));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
