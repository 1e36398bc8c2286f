/*!
Example: Fetch (and cache) the application access_token

Run:
  WX_APPID=wx... \
  WX_APPSECRET=your_appsecret \
  cargo run --example get_token

The token is cached in ./access_token.json; run twice to watch the second
call come back from the cache without a vendor request.
*/

use anyhow::Result;
use dotenvy::dotenv;
use wxmp_rs::{MpAuth, WxMp};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wxmp_rs=debug".into()),
        )
        .init();

    let mp = WxMp::new(MpAuth::from_env()?);

    let token = mp.access_token().await?;
    println!(
        "access_token acquired (len {}), expires_in {} seconds",
        token.access_token.len(),
        token.expires_in
    );
    println!("cached in ./access_token.json; the next call reuses it");

    Ok(())
}
