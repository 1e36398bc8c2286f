/*!
Example: Push a custom menu

Run:
  WX_APPID=wx... \
  WX_APPSECRET=your_appsecret \
  cargo run --example menu_create

Builds the classic two-column menu (a view button plus a submenu) and
pushes it. Button names contain CJK text on purpose; the body goes out
with the literal characters, not \u escapes.
*/

use anyhow::Result;
use dotenvy::dotenv;
use wxmp_rs::{MenuAction, MenuButton, MpAuth, WxMp};

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

    let buttons = vec![
        MenuButton::Action(MenuAction::View {
            name: "主页".into(),
            url: "https://example.com/".into(),
        }),
        MenuButton::SubMenu {
            name: "更多".into(),
            sub_button: vec![
                MenuAction::View {
                    name: "关于我们".into(),
                    url: "https://example.com/about".into(),
                },
                MenuAction::Click {
                    name: "点击".into(),
                    key: "V1001_TODAY_MUSIC".into(),
                },
            ],
        },
    ];

    match mp.create_menu(&buttons).await {
        Ok(()) => println!("menu pushed"),
        Err(e) => {
            eprintln!("menu push failed: {e}");
            if let Some(last) = mp.last_error() {
                eprintln!("last vendor error: {last}");
            }
        }
    }

    Ok(())
}
