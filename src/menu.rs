#![allow(dead_code)]
//! Official Account custom menu API.
//!
//! Endpoint: POST https://api.weixin.qq.com/cgi-bin/menu/create?access_token=ACCESS_TOKEN
//!
//! Body: {"button": [...]} where each button is either a leaf action
//! (tagged by "type") or a submenu holding a list of leaf actions. The
//! vendor allows at most 3 top-level buttons, 5 entries per submenu, and
//! one nesting level.
//!
//! Button names routinely contain CJK text; the serialized body must carry
//! the literal UTF-8 characters, never `\uXXXX` escapes (serde_json does
//! this by default).
//!
//! Usage:
//!   let buttons = vec![
//!       MenuButton::Action(MenuAction::View {
//!           name: "主页".into(),
//!           url: "https://example.com/".into(),
//!       }),
//!       MenuButton::SubMenu {
//!           name: "更多".into(),
//!           sub_button: vec![MenuAction::Click {
//!               name: "点击".into(),
//!               key: "V1001_TODAY_MUSIC".into(),
//!           }],
//!       },
//!   ];
//!   client.create_menu(&access_token, &buttons).await?;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::token::{Error, MpClient, Result, redact_body};

pub(crate) const MENU_CREATE_ENDPOINT: &str = "https://api.weixin.qq.com/cgi-bin/menu/create";

/// Leaf menu action, tagged by "type".
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum MenuAction {
    /// Open a web page
    #[serde(rename = "view")]
    View { name: String, url: String },

    /// Push a click event with the given key
    #[serde(rename = "click")]
    Click { name: String, key: String },

    /// Open a mini program, with `url` as the fallback page
    #[serde(rename = "miniprogram")]
    MiniProgram {
        name: String,
        appid: String,
        pagepath: String,
        url: String,
    },

    /// Scan a code and push the result
    #[serde(rename = "scancode_push")]
    ScancodePush { name: String, key: String },

    /// Scan a code while showing a waiting prompt
    #[serde(rename = "scancode_waitmsg")]
    ScancodeWaitmsg { name: String, key: String },

    /// Open the system camera
    #[serde(rename = "pic_sysphoto")]
    PicSysphoto { name: String, key: String },

    /// Let the user pick camera or album
    #[serde(rename = "pic_photo_or_album")]
    PicPhotoOrAlbum { name: String, key: String },

    /// Pick from the WeChat album
    #[serde(rename = "pic_weixin")]
    PicWeixin { name: String, key: String },

    /// Open the location picker
    #[serde(rename = "location_select")]
    LocationSelect { name: String, key: String },

    /// Send a permanent material message
    #[serde(rename = "media_id")]
    MediaId { name: String, media_id: String },

    /// Open a permanent material page
    #[serde(rename = "view_limited")]
    ViewLimited { name: String, media_id: String },
}

/// One top-level button: a leaf action or a submenu of leaf actions.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum MenuButton {
    SubMenu {
        name: String,
        sub_button: Vec<MenuAction>,
    },
    Action(MenuAction),
}

/// Request body for menu/create.
#[derive(Clone, Debug, Serialize)]
struct CreateMenuRequest<'a> {
    button: &'a [MenuButton],
}

/// Vendor ack for menu/create.
#[derive(Clone, Debug, Deserialize)]
struct MenuAck {
    errcode: i64,
    errmsg: String,
}

impl MpClient {
    /// Push a menu configuration (application-level access_token).
    ///
    /// The body is sent with non-ASCII characters unescaped; a vendor
    /// `errcode != 0` (e.g. 40018 invalid button name size) maps to
    /// [`Error::Wx`].
    #[instrument(level = "debug", skip(self, access_token, buttons))]
    pub async fn create_menu(&self, access_token: &str, buttons: &[MenuButton]) -> Result<()> {
        let mut url =
            Url::parse(MENU_CREATE_ENDPOINT).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("access_token", access_token);
        }
        debug!(buttons = buttons.len(), "menu create request");

        let req = CreateMenuRequest { button: buttons };
        let resp = self.http.post(url).json(&req).send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        match serde_json::from_slice::<MenuAck>(&bytes) {
            Ok(ack) => {
                if ack.errcode == 0 {
                    Ok(())
                } else {
                    Err(Error::Wx {
                        code: ack.errcode,
                        message: ack.errmsg,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_menu() -> Vec<MenuButton> {
        vec![
            MenuButton::Action(MenuAction::View {
                name: "TOP糯米".into(),
                url: "https://www.topnuomi.com/".into(),
            }),
            MenuButton::SubMenu {
                name: "测试多级".into(),
                sub_button: vec![
                    MenuAction::View {
                        name: "我的主页".into(),
                        url: "https://topnuomi.com/".into(),
                    },
                    MenuAction::Click {
                        name: "点击".into(),
                        key: "V1001_TODAY_MUSIC".into(),
                    },
                ],
            },
        ]
    }

    #[test]
    fn body_keeps_non_ascii_unescaped() {
        let menu = sample_menu();
        let json = serde_json::to_string(&CreateMenuRequest { button: &menu }).expect("serialize");
        assert!(json.contains("TOP糯米"));
        assert!(json.contains("测试多级"));
        assert!(!json.contains("\\u"));
    }

    #[test]
    fn body_is_wrapped_in_button_list() {
        let menu = sample_menu();
        let json = serde_json::to_string(&CreateMenuRequest { button: &menu }).expect("serialize");
        assert!(json.starts_with(r#"{"button":["#));
    }

    #[test]
    fn leaf_action_carries_type_tag() {
        let action = MenuAction::Click {
            name: "点击".into(),
            key: "KEY".into(),
        };
        let json = serde_json::to_string(&MenuButton::Action(action)).expect("serialize");
        assert!(json.contains(r#""type":"click""#));
        assert!(json.contains(r#""key":"KEY""#));
        assert!(!json.contains("sub_button"));
    }

    #[test]
    fn submenu_has_no_type_tag() {
        let menu = sample_menu();
        let json = serde_json::to_string(&menu[1]).expect("serialize");
        assert!(json.starts_with(r#"{"name":"测试多级","sub_button":["#));
    }

    #[test]
    fn miniprogram_action_shape() {
        let action = MenuAction::MiniProgram {
            name: "小程序".into(),
            appid: "wx286b93c14bbf93aa".into(),
            pagepath: "pages/lunar/index".into(),
            url: "http://mp.weixin.qq.com".into(),
        };
        let json = serde_json::to_string(&action).expect("serialize");
        assert!(json.contains(r#""type":"miniprogram""#));
        assert!(json.contains(r#""pagepath":"pages/lunar/index""#));
    }
}
