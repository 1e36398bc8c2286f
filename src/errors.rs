#![allow(dead_code)]
//! Official Account global errcode helpers.
//!
//! Purpose
//! - Map well-known global errcode values to human-friendly categories and hints
//! - Recommend whether to retry, or to refresh the access_token
//!
//! Notes
//! - Always make program logic depend on `errcode` rather than `errmsg`.
//! - `errmsg` may change; treat it only as diagnostic text.
//!
//! Typical usage
//! - Call `explain(errcode, errmsg)` for a human-readable one-liner.
//! - Or call granular helpers:
//!     - `category_for(code)`
//!     - `should_retry(code)`
//!     - `should_refresh_token(code)`
//!     - `hint_for(code)`
//!
//! Coverage
//! - The token, OAuth, user-info and menu codes this crate's surface can
//!   actually produce. Unknown codes are categorized as `Unknown` with a
//!   conservative policy: no retry, no token refresh recommendation.

/// High-level classification for an error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Success (errcode = 0)
    Success,
    /// Temporary/system busy condition (retryable)
    TemporarySystem,
    /// Credential or token issues (fix credentials or refresh token)
    Auth,
    /// Invalid parameter, wrong size/range, malformed payload
    InvalidParam,
    /// OAuth code missing, invalid or expired
    OAuthCode,
    /// Quota/frequency limit exceeded
    Limit,
    /// API not authorized for this account
    Unauthorized,
    /// Unknown/Uncategorized
    Unknown,
}

/// Recommendation for retry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryAdvice {
    /// Whether to retry at all
    pub retry: bool,
    /// First backoff in milliseconds (if retry)
    pub initial_backoff_ms: Option<u64>,
    /// Max retries suggested
    pub max_retries: Option<u8>,
    /// Short reason for the advice
    pub reason: &'static str,
}

impl RetryAdvice {
    pub const NO: RetryAdvice = RetryAdvice {
        retry: false,
        initial_backoff_ms: None,
        max_retries: None,
        reason: "do not retry",
    };
    pub const TRANSIENT_3: RetryAdvice = RetryAdvice {
        retry: true,
        initial_backoff_ms: Some(300),
        max_retries: Some(3),
        reason: "transient/system busy; retry with backoff",
    };
}

/// Returns a friendly hint for a known errcode.
pub fn hint_for(code: i64) -> &'static str {
    match code {
        -1 => "System busy; retry with backoff (<=3 attempts).",
        0 => "Success.",
        40001 => {
            "Invalid appsecret, or the access_token does not belong to this appid; verify the credential pair and refresh the token."
        }
        40002 => "Invalid grant_type; use client_credential for the application token.",
        40003 => "Invalid openid; ensure it belongs to this Official Account.",
        40013 => "Invalid appid; check for whitespace and that the account type matches.",
        40014 => "Invalid access_token; reacquire the token and retry once.",
        40018 => "Invalid button name length; menu names have tight byte limits.",
        40019 => "Invalid button key length (max 128 bytes).",
        40020 => "Invalid button url length (max 1024 bytes).",
        40023 => "Too many sub buttons; at most 5 per submenu.",
        40024 => "Invalid sub button type; check the menu action tag.",
        40029 => "Invalid oauth code; codes are single-use, send the user through authorize again.",
        40030 => "Invalid refresh_token; restart the oauth flow.",
        40125 => "Invalid appsecret; copy it again from the admin console.",
        40164 => {
            "Calling IP is not in the whitelist; add the server address in the admin console."
        }
        41001 => "access_token missing from the request.",
        41008 => "Missing oauth code parameter.",
        41009 => "Missing openid parameter.",
        42001 => "access_token expired; refresh and retry once.",
        42003 => "oauth code expired; send the user through authorize again.",
        45009 => "API call quota reached; back off until the daily quota resets.",
        48001 => {
            "API unauthorized for this account; the menu and user APIs require a verified service account."
        }
        65317 => "Invalid menu url; must include the protocol.",
        _ => "Unknown code; refer to official docs and logs for details.",
    }
}

/// Classify errcode into a category.
pub fn category_for(code: i64) -> ErrorCategory {
    match code {
        0 => ErrorCategory::Success,
        -1 => ErrorCategory::TemporarySystem,
        40001 | 40013 | 40014 | 40125 | 40164 | 41001 | 42001 => ErrorCategory::Auth,
        40029 | 40030 | 41008 | 42003 => ErrorCategory::OAuthCode,
        40002 | 40003 | 40018 | 40019 | 40020 | 40023 | 40024 | 41009 | 65317 => {
            ErrorCategory::InvalidParam
        }
        45009 => ErrorCategory::Limit,
        48001 => ErrorCategory::Unauthorized,
        _ => ErrorCategory::Unknown,
    }
}

/// Whether to retry, and how.
pub fn should_retry(code: i64) -> RetryAdvice {
    match category_for(code) {
        ErrorCategory::TemporarySystem => RetryAdvice::TRANSIENT_3,
        ErrorCategory::Auth => RetryAdvice {
            retry: false,
            initial_backoff_ms: None,
            max_retries: None,
            reason: "invalid credential or token; fix or refresh before retry",
        },
        ErrorCategory::InvalidParam => RetryAdvice {
            retry: false,
            initial_backoff_ms: None,
            max_retries: None,
            reason: "invalid parameter; correct request and resend",
        },
        ErrorCategory::OAuthCode => RetryAdvice {
            retry: false,
            initial_backoff_ms: None,
            max_retries: None,
            reason: "authorization code unusable; restart the oauth flow",
        },
        _ => RetryAdvice::NO,
    }
}

/// Whether to refresh/reacquire the cached access_token for this code.
pub fn should_refresh_token(code: i64) -> bool {
    matches!(code, 40001 | 40014 | 41001 | 42001)
}

/// Produce a concise, human-readable explanation string.
pub fn explain(errcode: i64, errmsg: &str) -> String {
    let mut parts = vec![
        format!("errcode={} ({:?})", errcode, category_for(errcode)),
        format!("errmsg: {}", errmsg),
        format!("hint: {}", hint_for(errcode)),
    ];

    let retry = should_retry(errcode);
    if retry.retry {
        let mut retry_line = String::from("retry: yes");
        if let Some(ms) = retry.initial_backoff_ms {
            retry_line.push_str(&format!(", initial_backoff_ms={}", ms));
        }
        if let Some(n) = retry.max_retries {
            retry_line.push_str(&format!(", max_retries={}", n));
        }
        retry_line.push_str(&format!(" ({})", retry.reason));
        parts.push(retry_line);
    } else {
        parts.push(format!("retry: no ({})", retry.reason));
    }

    if should_refresh_token(errcode) {
        parts.push("refresh_token: yes".to_string());
    }

    parts.join(" | ")
}

/// Return true if this looks like an auth/token problem.
pub fn is_auth_issue(code: i64) -> bool {
    matches!(category_for(code), ErrorCategory::Auth)
}

/// Return true if this error looks temporary (safe to retry with backoff).
pub fn is_temporary(code: i64) -> bool {
    matches!(category_for(code), ErrorCategory::TemporarySystem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_codes_trigger_refresh() {
        assert!(should_refresh_token(40001));
        assert!(should_refresh_token(40014));
        assert!(should_refresh_token(42001));
        assert!(!should_refresh_token(40003));
        assert!(!should_refresh_token(40029));
    }

    #[test]
    fn categories_cover_known_codes() {
        assert_eq!(category_for(0), ErrorCategory::Success);
        assert_eq!(category_for(-1), ErrorCategory::TemporarySystem);
        assert_eq!(category_for(40013), ErrorCategory::Auth);
        assert_eq!(category_for(42003), ErrorCategory::OAuthCode);
        assert_eq!(category_for(40018), ErrorCategory::InvalidParam);
        assert_eq!(category_for(48001), ErrorCategory::Unauthorized);
        assert_eq!(category_for(999999), ErrorCategory::Unknown);
    }

    #[test]
    fn only_transient_codes_retry() {
        assert!(should_retry(-1).retry);
        assert!(!should_retry(40001).retry);
        assert!(!should_retry(40029).retry);
        assert!(!should_retry(999999).retry);
    }

    #[test]
    fn explain_mentions_code_and_hint() {
        let s = explain(42001, "access_token expired");
        assert!(s.contains("errcode=42001"));
        assert!(s.contains("refresh_token: yes"));
        assert!(s.contains("retry: no"));
    }
}
