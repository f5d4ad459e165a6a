//! Refresh token cookie: parsing, signing and the set/clear policy.
//!
//! The cookie value is `<token>.<base64url HMAC-SHA256(token)>` under the
//! cookie secret. Set and clear share one attribute string so a clear always
//! targets exactly the cookie that was set.

use axum::http::{HeaderMap, header};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// The only path the refresh cookie is sent to.
pub const REFRESH_COOKIE_PATH: &str = "/tokens";

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Signs cookie values so the client cannot substitute its own.
#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
}

impl CookieSigner {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: secret.to_vec(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size")
    }

    /// Append a signature to `value`.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", value, tag)
    }

    /// Strip and check the signature, returning the original value.
    pub fn unsign<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, tag) = signed.rsplit_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

        let mut mac = self.mac();
        mac.update(value.as_bytes());
        mac.verify_slice(&tag).ok()?;
        Some(value)
    }
}

/// How the refresh token cookie is written, read and cleared.
#[derive(Clone)]
pub struct RefreshCookiePolicy {
    signer: CookieSigner,
    secure: bool,
}

impl RefreshCookiePolicy {
    pub fn new(cookie_secret: &[u8], secure: bool) -> Self {
        Self {
            signer: CookieSigner::new(cookie_secret),
            secure,
        }
    }

    fn attributes(&self) -> String {
        let secure = if self.secure { "; Secure" } else { "" };
        format!(
            "HttpOnly; SameSite=Strict; Path={}{}",
            REFRESH_COOKIE_PATH, secure
        )
    }

    /// `Set-Cookie` value carrying a signed refresh token.
    pub fn set_cookie(&self, token: &str, max_age: u64) -> String {
        format!(
            "{}={}; {}; Max-Age={}",
            REFRESH_COOKIE_NAME,
            self.signer.sign(token),
            self.attributes(),
            max_age
        )
    }

    /// `Set-Cookie` value that removes the refresh token cookie.
    pub fn clear_cookie(&self) -> String {
        format!("{}=; {}; Max-Age=0", REFRESH_COOKIE_NAME, self.attributes())
    }

    /// Read the refresh token from a request, if present and correctly signed.
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        let signed = get_cookie(headers, REFRESH_COOKIE_NAME)?;
        let token = self.signer.unsign(signed);
        if token.is_none() {
            tracing::debug!("Refresh cookie signature rejected");
        }
        token
    }
}
