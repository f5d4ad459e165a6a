//! Authentication gate for API routes.
//!
//! Dual-token system: short-lived access tokens (stateless, sent as
//! `Authorization: Bearer`) and long-lived refresh tokens (signed httpOnly
//! cookie scoped to `/tokens`, checked against the revocation store).

mod cookie;
mod errors;
mod extractors;
mod ip;
mod password;
mod state;
mod types;

pub use cookie::{
    CookieSigner, REFRESH_COOKIE_NAME, REFRESH_COOKIE_PATH, RefreshCookiePolicy, get_cookie,
};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{BearerAuth, RefreshAuth, RefreshCookie};
pub use ip::extract_client_ip;
pub use password::{LoginError, authenticate_password};
pub use state::HasAuthBackend;
pub use types::{AuthenticatedUser, RefreshSession};
