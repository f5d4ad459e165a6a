//! Authentication state trait and macro.

use crate::db::Database;
use crate::issuer::TokenIssuer;

use super::cookie::RefreshCookiePolicy;

/// Trait for state types that can run the authentication gate.
pub trait HasAuthBackend {
    fn tokens(&self) -> &TokenIssuer;
    fn db(&self) -> &Database;
    fn cookies(&self) -> &RefreshCookiePolicy;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `tokens: Arc<TokenIssuer>`
/// - `db: Database`
/// - `cookies: Arc<RefreshCookiePolicy>`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub tokens: Arc<TokenIssuer>,
///     pub cookies: Arc<RefreshCookiePolicy>,
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn tokens(&self) -> &$crate::issuer::TokenIssuer {
                &self.tokens
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn cookies(&self) -> &$crate::auth::RefreshCookiePolicy {
                &self.cookies
            }
        }
    };
}
