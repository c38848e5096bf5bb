//! Access token state and its renewal.
//!
//! # Structure
//!
//! - `token` - the shared token store
//! - `refresh` - the refresher trait and the single-flight coordinator
//! - `policy` - which server codes mean the session expired
//! - `passport` - a refresher backed by the passport service

mod passport;
mod policy;
mod refresh;
mod token;

pub use passport::{PassportRefresher, RefreshedTokens};
pub use policy::{
    DEFAULT_EXPIRED_PREFIX, PrefixPolicy, SessionPolicy, TOKEN_EXPIRED_CODE, needs_refresh,
};
pub use refresh::{RefreshCoordinator, TokenRefresher};
pub use token::{TokenStore, mask};

#[cfg(test)]
pub use policy::MockSessionPolicy;
#[cfg(test)]
pub use refresh::MockTokenRefresher;
