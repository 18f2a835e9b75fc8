//! Doorman Auth — the account-authentication and session-lifecycle
//! engine: password credentials, signed client-held sessions, the email
//! confirmation and password reset token state machines, a TTL
//! read-through identity cache, and post-redirect return-URL tracking.
//!
//! The engine is storage-agnostic: it is constructed from explicit
//! repository and mailer handles (see [`AuthEngine`]) and never touches
//! HTTP or rendering concerns.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod password;
pub mod random;
pub mod return_url;
pub mod session;

pub use cache::{CachedUser, InvalidatingUsers, UserCache};
pub use config::{AuthConfig, HashingParams};
pub use engine::AuthEngine;
pub use error::{AuthError, AuthResult};
pub use lifecycle::{NewAccount, TokenLifecycle};
pub use password::CredentialStore;
pub use return_url::{CookieChange, ReturnUrlTracker};
pub use session::{Identity, IssuedSession, SessionClaims, SessionManager};
