//! Session issuance and hydration.
//!
//! Sessions are client-held: a signed EdDSA token carrying the user id,
//! never persisted server-side. Per request the state machine is
//! `Anonymous -> Authenticated` (valid token resolving to an enabled
//! user) or `Anonymous -> Rejected` (anything else), with rejection
//! expressed as staying anonymous.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doorman_core::error::DoormanError;
use doorman_core::models::user::{ExternalProfile, User};
use doorman_core::repository::{RoleRepository, UserFilter, UserRepository};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cache::{CachedUser, InvalidatingUsers, UserCache};
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::password::CredentialStore;

/// Claims carried by the client-held session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject — user id.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration. Present only for "remember me" sessions; a token
    /// without `exp` lives exactly as long as the browser session
    /// cookie that carries it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// A freshly signed session token plus the cookie max-age decision.
///
/// The TTL is computed once, here; nothing downstream revisits it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    /// `Some` for remembered sessions (explicit cookie max-age),
    /// `None` for browser-session-scoped cookies.
    pub max_age: Option<Duration>,
}

/// Outcome of hydrating a request's session token.
#[derive(Debug, Clone)]
pub enum Identity {
    Anonymous,
    Authenticated(Arc<CachedUser>),
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated(_))
    }

    pub fn user(&self) -> Option<&Arc<CachedUser>> {
        match self {
            Identity::Authenticated(user) => Some(user),
            Identity::Anonymous => None,
        }
    }
}

/// Issues, hydrates, and signs out browser sessions.
pub struct SessionManager<U, R> {
    users: InvalidatingUsers<U, R>,
    cache: Arc<UserCache<U, R>>,
    credentials: CredentialStore,
    config: AuthConfig,
}

impl<U: UserRepository, R: RoleRepository> SessionManager<U, R> {
    pub fn new(
        users: InvalidatingUsers<U, R>,
        cache: Arc<UserCache<U, R>>,
        credentials: CredentialStore,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            cache,
            credentials,
            config,
        }
    }

    /// Authenticate by user name or email and issue a session.
    ///
    /// Unknown identifier, wrong password, disabled account, and
    /// unconfirmed local account all collapse into
    /// `AuthError::InvalidCredentials`.
    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &str,
        remember: bool,
    ) -> AuthResult<(Arc<CachedUser>, IssuedSession)> {
        // Look up the user — try user name first, then email.
        let user = match self
            .users
            .find_one(UserFilter::UserName(identifier.to_string()))
            .await
        {
            Ok(u) => u,
            Err(DoormanError::NotFound { .. }) => self
                .users
                .find_one(UserFilter::Email(identifier.to_string()))
                .await
                .map_err(|e| match e {
                    DoormanError::NotFound { .. } => AuthError::InvalidCredentials,
                    other => AuthError::Infrastructure(other),
                })?,
            Err(other) => return Err(other.into()),
        };

        // Local sign-in requires an enabled account whose email has
        // been confirmed (provider-backed accounts are born confirmed).
        if !user.enabled || user.confirmed_date.is_none() {
            return Err(AuthError::InvalidCredentials);
        }
        if !self.credentials.compare_password(&user, password).await? {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self.issue_session(user.id, remember)?;
        info!(user_id = %user.id, remember, "user signed in");

        let cached = self
            .cache
            .get_by_id(user.id)
            .await
            .map_err(AuthError::Infrastructure)?;
        Ok((cached, session))
    }

    /// Sign a session token for `user_id`.
    ///
    /// Remembered sessions get an `exp` claim and a matching cookie
    /// max-age; browser-scoped sessions get neither.
    pub fn issue_session(&self, user_id: Uuid, remember: bool) -> AuthResult<IssuedSession> {
        let now = Utc::now().timestamp();
        let exp = remember.then(|| now + self.config.remember_ttl_secs as i64);
        let claims = SessionClaims {
            sub: user_id.to_string(),
            iss: self.config.session_issuer.clone(),
            iat: now,
            exp,
        };

        let key = EncodingKey::from_ed_pem(self.config.session_private_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad session signing key: {e}")))?;
        let token = jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &key)
            .map_err(|e| AuthError::Crypto(format!("session token encode: {e}")))?;

        Ok(IssuedSession {
            token,
            max_age: exp.map(|_| Duration::from_secs(self.config.remember_ttl_secs)),
        })
    }

    /// Decode and verify a session token (signature, issuer, and expiry
    /// when present).
    pub fn decode_session(&self, token: &str) -> AuthResult<SessionClaims> {
        let key = DecodingKey::from_ed_pem(self.config.session_public_key_pem.as_bytes())
            .map_err(|e| AuthError::Crypto(format!("bad session verification key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[&self.config.session_issuer]);
        validation.set_required_spec_claims(&["sub", "iat", "iss"]);

        jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Resolve the identity behind a request's session token.
    ///
    /// Every failure mode (missing, garbled or expired token, deleted
    /// user, disabled user) yields `Identity::Anonymous`; hydration
    /// never fails a request.
    pub async fn hydrate(&self, token: Option<&str>) -> Identity {
        let Some(token) = token else {
            return Identity::Anonymous;
        };
        let Ok(claims) = self.decode_session(token) else {
            return Identity::Anonymous;
        };
        let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
            return Identity::Anonymous;
        };

        match self.cache.get_by_id(user_id).await {
            Ok(user) if user.enabled => Identity::Authenticated(user),
            Ok(_) | Err(DoormanError::NotFound { .. }) => Identity::Anonymous,
            Err(err) => {
                warn!(%user_id, error = %err, "session hydration failed");
                Identity::Anonymous
            }
        }
    }

    /// Sessions are client-held, so signing out is the host discarding
    /// the cookie; this records the event.
    pub fn sign_out(&self, user: &CachedUser) {
        info!(user_id = %user.id, "user signed out");
    }

    /// Resolve or create the account behind an external-provider
    /// profile.
    ///
    /// Repeated sign-ins with the same profile resolve to the same
    /// account; a lost race against a concurrent first sign-in falls
    /// back to the winner's record.
    pub async fn get_or_create(&self, profile: ExternalProfile) -> AuthResult<User> {
        let user_name = profile.user_name.clone();
        match self
            .users
            .find_one(UserFilter::UserName(user_name.clone()))
            .await
        {
            Ok(existing) => Ok(existing),
            Err(DoormanError::NotFound { .. }) => {
                let user = User::new_external(profile);
                match self.users.save(&user).await {
                    Ok(saved) => {
                        info!(user_id = %saved.id, "external account created");
                        Ok(saved)
                    }
                    Err(DoormanError::AlreadyExists { .. }) => self
                        .users
                        .find_one(UserFilter::UserName(user_name))
                        .await
                        .map_err(AuthError::Infrastructure),
                    Err(other) => Err(other.into()),
                }
            }
            Err(other) => Err(other.into()),
        }
    }
}
