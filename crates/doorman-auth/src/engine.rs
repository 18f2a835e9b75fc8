//! Engine assembly.
//!
//! Explicit factory wiring: the host hands over configuration, the
//! identity store, and the mail collaborator; the engine builds the
//! cache, wraps every mutation path in cache invalidation, and exposes
//! the two services. No registry, no globals.

use std::sync::Arc;
use std::time::Duration;

use doorman_core::mailer::Mailer;
use doorman_core::repository::{RoleRepository, UserRepository};

use crate::cache::{InvalidatingUsers, UserCache};
use crate::config::AuthConfig;
use crate::lifecycle::TokenLifecycle;
use crate::password::CredentialStore;
use crate::session::SessionManager;

pub struct AuthEngine<U, R, M> {
    cache: Arc<UserCache<U, R>>,
    sessions: SessionManager<U, R>,
    tokens: TokenLifecycle<U, R, M>,
}

impl<U, R, M> AuthEngine<U, R, M>
where
    U: UserRepository + Clone,
    R: RoleRepository,
    M: Mailer,
{
    pub fn new(config: AuthConfig, users: U, roles: R, mailer: M) -> Self {
        let cache = Arc::new(UserCache::new(
            users.clone(),
            roles,
            Duration::from_secs(config.user_cache_ttl_secs),
        ));
        let store = InvalidatingUsers::new(users, cache.clone());
        let credentials = CredentialStore::new(&config);

        let sessions = SessionManager::new(
            store.clone(),
            cache.clone(),
            credentials.clone(),
            config.clone(),
        );
        let tokens = TokenLifecycle::new(store, credentials, mailer, config);

        Self {
            cache,
            sessions,
            tokens,
        }
    }

    pub fn sessions(&self) -> &SessionManager<U, R> {
        &self.sessions
    }

    pub fn tokens(&self) -> &TokenLifecycle<U, R, M> {
        &self.tokens
    }

    pub fn cache(&self) -> &Arc<UserCache<U, R>> {
        &self.cache
    }
}
