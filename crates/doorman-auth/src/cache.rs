//! TTL read-through cache for identity lookups.
//!
//! Session hydration runs on every request, so resolved identities are
//! cached under two independent keys (user id and user name), both
//! pointing at one shared projection. Entries expire after a fixed TTL
//! and are dropped synchronously whenever the user is saved or removed;
//! see [`InvalidatingUsers`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use doorman_core::error::DoormanResult;
use doorman_core::models::role::RoleRef;
use doorman_core::models::user::User;
use doorman_core::repository::{RoleRepository, UserFilter, UserRepository};
use tracing::debug;
use uuid::Uuid;

/// Public projection of a user: what handlers and templates may see.
///
/// Secret fields (password hash, confirmation/reset token pairs) never
/// leave the repository layer through this type.
#[derive(Debug, Clone)]
pub struct CachedUser {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Name of the linked external provider, if any.
    pub provider: Option<String>,
    pub enabled: bool,
    pub confirmed_date: Option<DateTime<Utc>>,
    pub roles: Vec<RoleRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CachedUser {
    /// Flat role-membership check.
    pub fn in_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }

    /// "First Last" when both are present, else the first name, else
    /// the user name.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(first), None) => first.clone(),
            _ => self.user_name.clone(),
        }
    }
}

fn project(user: &User, roles: Vec<RoleRef>) -> CachedUser {
    CachedUser {
        id: user.id,
        user_name: user.user_name.clone(),
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        provider: user.external_provider.as_ref().map(|p| p.provider.clone()),
        enabled: user.enabled,
        confirmed_date: user.confirmed_date,
        roles,
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

struct CacheEntry {
    user: Arc<CachedUser>,
    expires_at: Instant,
}

enum LookupKey {
    Id(Uuid),
    UserName(String),
}

impl LookupKey {
    fn cache_key(&self) -> String {
        match self {
            LookupKey::Id(id) => id_key(*id),
            LookupKey::UserName(name) => name_key(name),
        }
    }
}

fn id_key(id: Uuid) -> String {
    format!("id:{id}")
}

fn name_key(name: &str) -> String {
    format!("name:{name}")
}

/// Read-through cache in front of the identity store.
///
/// Concurrent misses for the same key are collapsed onto a single
/// backing fetch by a per-key guard. A duplicate fetch that slips
/// through can only replace an entry with equally fresh data, so cache
/// state stays consistent either way.
pub struct UserCache<U, R> {
    users: U,
    roles: R,
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
    inflight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<U: UserRepository, R: RoleRepository> UserCache<U, R> {
    pub fn new(users: U, roles: R, ttl: Duration) -> Self {
        Self {
            users,
            roles,
            ttl,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a user by id, reading through to the store on a miss.
    /// Fails with `NotFound` when no such user exists.
    pub async fn get_by_id(&self, id: Uuid) -> DoormanResult<Arc<CachedUser>> {
        self.resolve(LookupKey::Id(id)).await
    }

    /// Resolve a user by user name, reading through on a miss.
    pub async fn get_by_user_name(&self, user_name: &str) -> DoormanResult<Arc<CachedUser>> {
        self.resolve(LookupKey::UserName(user_name.to_string())).await
    }

    /// Drop both cache keys for a user. Must be called synchronously
    /// after every successful mutation of that user, on every mutation
    /// path.
    pub fn invalidate(&self, user: &User) {
        let mut entries = self.entries.lock().expect("user cache lock poisoned");
        entries.remove(&id_key(user.id));
        entries.remove(&name_key(&user.user_name));
        debug!(user_id = %user.id, "user dropped from cache");
    }

    async fn resolve(&self, key: LookupKey) -> DoormanResult<Arc<CachedUser>> {
        let cache_key = key.cache_key();
        if let Some(hit) = self.peek(&cache_key) {
            return Ok(hit);
        }

        let guard = self.fetch_guard(&cache_key);
        let _held = guard.lock().await;

        // Another task may have populated the entry while we waited.
        if let Some(hit) = self.peek(&cache_key) {
            return Ok(hit);
        }

        let outcome = self.fetch_and_store(&key).await;
        drop(_held);
        self.remove_guard(&cache_key);
        outcome
    }

    async fn fetch_and_store(&self, key: &LookupKey) -> DoormanResult<Arc<CachedUser>> {
        let user = match key {
            LookupKey::Id(id) => self.users.find_by_id(*id).await?,
            LookupKey::UserName(name) => {
                self.users.find_one(UserFilter::UserName(name.clone())).await?
            }
        };
        let roles = self.roles.find_by_ids(&user.roles).await?;
        let projected = Arc::new(project(&user, roles.iter().map(RoleRef::from).collect()));

        let expires_at = Instant::now() + self.ttl;
        let mut entries = self.entries.lock().expect("user cache lock poisoned");
        entries.insert(
            id_key(user.id),
            CacheEntry {
                user: projected.clone(),
                expires_at,
            },
        );
        entries.insert(
            name_key(&user.user_name),
            CacheEntry {
                user: projected.clone(),
                expires_at,
            },
        );
        Ok(projected)
    }

    /// Non-populating lookup; expired entries are evicted on the spot.
    fn peek(&self, cache_key: &str) -> Option<Arc<CachedUser>> {
        let mut entries = self.entries.lock().expect("user cache lock poisoned");
        match entries.get(cache_key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.user.clone()),
            Some(_) => {
                entries.remove(cache_key);
                None
            }
            None => None,
        }
    }

    fn fetch_guard(&self, cache_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut inflight = self.inflight.lock().expect("user cache lock poisoned");
        inflight
            .entry(cache_key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    fn remove_guard(&self, cache_key: &str) {
        let mut inflight = self.inflight.lock().expect("user cache lock poisoned");
        inflight.remove(cache_key);
    }
}

/// [`UserRepository`] decorator that drops a user's cache entries after
/// every successful mutation.
///
/// All mutation paths in the engine go through this wrapper, replacing
/// the implicit persistence hooks of a document mapper with an explicit
/// invalidation call.
pub struct InvalidatingUsers<U, R> {
    inner: U,
    cache: Arc<UserCache<U, R>>,
}

impl<U, R> InvalidatingUsers<U, R> {
    pub fn new(inner: U, cache: Arc<UserCache<U, R>>) -> Self {
        Self { inner, cache }
    }
}

impl<U: Clone, R> Clone for InvalidatingUsers<U, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<U: UserRepository, R: RoleRepository> UserRepository for InvalidatingUsers<U, R> {
    async fn find_by_id(&self, id: Uuid) -> DoormanResult<User> {
        self.inner.find_by_id(id).await
    }

    async fn find_one(&self, filter: UserFilter) -> DoormanResult<User> {
        self.inner.find_one(filter).await
    }

    async fn save(&self, user: &User) -> DoormanResult<User> {
        let saved = self.inner.save(user).await?;
        self.cache.invalidate(&saved);
        Ok(saved)
    }

    async fn remove(&self, id: Uuid) -> DoormanResult<()> {
        // The name key needs the pre-image; look it up before deleting.
        let pre_image = self.inner.find_by_id(id).await.ok();
        self.inner.remove(id).await?;
        if let Some(user) = pre_image {
            self.cache.invalidate(&user);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cached(first: Option<&str>, last: Option<&str>) -> CachedUser {
        let now = Utc::now();
        CachedUser {
            id: Uuid::new_v4(),
            user_name: "alice".into(),
            email: "alice@example.com".into(),
            first_name: first.map(str::to_string),
            last_name: last.map(str::to_string),
            provider: None,
            enabled: true,
            confirmed_date: Some(now),
            roles: vec![RoleRef {
                id: Uuid::new_v4(),
                name: "Administrator".into(),
            }],
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn display_name_precedence() {
        assert_eq!(cached(Some("Ada"), Some("Lovelace")).display_name(), "Ada Lovelace");
        assert_eq!(cached(Some("Ada"), None).display_name(), "Ada");
        assert_eq!(cached(None, None).display_name(), "alice");
        // A lone last name is not a usable display name.
        assert_eq!(cached(None, Some("Lovelace")).display_name(), "alice");
    }

    #[test]
    fn in_role_matches_by_name() {
        let user = cached(None, None);
        assert!(user.in_role("Administrator"));
        assert!(!user.in_role("Editor"));
        assert!(!user.in_role("administrator"));
    }
}
