//! Password hashing and verification using Argon2id.
//!
//! Hashing and verification are CPU-bound, so both are dispatched to
//! the blocking pool; in-flight requests keep being served while a hash
//! computes.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use doorman_core::models::user::User;

use crate::config::{AuthConfig, HashingParams};
use crate::error::{AuthError, AuthResult};

/// Owns the password policy: minimum length, server pepper, and cost
/// parameters.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pepper: Option<String>,
    params: HashingParams,
    min_password_length: usize,
}

impl CredentialStore {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            pepper: config.pepper.clone(),
            params: config.hashing.clone(),
            min_password_length: config.min_password_length,
        }
    }

    /// Set or clear a user's password hash.
    ///
    /// `None` or an empty string clears the stored hash (used for
    /// provider-only accounts). Otherwise the password must meet the
    /// minimum length, or the user is left untouched and
    /// `AuthError::Validation` is returned.
    pub async fn set_password(&self, user: &mut User, password: Option<&str>) -> AuthResult<()> {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            user.password_hash = None;
            return Ok(());
        };
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "password must contain at least {} characters",
                self.min_password_length
            )));
        }

        let password = password.to_string();
        let pepper = self.pepper.clone();
        let params = self.params.clone();
        let hash = tokio::task::spawn_blocking(move || {
            hash_password(&password, pepper.as_deref(), &params)
        })
        .await
        .map_err(|e| AuthError::Crypto(format!("hashing task failed: {e}")))??;

        user.password_hash = Some(hash);
        Ok(())
    }

    /// Compare a plaintext candidate against the stored hash.
    ///
    /// Returns `Ok(false)` when no hash is stored (provider-only
    /// account) or on mismatch; `Err` only when the stored hash is
    /// malformed.
    pub async fn compare_password(&self, user: &User, password: &str) -> AuthResult<bool> {
        let Some(hash) = user.password_hash.clone() else {
            return Ok(false);
        };
        let password = password.to_string();
        let pepper = self.pepper.clone();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash, pepper.as_deref()))
            .await
            .map_err(|e| AuthError::Crypto(format!("verification task failed: {e}")))?
    }
}

/// Hash a password with Argon2id.
///
/// If a pepper is provided it is prepended to the password before
/// hashing. The salt is randomly generated for each call.
fn hash_password(
    password: &str,
    pepper: Option<&str>,
    params: &HashingParams,
) -> Result<String, AuthError> {
    let params = argon2::Params::new(params.memory_kib, params.iterations, params.parallelism, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(input, &salt)
        .map_err(|e| AuthError::Crypto(format!("password hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a plaintext password against an Argon2id PHC-format hash.
///
/// The cost parameters are read back from the hash string, so hashes
/// survive parameter changes.
fn verify_password(password: &str, hash: &str, pepper: Option<&str>) -> AuthResult<bool> {
    let peppered: String;
    let input = match pepper {
        Some(p) => {
            peppered = format!("{p}{password}");
            peppered.as_bytes()
        }
        None => password.as_bytes(),
    };

    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    let argon2 = Argon2::default();
    match argon2.verify_password(input, &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pepper: Option<&str>) -> CredentialStore {
        let config = AuthConfig {
            pepper: pepper.map(str::to_string),
            hashing: HashingParams::fast_insecure(),
            ..AuthConfig::default()
        };
        CredentialStore::new(&config)
    }

    fn user() -> User {
        User::new_local("alice", "alice@example.com")
    }

    #[tokio::test]
    async fn set_then_compare_roundtrip() {
        let store = store(None);
        let mut user = user();
        store.set_password(&mut user, Some("hunter22")).await.unwrap();
        assert!(user.password_hash.as_deref().unwrap().starts_with("$argon2id$"));
        assert!(store.compare_password(&user, "hunter22").await.unwrap());
        assert!(!store.compare_password(&user, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn too_short_password_is_rejected_and_hash_unchanged() {
        let store = store(None);
        let mut user = user();
        store.set_password(&mut user, Some("longenough")).await.unwrap();
        let before = user.password_hash.clone();

        let err = store.set_password(&mut user, Some("short")).await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
        assert_eq!(user.password_hash, before);
    }

    #[tokio::test]
    async fn empty_password_clears_hash() {
        let store = store(None);
        let mut user = user();
        store.set_password(&mut user, Some("hunter22")).await.unwrap();
        store.set_password(&mut user, None).await.unwrap();
        assert!(user.password_hash.is_none());
        // No hash stored means no candidate ever matches.
        assert!(!store.compare_password(&user, "hunter22").await.unwrap());

        store.set_password(&mut user, Some("hunter22")).await.unwrap();
        store.set_password(&mut user, Some("")).await.unwrap();
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn pepper_is_applied() {
        let peppered = store(Some("pepper!"));
        let plain = store(None);
        let mut user = user();
        peppered.set_password(&mut user, Some("hunter22")).await.unwrap();
        assert!(peppered.compare_password(&user, "hunter22").await.unwrap());
        // Verification without the pepper must fail.
        assert!(!plain.compare_password(&user, "hunter22").await.unwrap());
    }

    #[tokio::test]
    async fn malformed_hash_returns_error() {
        let store = store(None);
        let mut user = user();
        user.password_hash = Some("not-a-hash".into());
        assert!(store.compare_password(&user, "pw").await.is_err());
    }
}
