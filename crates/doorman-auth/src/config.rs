//! Engine configuration.

/// Argon2id cost parameters.
///
/// The work factor is fixed per deployment; test environments use
/// [`HashingParams::fast_insecure`] so suites stay quick.
#[derive(Debug, Clone)]
pub struct HashingParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingParams {
    /// OWASP ASVS recommended: m=19456 (19 MiB), t=2, p=1.
    fn default() -> Self {
        Self {
            memory_kib: 19456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl HashingParams {
    /// Minimal cost for test environments. Never use in production.
    pub fn fast_insecure() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Configuration for the authentication engine.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for session token signing.
    pub session_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for session token verification.
    pub session_public_key_pem: String,
    /// Issuer (`iss` claim) embedded in session tokens.
    pub session_issuer: String,
    /// Session lifetime when "remember me" is requested
    /// (default: 2_592_000 = 30 days). Sessions issued without it are
    /// browser-session-scoped and carry no expiry.
    pub remember_ttl_secs: u64,
    /// Optional server-side pepper prepended to passwords before hashing.
    pub pepper: Option<String>,
    /// Minimum password length (default: 6).
    pub min_password_length: usize,
    /// Argon2id cost parameters.
    pub hashing: HashingParams,
    /// Email confirmation token validity window (default: 86_400 = 24 hours).
    pub confirmation_token_lifetime_secs: u64,
    /// Password reset token validity window (default: 3_600 = 1 hour).
    pub reset_token_lifetime_secs: u64,
    /// Length of generated confirmation/reset tokens (default: 64).
    pub token_length: usize,
    /// User cache entry lifetime (default: 300 seconds).
    pub user_cache_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_private_key_pem: String::new(),
            session_public_key_pem: String::new(),
            session_issuer: "doorman".into(),
            remember_ttl_secs: 2_592_000,
            pepper: None,
            min_password_length: 6,
            hashing: HashingParams::default(),
            confirmation_token_lifetime_secs: 86_400,
            reset_token_lifetime_secs: 3_600,
            token_length: 64,
            user_cache_ttl_secs: 300,
        }
    }
}
