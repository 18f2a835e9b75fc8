//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Link to an externally managed identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalProvider {
    /// Provider name, e.g. `"google"`.
    pub provider: String,
    /// The provider's stable identifier for this account.
    pub subject: String,
}

/// Profile handed over by the host after a completed external-provider
/// exchange. The provider protocol itself is not this crate's concern.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    pub provider: String,
    pub subject: String,
    pub user_name: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub user_name: String,
    pub email: String,
    /// `None` means no local-password login (external-provider-only account).
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub external_provider: Option<ExternalProvider>,
    /// Gates login eligibility.
    pub enabled: bool,
    /// Set once email ownership is proven.
    pub confirmed_date: Option<DateTime<Utc>>,
    /// Set together with `confirmation_token_created`, cleared together.
    pub confirmation_token: Option<String>,
    pub confirmation_token_created: Option<DateTime<Utc>>,
    /// Same pairing discipline as the confirmation pair.
    pub reset_password_token: Option<String>,
    pub reset_password_token_created: Option<DateTime<Utc>>,
    pub roles: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A fresh local account: disabled and unconfirmed until the email
    /// confirmation flow completes.
    pub fn new_local(user_name: impl Into<String>, email: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_name: user_name.into(),
            email: email.into(),
            password_hash: None,
            first_name: None,
            last_name: None,
            external_provider: None,
            enabled: false,
            confirmed_date: None,
            confirmation_token: None,
            confirmation_token_created: None,
            reset_password_token: None,
            reset_password_token_created: None,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// An account backed by an external identity provider: enabled and
    /// confirmed immediately, with no local password.
    pub fn new_external(profile: ExternalProfile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_name: profile.user_name,
            email: profile.email,
            password_hash: None,
            first_name: profile.first_name,
            last_name: profile.last_name,
            external_provider: Some(ExternalProvider {
                provider: profile.provider,
                subject: profile.subject,
            }),
            enabled: true,
            confirmed_date: Some(now),
            confirmation_token: None,
            confirmation_token_created: None,
            reset_password_token: None,
            reset_password_token_created: None,
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}
