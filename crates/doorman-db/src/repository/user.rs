//! SurrealDB implementation of [`UserRepository`].
//!
//! `save` writes the full document back (insert or replace by id); the
//! unique indexes on `user_name` and `email` are the authority on
//! identity uniqueness, and violations surface as `AlreadyExists`.

use chrono::{DateTime, Utc};
use doorman_core::error::DoormanResult;
use doorman_core::models::user::{ExternalProvider, User};
use doorman_core::repository::{UserFilter, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct UserRow {
    user_name: String,
    email: String,
    password_hash: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    provider_name: Option<String>,
    provider_subject: Option<String>,
    enabled: bool,
    confirmed_date: Option<DateTime<Utc>>,
    confirmation_token: Option<String>,
    confirmation_token_created: Option<DateTime<Utc>>,
    reset_password_token: Option<String>,
    reset_password_token_created: Option<DateTime<Utc>>,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRowWithId {
    record_id: String,
    user_name: String,
    email: String,
    password_hash: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    provider_name: Option<String>,
    provider_subject: Option<String>,
    enabled: bool,
    confirmed_date: Option<DateTime<Utc>>,
    confirmation_token: Option<String>,
    confirmation_token_created: Option<DateTime<Utc>>,
    reset_password_token: Option<String>,
    reset_password_token_created: Option<DateTime<Utc>>,
    roles: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_roles(raw: Vec<String>) -> Result<Vec<Uuid>, DbError> {
    raw.iter()
        .map(|r| {
            Uuid::parse_str(r).map_err(|e| DbError::Migration(format!("invalid role UUID: {e}")))
        })
        .collect()
}

fn provider_of(name: Option<String>, subject: Option<String>) -> Option<ExternalProvider> {
    match (name, subject) {
        (Some(provider), Some(subject)) => Some(ExternalProvider { provider, subject }),
        _ => None,
    }
}

impl UserRow {
    fn into_user(self, id: Uuid) -> Result<User, DbError> {
        Ok(User {
            id,
            user_name: self.user_name,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            external_provider: provider_of(self.provider_name, self.provider_subject),
            enabled: self.enabled,
            confirmed_date: self.confirmed_date,
            confirmation_token: self.confirmation_token,
            confirmation_token_created: self.confirmation_token_created,
            reset_password_token: self.reset_password_token,
            reset_password_token_created: self.reset_password_token_created,
            roles: parse_roles(self.roles)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UserRowWithId {
    fn try_into_user(self) -> Result<User, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        Ok(User {
            id,
            user_name: self.user_name,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            external_provider: provider_of(self.provider_name, self.provider_subject),
            enabled: self.enabled,
            confirmed_date: self.confirmed_date,
            confirmation_token: self.confirmation_token,
            confirmation_token_created: self.confirmation_token_created,
            reset_password_token: self.reset_password_token,
            reset_password_token_created: self.reset_password_token_created,
            roles: parse_roles(self.roles)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Unique-index violations come back as plain query errors; detect the
/// `already contains` message and surface them as duplicates.
fn save_error(message: String) -> DbError {
    if message.contains("already contains") {
        DbError::Duplicate {
            entity: "user".into(),
        }
    } else {
        DbError::Migration(message)
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn find_by_id(&self, id: Uuid) -> DoormanResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(id)?)
    }

    async fn find_one(&self, filter: UserFilter) -> DoormanResult<User> {
        let (field, value) = match filter {
            UserFilter::UserName(v) => ("user_name", v),
            UserFilter::Email(v) => ("email", v),
            UserFilter::ConfirmationToken(v) => ("confirmation_token", v),
            UserFilter::ResetPasswordToken(v) => ("reset_password_token", v),
        };

        // `field` comes from the fixed set above, never from input.
        let query =
            format!("SELECT meta::id(id) AS record_id, * FROM user WHERE {field} = $value");

        let mut result = self
            .db
            .query(&query)
            .bind(("value", value))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRowWithId> = result.take(0).map_err(DbError::from)?;
        // The filtered value stays out of the error: token and address
        // lookups must not echo their needle.
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: field.to_string(),
        })?;

        Ok(row.try_into_user()?)
    }

    async fn save(&self, user: &User) -> DoormanResult<User> {
        let id_str = user.id.to_string();
        let roles: Vec<String> = user.roles.iter().map(Uuid::to_string).collect();
        let (provider_name, provider_subject) = match &user.external_provider {
            Some(p) => (Some(p.provider.clone()), Some(p.subject.clone())),
            None => (None, None),
        };

        let result = self
            .db
            .query(
                "UPSERT type::record('user', $id) SET \
                 user_name = $user_name, email = $email, \
                 password_hash = $password_hash, \
                 first_name = $first_name, last_name = $last_name, \
                 provider_name = $provider_name, \
                 provider_subject = $provider_subject, \
                 enabled = $enabled, \
                 confirmed_date = $confirmed_date, \
                 confirmation_token = $confirmation_token, \
                 confirmation_token_created = $confirmation_token_created, \
                 reset_password_token = $reset_password_token, \
                 reset_password_token_created = $reset_password_token_created, \
                 roles = $roles, \
                 created_at = $created_at, \
                 updated_at = time::now()",
            )
            .bind(("id", id_str.clone()))
            .bind(("user_name", user.user_name.clone()))
            .bind(("email", user.email.clone()))
            .bind(("password_hash", user.password_hash.clone()))
            .bind(("first_name", user.first_name.clone()))
            .bind(("last_name", user.last_name.clone()))
            .bind(("provider_name", provider_name))
            .bind(("provider_subject", provider_subject))
            .bind(("enabled", user.enabled))
            .bind(("confirmed_date", user.confirmed_date))
            .bind(("confirmation_token", user.confirmation_token.clone()))
            .bind((
                "confirmation_token_created",
                user.confirmation_token_created,
            ))
            .bind(("reset_password_token", user.reset_password_token.clone()))
            .bind((
                "reset_password_token_created",
                user.reset_password_token_created,
            ))
            .bind(("roles", roles))
            .bind(("created_at", user.created_at))
            .await
            .map_err(|e| save_error(e.to_string()))?;

        let mut result = result.check().map_err(|e| save_error(e.to_string()))?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        Ok(row.into_user(user.id)?)
    }

    async fn remove(&self, id: Uuid) -> DoormanResult<()> {
        self.db
            .query("DELETE type::record('user', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }
}
