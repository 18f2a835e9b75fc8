//! Confirmation and reset token state machines.
//!
//! Both machines share one shape: an opaque single-use token paired
//! with its creation date lives on the user document, is valid inside a
//! fixed window, and is cleared by the transition that consumes it. An
//! expired pair is simply invalid — nothing purges it eagerly; the next
//! issuance overwrites it.

use chrono::{DateTime, Duration, Utc};
use doorman_core::error::DoormanError;
use doorman_core::mailer::{MailMessage, Mailer};
use doorman_core::models::user::User;
use doorman_core::repository::{RoleRepository, UserFilter, UserRepository};
use tracing::{debug, info};
use uuid::Uuid;

use crate::cache::InvalidatingUsers;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::password::CredentialStore;
use crate::random::random_alphanumeric;

/// Input for the local sign-up flow.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub user_name: String,
    pub email: String,
    pub password: String,
    pub repeat_password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Drives sign-up, email confirmation, and password reset.
pub struct TokenLifecycle<U, R, M> {
    users: InvalidatingUsers<U, R>,
    credentials: CredentialStore,
    mailer: M,
    config: AuthConfig,
}

impl<U: UserRepository, R: RoleRepository, M: Mailer> TokenLifecycle<U, R, M> {
    pub fn new(
        users: InvalidatingUsers<U, R>,
        credentials: CredentialStore,
        mailer: M,
        config: AuthConfig,
    ) -> Self {
        Self {
            users,
            credentials,
            mailer,
            config,
        }
    }

    /// Register a local account: created disabled and unconfirmed, with
    /// a fresh confirmation token, then the confirmation mail goes out.
    ///
    /// Uniqueness is pre-checked for a clean error; the store's unique
    /// indexes back it up under concurrent sign-ups, so a lost race
    /// still surfaces as `DuplicateIdentity` and dispatches no mail.
    pub async fn sign_up(&self, input: NewAccount) -> AuthResult<User> {
        if input.user_name.is_empty() || input.email.is_empty() {
            return Err(AuthError::Validation(
                "user name and email are required".into(),
            ));
        }
        if input.password != input.repeat_password {
            return Err(AuthError::Validation("passwords do not match".into()));
        }
        if self.exists(UserFilter::UserName(input.user_name.clone())).await?
            || self.exists(UserFilter::Email(input.email.clone())).await?
        {
            return Err(AuthError::DuplicateIdentity);
        }

        let mut user = User::new_local(input.user_name, input.email);
        user.first_name = input.first_name;
        user.last_name = input.last_name;
        self.credentials
            .set_password(&mut user, Some(&input.password))
            .await?;
        self.stamp_confirmation_token(&mut user);

        let saved = match self.users.save(&user).await {
            Ok(saved) => saved,
            Err(DoormanError::AlreadyExists { .. }) => return Err(AuthError::DuplicateIdentity),
            Err(other) => return Err(other.into()),
        };
        info!(user_id = %saved.id, "account registered, confirmation pending");

        self.send_confirmation_mail(&saved).await?;
        Ok(saved)
    }

    /// Generate and persist a fresh confirmation token pair, e.g. to
    /// re-issue one for a still-unconfirmed account.
    pub async fn issue_confirmation_token(&self, mut user: User) -> AuthResult<User> {
        self.stamp_confirmation_token(&mut user);
        let saved = self.users.save(&user).await?;
        debug!(user_id = %saved.id, "confirmation token issued");
        Ok(saved)
    }

    /// Consume a confirmation token: the account becomes enabled and
    /// confirmed, and the pair is cleared so the token cannot be
    /// replayed.
    pub async fn confirm(&self, token: &str) -> AuthResult<User> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let mut user = match self
            .users
            .find_one(UserFilter::ConfirmationToken(token.to_string()))
            .await
        {
            Ok(u) => u,
            Err(DoormanError::NotFound { .. }) => return Err(AuthError::InvalidToken),
            Err(other) => return Err(other.into()),
        };
        if !within_window(
            user.confirmation_token_created,
            self.config.confirmation_token_lifetime_secs,
        ) {
            return Err(AuthError::InvalidToken);
        }

        user.confirmed_date = Some(Utc::now());
        user.enabled = true;
        user.confirmation_token = None;
        user.confirmation_token_created = None;

        let saved = self.users.save(&user).await?;
        info!(user_id = %saved.id, "email confirmed");
        Ok(saved)
    }

    /// Start a password reset for an enabled local account.
    ///
    /// NOTE: the distinct `UserNotFound` outcome lets a caller probe
    /// which addresses are registered; hosts that care should render
    /// the same view for success and failure.
    pub async fn request_reset(&self, email: &str) -> AuthResult<User> {
        let mut user = match self.users.find_one(UserFilter::Email(email.to_string())).await {
            Ok(u) => u,
            Err(DoormanError::NotFound { .. }) => return Err(AuthError::UserNotFound),
            Err(other) => return Err(other.into()),
        };
        if !user.enabled || user.external_provider.is_some() {
            return Err(AuthError::UserNotFound);
        }

        user.reset_password_token = Some(random_alphanumeric(self.config.token_length));
        user.reset_password_token_created = Some(Utc::now());

        let saved = self.users.save(&user).await?;
        info!(user_id = %saved.id, "password reset requested");

        self.send_reset_mail(&saved).await?;
        Ok(saved)
    }

    /// Consume a reset token and set the new password.
    ///
    /// The pair is cleared in the same persist that stores the new
    /// hash; a policy failure (e.g. too-short password) happens before
    /// either, so a failed attempt does not consume the token.
    pub async fn complete_reset(&self, token: &str, new_password: &str) -> AuthResult<User> {
        if token.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        let mut user = match self
            .users
            .find_one(UserFilter::ResetPasswordToken(token.to_string()))
            .await
        {
            Ok(u) => u,
            Err(DoormanError::NotFound { .. }) => return Err(AuthError::InvalidToken),
            Err(other) => return Err(other.into()),
        };
        if !user.enabled
            || !within_window(
                user.reset_password_token_created,
                self.config.reset_token_lifetime_secs,
            )
        {
            return Err(AuthError::InvalidToken);
        }

        self.credentials
            .set_password(&mut user, Some(new_password))
            .await?;
        user.reset_password_token = None;
        user.reset_password_token_created = None;

        let saved = self.users.save(&user).await?;
        info!(user_id = %saved.id, "password reset completed");
        Ok(saved)
    }

    /// Change the password of an authenticated user, verifying the
    /// current one first.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<User> {
        let mut user = match self.users.find_by_id(user_id).await {
            Ok(u) => u,
            Err(DoormanError::NotFound { .. }) => return Err(AuthError::InvalidCredentials),
            Err(other) => return Err(other.into()),
        };
        if !self
            .credentials
            .compare_password(&user, current_password)
            .await?
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.credentials
            .set_password(&mut user, Some(new_password))
            .await?;
        let saved = self.users.save(&user).await?;
        info!(user_id = %saved.id, "password changed");
        Ok(saved)
    }

    fn stamp_confirmation_token(&self, user: &mut User) {
        user.confirmation_token = Some(random_alphanumeric(self.config.token_length));
        user.confirmation_token_created = Some(Utc::now());
    }

    async fn exists(&self, filter: UserFilter) -> AuthResult<bool> {
        match self.users.find_one(filter).await {
            Ok(_) => Ok(true),
            Err(DoormanError::NotFound { .. }) => Ok(false),
            Err(other) => Err(other.into()),
        }
    }

    async fn send_confirmation_mail(&self, user: &User) -> AuthResult<()> {
        let message = MailMessage {
            template: "confirmEmail".into(),
            to: user.email.clone(),
            subject: "Confirm your email address".into(),
            data: serde_json::json!({
                "userName": user.user_name,
                "token": user.confirmation_token,
            }),
        };
        self.mailer.send(message).await?;
        debug!(user_id = %user.id, template = "confirmEmail", "mail dispatched");
        Ok(())
    }

    async fn send_reset_mail(&self, user: &User) -> AuthResult<()> {
        let message = MailMessage {
            template: "resetPassword".into(),
            to: user.email.clone(),
            subject: "Reset your password".into(),
            data: serde_json::json!({
                "userName": user.user_name,
                "token": user.reset_password_token,
            }),
        };
        self.mailer.send(message).await?;
        debug!(user_id = %user.id, template = "resetPassword", "mail dispatched");
        Ok(())
    }
}

/// A token pair is valid while `created >= now - lifetime`; the
/// boundary instant itself still validates.
fn within_window(created: Option<DateTime<Utc>>, lifetime_secs: u64) -> bool {
    match created {
        Some(created) => created >= Utc::now() - Duration::seconds(lifetime_secs as i64),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_accepts_fresh_and_boundary_rejects_stale() {
        let now = Utc::now();
        assert!(within_window(Some(now), 60));
        // Slightly inside the boundary.
        assert!(within_window(Some(now - Duration::seconds(59)), 60));
        // Well past the window.
        assert!(!within_window(Some(now - Duration::seconds(120)), 60));
        // No creation date means no valid token.
        assert!(!within_window(None, 60));
    }
}
