//! Authentication error types.

use doorman_core::error::DoormanError;
use thiserror::Error;

/// User-facing, recoverable failures of the authentication flows, plus
/// an infrastructure passthrough for everything that is not.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown identifier, wrong password, or an account not eligible
    /// for local sign-in. Deliberately indistinguishable from outside.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Malformed or missing input; the message is safe to re-render on
    /// the originating form.
    #[error("{0}")]
    Validation(String),

    /// Confirmation or reset token missing, unknown, already consumed,
    /// or outside its validity window.
    #[error("invalid or expired token")]
    InvalidToken,

    /// User name or email already registered.
    #[error("user name or email is already registered")]
    DuplicateIdentity,

    /// Reset requested for an address with no eligible account.
    #[error("no matching account")]
    UserNotFound,

    #[error("cryptography error: {0}")]
    Crypto(String),

    /// Store or mail failure. Not user-facing; maps to a 5xx-equivalent
    /// at the host boundary.
    #[error(transparent)]
    Infrastructure(#[from] DoormanError),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl From<AuthError> for DoormanError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::UserNotFound => {
                DoormanError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            AuthError::Validation(message) => DoormanError::Validation { message },
            AuthError::InvalidToken => DoormanError::InvalidToken,
            AuthError::DuplicateIdentity => DoormanError::AlreadyExists {
                entity: "user".into(),
            },
            AuthError::Crypto(msg) => DoormanError::Crypto(msg),
            AuthError::Infrastructure(inner) => inner,
        }
    }
}
