//! Repository trait definitions for the identity store boundary.
//!
//! All repository operations are async. Implementations live in
//! `doorman-db`; the engine crate only ever sees these traits, so it can
//! be tested against any backing store.

use uuid::Uuid;

use crate::error::DoormanResult;
use crate::models::role::Role;
use crate::models::user::User;

/// Field-based lookup filter for [`UserRepository::find_one`].
///
/// Each variant corresponds to an indexed field in the backing store.
#[derive(Debug, Clone)]
pub enum UserFilter {
    UserName(String),
    Email(String),
    ConfirmationToken(String),
    ResetPasswordToken(String),
}

pub trait UserRepository: Send + Sync {
    /// Look up a user by id. Fails with `NotFound` when absent.
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = DoormanResult<User>> + Send;

    /// Look up a single user by an indexed field. Fails with `NotFound`.
    fn find_one(&self, filter: UserFilter) -> impl Future<Output = DoormanResult<User>> + Send;

    /// Insert or fully replace a user document and return the persisted
    /// state. Unique-index violations (`user_name`, `email`) surface as
    /// `AlreadyExists`.
    fn save(&self, user: &User) -> impl Future<Output = DoormanResult<User>> + Send;

    /// Delete a user document. Deleting an absent user is not an error.
    fn remove(&self, id: Uuid) -> impl Future<Output = DoormanResult<()>> + Send;
}

pub trait RoleRepository: Send + Sync {
    /// Look up a role by id. Fails with `NotFound` when absent.
    fn find_by_id(&self, id: Uuid) -> impl Future<Output = DoormanResult<Role>> + Send;

    /// Look up a role by its unique name. Fails with `NotFound`.
    fn find_by_name(&self, name: &str) -> impl Future<Output = DoormanResult<Role>> + Send;

    /// Resolve a set of role ids. Ids with no backing record are skipped,
    /// so a stale reference never fails a user lookup.
    fn find_by_ids(&self, ids: &[Uuid]) -> impl Future<Output = DoormanResult<Vec<Role>>> + Send;

    /// Insert or replace a role. Unique-index violations on `name`
    /// surface as `AlreadyExists`.
    fn save(&self, role: &Role) -> impl Future<Output = DoormanResult<Role>> + Send;

    /// Delete a role.
    fn remove(&self, id: Uuid) -> impl Future<Output = DoormanResult<()>> + Send;
}
