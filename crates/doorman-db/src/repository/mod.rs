//! SurrealDB repository implementations.

mod role;
mod user;

pub use role::SurrealRoleRepository;
pub use user::SurrealUserRepository;
