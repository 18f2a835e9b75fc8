//! Doorman Core — domain models, repository traits, and the shared
//! error type.
//!
//! This crate has no knowledge of the storage engine or the HTTP host;
//! it defines the boundary the rest of the workspace is built against.

pub mod error;
pub mod mailer;
pub mod models;
pub mod repository;

pub use error::{DoormanError, DoormanResult};
