//! Outbound mail collaborator boundary.

use serde_json::Value;

use crate::error::DoormanResult;

/// A templated message handed to the mail collaborator.
#[derive(Debug, Clone)]
pub struct MailMessage {
    /// Template name resolved by the mail layer, e.g. `"confirmEmail"`.
    pub template: String,
    pub to: String,
    pub subject: String,
    /// Template rendering context.
    pub data: Value,
}

/// Mail dispatch boundary.
///
/// Delivery concerns (transport, queueing, retries) belong to the
/// implementor; the engine only hands over the message. A failed send is
/// an infrastructure failure and propagates as `DoormanError::Mail`.
pub trait Mailer: Send + Sync {
    fn send(&self, message: MailMessage) -> impl Future<Output = DoormanResult<()>> + Send;
}
