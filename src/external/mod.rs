//! External collaborator interfaces.
//!
//! The engine consumes these; it never implements them beyond thin
//! stand-ins. Language detection, champion-role management, and message
//! delivery all live outside the core and may fail per call without
//! affecting league state.

pub mod logging;

use crate::domain::{ChannelId, UserId};

pub use logging::{DisabledDetector, LoggingNotifier, LoggingRoleApi};

/// A language the league scores messages in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// Spanish (`es`).
    Spanish,
    /// English (`en`).
    English,
}

/// Failure from an external call (role grant/revoke, message send).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ExternalError(pub String);

/// Detects the language of inbound text.
///
/// Returns `None` for any language other than the two league languages and
/// for detection failures; the two cases are deliberately indistinguishable
/// to the gate.
#[async_trait::async_trait]
pub trait LanguageDetector: Send + Sync + std::fmt::Debug {
    /// Classifies `text`, or `None` when uncertain.
    async fn detect(&self, text: &str) -> Option<Language>;
}

/// Grants and revokes the rotating champion status.
#[async_trait::async_trait]
pub trait RoleApi: Send + Sync + std::fmt::Debug {
    /// Grants champion status to a user.
    ///
    /// # Errors
    ///
    /// Returns an [`ExternalError`] when the platform call fails; callers
    /// log and continue.
    async fn grant(&self, user_id: UserId, reason: &str) -> Result<(), ExternalError>;

    /// Revokes champion status from a user.
    ///
    /// # Errors
    ///
    /// Returns an [`ExternalError`] when the platform call fails; callers
    /// log and continue.
    async fn revoke(&self, user_id: UserId, reason: &str) -> Result<(), ExternalError>;
}

/// Delivers plain-text messages to a channel.
#[async_trait::async_trait]
pub trait NotificationSink: Send + Sync + std::fmt::Debug {
    /// Sends `message` to `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ExternalError`] when delivery fails; callers log and
    /// continue.
    async fn send_text(&self, channel_id: ChannelId, message: &str) -> Result<(), ExternalError>;
}
