//! Log-only collaborator stand-ins.
//!
//! The binary wires these where real platform integrations plug in. They
//! keep the engine runnable end-to-end: role changes and announcements are
//! logged instead of delivered, and detection reports nothing so no event
//! qualifies until a real detector is configured.

use tracing::info;

use super::{ExternalError, Language, LanguageDetector, NotificationSink, RoleApi};
use crate::domain::{ChannelId, UserId};

/// Detector stand-in that never recognizes a language.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledDetector;

#[async_trait::async_trait]
impl LanguageDetector for DisabledDetector {
    async fn detect(&self, _text: &str) -> Option<Language> {
        None
    }
}

/// Role API stand-in that logs grants and revokes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRoleApi;

#[async_trait::async_trait]
impl RoleApi for LoggingRoleApi {
    async fn grant(&self, user_id: UserId, reason: &str) -> Result<(), ExternalError> {
        info!(%user_id, reason, "role grant (logging stand-in)");
        Ok(())
    }

    async fn revoke(&self, user_id: UserId, reason: &str) -> Result<(), ExternalError> {
        info!(%user_id, reason, "role revoke (logging stand-in)");
        Ok(())
    }
}

/// Notification stand-in that logs outbound messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

#[async_trait::async_trait]
impl NotificationSink for LoggingNotifier {
    async fn send_text(&self, channel_id: ChannelId, message: &str) -> Result<(), ExternalError> {
        info!(%channel_id, message, "notification (logging stand-in)");
        Ok(())
    }
}
