//! Per-event eligibility checks.
//!
//! [`ActivityGate::evaluate`] runs the checks in a fixed order and
//! short-circuits on the first failure. Rejection is silent: nothing is
//! persisted and nothing is retried. The only side effect of acceptance is
//! stamping the in-memory cooldown for the (user, channel) pair.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};

use crate::domain::{ChannelId, CooldownTracker, UserId};
use crate::error::LeagueError;
use crate::external::{Language, LanguageDetector};
use crate::store::LeagueStore;

/// An inbound message delivered by the event source.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Sender.
    pub user_id: UserId,
    /// Channel the message arrived in.
    pub channel_id: ChannelId,
    /// Space the channel belongs to; `None` for direct messages.
    pub guild_id: Option<i64>,
    /// Raw text content.
    pub content: String,
    /// Upstream message id, when the source provides one.
    pub source_event_id: Option<i64>,
    /// Delivery time.
    pub timestamp: DateTime<Utc>,
    /// Whether the sender is a bot or system account.
    pub from_bot: bool,
}

/// Why an event did not count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Sender is a bot or system account.
    Bot,
    /// Channel is outside the tracked space (or a direct message).
    OutsideTrackedSpace,
    /// Sender never joined or has opted out.
    NotOptedIn,
    /// Sender is banned.
    Banned,
    /// Channel is on the exclusion list.
    ChannelExcluded,
    /// The (user, channel) cooldown has not elapsed.
    OnCooldown,
    /// The sender reached the daily counted-event cap.
    DailyCapReached,
    /// Trimmed content is below the minimum length.
    ContentTooShort,
    /// Detected language does not match a learning flag (or nothing was
    /// detected).
    LanguageMismatch,
    /// No round is accepting activity.
    NoActiveRound,
}

impl RejectReason {
    /// Stable snake_case name for logs and API responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::OutsideTrackedSpace => "outside_tracked_space",
            Self::NotOptedIn => "not_opted_in",
            Self::Banned => "banned",
            Self::ChannelExcluded => "channel_excluded",
            Self::OnCooldown => "on_cooldown",
            Self::DailyCapReached => "daily_cap_reached",
            Self::ContentTooShort => "content_too_short",
            Self::LanguageMismatch => "language_mismatch",
            Self::NoActiveRound => "no_active_round",
        }
    }
}

/// Outcome of gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The event counts.
    Accepted,
    /// The event is silently dropped.
    Rejected(RejectReason),
}

/// Eligibility gate and rate limiter in front of the activity log.
#[derive(Debug)]
pub struct ActivityGate {
    store: Arc<dyn LeagueStore>,
    detector: Arc<dyn LanguageDetector>,
    cooldowns: Arc<CooldownTracker>,
    tracked_guild_id: i64,
    daily_event_cap: i64,
    min_content_length: usize,
}

impl ActivityGate {
    /// Creates a gate over the given collaborators.
    #[must_use]
    pub fn new(
        store: Arc<dyn LeagueStore>,
        detector: Arc<dyn LanguageDetector>,
        cooldowns: Arc<CooldownTracker>,
        tracked_guild_id: i64,
        daily_event_cap: i64,
        min_content_length: usize,
    ) -> Self {
        Self {
            store,
            detector,
            cooldowns,
            tracked_guild_id,
            daily_event_cap,
            min_content_length,
        }
    }

    /// Runs every check in order and stamps the cooldown on acceptance.
    ///
    /// # Errors
    ///
    /// Returns a [`LeagueError`] only for store failures; every policy
    /// outcome is a [`GateDecision`].
    pub async fn evaluate(&self, event: &InboundEvent) -> Result<GateDecision, LeagueError> {
        use GateDecision::Rejected;

        if event.from_bot {
            return Ok(Rejected(RejectReason::Bot));
        }

        if event.guild_id != Some(self.tracked_guild_id) {
            return Ok(Rejected(RejectReason::OutsideTrackedSpace));
        }

        let Some(user) = self.store.member(event.user_id).await? else {
            return Ok(Rejected(RejectReason::NotOptedIn));
        };
        if !user.opted_in {
            return Ok(Rejected(RejectReason::NotOptedIn));
        }
        if user.banned {
            return Ok(Rejected(RejectReason::Banned));
        }

        if self.store.is_channel_excluded(event.channel_id).await? {
            return Ok(Rejected(RejectReason::ChannelExcluded));
        }

        if !self.cooldowns.is_ready(event.user_id, event.channel_id).await {
            return Ok(Rejected(RejectReason::OnCooldown));
        }

        let day_start = day_start_utc(event.timestamp);
        let counted_today = self.store.daily_event_count(event.user_id, day_start).await?;
        if counted_today >= self.daily_event_cap {
            return Ok(Rejected(RejectReason::DailyCapReached));
        }

        if event.content.trim().chars().count() < self.min_content_length {
            return Ok(Rejected(RejectReason::ContentTooShort));
        }

        let matches = match self.detector.detect(&event.content).await {
            Some(Language::Spanish) => user.learning_spanish,
            Some(Language::English) => user.learning_english,
            None => false,
        };
        if !matches {
            return Ok(Rejected(RejectReason::LanguageMismatch));
        }

        self.cooldowns.stamp(event.user_id, event.channel_id).await;
        Ok(GateDecision::Accepted)
    }
}

/// Start of the UTC calendar day containing `at`.
fn day_start_utc(at: DateTime<Utc>) -> DateTime<Utc> {
    at.date_naive()
        .and_time(NaiveTime::from_hms_opt(0, 0, 0).unwrap_or_default())
        .and_utc()
}
