//! Board partitions and ranked standings entries.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::UserId;

/// Ranking partition of the league.
///
/// The two language boards filter participants by learning flag; the
/// combined board keeps every opted-in, non-banned participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardType {
    /// Participants learning Spanish.
    Spanish,
    /// Participants learning English.
    English,
    /// All participants regardless of learning flag.
    Combined,
}

impl BoardType {
    /// The two language-specific boards, in announcement order.
    pub const LANGUAGE_BOARDS: [Self; 2] = [Self::Spanish, Self::English];

    /// Parses a board name as used in API queries and stored winner rows.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "spanish" => Some(Self::Spanish),
            "english" => Some(Self::English),
            "combined" => Some(Self::Combined),
            _ => None,
        }
    }

    /// Lowercase name, stable across serialization and storage.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Spanish => "spanish",
            Self::English => "english",
            Self::Combined => "combined",
        }
    }

    /// Display title used in announcements.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Spanish => "Spanish League",
            Self::English => "English League",
            Self::Combined => "Combined League",
        }
    }
}

impl fmt::Display for BoardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of a ranked leaderboard.
///
/// Ranks follow standard competition ranking: tied scores share a rank and
/// the entry after a tie group of size `k` starting at rank `r` gets `r + k`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedEntry {
    /// 1-based competition rank.
    pub rank: u32,
    /// Participant id.
    pub user_id: UserId,
    /// Display name captured at join time.
    pub username: String,
    /// Points plus the per-active-day bonus.
    pub total_score: i64,
    /// Distinct calendar days with at least one qualifying event.
    pub active_days: i64,
}
