//! Round-end announcements.
//!
//! Formatting is pure and deterministic; delivery goes through the
//! notification collaborator and is best-effort.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use tracing::warn;

use crate::domain::{BoardType, ChannelId, RankedEntry, UserId};
use crate::external::NotificationSink;
use crate::store::models::Round;

/// Medal-style rank marker: medals for the podium, `#n` beyond it.
fn rank_marker(rank: u32) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        other => format!("#{other}"),
    }
}

/// Builds the plain-text round summary.
///
/// One section per language board with the top three ranked entries,
/// cooldown members annotated as resting, the merged champion list, and a
/// fallback line for boards without participants.
#[must_use]
pub fn format_summary(
    round: &Round,
    boards: &[(BoardType, Vec<RankedEntry>)],
    champions: &[RankedEntry],
    cooldown: &HashSet<UserId>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "🏁 Round #{} has ended!", round.round_number);

    for (board, entries) in boards {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", board.title());
        if entries.is_empty() {
            let _ = writeln!(out, "  No participants this round.");
            continue;
        }
        for entry in entries.iter().take(3) {
            let resting = if cooldown.contains(&entry.user_id) {
                " (resting)"
            } else {
                ""
            };
            let _ = writeln!(
                out,
                "  {} {} — {} pts, {} active days{}",
                rank_marker(entry.rank),
                entry.username,
                entry.total_score,
                entry.active_days,
                resting
            );
        }
    }

    let _ = writeln!(out);
    if champions.is_empty() {
        let _ = writeln!(out, "No champions this round.");
    } else {
        let names: Vec<&str> = champions.iter().map(|c| c.username.as_str()).collect();
        let _ = writeln!(out, "🏆 New champions: {}", names.join(", "));
    }

    out
}

/// Sends round summaries to the announcement channel.
#[derive(Debug)]
pub struct RoundAnnouncer {
    sink: Arc<dyn NotificationSink>,
    announce_channel: ChannelId,
}

impl RoundAnnouncer {
    /// Creates an announcer for the given channel.
    #[must_use]
    pub fn new(sink: Arc<dyn NotificationSink>, announce_channel: ChannelId) -> Self {
        Self {
            sink,
            announce_channel,
        }
    }

    /// Formats and sends the summary. Delivery failures are logged and
    /// swallowed; the round transition has already committed.
    pub async fn announce(
        &self,
        round: &Round,
        boards: &[(BoardType, Vec<RankedEntry>)],
        champions: &[RankedEntry],
        cooldown: &HashSet<UserId>,
    ) {
        let message = format_summary(round, boards, champions, cooldown);
        if let Err(e) = self.sink.send_text(self.announce_channel, &message).await {
            warn!(round_id = %round.round_id, error = %e, "round summary delivery failed");
        }
    }
}
