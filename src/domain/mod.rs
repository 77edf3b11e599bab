//! Domain layer: identifiers, boards, scoring, rotation, and the
//! process-local mutable state (cooldown map, leaderboard cache).
//!
//! Everything here is either pure (scoring, rotation, schedule) or a small
//! self-contained concurrent component, so the service layer above can be
//! exercised in tests without external collaborators.

pub mod board;
pub mod cache;
pub mod cooldown;
pub mod ids;
pub mod rotation;
pub mod schedule;
pub mod scoring;

pub use board::{BoardType, RankedEntry};
pub use cache::LeaderboardCache;
pub use cooldown::CooldownTracker;
pub use ids::{ChannelId, RoundId, UserId};
pub use rotation::eligible_champions;
pub use schedule::next_round_end;
pub use scoring::{ActivityTotals, rank_entries, total_score};
