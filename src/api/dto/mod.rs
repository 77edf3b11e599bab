//! Data Transfer Objects for REST request/response serialization.
//!
//! Platform ids cross the wire as raw `i64` values; handlers wrap them in
//! the domain newtypes at the boundary.

pub mod admin_dto;
pub mod league_dto;

pub use admin_dto::{
    BanResponse, EndRoundResponse, ExcludeChannelRequest, ExcludedChannelDto, OverviewResponse,
    PreviewResponse, SeedRecipientsRequest, SeedRecipientsResponse, WinnerDto,
};
pub use league_dto::{
    BoardQuery, IngestEventRequest, IngestEventResponse, JoinRequest, JoinResponse,
    LeaderboardResponse, LeaveRequest, LeaveResponse, RankedEntryDto, UserStatsResponse,
};
