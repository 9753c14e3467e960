//! Shared fixtures for unit tests.

use chrono::{Duration, Utc};

use crate::types::{FollowedSide, MatchSnapshot, MatchStatus};

/// Liverpool (followed, home) v Everton, kicked off a minute ago.
pub fn snapshot(status: MatchStatus, home: Option<u32>, away: Option<u32>) -> MatchSnapshot {
    MatchSnapshot {
        id: 1001,
        home_team: "Liverpool FC".to_string(),
        away_team: "Everton FC".to_string(),
        home_score: home,
        away_score: away,
        status,
        kickoff: Utc::now() - Duration::minutes(1),
        competition: "Premier League".to_string(),
        stage: "REGULAR_SEASON".to_string(),
        group: None,
        followed: FollowedSide::Home,
    }
}
