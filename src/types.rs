use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Match status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Scheduled,
    InPlay,
    Paused,
    Finished,
    /// Any provider value we don't map (POSTPONED, SUSPENDED, CANCELLED, ...).
    Other(String),
}

impl MatchStatus {
    /// Map a provider status string.
    ///
    /// EXTRA_TIME and PENALTY_SHOOTOUT are not live: they map to `Other`. Score
    /// changes there still alert, but a match that reaches `Finished` from
    /// extra time settles without a full-time event.
    pub fn from_provider(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "SCHEDULED" | "TIMED" => MatchStatus::Scheduled,
            "IN_PLAY" | "LIVE" => MatchStatus::InPlay,
            "PAUSED" => MatchStatus::Paused,
            "FINISHED" | "AWARDED" => MatchStatus::Finished,
            other => MatchStatus::Other(other.to_string()),
        }
    }

    /// In play or at half time.
    pub fn is_live(&self) -> bool {
        matches!(self, MatchStatus::InPlay | MatchStatus::Paused)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Scheduled => write!(f, "scheduled"),
            MatchStatus::InPlay => write!(f, "in_play"),
            MatchStatus::Paused => write!(f, "paused"),
            MatchStatus::Finished => write!(f, "finished"),
            MatchStatus::Other(raw) => write!(f, "other({})", raw.to_lowercase()),
        }
    }
}

// ---------------------------------------------------------------------------
// Followed side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FollowedSide {
    Home,
    Away,
    None,
}

/// The set of team names we send notifications about.
#[derive(Debug, Clone, Default)]
pub struct FollowedTeams(HashSet<String>);

impl FollowedTeams {
    pub fn new<I, S>(teams: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(teams.into_iter().map(Into::into).collect())
    }

    /// Comma-separated list, blanks ignored.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty()),
        )
    }

    pub fn contains(&self, team: &str) -> bool {
        self.0.contains(team)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Home wins when both teams are followed.
    pub fn side_of(&self, home_team: &str, away_team: &str) -> FollowedSide {
        if self.contains(home_team) {
            FollowedSide::Home
        } else if self.contains(away_team) {
            FollowedSide::Away
        } else {
            FollowedSide::None
        }
    }
}

// ---------------------------------------------------------------------------
// MatchSnapshot
// ---------------------------------------------------------------------------

/// One point-in-time read of a fixture. Scores are `None` until the provider
/// publishes them; a missing score is never treated as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id: u64,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<u32>,
    pub away_score: Option<u32>,
    pub status: MatchStatus,
    pub kickoff: DateTime<Utc>,
    pub competition: String,
    pub stage: String,
    pub group: Option<String>,
    pub followed: FollowedSide,
}

impl MatchSnapshot {
    pub fn followed_team(&self) -> Option<&str> {
        match self.followed {
            FollowedSide::Home => Some(&self.home_team),
            FollowedSide::Away => Some(&self.away_team),
            FollowedSide::None => None,
        }
    }

    pub fn opposition_team(&self) -> Option<&str> {
        match self.followed {
            FollowedSide::Home => Some(&self.away_team),
            FollowedSide::Away => Some(&self.home_team),
            FollowedSide::None => None,
        }
    }

    /// Followed side's score; `None` without a followed side or before scores exist.
    pub fn team_score(&self) -> Option<u32> {
        match self.followed {
            FollowedSide::Home => self.home_score,
            FollowedSide::Away => self.away_score,
            FollowedSide::None => None,
        }
    }

    pub fn opposition_score(&self) -> Option<u32> {
        match self.followed {
            FollowedSide::Home => self.away_score,
            FollowedSide::Away => self.home_score,
            FollowedSide::None => None,
        }
    }

    /// `Home 2 - 1 Away`, with `?` for scores not yet published.
    pub fn scoreline(&self) -> String {
        format!(
            "{} {} - {} {}",
            self.home_team,
            fmt_score(self.home_score),
            fmt_score(self.away_score),
            self.away_team
        )
    }
}

fn fmt_score(score: Option<u32>) -> String {
    score.map_or_else(|| "?".to_string(), |s| s.to_string())
}

impl std::fmt::Display for MatchSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} - Stage: {}",
            self.kickoff.format("%a %d %b %H:%M UTC"),
            self.competition,
            self.stage
        )?;
        if let Some(group) = &self.group {
            write!(f, " - Group: {group}")?;
        }
        write!(f, "\n{} - {}", self.scoreline(), self.status)
    }
}

// ---------------------------------------------------------------------------
// Match changes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchResult {
    Won,
    Lost,
    Drawn,
    #[default]
    None,
}

/// Everything that changed between two snapshots. Several flags may be set by
/// one transition, so this is a flag set rather than a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchChanges {
    pub match_started: bool,
    pub half_time: bool,
    pub second_half_started: bool,
    pub full_time: bool,
    pub team_scored: bool,
    pub team_conceded: bool,
    /// The opposition had a goal taken away.
    pub var_goal_awarded: bool,
    /// The followed team had a goal taken away.
    pub var_goal_disallowed: bool,
    pub match_result: MatchResult,
}

/// One notifiable change, as yielded by [`MatchChanges::events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    MatchStarted,
    HalfTime,
    SecondHalfStarted,
    TeamScored,
    TeamConceded,
    VarGoalDisallowed,
    VarGoalAwarded,
    FullTime(MatchResult),
}

impl MatchChanges {
    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    /// Set flags in notification order: status first, then goals, full time last.
    pub fn events(&self) -> Vec<MatchEvent> {
        let mut events = Vec::new();
        if self.match_started {
            events.push(MatchEvent::MatchStarted);
        }
        if self.half_time {
            events.push(MatchEvent::HalfTime);
        }
        if self.second_half_started {
            events.push(MatchEvent::SecondHalfStarted);
        }
        if self.team_scored {
            events.push(MatchEvent::TeamScored);
        }
        if self.team_conceded {
            events.push(MatchEvent::TeamConceded);
        }
        if self.var_goal_disallowed {
            events.push(MatchEvent::VarGoalDisallowed);
        }
        if self.var_goal_awarded {
            events.push(MatchEvent::VarGoalAwarded);
        }
        if self.full_time {
            events.push(MatchEvent::FullTime(self.match_result));
        }
        events
    }
}

impl std::fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchEvent::MatchStarted => "match_started",
            MatchEvent::HalfTime => "half_time",
            MatchEvent::SecondHalfStarted => "second_half_started",
            MatchEvent::TeamScored => "team_scored",
            MatchEvent::TeamConceded => "team_conceded",
            MatchEvent::VarGoalDisallowed => "var_goal_disallowed",
            MatchEvent::VarGoalAwarded => "var_goal_awarded",
            MatchEvent::FullTime(_) => "full_time",
        };
        write!(f, "{s}")
    }
}
