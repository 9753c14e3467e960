use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, FetchError};
use crate::types::{FollowedTeams, MatchSnapshot, MatchStatus};

/// Where match snapshots come from.
#[async_trait]
pub trait MatchSource: Send + Sync {
    async fn fetch_match(&self, id: u64) -> Result<MatchSnapshot, FetchError>;

    /// All fixtures with a kickoff date in `[from, to]`.
    async fn fetch_fixtures(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MatchSnapshot>, FetchError>;
}

/// football-data.org REST client.
pub struct FootballDataClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    competition_id: Option<u32>,
    followed: FollowedTeams,
}

impl FootballDataClient {
    pub fn new(cfg: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: cfg.football_data_url.trim_end_matches('/').to_string(),
            token: cfg.football_data_token.clone(),
            competition_id: cfg.competition_id,
            followed: cfg.followed_teams.clone(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value, FetchError> {
        let resp = self
            .http
            .get(url)
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(0)),
            s if !s.is_success() => Err(FetchError::Unavailable(format!("HTTP {s} from {url}"))),
            _ => resp
                .json::<serde_json::Value>()
                .await
                .map_err(|e| FetchError::Malformed(e.to_string())),
        }
    }
}

#[async_trait]
impl MatchSource for FootballDataClient {
    async fn fetch_match(&self, id: u64) -> Result<MatchSnapshot, FetchError> {
        let url = format!("{}/matches/{}", self.base_url, id);
        let resp = self.get_json(&url).await.map_err(|e| match e {
            FetchError::NotFound(_) => FetchError::NotFound(id),
            other => other,
        })?;

        // v2 wraps the match as {"head2head": .., "match": {..}}; v4 returns it bare.
        let item = resp.get("match").unwrap_or(&resp);
        parse_match(item, None, &self.followed)
    }

    async fn fetch_fixtures(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MatchSnapshot>, FetchError> {
        let url = match self.competition_id {
            Some(competition) => format!(
                "{}/competitions/{}/matches?dateFrom={}&dateTo={}",
                self.base_url, competition, from, to
            ),
            None => format!("{}/matches?dateFrom={}&dateTo={}", self.base_url, from, to),
        };
        let resp = self.get_json(&url).await?;
        parse_fixture_list(&resp, &self.followed)
    }
}

/// Parse a `{"competition": .., "matches": [..]}` response.
///
/// Individual malformed entries are skipped; a response without a `matches`
/// array is malformed as a whole.
pub fn parse_fixture_list(
    resp: &serde_json::Value,
    followed: &FollowedTeams,
) -> Result<Vec<MatchSnapshot>, FetchError> {
    let items = resp
        .get("matches")
        .and_then(|m| m.as_array())
        .ok_or_else(|| FetchError::Malformed("fixture list has no matches array".to_string()))?;

    let competition = resp
        .get("competition")
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str());

    let mut fixtures = Vec::with_capacity(items.len());
    for item in items {
        match parse_match(item, competition, followed) {
            Ok(snapshot) => fixtures.push(snapshot),
            Err(e) => debug!("skipping fixture entry: {e}"),
        }
    }
    Ok(fixtures)
}

/// Parse one match object. `competition` overrides the per-match competition
/// name (list responses carry it once at the top level).
pub fn parse_match(
    v: &serde_json::Value,
    competition: Option<&str>,
    followed: &FollowedTeams,
) -> Result<MatchSnapshot, FetchError> {
    let id = v
        .get("id")
        .and_then(|i| i.as_u64())
        .ok_or_else(|| missing("id"))?;

    let home_team = team_name(v, "homeTeam")?;
    let away_team = team_name(v, "awayTeam")?;

    let status = v
        .get("status")
        .and_then(|s| s.as_str())
        .map(MatchStatus::from_provider)
        .ok_or_else(|| missing("status"))?;

    let kickoff = v
        .get("utcDate")
        .and_then(|d| d.as_str())
        .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
        .map(|d| d.with_timezone(&Utc))
        .ok_or_else(|| missing("utcDate"))?;

    let full_time = v
        .get("score")
        .and_then(|s| s.get("fullTime"))
        .ok_or_else(|| missing("score.fullTime"))?;
    let home_score = side_score(full_time, "homeTeam", "home");
    let away_score = side_score(full_time, "awayTeam", "away");

    let competition = competition
        .map(str::to_string)
        .or_else(|| {
            v.get("competition")
                .and_then(|c| c.get("name"))
                .and_then(|n| n.as_str())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let stage = v
        .get("stage")
        .and_then(|s| s.as_str())
        .unwrap_or("")
        .to_string();

    let group = v
        .get("group")
        .and_then(|g| g.as_str())
        .map(str::to_string);

    let followed = followed.side_of(&home_team, &away_team);

    Ok(MatchSnapshot {
        id,
        home_team,
        away_team,
        home_score,
        away_score,
        status,
        kickoff,
        competition,
        stage,
        group,
        followed,
    })
}

fn team_name(v: &serde_json::Value, key: &str) -> Result<String, FetchError> {
    v.get(key)
        .and_then(|t| t.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .ok_or_else(|| missing(key))
}

/// v2 uses `homeTeam`/`awayTeam` inside `score.fullTime`, v4 uses `home`/`away`.
/// `null` means the score isn't published yet.
fn side_score(full_time: &serde_json::Value, v2_key: &str, v4_key: &str) -> Option<u32> {
    full_time
        .get(v2_key)
        .or_else(|| full_time.get(v4_key))
        .and_then(|s| s.as_u64())
        .and_then(|s| u32::try_from(s).ok())
}

fn missing(field: &str) -> FetchError {
    FetchError::Malformed(format!("missing or invalid field `{field}`"))
}
