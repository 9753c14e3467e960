use crate::detector::{ScoreTrend, TrendKind};
use crate::types::{MatchEvent, MatchResult, MatchSnapshot};

/// Text for one change event, rendered against the snapshot that produced it
/// and the trend after it.
pub fn render_event(event: MatchEvent, snapshot: &MatchSnapshot, trend: &ScoreTrend) -> String {
    let team = snapshot.followed_team().unwrap_or(snapshot.home_team.as_str());
    let opposition = snapshot.opposition_team().unwrap_or(snapshot.away_team.as_str());
    let scoreline = snapshot.scoreline();

    match event {
        MatchEvent::MatchStarted => format!(
            "Kick off! {} v {} is underway ({}).",
            snapshot.home_team, snapshot.away_team, snapshot.competition
        ),
        MatchEvent::HalfTime => format!("Half time: {scoreline}"),
        MatchEvent::SecondHalfStarted => format!("Second half underway: {scoreline}"),
        MatchEvent::TeamScored => format!(
            "GOAL! {team} score!\n{scoreline}\n{}",
            trend_line(team, opposition, trend)
        ),
        MatchEvent::TeamConceded => format!(
            "{opposition} score.\n{scoreline}\n{}",
            trend_line(team, opposition, trend)
        ),
        MatchEvent::VarGoalDisallowed => {
            format!("VAR: {team} goal ruled out.\n{scoreline}")
        }
        MatchEvent::VarGoalAwarded => {
            format!("VAR: {opposition} goal ruled out.\n{scoreline}")
        }
        MatchEvent::FullTime(result) => {
            let verdict = match result {
                MatchResult::Won => format!("{team} win!"),
                MatchResult::Lost => format!("{team} lose."),
                MatchResult::Drawn => format!("{team} draw."),
                MatchResult::None => "Match over.".to_string(),
            };
            format!("Full time: {scoreline}\n{verdict}")
        }
    }
}

fn trend_line(team: &str, opposition: &str, trend: &ScoreTrend) -> String {
    match trend.kind {
        TrendKind::Drawing => "All square.".to_string(),
        TrendKind::LeadByOne => format!("{team} lead by one."),
        TrendKind::ExtendingLead => format!("{team} extend their lead."),
        TrendKind::LosingLead => format!("{opposition} are closing the gap."),
        TrendKind::DeficitOfOne => format!("{team} trail by one."),
        TrendKind::ExtendingDeficit => format!("{opposition} pull further ahead."),
        TrendKind::LosingDeficit => format!("{team} are fighting back."),
    }
}

/// Sent shortly before kickoff.
pub fn render_pre_match(snapshot: &MatchSnapshot) -> String {
    let mut text = format!(
        "Coming up: {} v {} at {} ({}",
        snapshot.home_team,
        snapshot.away_team,
        snapshot.kickoff.format("%H:%M UTC"),
        snapshot.competition,
    );
    if let Some(group) = &snapshot.group {
        text.push_str(&format!(", {group}"));
    }
    text.push(')');
    text
}

/// Sent a fixed time after kickoff, whatever the score.
pub fn render_post_kickoff(snapshot: &MatchSnapshot) -> String {
    let team = snapshot.followed_team().unwrap_or(snapshot.home_team.as_str());
    format!("How's the crowd for {team} today? Let us know from the ground.")
}
