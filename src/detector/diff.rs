use std::cmp::Ordering;

use crate::detector::{advance, ScoreTrend};
use crate::types::{FollowedSide, MatchChanges, MatchResult, MatchSnapshot, MatchStatus};

/// Compare two snapshots of the same match and return what changed, along
/// with the trend after any goals. The caller owns the returned trend.
///
/// Goals and VAR reversals are only detected once both snapshots carry a full
/// scoreline, and only when the match has a followed side. The first full
/// scoreline re-seeds the trend. A reversal never touches the trend.
pub fn diff(
    previous: &MatchSnapshot,
    current: &MatchSnapshot,
    trend: ScoreTrend,
) -> (MatchChanges, ScoreTrend) {
    let mut changes = MatchChanges::default();

    match (&previous.status, &current.status) {
        (MatchStatus::Scheduled, MatchStatus::InPlay) => changes.match_started = true,
        (MatchStatus::InPlay, MatchStatus::Paused) => changes.half_time = true,
        (MatchStatus::Paused, MatchStatus::InPlay) => changes.second_half_started = true,
        (MatchStatus::InPlay, MatchStatus::Finished) => {
            changes.full_time = true;
            changes.match_result = match_result(current);
        }
        _ => {}
    }

    if current.followed == FollowedSide::None {
        return (changes, trend);
    }

    let team = (previous.team_score(), current.team_score());
    let opposition = (previous.opposition_score(), current.opposition_score());

    // The first full scoreline is a baseline: re-seed from it, no goal events.
    if let (Some(new_team), Some(new_opp)) = (team.1, opposition.1) {
        if team.0.is_none() || opposition.0.is_none() {
            return (changes, ScoreTrend::classify(new_team, new_opp));
        }
    }

    let mut trend = trend;

    if let (Some(old_team), Some(new_team)) = team {
        match new_team.cmp(&old_team) {
            Ordering::Greater => {
                changes.team_scored = true;
                // If the opposition also moved, count our goal first against
                // their old score so each goal advances the trend once.
                let opp_at_goal = opposition.0.unwrap_or(trend.opposition_score);
                trend = advance(trend, new_team, opp_at_goal);
            }
            Ordering::Less => changes.var_goal_disallowed = true,
            Ordering::Equal => {}
        }
    }

    if let (Some(old_opp), Some(new_opp)) = opposition {
        match new_opp.cmp(&old_opp) {
            Ordering::Greater => {
                changes.team_conceded = true;
                let team_at_goal = team.1.unwrap_or(trend.team_score);
                trend = advance(trend, team_at_goal, new_opp);
            }
            Ordering::Less => changes.var_goal_awarded = true,
            Ordering::Equal => {}
        }
    }

    (changes, trend)
}

fn match_result(snapshot: &MatchSnapshot) -> MatchResult {
    match (snapshot.team_score(), snapshot.opposition_score()) {
        (Some(team), Some(opp)) => match team.cmp(&opp) {
            Ordering::Greater => MatchResult::Won,
            Ordering::Less => MatchResult::Lost,
            Ordering::Equal => MatchResult::Drawn,
        },
        _ => MatchResult::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::trend::TrendKind;
    use crate::testutil::snapshot;

    #[test]
    fn identical_snapshots_emit_nothing() {
        let a = snapshot(MatchStatus::InPlay, Some(1), Some(1));
        let trend = ScoreTrend::classify(1, 1);
        let (changes, next) = diff(&a, &a.clone(), trend);
        assert!(changes.is_empty());
        assert_eq!(next, trend);
    }

    #[test]
    fn first_published_score_is_not_a_goal() {
        let before = snapshot(MatchStatus::Scheduled, None, None);
        let after = snapshot(MatchStatus::InPlay, Some(1), Some(0));
        let (changes, trend) = diff(&before, &after, ScoreTrend::seeded());
        assert!(changes.match_started);
        assert!(!changes.team_scored);
        assert!(!changes.team_conceded);
        assert_eq!(trend, ScoreTrend::classify(1, 0));
    }

    #[test]
    fn late_first_score_reseeds_trend() {
        // First poll after kickoff already shows 2-0.
        let before = snapshot(MatchStatus::Scheduled, None, None);
        let first = snapshot(MatchStatus::InPlay, Some(2), Some(0));
        let (changes, trend) = diff(&before, &first, ScoreTrend::seeded());
        assert!(!changes.team_scored);
        assert_eq!(trend.kind, TrendKind::ExtendingLead);

        let conceded = snapshot(MatchStatus::InPlay, Some(2), Some(1));
        let (changes, trend) = diff(&first, &conceded, trend);
        assert!(changes.team_conceded);
        assert_eq!(trend.kind, TrendKind::LosingLead);
    }

    #[test]
    fn status_transitions() {
        let cases = [
            (MatchStatus::Scheduled, MatchStatus::InPlay),
            (MatchStatus::InPlay, MatchStatus::Paused),
            (MatchStatus::Paused, MatchStatus::InPlay),
        ];
        for (from, to) in cases {
            let (changes, _) = diff(
                &snapshot(from.clone(), Some(0), Some(0)),
                &snapshot(to.clone(), Some(0), Some(0)),
                ScoreTrend::seeded(),
            );
            assert_eq!(changes.events().len(), 1, "{from} -> {to}");
        }
        let (changes, _) = diff(
            &snapshot(MatchStatus::InPlay, Some(0), Some(0)),
            &snapshot(MatchStatus::Paused, Some(0), Some(0)),
            ScoreTrend::seeded(),
        );
        assert!(changes.half_time);
    }

    #[test]
    fn goal_advances_trend() {
        let before = snapshot(MatchStatus::InPlay, Some(1), Some(0));
        let after = snapshot(MatchStatus::InPlay, Some(2), Some(0));
        let (changes, trend) = diff(&before, &after, ScoreTrend::classify(1, 0));
        assert!(changes.team_scored);
        assert!(!changes.team_conceded);
        assert_eq!(trend.kind, TrendKind::ExtendingLead);
    }

    #[test]
    fn away_followed_side_is_the_team() {
        let mut before = snapshot(MatchStatus::InPlay, Some(0), Some(0));
        before.followed = FollowedSide::Away;
        let mut after = snapshot(MatchStatus::InPlay, Some(1), Some(0));
        after.followed = FollowedSide::Away;

        let (changes, trend) = diff(&before, &after, ScoreTrend::seeded());
        assert!(changes.team_conceded);
        assert!(!changes.team_scored);
        assert_eq!(trend.kind, TrendKind::DeficitOfOne);
    }

    #[test]
    fn score_decrease_is_single_var_event_and_keeps_trend() {
        let trend = ScoreTrend::classify(2, 1);
        let before = snapshot(MatchStatus::InPlay, Some(2), Some(1));

        let (changes, next) = diff(&before, &snapshot(MatchStatus::InPlay, Some(1), Some(1)), trend);
        assert_eq!(changes.events().len(), 1);
        assert!(changes.var_goal_disallowed);
        assert_eq!(next, trend);

        let (changes, next) = diff(&before, &snapshot(MatchStatus::InPlay, Some(2), Some(0)), trend);
        assert_eq!(changes.events().len(), 1);
        assert!(changes.var_goal_awarded);
        assert_eq!(next, trend);
    }

    #[test]
    fn both_sides_scoring_fires_both_and_advances_twice() {
        let before = snapshot(MatchStatus::InPlay, Some(1), Some(0));
        let after = snapshot(MatchStatus::InPlay, Some(2), Some(1));
        let (changes, trend) = diff(&before, &after, ScoreTrend::classify(1, 0));
        assert!(changes.team_scored);
        assert!(changes.team_conceded);
        // 1-0 -> 2-0 (extending) -> 2-1 (losing)
        assert_eq!(trend.kind, TrendKind::LosingLead);
        assert_eq!((trend.team_score, trend.opposition_score), (2, 1));
    }

    #[test]
    fn full_time_carries_result() {
        let before = snapshot(MatchStatus::InPlay, Some(0), Some(2));
        let after = snapshot(MatchStatus::Finished, Some(0), Some(2));
        let (changes, _) = diff(&before, &after, ScoreTrend::classify(0, 2));
        assert!(changes.full_time);
        assert_eq!(changes.match_result, MatchResult::Lost);
    }

    #[test]
    fn no_followed_side_only_reports_status() {
        let mut before = snapshot(MatchStatus::InPlay, Some(0), Some(0));
        before.followed = FollowedSide::None;
        let mut after = snapshot(MatchStatus::Finished, Some(1), Some(0));
        after.followed = FollowedSide::None;

        let (changes, _) = diff(&before, &after, ScoreTrend::seeded());
        assert!(changes.full_time);
        assert!(!changes.team_scored);
        assert_eq!(changes.match_result, MatchResult::None);
    }
}
