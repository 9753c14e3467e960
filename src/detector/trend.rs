use std::cmp::Ordering;

use serde::Serialize;

/// How the followed team's scoreline is evolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendKind {
    Drawing,
    LeadByOne,
    ExtendingLead,
    LosingLead,
    DeficitOfOne,
    ExtendingDeficit,
    LosingDeficit,
}

impl TrendKind {
    fn is_multi_goal_lead(self) -> bool {
        matches!(self, TrendKind::ExtendingLead | TrendKind::LosingLead)
    }

    fn is_multi_goal_deficit(self) -> bool {
        matches!(self, TrendKind::ExtendingDeficit | TrendKind::LosingDeficit)
    }
}

impl std::fmt::Display for TrendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TrendKind::Drawing => "drawing",
            TrendKind::LeadByOne => "lead_by_one",
            TrendKind::ExtendingLead => "extending_lead",
            TrendKind::LosingLead => "losing_lead",
            TrendKind::DeficitOfOne => "deficit_of_one",
            TrendKind::ExtendingDeficit => "extending_deficit",
            TrendKind::LosingDeficit => "losing_deficit",
        };
        write!(f, "{s}")
    }
}

/// Trend classification plus the scoreline it was computed from.
///
/// Values are replaced, never mutated: every goal produces a successor via
/// [`advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScoreTrend {
    pub kind: TrendKind,
    pub team_score: u32,
    pub opposition_score: u32,
    /// Differential of the trend this one replaced.
    pub previous_diff: i64,
}

impl ScoreTrend {
    /// 0-0, drawing. Every match starts here.
    pub fn seeded() -> Self {
        Self {
            kind: TrendKind::Drawing,
            team_score: 0,
            opposition_score: 0,
            previous_diff: 0,
        }
    }

    /// Classify a scoreline with no history, as if every goal went one way.
    pub fn classify(team_score: u32, opposition_score: u32) -> Self {
        let diff = i64::from(team_score) - i64::from(opposition_score);
        let kind = match diff {
            0 => TrendKind::Drawing,
            1 => TrendKind::LeadByOne,
            -1 => TrendKind::DeficitOfOne,
            d if d > 1 => TrendKind::ExtendingLead,
            _ => TrendKind::ExtendingDeficit,
        };
        Self {
            kind,
            team_score,
            opposition_score,
            previous_diff: 0,
        }
    }

    pub fn diff(&self) -> i64 {
        i64::from(self.team_score) - i64::from(self.opposition_score)
    }
}

impl Default for ScoreTrend {
    fn default() -> Self {
        Self::seeded()
    }
}

/// Advance the trend after a goal.
///
/// A one-goal margin reached by shrinking a bigger one is still a lead (or
/// deficit) being lost; only margins reached from level or the other side are
/// `LeadByOne` / `DeficitOfOne`. Beyond one goal the direction of the change
/// decides, and no change keeps the current class.
pub fn advance(current: ScoreTrend, team_score: u32, opposition_score: u32) -> ScoreTrend {
    let previous_diff = current.diff();
    let diff = i64::from(team_score) - i64::from(opposition_score);
    let direction = diff - previous_diff;

    let kind = match diff {
        0 => TrendKind::Drawing,
        1 if current.kind.is_multi_goal_lead() => TrendKind::LosingLead,
        1 => TrendKind::LeadByOne,
        -1 if current.kind.is_multi_goal_deficit() => TrendKind::LosingDeficit,
        -1 => TrendKind::DeficitOfOne,
        d if d > 1 => match direction.cmp(&0) {
            Ordering::Greater => TrendKind::ExtendingLead,
            Ordering::Less => TrendKind::LosingLead,
            Ordering::Equal if current.kind.is_multi_goal_lead() => current.kind,
            Ordering::Equal => TrendKind::ExtendingLead,
        },
        _ => match direction.cmp(&0) {
            Ordering::Less => TrendKind::ExtendingDeficit,
            Ordering::Greater => TrendKind::LosingDeficit,
            Ordering::Equal if current.kind.is_multi_goal_deficit() => current.kind,
            Ordering::Equal => TrendKind::ExtendingDeficit,
        },
    };

    ScoreTrend {
        kind,
        team_score,
        opposition_score,
        previous_diff,
    }
}
