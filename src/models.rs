use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Terminal status given to events that dropped out of the upstream feed.
pub const REMOVED_STATUS: &str = "REMOVED";

/// Side of a competitor in a fixture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CompetitorSide {
    Home,
    Away,
}

/// A resolved competitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitor {
    #[serde(rename = "type")]
    pub side: CompetitorSide,
    pub name: String,
}

impl Competitor {
    pub fn home(name: impl Into<String>) -> Self {
        Self {
            side: CompetitorSide::Home,
            name: name.into(),
        }
    }

    pub fn away(name: impl Into<String>) -> Self {
        Self {
            side: CompetitorSide::Away,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Competitors {
    #[serde(rename = "HOME")]
    pub home: Competitor,
    #[serde(rename = "AWAY")]
    pub away: Competitor,
}

/// Score for a single period. Scores stay strings; upstream never promises numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    #[serde(rename = "type")]
    pub period: String,
    pub home: String,
    pub away: String,
}

/// Period label -> score
pub type ScoreMap = BTreeMap<String, ScoreEntry>;

/// A fully resolved sporting event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SportEvent {
    pub id: String,
    pub status: String,
    pub scores: ScoreMap,
    /// ISO-8601, millisecond precision, UTC
    pub start_time: String,
    pub sport: String,
    pub competitors: Competitors,
    pub competition: String,
}

impl SportEvent {
    /// "<home> vs <away>", used in change diagnostics
    pub fn display_name(&self) -> String {
        format!(
            "{} vs {}",
            self.competitors.home.name, self.competitors.away.name
        )
    }

    pub fn is_removed(&self) -> bool {
        self.status == REMOVED_STATUS
    }

    /// Copy of this event with its status forced to `REMOVED`
    pub fn tombstoned(&self) -> Self {
        Self {
            status: REMOVED_STATUS.to_string(),
            ..self.clone()
        }
    }
}

/// One undecoded line of the state payload. Every field is still an opaque id.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEventRecord {
    pub id: String,
    pub sport_id: String,
    pub competition_id: String,
    pub start_time: String,
    pub home_competitor_id: String,
    pub away_competitor_id: String,
    pub status_id: String,
    /// Raw score sub-string, empty when the line has no 8th field
    pub scores: String,
}

impl RawEventRecord {
    /// The five ids that must resolve before an event can be built
    pub fn required_ids(&self) -> [&str; 5] {
        [
            &self.sport_id,
            &self.competition_id,
            &self.home_competitor_id,
            &self.away_competitor_id,
            &self.status_id,
        ]
    }
}
