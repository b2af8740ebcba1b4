//! Raw record -> SportEvent
//!
//! Pure function of one record and one mapping table. Resolution is
//! all-or-nothing: any unresolved required id or an unusable start time
//! rejects the whole record.
//!
//! Score segments never reject a record. A segment missing a separator, or
//! whose period id does not resolve, is dropped on its own; surplus
//! separators are ignored past the first two parts on each split, so
//! `p1@1:2:3` reads as `1:2` and `cur@1:0@zz` as `1:0`.

use chrono::{DateTime, SecondsFormat};
use thiserror::Error;

use crate::feed::wire::{HOME_AWAY_SEPARATOR, PERIOD_SEPARATOR, SCORE_SEGMENT_SEPARATOR};
use crate::mapping::MappingTable;
use crate::models::{Competitor, Competitors, RawEventRecord, ScoreEntry, ScoreMap, SportEvent};

/// Why a record did not produce an event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("unresolved mapping: {}", missing.join(", "))]
    UnresolvedMapping { missing: Vec<String> },

    #[error("invalid start time `{raw}`")]
    InvalidTimestamp { raw: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconstruction {
    Resolved(SportEvent),
    Rejected(Rejection),
}

pub fn reconstruct(record: &RawEventRecord, table: &MappingTable) -> Reconstruction {
    match try_reconstruct(record, table) {
        Ok(event) => Reconstruction::Resolved(event),
        Err(reason) => Reconstruction::Rejected(reason),
    }
}

fn try_reconstruct(record: &RawEventRecord, table: &MappingTable) -> Result<SportEvent, Rejection> {
    let (sport, competition, home, away, status) = match (
        table.resolve(&record.sport_id),
        table.resolve(&record.competition_id),
        table.resolve(&record.home_competitor_id),
        table.resolve(&record.away_competitor_id),
        table.resolve(&record.status_id),
    ) {
        (Some(s), Some(c), Some(h), Some(a), Some(st)) => (s, c, h, a, st),
        _ => {
            return Err(Rejection::UnresolvedMapping {
                missing: table.validate_required(&record.required_ids()).missing,
            })
        }
    };

    let start_time = parse_start_time(&record.start_time)?;
    let scores = parse_scores(&record.scores, table);

    Ok(SportEvent {
        id: record.id.clone(),
        status: status.to_string(),
        scores,
        start_time,
        sport: sport.to_string(),
        competitors: Competitors {
            home: Competitor::home(home),
            away: Competitor::away(away),
        },
        competition: competition.to_string(),
    })
}

/// Epoch milliseconds -> `2023-11-14T22:13:20.000Z`
pub fn parse_start_time(raw: &str) -> Result<String, Rejection> {
    let invalid = || Rejection::InvalidTimestamp {
        raw: raw.to_string(),
    };

    let millis: i64 = raw.trim().parse().map_err(|_| invalid())?;
    let timestamp = DateTime::from_timestamp_millis(millis).ok_or_else(invalid)?;

    Ok(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Decode `periodId@home:away|...` into a score map keyed by period label.
/// A later segment for the same period overwrites an earlier one.
pub fn parse_scores(raw: &str, table: &MappingTable) -> ScoreMap {
    let mut scores = ScoreMap::new();
    if raw.trim().is_empty() {
        return scores;
    }

    for segment in raw.split(SCORE_SEGMENT_SEPARATOR) {
        let mut parts = segment.split(PERIOD_SEPARATOR);
        let (Some(period_id), Some(pair)) = (parts.next(), parts.next()) else {
            continue;
        };
        if period_id.is_empty() || pair.is_empty() {
            continue;
        }

        let Some(period) = table.resolve(period_id) else {
            continue;
        };

        let mut sides = pair.split(HOME_AWAY_SEPARATOR);
        let (Some(home), Some(away)) = (sides.next(), sides.next()) else {
            continue;
        };

        scores.insert(
            period.to_string(),
            ScoreEntry {
                period: period.to_string(),
                home: home.to_string(),
                away: away.to_string(),
            },
        );
    }

    scores
}
