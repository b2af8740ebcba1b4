//! Wire format for the odds feed
//!
//! Mapping payload:  `id:label;id:label;...` (each pair split on the first `:`)
//! State payload:    one record per line,
//!                   `id,sportId,competitionId,startTimeMs,homeId,awayId,statusId[,scores]`
//! Score sub-string: `periodId@home:away|periodId@home:away|...`
//!
//! Decoding is tolerant per pair / per line: a malformed entry is dropped and
//! the rest of the payload is still decoded. Nothing here returns an error.

use std::collections::BTreeMap;

use crate::models::RawEventRecord;

pub const PAIR_SEPARATOR: char = ';';
pub const ID_LABEL_SEPARATOR: char = ':';
pub const RECORD_SEPARATOR: char = '\n';
pub const FIELD_SEPARATOR: char = ',';
pub const SCORE_SEGMENT_SEPARATOR: char = '|';
pub const PERIOD_SEPARATOR: char = '@';
pub const HOME_AWAY_SEPARATOR: char = ':';

/// Number of mandatory comma separated fields in a state record
pub const REQUIRED_FIELDS: usize = 7;

/// Decode a mapping payload into id -> label. Later duplicates win.
pub fn parse_mappings(payload: &str) -> BTreeMap<String, String> {
    let mut mappings = BTreeMap::new();

    for pair in payload.split(PAIR_SEPARATOR) {
        let Some((id, label)) = pair.split_once(ID_LABEL_SEPARATOR) else {
            continue;
        };
        if id.is_empty() || label.is_empty() {
            continue;
        }
        mappings.insert(id.to_string(), label.to_string());
    }

    mappings
}

/// Inverse of [`parse_mappings`] for well-formed tables
pub fn encode_mappings<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a String, &'a String)>,
{
    let mut encoded = String::new();
    for (i, (id, label)) in pairs.into_iter().enumerate() {
        if i > 0 {
            encoded.push(PAIR_SEPARATOR);
        }
        encoded.push_str(id);
        encoded.push(ID_LABEL_SEPARATOR);
        encoded.push_str(label);
    }
    encoded
}

/// Decode a state payload into raw records. Blank lines and lines with fewer
/// than seven fields are skipped.
pub fn parse_state(payload: &str) -> Vec<RawEventRecord> {
    payload
        .split(RECORD_SEPARATOR)
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_record)
        .collect()
}

/// Decode a single state line
pub fn parse_record(line: &str) -> Option<RawEventRecord> {
    let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if fields.len() < REQUIRED_FIELDS {
        return None;
    }

    Some(RawEventRecord {
        id: fields[0].to_string(),
        sport_id: fields[1].to_string(),
        competition_id: fields[2].to_string(),
        start_time: fields[3].to_string(),
        home_competitor_id: fields[4].to_string(),
        away_competitor_id: fields[5].to_string(),
        status_id: fields[6].to_string(),
        scores: fields.get(7).map(|s| s.to_string()).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mappings_basic() {
        let table = parse_mappings("A:FOOTBALL;B:PRE;C:Real Madrid");
        assert_eq!(table.len(), 3);
        assert_eq!(table["A"], "FOOTBALL");
        assert_eq!(table["C"], "Real Madrid");
    }

    #[test]
    fn test_parse_mappings_skips_malformed_pairs() {
        let table = parse_mappings("A:FOOTBALL;novalue;:nolabel;B:;;C:LIVE");
        assert_eq!(table.len(), 2);
        assert_eq!(table["A"], "FOOTBALL");
        assert_eq!(table["C"], "LIVE");
    }

    #[test]
    fn test_parse_mappings_splits_on_first_colon() {
        let table = parse_mappings("p1:Period: 1st half");
        assert_eq!(table["p1"], "Period: 1st half");
    }

    #[test]
    fn test_parse_mappings_empty_input() {
        assert!(parse_mappings("").is_empty());
        assert!(parse_mappings(";;;").is_empty());
    }

    #[test]
    fn test_mapping_decode_is_stable_under_reencode() {
        let payloads = [
            "A:FOOTBALL;B:PRE",
            "x:y",
            "id-1:label with spaces;id-2:a:b:c;id-3:LIVE",
            "dup:first;dup:second",
        ];

        for payload in payloads {
            let first = parse_mappings(payload);
            let encoded = encode_mappings(&first);
            let second = parse_mappings(&encoded);
            assert_eq!(first, second, "payload {payload:?}");
        }
    }

    #[test]
    fn test_parse_state_records() {
        let payload = "e1,s,c,1700000000000,h,a,st,p@1:0\n\n   \ne2,s,c,1700000000000,h,a,st\n";
        let records = parse_state(payload);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "e1");
        assert_eq!(records[0].scores, "p@1:0");
        assert_eq!(records[1].id, "e2");
        assert_eq!(records[1].status_id, "st");
        assert_eq!(records[1].scores, "");
    }

    #[test]
    fn test_parse_state_drops_short_lines_only() {
        let payload = "broken,line\ne1,s,c,1700000000000,h,a,st,\ne2,s,c";
        let records = parse_state(payload);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "e1");
        assert_eq!(records[0].scores, "");
    }

    #[test]
    fn test_parse_state_empty_input() {
        assert!(parse_state("").is_empty());
        assert!(parse_state("\n\n").is_empty());
    }
}
