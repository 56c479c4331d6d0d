use std::io::Read;
use std::path::Path;

use anyhow::Context;

use crate::models::{CorpusRecord, MovieInfo, RawWeek};
use crate::stats::{TierTable, TierTableDoc};

/// Raw weekly records as exported by the ingestion side: a JSON array of
/// `{week, boxoffice, audience, screens, date_range?}` objects.
pub fn load_raw_weeks(path: &Path) -> anyhow::Result<Vec<RawWeek>> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read weekly records from {}", path.display()))?;
    let weeks: Vec<RawWeek> =
        serde_json::from_str(&payload).context("weekly records are not valid JSON")?;
    Ok(weeks)
}

pub fn load_movie_info(path: &Path) -> anyhow::Result<MovieInfo> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read movie info from {}", path.display()))?;
    let info: MovieInfo =
        serde_json::from_str(&payload).context("movie info is not valid JSON")?;
    Ok(info)
}

/// Historical corpus rows: `opening_strength,active_week,decline_rate`.
pub fn read_corpus_csv(path: &Path) -> anyhow::Result<Vec<CorpusRecord>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open corpus CSV {}", path.display()))?;
    parse_corpus(file)
}

pub fn parse_corpus<R: Read>(reader: R) -> anyhow::Result<Vec<CorpusRecord>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in reader.deserialize::<CorpusRecord>() {
        records.push(row.context("malformed corpus row")?);
    }
    Ok(records)
}

pub fn load_tier_table(path: &Path) -> anyhow::Result<TierTable> {
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read tier table from {}", path.display()))?;
    let doc: TierTableDoc =
        serde_json::from_str(&payload).context("tier table cache is not valid JSON")?;
    Ok(TierTable::from_document(&doc)?)
}

pub fn save_tier_table(path: &Path, table: &TierTable) -> anyhow::Result<()> {
    let payload = serde_json::to_string_pretty(&table.to_document())?;
    std::fs::write(path, payload)
        .with_context(|| format!("failed to write tier table to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_csv_rows_deserialize_by_header() {
        let csv = "opening_strength,active_week,decline_rate\n\
                   120000.5,2,-0.35\n\
                   98000.0,3,-0.5\n";
        let records = parse_corpus(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].active_week, 2);
        assert!((records[1].decline_rate - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn malformed_corpus_rows_are_rejected() {
        let csv = "opening_strength,active_week,decline_rate\nnot_a_number,2,-0.35\n";
        assert!(parse_corpus(csv.as_bytes()).is_err());
    }

    #[test]
    fn raw_weeks_accept_missing_date_ranges() {
        let json = r#"[
            {"week": 1, "boxoffice": 1000000.0, "audience": 4000, "screens": 100,
             "date_range": {"start": "2025-06-06", "end": "2025-06-12"}},
            {"week": 2, "boxoffice": 600000.0, "audience": 2400, "screens": 90}
        ]"#;
        let weeks: Vec<RawWeek> = serde_json::from_str(json).unwrap();
        assert_eq!(weeks.len(), 2);
        assert!(weeks[0].date_range.is_some());
        assert!(weeks[1].date_range.is_none());
    }
}
