use chrono::NaiveDate;

use crate::models::{RawWeek, Round, WeekRecord};

/// A run is considered over once this many consecutive weeks report zero
/// revenue; later weeks belong to a new round (a re-release) or to none.
const ZERO_STREAK_LIMIT: u32 = 3;

/// Drops raw weeks that ended before the official release date. Weeks
/// without a date range are kept; only a range that provably predates the
/// release disqualifies a week.
pub fn discard_pre_release(raw_weeks: &[RawWeek], release_date: NaiveDate) -> Vec<RawWeek> {
    raw_weeks
        .iter()
        .filter(|w| match &w.date_range {
            Some(range) => range.end >= release_date,
            None => true,
        })
        .cloned()
        .collect()
}

/// Splits one movie's ordered weekly records into theatrical rounds.
///
/// A week stays in its round while the running zero-revenue streak is
/// below [`ZERO_STREAK_LIMIT`]; once the streak reaches the limit the run
/// is over and every week of the streak-or-longer interruption is dropped.
/// Each retained round is trimmed so its last stored week has revenue,
/// then indexed: `real_week_index` runs 1..k over all retained weeks,
/// `active_week_index` counts only revenue-positive weeks.
///
/// A movie that never reports revenue yields no rounds; that is "no
/// data", not an error.
pub fn segment_rounds(raw_weeks: &[RawWeek]) -> Vec<Round> {
    let mut ordered: Vec<&RawWeek> = raw_weeks.iter().collect();
    ordered.sort_by_key(|w| w.week);

    let mut segments: Vec<Vec<&RawWeek>> = Vec::new();
    let mut current: Vec<&RawWeek> = Vec::new();
    let mut zero_streak = 0u32;

    for week in ordered {
        if week.boxoffice == 0.0 {
            zero_streak += 1;
        } else {
            zero_streak = 0;
        }

        if zero_streak >= ZERO_STREAK_LIMIT {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
        } else {
            current.push(week);
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    let mut rounds = Vec::new();
    for segment in &mut segments {
        // The round must end on a revenue-positive week; streak-1 and
        // streak-2 zero weeks before a boundary land here as a tail.
        while segment.last().is_some_and(|w| w.boxoffice == 0.0) {
            segment.pop();
        }
        if segment.is_empty() {
            continue;
        }

        let round_index = rounds.len() as u32 + 1;
        let mut weeks = Vec::with_capacity(segment.len());
        let mut active_counter = 0u32;

        for (offset, raw) in segment.iter().enumerate() {
            let active_week_index = if raw.boxoffice > 0.0 {
                active_counter += 1;
                Some(active_counter)
            } else {
                None
            };
            weeks.push(WeekRecord {
                real_week_index: offset as u32 + 1,
                active_week_index,
                boxoffice: raw.boxoffice,
                audience: raw.audience,
                screens: raw.screens,
                date_range: raw.date_range,
                round_index,
            });
        }

        rounds.push(Round {
            index: round_index,
            weeks,
        });
    }

    rounds
}
