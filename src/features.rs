use std::f64::consts::PI;

use crate::error::ForecastError;
use crate::models::{FeatureVector, MovieInfo, PredictionRecord, Round};

/// Week length assumed when the first active week carries no date range.
const DEFAULT_OPENING_DAYS: i64 = 7;

/// One point of the combined real + predicted history the lag features
/// are read from.
#[derive(Debug, Clone, Copy)]
struct HistoryEntry {
    active_idx: u32,
    real_idx: u32,
    boxoffice: f64,
    audience: f64,
    screens: f64,
}

/// Cyclic month encoding; keeps December and January adjacent instead of
/// twelve units apart.
pub fn encode_month_cyclical(month: u32) -> (f64, f64) {
    let angle = 2.0 * PI * month as f64 / 12.0;
    (angle.sin(), angle.cos())
}

/// Builds the feature vector for `target_week` (an active-week index) of
/// one round.
///
/// `pseudo_history` holds earlier forecast steps to be treated as trailing
/// weeks during recursive multi-step prediction; real data always takes
/// precedence because predicted entries only extend past the last real
/// active week. A predicted entry has no calendar anchor, so its real
/// week index is assumed contiguous with the entry before it.
pub fn build_features(
    round: &Round,
    info: &MovieInfo,
    target_week: u32,
    pseudo_history: &[PredictionRecord],
) -> Result<FeatureVector, ForecastError> {
    validate_recent_real_weeks(round)?;

    let combined = combined_history(round, pseudo_history);
    let prior: Vec<&HistoryEntry> = combined
        .iter()
        .filter(|e| e.active_idx < target_week)
        .collect();

    if prior.len() < 2 {
        return Err(ForecastError::InsufficientHistory {
            target_week,
            available: prior.len(),
        });
    }

    let lag_1 = prior[prior.len() - 1];
    let lag_2 = prior[prior.len() - 2];

    let gap_real_week_2to1 = lag_1.real_idx.saturating_sub(lag_2.real_idx).saturating_sub(1);
    // When the target week is itself a known entry its own calendar index
    // anchors the gap; a future target is assumed contiguous.
    let implied_target_real = combined
        .iter()
        .find(|e| e.active_idx == target_week)
        .map(|e| e.real_idx)
        .unwrap_or_else(|| lag_1.real_idx + (target_week - lag_1.active_idx));
    let gap_real_week_1tocurrent = implied_target_real
        .saturating_sub(lag_1.real_idx)
        .saturating_sub(1);

    let opening = opening_strength_features(round, info);
    let (release_month_sin, release_month_cos) =
        encode_month_cyclical(chrono::Datelike::month(&info.release_date));

    Ok(FeatureVector {
        round_index: round.index,
        current_week_active_idx: target_week,
        gap_real_week_2to1,
        gap_real_week_1tocurrent,
        boxoffice_week_1: lag_1.boxoffice,
        boxoffice_week_2: lag_2.boxoffice,
        audience_week_1: lag_1.audience,
        audience_week_2: lag_2.audience,
        screens_week_1: lag_1.screens,
        screens_week_2: lag_2.screens,
        open_week1_days: opening.days as f64,
        open_week1_boxoffice: opening.week1_boxoffice,
        open_week1_boxoffice_daily_avg: opening.week1_boxoffice / opening.days as f64,
        open_week2_boxoffice: opening.week2_boxoffice,
        release_year: chrono::Datelike::year(&info.release_date),
        release_month_sin,
        release_month_cos,
        film_length_minutes: info.film_length_minutes,
        is_restricted: info.is_restricted,
        open_week1_days_defaulted: opening.days_defaulted,
    })
}

/// Opening strength for tier lookup without building a full feature
/// vector: average of first-week daily revenue and second-week revenue.
pub fn opening_strength(round: &Round, info: &MovieInfo) -> f64 {
    let opening = opening_strength_features(round, info);
    (opening.week1_boxoffice / opening.days as f64 + opening.week2_boxoffice) / 2.0
}

fn validate_recent_real_weeks(round: &Round) -> Result<(), ForecastError> {
    let weeks = &round.weeks;
    if weeks.len() >= 2 {
        let last = &weeks[weeks.len() - 1];
        let prev = &weeks[weeks.len() - 2];
        if last.boxoffice <= 0.0 && prev.boxoffice <= 0.0 {
            return Err(ForecastError::InvalidInput {
                field: "boxoffice",
                reason: format!(
                    "the two most recent real weeks (real indices {} and {}) both have non-positive revenue",
                    prev.real_week_index, last.real_week_index
                ),
            });
        }
    }
    Ok(())
}

fn combined_history(round: &Round, pseudo_history: &[PredictionRecord]) -> Vec<HistoryEntry> {
    let mut entries: Vec<HistoryEntry> = round
        .active_weeks()
        .filter_map(|w| {
            w.active_week_index.map(|active_idx| HistoryEntry {
                active_idx,
                real_idx: w.real_week_index,
                boxoffice: w.boxoffice,
                audience: w.audience as f64,
                screens: w.screens as f64,
            })
        })
        .collect();

    for prediction in pseudo_history {
        let real_idx = entries.last().map(|e| e.real_idx + 1).unwrap_or(1);
        entries.push(HistoryEntry {
            active_idx: prediction.target_week,
            real_idx,
            boxoffice: prediction.predicted_boxoffice,
            audience: prediction.predicted_audience as f64,
            screens: prediction.predicted_screens as f64,
        });
    }

    entries
}

struct OpeningStrength {
    days: i64,
    days_defaulted: bool,
    week1_boxoffice: f64,
    week2_boxoffice: f64,
}

/// Constant across every target week of a round: the opening-week metrics
/// only ever depend on the first two active weeks.
fn opening_strength_features(round: &Round, info: &MovieInfo) -> OpeningStrength {
    let mut actives = round.active_weeks();
    let first = actives.next();
    let second = actives.next();

    let week1_boxoffice = first.map(|w| w.boxoffice).unwrap_or(0.0);
    let week2_boxoffice = second.map(|w| w.boxoffice).unwrap_or(0.0);

    let (days, days_defaulted) = match first.and_then(|w| w.date_range) {
        Some(range) => {
            let days = (range.end - info.release_date).num_days() + 1;
            (days.clamp(1, DEFAULT_OPENING_DAYS), false)
        }
        None => (DEFAULT_OPENING_DAYS, true),
    };

    OpeningStrength {
        days,
        days_defaulted,
        week1_boxoffice,
        week2_boxoffice,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateRange, Provenance, RawWeek};
    use crate::segment::segment_rounds;
    use chrono::NaiveDate;

    fn info() -> MovieInfo {
        MovieInfo {
            release_date: NaiveDate::from_ymd_opt(2025, 6, 6).unwrap(),
            film_length_minutes: 118,
            is_restricted: false,
            region: None,
            rating: None,
        }
    }

    fn series(values: &[f64]) -> Vec<RawWeek> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RawWeek {
                week: i as u32 + 1,
                boxoffice: v,
                audience: (v / 300.0) as u64,
                screens: 100,
                date_range: None,
            })
            .collect()
    }

    fn prediction(target_week: u32, boxoffice: f64) -> PredictionRecord {
        PredictionRecord {
            target_week,
            predicted_boxoffice: boxoffice,
            predicted_audience: (boxoffice / 300.0) as u64,
            predicted_screens: 90,
            decline_rate: 0.0,
            provenance: Provenance::Predicted,
        }
    }

    #[test]
    fn gap_features_count_skipped_calendar_weeks() {
        // Real indices {1,2,4,5}; index 3 is a zero week inside the round.
        let rounds = segment_rounds(&series(&[1000.0, 800.0, 0.0, 500.0, 400.0]));
        assert_eq!(rounds.len(), 1);
        let round = &rounds[0];
        assert_eq!(round.active_len(), 4);

        // lag-1 = real week 5, lag-2 = real week 4: adjacent.
        let fv = build_features(round, &info(), 5, &[]).unwrap();
        assert_eq!(fv.gap_real_week_2to1, 0);
        assert_eq!(fv.gap_real_week_1tocurrent, 0);

        // lag-1 = real week 4, lag-2 = real week 2: one skipped week.
        let fv = build_features(round, &info(), 4, &[]).unwrap();
        assert_eq!(fv.gap_real_week_2to1, 1);
        // Target active week 4 is real week 5, one past lag-1's real week 4.
        assert_eq!(fv.gap_real_week_1tocurrent, 0);
    }

    #[test]
    fn lag_features_prefer_real_data_then_fall_back_to_predictions() {
        let rounds = segment_rounds(&series(&[1_000_000.0, 600_000.0]));
        let round = &rounds[0];

        let fv = build_features(round, &info(), 3, &[]).unwrap();
        assert_eq!(fv.boxoffice_week_1, 600_000.0);
        assert_eq!(fv.boxoffice_week_2, 1_000_000.0);

        let pseudo = vec![prediction(3, 420_000.0)];
        let fv = build_features(round, &info(), 4, &pseudo).unwrap();
        assert_eq!(fv.boxoffice_week_1, 420_000.0);
        assert_eq!(fv.boxoffice_week_2, 600_000.0);
        // The predicted lag-1 is assumed calendar-contiguous.
        assert_eq!(fv.gap_real_week_1tocurrent, 0);
        assert_eq!(fv.gap_real_week_2to1, 0);
    }

    #[test]
    fn fewer_than_two_prior_weeks_is_insufficient_history() {
        let rounds = segment_rounds(&series(&[750_000.0]));
        let err = build_features(&rounds[0], &info(), 2, &[]).unwrap_err();
        match err {
            ForecastError::InsufficientHistory {
                target_week,
                available,
            } => {
                assert_eq!(target_week, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientHistory, got {other:?}"),
        }
    }

    #[test]
    fn two_trailing_non_positive_real_weeks_are_invalid_input() {
        // Hand-built round that violates the segmenter's trim invariant.
        let mut rounds = segment_rounds(&series(&[900.0, 700.0, 500.0]));
        let mut round = rounds.remove(0);
        round.weeks[1].boxoffice = 0.0;
        round.weeks[2].boxoffice = 0.0;

        let err = build_features(&round, &info(), 4, &[]).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InvalidInput { field: "boxoffice", .. }
        ));
    }

    #[test]
    fn opening_days_come_from_the_release_date_and_first_week_range() {
        let mut raw = series(&[700_000.0, 420_000.0]);
        // Release on a Friday, week range ends the following Thursday.
        raw[0].date_range = Some(DateRange {
            start: NaiveDate::from_ymd_opt(2025, 6, 6).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 6, 8).unwrap(),
        });
        let rounds = segment_rounds(&raw);

        let fv = build_features(&rounds[0], &info(), 3, &[]).unwrap();
        assert_eq!(fv.open_week1_days, 3.0);
        assert!(!fv.open_week1_days_defaulted);
        assert_eq!(fv.open_week1_boxoffice, 700_000.0);
        assert!((fv.open_week1_boxoffice_daily_avg - 700_000.0 / 3.0).abs() < 1e-9);
        assert_eq!(fv.open_week2_boxoffice, 420_000.0);
    }

    #[test]
    fn missing_date_range_defaults_to_seven_days_and_is_flagged() {
        let rounds = segment_rounds(&series(&[700_000.0, 420_000.0]));
        let fv = build_features(&rounds[0], &info(), 3, &[]).unwrap();

        assert_eq!(fv.open_week1_days, 7.0);
        assert!(fv.open_week1_days_defaulted);
        assert!((fv.open_week1_boxoffice_daily_avg - 100_000.0).abs() < 1e-9);
    }

    #[test]
    fn month_encoding_keeps_december_next_to_january() {
        let (dec_sin, dec_cos) = encode_month_cyclical(12);
        let (jan_sin, jan_cos) = encode_month_cyclical(1);
        let (jun_sin, jun_cos) = encode_month_cyclical(6);

        let dec_jan = ((dec_sin - jan_sin).powi(2) + (dec_cos - jan_cos).powi(2)).sqrt();
        let dec_jun = ((dec_sin - jun_sin).powi(2) + (dec_cos - jun_cos).powi(2)).sqrt();
        assert!(dec_jan < dec_jun);
        assert!((dec_sin.powi(2) + dec_cos.powi(2) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn opening_strength_averages_daily_week1_and_week2_revenue() {
        let rounds = segment_rounds(&series(&[700_000.0, 420_000.0, 260_000.0]));
        let fv = build_features(&rounds[0], &info(), 4, &[]).unwrap();
        // Daily average 100_000 over the default 7 days, week 2 at 420_000.
        assert!((fv.opening_strength() - 260_000.0).abs() < 1e-9);
    }
}
