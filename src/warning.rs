use crate::models::{PredictionRecord, WarningLevel, WarningVerdict};
use crate::stats::TierTable;

/// Decline faster than the cohort average by at least this relative
/// margin warrants attention; past [`CRITICAL_RATIO`] it is critical.
const ATTENTION_RATIO: f64 = 0.30;
const CRITICAL_RATIO: f64 = 0.50;

/// Compares a predicted decline rate against its tier's historical
/// average for the same active week and grades the difference.
///
/// Rates are negative when revenue shrinks, so a forecast below the
/// average means the movie is declining faster than its cohort did.
/// With no cohort data the verdict is `Unknown`, which is a valid
/// "cannot compare" outcome rather than an error.
pub fn classify_warning(
    table: &TierTable,
    opening_strength: f64,
    active_week: u32,
    predicted_decline_rate: f64,
) -> WarningVerdict {
    let tier = table.tier_for(opening_strength);

    let Some(average) = table.average_decline_rate(tier, active_week) else {
        return WarningVerdict {
            level: WarningLevel::Unknown,
            message: format!(
                "no historical data for {tier} at active week {active_week}; predicted decline {:.1}% cannot be compared",
                predicted_decline_rate * 100.0
            ),
            tier,
            predicted_decline_rate,
            historical_average_decline_rate: None,
        };
    };

    let speed_ratio = if average.abs() < f64::EPSILON {
        0.0
    } else {
        (predicted_decline_rate - average) / average.abs()
    };

    let faster_than_average = predicted_decline_rate < average;
    let acceleration = speed_ratio.abs();

    let (level, message) = if faster_than_average && acceleration >= CRITICAL_RATIO {
        (
            WarningLevel::Critical,
            format!(
                "predicted decline {:.1}% is {:.0}% faster than the historical average {:.1}%",
                predicted_decline_rate * 100.0,
                acceleration * 100.0,
                average * 100.0
            ),
        )
    } else if faster_than_average && acceleration >= ATTENTION_RATIO {
        (
            WarningLevel::Attention,
            format!(
                "predicted decline {:.1}% is {:.0}% faster than the historical average {:.1}%",
                predicted_decline_rate * 100.0,
                acceleration * 100.0,
                average * 100.0
            ),
        )
    } else {
        (
            WarningLevel::Normal,
            format!(
                "predicted decline {:.1}% is in line with the historical average {:.1}%",
                predicted_decline_rate * 100.0,
                average * 100.0
            ),
        )
    };

    WarningVerdict {
        level,
        message,
        tier,
        predicted_decline_rate,
        historical_average_decline_rate: Some(average),
    }
}

/// Grades every step of a multi-week forecast against the same tier.
pub fn classify_forecast(
    table: &TierTable,
    opening_strength: f64,
    predictions: &[PredictionRecord],
) -> Vec<WarningVerdict> {
    predictions
        .iter()
        .map(|p| classify_warning(table, opening_strength, p.target_week, p.decline_rate))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CorpusRecord, Provenance, Tier};

    /// One-movie corpus: every record lands in tier 4 with a -40% average
    /// decline at active week 3 and a 0% average at week 4.
    fn table() -> TierTable {
        TierTable::from_corpus(&[
            CorpusRecord {
                opening_strength: 100.0,
                active_week: 3,
                decline_rate: -0.4,
            },
            CorpusRecord {
                opening_strength: 100.0,
                active_week: 4,
                decline_rate: 0.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn double_speed_decline_is_critical() {
        let verdict = classify_warning(&table(), 100.0, 3, -0.8);
        assert_eq!(verdict.level, WarningLevel::Critical);
        assert_eq!(verdict.tier, Tier::Tier4);
        assert_eq!(verdict.historical_average_decline_rate, Some(-0.4));
        assert!(verdict.message.contains("-80.0%"));
        assert!(verdict.message.contains("-40.0%"));
    }

    #[test]
    fn near_average_decline_is_normal() {
        let verdict = classify_warning(&table(), 100.0, 3, -0.42);
        assert_eq!(verdict.level, WarningLevel::Normal);
    }

    #[test]
    fn moderately_faster_decline_is_attention() {
        // 40% faster than the -0.4 average.
        let verdict = classify_warning(&table(), 100.0, 3, -0.56);
        assert_eq!(verdict.level, WarningLevel::Attention);
    }

    #[test]
    fn slower_than_average_decline_is_normal() {
        // Much slower decline than the cohort: no warning either way.
        let verdict = classify_warning(&table(), 100.0, 3, -0.05);
        assert_eq!(verdict.level, WarningLevel::Normal);
    }

    #[test]
    fn zero_average_yields_zero_speed_ratio() {
        let verdict = classify_warning(&table(), 100.0, 4, -0.9);
        assert_eq!(verdict.level, WarningLevel::Normal);
        assert_eq!(verdict.historical_average_decline_rate, Some(0.0));
    }

    #[test]
    fn missing_cohort_data_is_unknown_not_normal() {
        let verdict = classify_warning(&table(), 100.0, 9, -0.8);
        assert_eq!(verdict.level, WarningLevel::Unknown);
        assert_eq!(verdict.historical_average_decline_rate, None);
    }

    #[test]
    fn forecast_steps_are_graded_individually() {
        let step = |target_week, decline_rate| PredictionRecord {
            target_week,
            predicted_boxoffice: 0.0,
            predicted_audience: 0,
            predicted_screens: 20,
            decline_rate,
            provenance: Provenance::Predicted,
        };

        let verdicts = classify_forecast(&table(), 100.0, &[step(3, -0.8), step(4, -0.1)]);
        assert_eq!(verdicts.len(), 2);
        assert_eq!(verdicts[0].level, WarningLevel::Critical);
        assert_eq!(verdicts[1].level, WarningLevel::Normal);
    }
}
