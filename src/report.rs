use std::fmt::Write;

use crate::models::{MovieInfo, PredictionRecord, Provenance, Round, WarningVerdict};

/// Renders one round's observed history, forecast, and per-step decline
/// warnings as a markdown report.
pub fn build_report(
    label: &str,
    info: &MovieInfo,
    round: &Round,
    predictions: &[PredictionRecord],
    warnings: Option<&[WarningVerdict]>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Box-office Forecast Report");
    let _ = writeln!(
        output,
        "Generated for {} (round {}, released {})",
        label, round.index, info.release_date
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Observed Weeks");

    if round.weeks.is_empty() {
        let _ = writeln!(output, "No weekly records in this round.");
    } else {
        for week in &round.weeks {
            let active = match week.active_week_index {
                Some(idx) => format!("active week {idx}"),
                None => "no revenue".to_string(),
            };
            let _ = writeln!(
                output,
                "- week {}: {:.0} across {} screens ({})",
                week.real_week_index, week.boxoffice, week.screens, active
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Forecast");

    if predictions.is_empty() {
        let _ = writeln!(output, "No forecast steps produced.");
    } else {
        for prediction in predictions {
            let basis = match prediction.provenance {
                Provenance::Real => "from observed weeks",
                Provenance::Predicted => "built on earlier forecasts",
            };
            let _ = writeln!(
                output,
                "- week {}: {:.0} predicted ({:+.1}% vs previous week, {})",
                prediction.target_week,
                prediction.predicted_boxoffice,
                prediction.decline_rate * 100.0,
                basis
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Decline Warnings");

    match warnings {
        None => {
            let _ = writeln!(output, "No tier statistics supplied; warnings skipped.");
        }
        Some([]) => {
            let _ = writeln!(output, "No forecast steps to grade.");
        }
        Some(verdicts) => {
            for verdict in verdicts {
                let _ = writeln!(
                    output,
                    "- [{}] {} ({})",
                    verdict.level, verdict.message, verdict.tier
                );
            }
        }
    }

    output
}
