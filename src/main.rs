use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};

mod error;
mod features;
mod forecast;
mod input;
mod models;
mod report;
mod segment;
mod stats;
mod warning;

use error::ForecastError;
use forecast::{BaselineScorer, FixedRatioPolicy};
use models::{MovieInfo, PredictionRecord, Round};
use stats::TierTable;

#[derive(Parser)]
#[command(name = "boxoffice-early-warning")]
#[command(about = "Weekly box-office forecaster and decline early warning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute tier statistics from a historical corpus CSV
    BuildStats {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "tier_table.json")]
        out: PathBuf,
    },
    /// Forecast upcoming weeks for one movie
    Forecast {
        #[arg(long)]
        weeks: PathBuf,
        #[arg(long)]
        movie: PathBuf,
        #[arg(long, default_value_t = 3)]
        horizon: u32,
        #[arg(long)]
        stats: Option<PathBuf>,
    },
    /// Write a markdown forecast report
    Report {
        #[arg(long)]
        weeks: PathBuf,
        #[arg(long)]
        movie: PathBuf,
        #[arg(long, default_value_t = 3)]
        horizon: u32,
        #[arg(long)]
        stats: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildStats { csv, out } => {
            let corpus = input::read_corpus_csv(&csv)?;
            let table = TierTable::from_corpus(&corpus)
                .with_context(|| format!("failed to compute tier table from {}", csv.display()))?;
            input::save_tier_table(&out, &table)?;
            let quantiles = table.quantiles();
            println!(
                "Tier table written to {} ({} corpus rows; P25 {:.0}, P75 {:.0}, P90 {:.0}).",
                out.display(),
                table.corpus_size(),
                quantiles.p25,
                quantiles.p75,
                quantiles.p90
            );
        }
        Commands::Forecast {
            weeks,
            movie,
            horizon,
            stats,
        } => {
            let (info, round) = match load_current_round(&weeks, &movie)? {
                Some(loaded) => loaded,
                None => {
                    println!("No revenue weeks found; nothing to forecast.");
                    return Ok(());
                }
            };

            let predictions = run_forecast(&round, &info, horizon)?;

            println!(
                "Forecast for round {} (last active week {}):",
                round.index,
                round.last_active_index()
            );
            for prediction in &predictions {
                println!(
                    "- week {}: {:.0} predicted ({:+.1}% vs previous week, inputs {})",
                    prediction.target_week,
                    prediction.predicted_boxoffice,
                    prediction.decline_rate * 100.0,
                    prediction.provenance
                );
            }

            if let Some(stats_path) = stats {
                let table = input::load_tier_table(&stats_path)?;
                let strength = features::opening_strength(&round, &info);
                let verdicts = warning::classify_forecast(&table, strength, &predictions);
                println!("Decline warnings (opening strength {strength:.0}):");
                for (prediction, verdict) in predictions.iter().zip(&verdicts) {
                    println!(
                        "- week {} [{}] {}",
                        prediction.target_week, verdict.level, verdict.message
                    );
                }
            }
        }
        Commands::Report {
            weeks,
            movie,
            horizon,
            stats,
            out,
        } => {
            let (info, round) = match load_current_round(&weeks, &movie)? {
                Some(loaded) => loaded,
                None => {
                    println!("No revenue weeks found; nothing to report.");
                    return Ok(());
                }
            };

            let predictions = run_forecast(&round, &info, horizon)?;
            let table = input::load_tier_table(&stats)?;
            let strength = features::opening_strength(&round, &info);
            let verdicts = warning::classify_forecast(&table, strength, &predictions);

            let label = movie
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "movie".to_string());
            let rendered = report::build_report(&label, &info, &round, &predictions, Some(&verdicts));
            std::fs::write(&out, rendered)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Loads the movie's inputs and segments its history, returning the most
/// recent round (the run currently in theaters).
fn load_current_round(
    weeks_path: &Path,
    movie_path: &Path,
) -> anyhow::Result<Option<(MovieInfo, Round)>> {
    let info = input::load_movie_info(movie_path)?;
    let raw_weeks = input::load_raw_weeks(weeks_path)?;
    let in_release = segment::discard_pre_release(&raw_weeks, info.release_date);
    let mut rounds = segment::segment_rounds(&in_release);
    Ok(rounds.pop().map(|round| (info, round)))
}

/// Runs the recursive forecaster with the baseline scorer. A scoring
/// failure keeps the steps that finished and reports the rest as lost.
fn run_forecast(
    round: &Round,
    info: &MovieInfo,
    horizon: u32,
) -> anyhow::Result<Vec<PredictionRecord>> {
    match forecast::forecast(
        round,
        info,
        horizon,
        &BaselineScorer::default(),
        &FixedRatioPolicy::default(),
    ) {
        Ok(predictions) => Ok(predictions),
        Err(ForecastError::Scoring {
            step,
            reason,
            completed,
        }) => {
            println!("Scoring failed at step {step} ({reason}); keeping {} finished step(s).", completed.len());
            Ok(completed)
        }
        Err(err) => Err(err.into()),
    }
}
