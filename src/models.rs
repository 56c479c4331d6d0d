use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive calendar span covered by one reported week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// One weekly record as delivered by the ingestion side, before any
/// round segmentation has happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWeek {
    pub week: u32,
    pub boxoffice: f64,
    pub audience: u64,
    pub screens: u32,
    #[serde(default)]
    pub date_range: Option<DateRange>,
}

/// One observed week inside a segmented round.
///
/// `real_week_index` counts every retained week of the round (including
/// zero-revenue weeks that did not end the run); `active_week_index` counts
/// only weeks with revenue and is `None` for zero weeks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekRecord {
    pub real_week_index: u32,
    pub active_week_index: Option<u32>,
    pub boxoffice: f64,
    pub audience: u64,
    pub screens: u32,
    pub date_range: Option<DateRange>,
    pub round_index: u32,
}

/// Static attributes of one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieInfo {
    pub release_date: NaiveDate,
    pub film_length_minutes: u32,
    pub is_restricted: bool,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub rating: Option<String>,
}

/// One contiguous theatrical run, bounded by the 3-consecutive-zero-week
/// rule and trimmed so the last stored week has revenue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub index: u32,
    pub weeks: Vec<WeekRecord>,
}

impl Round {
    /// Weeks with revenue, in order.
    pub fn active_weeks(&self) -> impl Iterator<Item = &WeekRecord> {
        self.weeks.iter().filter(|w| w.boxoffice > 0.0)
    }

    pub fn active_len(&self) -> usize {
        self.active_weeks().count()
    }

    /// Highest assigned active week index, 0 when the round has none.
    pub fn last_active_index(&self) -> u32 {
        self.active_weeks()
            .filter_map(|w| w.active_week_index)
            .max()
            .unwrap_or(0)
    }
}

/// Whether a forecast step's lag inputs were ground truth or earlier
/// forecast output. Error compounds across `Predicted` steps, so callers
/// must be able to tell the two apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Provenance {
    Real,
    Predicted,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Provenance::Real => "REAL",
            Provenance::Predicted => "PREDICTED",
        };
        f.write_str(label)
    }
}

/// One forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub target_week: u32,
    pub predicted_boxoffice: f64,
    pub predicted_audience: u64,
    pub predicted_screens: u32,
    /// Relative change versus the lag-1 revenue this step was fed.
    pub decline_rate: f64,
    pub provenance: Provenance,
}

/// Opening-strength percentile bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "tier_1")]
    Tier1,
    #[serde(rename = "tier_2")]
    Tier2,
    #[serde(rename = "tier_3")]
    Tier3,
    #[serde(rename = "tier_4")]
    Tier4,
}

impl Tier {
    pub const ALL: [Tier; 4] = [Tier::Tier1, Tier::Tier2, Tier::Tier3, Tier::Tier4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Tier1 => "tier_1",
            Tier::Tier2 => "tier_2",
            Tier::Tier3 => "tier_3",
            Tier::Tier4 => "tier_4",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One historical training observation for the statistics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub opening_strength: f64,
    pub active_week: u32,
    pub decline_rate: f64,
}

/// Global opening-strength percentile thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantiles {
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WarningLevel {
    Normal,
    Attention,
    Critical,
    /// No historical cohort to compare against; distinct from Normal.
    Unknown,
}

impl std::fmt::Display for WarningLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            WarningLevel::Normal => "NORMAL",
            WarningLevel::Attention => "ATTENTION",
            WarningLevel::Critical => "CRITICAL",
            WarningLevel::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Verdict for one forecast step, recomputed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningVerdict {
    pub level: WarningLevel,
    pub message: String,
    pub tier: Tier,
    pub predicted_decline_rate: f64,
    pub historical_average_decline_rate: Option<f64>,
}

/// Flat, fully validated feature set for one target week of one round.
///
/// Field layout follows the training feature table; everything the scoring
/// function consumes is numeric. `open_week1_days_defaulted` is metadata
/// only: it records that the 7-day default was used because the first
/// week's date range was missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub round_index: u32,
    pub current_week_active_idx: u32,
    pub gap_real_week_2to1: u32,
    pub gap_real_week_1tocurrent: u32,
    pub boxoffice_week_1: f64,
    pub boxoffice_week_2: f64,
    pub audience_week_1: f64,
    pub audience_week_2: f64,
    pub screens_week_1: f64,
    pub screens_week_2: f64,
    pub open_week1_days: f64,
    pub open_week1_boxoffice: f64,
    pub open_week1_boxoffice_daily_avg: f64,
    pub open_week2_boxoffice: f64,
    pub release_year: i32,
    pub release_month_sin: f64,
    pub release_month_cos: f64,
    pub film_length_minutes: u32,
    pub is_restricted: bool,
    pub open_week1_days_defaulted: bool,
}

impl FeatureVector {
    /// Average of first-week daily revenue and second-week revenue, used
    /// to bucket the movie into a historical tier.
    pub fn opening_strength(&self) -> f64 {
        (self.open_week1_boxoffice_daily_avg + self.open_week2_boxoffice) / 2.0
    }
}
