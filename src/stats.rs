use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::StatsError;
use crate::models::{CorpusRecord, Quantiles, Tier};

/// Immutable tier statistics snapshot: opening-strength percentile
/// boundaries plus the historical mean decline rate per tier per active
/// week. Built once from a corpus and never mutated; recomputation
/// produces a fresh table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    quantiles: Quantiles,
    averages: BTreeMap<Tier, BTreeMap<u32, f64>>,
    corpus_size: usize,
}

impl TierTable {
    pub fn from_corpus(corpus: &[CorpusRecord]) -> Result<Self, StatsError> {
        if corpus.is_empty() {
            return Err(StatsError::EmptyCorpus);
        }
        if let Some(bad) = corpus
            .iter()
            .find(|r| !r.opening_strength.is_finite())
        {
            return Err(StatsError::NonFiniteStrength(bad.opening_strength));
        }

        let mut strengths: Vec<f64> = corpus.iter().map(|r| r.opening_strength).collect();
        strengths.sort_by(|a, b| a.total_cmp(b));

        let quantiles = Quantiles {
            p25: quantile(&strengths, 0.25),
            p75: quantile(&strengths, 0.75),
            p90: quantile(&strengths, 0.90),
        };

        let mut sums: BTreeMap<(Tier, u32), (f64, usize)> = BTreeMap::new();
        for record in corpus {
            let tier = tier_for(&quantiles, record.opening_strength);
            let entry = sums.entry((tier, record.active_week)).or_insert((0.0, 0));
            entry.0 += record.decline_rate;
            entry.1 += 1;
        }

        let mut averages: BTreeMap<Tier, BTreeMap<u32, f64>> = BTreeMap::new();
        for ((tier, week), (total, count)) in sums {
            averages
                .entry(tier)
                .or_default()
                .insert(week, total / count as f64);
        }

        Ok(Self {
            quantiles,
            averages,
            corpus_size: corpus.len(),
        })
    }

    pub fn quantiles(&self) -> Quantiles {
        self.quantiles
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus_size
    }

    pub fn tier_for(&self, opening_strength: f64) -> Tier {
        tier_for(&self.quantiles, opening_strength)
    }

    /// Historical mean decline rate for the cohort, `None` when the
    /// `(tier, week)` combination never occurred in the corpus.
    pub fn average_decline_rate(&self, tier: Tier, active_week: u32) -> Option<f64> {
        self.averages.get(&tier)?.get(&active_week).copied()
    }

    pub fn to_document(&self) -> TierTableDoc {
        let mut tiers = BTreeMap::new();
        for tier in Tier::ALL {
            let weeks: BTreeMap<String, f64> = self
                .averages
                .get(&tier)
                .map(|by_week| {
                    by_week
                        .iter()
                        .map(|(week, avg)| (format!("week_{week}"), *avg))
                        .collect()
                })
                .unwrap_or_default();
            tiers.insert(tier.as_str().to_string(), weeks);
        }
        TierTableDoc {
            quantiles: self.quantiles,
            tiers,
            corpus_size: self.corpus_size,
        }
    }

    pub fn from_document(doc: &TierTableDoc) -> Result<Self, StatsError> {
        let mut averages: BTreeMap<Tier, BTreeMap<u32, f64>> = BTreeMap::new();
        for (tier_key, weeks) in &doc.tiers {
            let tier = Tier::ALL
                .into_iter()
                .find(|t| t.as_str() == tier_key)
                .ok_or_else(|| StatsError::MalformedDocument(format!("unknown tier {tier_key}")))?;
            let mut by_week = BTreeMap::new();
            for (week_key, avg) in weeks {
                let week: u32 = week_key
                    .strip_prefix("week_")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| {
                        StatsError::MalformedDocument(format!("bad week key {week_key}"))
                    })?;
                by_week.insert(week, *avg);
            }
            if !by_week.is_empty() {
                averages.insert(tier, by_week);
            }
        }
        Ok(Self {
            quantiles: doc.quantiles,
            averages,
            corpus_size: doc.corpus_size,
        })
    }
}

/// Persisted cache layout: `{quantiles, tiers: {tier_1..4: {week_N:
/// avg_decline_rate}}, corpus_size}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTableDoc {
    pub quantiles: Quantiles,
    pub tiers: BTreeMap<String, BTreeMap<String, f64>>,
    pub corpus_size: usize,
}

fn tier_for(quantiles: &Quantiles, opening_strength: f64) -> Tier {
    if opening_strength < quantiles.p25 {
        Tier::Tier1
    } else if opening_strength < quantiles.p75 {
        Tier::Tier2
    } else if opening_strength < quantiles.p90 {
        Tier::Tier3
    } else {
        Tier::Tier4
    }
}

/// Linear-interpolation quantile over sorted values.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let last = sorted.len() - 1;
    let position = q * last as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Shared handle on the current [`TierTable`]. Reads take a cheap atomic
/// snapshot; `recompute` builds a whole new table and swaps the pointer,
/// so in-flight readers never observe a partially rebuilt table.
pub struct DeclineStatsEngine {
    current: ArcSwap<TierTable>,
}

impl DeclineStatsEngine {
    pub fn new(table: TierTable) -> Self {
        Self {
            current: ArcSwap::from_pointee(table),
        }
    }

    pub fn snapshot(&self) -> Arc<TierTable> {
        self.current.load_full()
    }

    pub fn recompute(&self, corpus: &[CorpusRecord]) -> Result<Arc<TierTable>, StatsError> {
        let table = Arc::new(TierTable::from_corpus(corpus)?);
        self.current.store(Arc::clone(&table));
        Ok(table)
    }

    pub fn tier_for(&self, opening_strength: f64) -> Tier {
        self.current.load().tier_for(opening_strength)
    }

    pub fn average_decline_rate(&self, tier: Tier, active_week: u32) -> Option<f64> {
        self.current.load().average_decline_rate(tier, active_week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decile_corpus() -> Vec<CorpusRecord> {
        // Opening strengths 10, 20, ..., 100, all at active week 2.
        (1..=10)
            .map(|i| CorpusRecord {
                opening_strength: (i * 10) as f64,
                active_week: 2,
                decline_rate: -0.1 * i as f64,
            })
            .collect()
    }

    #[test]
    fn quantile_boundaries_use_linear_interpolation() {
        let table = TierTable::from_corpus(&decile_corpus()).unwrap();
        let q = table.quantiles();
        assert!((q.p25 - 32.5).abs() < 1e-9);
        assert!((q.p75 - 77.5).abs() < 1e-9);
        assert!((q.p90 - 91.0).abs() < 1e-9);
    }

    #[test]
    fn tier_assignment_follows_percentile_buckets() {
        let table = TierTable::from_corpus(&decile_corpus()).unwrap();
        assert_eq!(table.tier_for(91.0), Tier::Tier4);
        assert_eq!(table.tier_for(32.4), Tier::Tier1);
        assert_eq!(table.tier_for(32.5), Tier::Tier2);
        assert_eq!(table.tier_for(80.0), Tier::Tier3);
    }

    #[test]
    fn averages_are_per_tier_per_week_means() {
        let table = TierTable::from_corpus(&decile_corpus()).unwrap();
        // Tier 1 holds strengths 10, 20, 30 with declines -0.1, -0.2, -0.3.
        let avg = table.average_decline_rate(Tier::Tier1, 2).unwrap();
        assert!((avg - (-0.2)).abs() < 1e-9);
        assert_eq!(table.corpus_size(), 10);
    }

    #[test]
    fn unseen_tier_week_combination_is_not_available() {
        let table = TierTable::from_corpus(&decile_corpus()).unwrap();
        assert_eq!(table.average_decline_rate(Tier::Tier1, 9), None);
    }

    #[test]
    fn empty_corpus_is_rejected() {
        assert!(matches!(
            TierTable::from_corpus(&[]),
            Err(StatsError::EmptyCorpus)
        ));
    }

    #[test]
    fn recompute_swaps_the_snapshot_without_touching_old_readers() {
        let engine = DeclineStatsEngine::new(TierTable::from_corpus(&decile_corpus()).unwrap());
        let before = engine.snapshot();

        let shifted: Vec<CorpusRecord> = decile_corpus()
            .into_iter()
            .map(|mut r| {
                r.opening_strength *= 10.0;
                r
            })
            .collect();
        engine.recompute(&shifted).unwrap();

        // The old snapshot still answers with the old boundaries.
        assert!((before.quantiles().p90 - 91.0).abs() < 1e-9);
        assert!((engine.snapshot().quantiles().p90 - 910.0).abs() < 1e-9);
    }

    #[test]
    fn document_layout_round_trips_and_uses_week_keys() {
        let table = TierTable::from_corpus(&decile_corpus()).unwrap();
        let doc = table.to_document();

        assert!(doc.tiers.contains_key("tier_1"));
        assert!(doc.tiers["tier_1"].contains_key("week_2"));
        assert!(doc.tiers["tier_4"].contains_key("week_2"));

        let restored = TierTable::from_document(&doc).unwrap();
        assert_eq!(restored, table);
    }

    #[test]
    fn malformed_week_key_is_rejected() {
        let mut doc = TierTable::from_corpus(&decile_corpus()).unwrap().to_document();
        doc.tiers
            .get_mut("tier_1")
            .unwrap()
            .insert("third_week".to_string(), -0.4);
        assert!(matches!(
            TierTable::from_document(&doc),
            Err(StatsError::MalformedDocument(_))
        ));
    }
}
