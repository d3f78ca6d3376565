//! Ecosystem metrics and the overall score.
//!
//! [`compute_metrics`] reduces a [`Trajectory`] to four normalized measures
//! plus per-species population trends. [`score`] weights those measures into
//! a 0-100 score with a named breakdown.
//!
//! | Metric | Definition |
//! |--------|------------|
//! | Biodiversity | Pielou evenness of final populations, 0 with < 2 survivors |
//! | Stability | Mean of `1 / (1 + CV)` per species over the final window |
//! | Sustainability | Fraction of species alive and not in runaway growth |
//! | Trophic efficiency | Consumer and decomposer energy over producer energy |

use ecosim_types::{Metrics, PopulationTrend, ScoreBreakdown, SpeciesType, TrendDirection};
use tracing::debug;

use crate::config::{MetricsParams, ScoringWeights};
use crate::simulation::Trajectory;
use crate::validation::ValidatedState;

/// Compute every metric for a finished trajectory.
///
/// Pure: the same trajectory and parameters always yield the same metrics.
pub fn compute_metrics(
    trajectory: &Trajectory,
    state: &ValidatedState,
    params: &MetricsParams,
) -> Metrics {
    let population_trends = population_trends(trajectory, state, params);
    let metrics = Metrics {
        biodiversity_index: biodiversity_index(&population_trends),
        stability_score: stability_score(trajectory, state, params.stability_window),
        sustainability_rating: sustainability_rating(
            &population_trends,
            params.runaway_growth_factor,
        ),
        trophic_efficiency: trophic_efficiency(trajectory, state),
        population_trends,
    };

    debug!(
        biodiversity = metrics.biodiversity_index,
        stability = metrics.stability_score,
        sustainability = metrics.sustainability_rating,
        trophic_efficiency = metrics.trophic_efficiency,
        "metrics computed"
    );
    metrics
}

/// Weight the metrics into a score breakdown.
///
/// Weights are normalized by their sum, so the breakdown always totals
/// between 0 and 100. Negative weights count as zero; if every weight is
/// zero the default weights apply.
///
/// | Component | Metric(s) | Default weight |
/// |-----------|-----------|----------------|
/// | balance | mean of biodiversity and trophic efficiency | 0.30 |
/// | survival | sustainability | 0.40 |
/// | stability | stability | 0.30 |
pub fn score(metrics: &Metrics, weights: &ScoringWeights) -> ScoreBreakdown {
    let mut balance_w = weights.balance.max(0.0);
    let mut survival_w = weights.survival.max(0.0);
    let mut stability_w = weights.stability.max(0.0);
    let mut total_w = balance_w + survival_w + stability_w;
    if total_w <= 0.0 || !total_w.is_finite() {
        let defaults = ScoringWeights::default();
        balance_w = defaults.balance;
        survival_w = defaults.survival;
        stability_w = defaults.stability;
        total_w = balance_w + survival_w + stability_w;
    }

    let balance = f64::midpoint(
        unit(metrics.biodiversity_index),
        unit(metrics.trophic_efficiency),
    );
    ScoreBreakdown {
        balance: 100.0 * balance_w / total_w * balance,
        survival: 100.0 * survival_w / total_w * unit(metrics.sustainability_rating),
        stability: 100.0 * stability_w / total_w * unit(metrics.stability_score),
    }
}

fn unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[allow(clippy::cast_precision_loss)]
const fn as_count(n: usize) -> f64 {
    n as f64
}

// ---------------------------------------------------------------------------
// Individual metrics
// ---------------------------------------------------------------------------

fn population_trends(
    trajectory: &Trajectory,
    state: &ValidatedState,
    params: &MetricsParams,
) -> Vec<PopulationTrend> {
    state
        .species()
        .iter()
        .map(|species| {
            let series = trajectory.population_series(&species.id);
            let initial = series.first().copied().unwrap_or(0.0);
            let final_population = series.last().copied().unwrap_or(0.0);
            let peak = series.iter().copied().fold(initial, f64::max);
            let minimum = series.iter().copied().fold(initial, f64::min);
            PopulationTrend {
                species_id: species.id.clone(),
                initial,
                final_population,
                peak,
                minimum,
                direction: direction(initial, final_population, params.trend_tolerance),
            }
        })
        .collect()
}

fn direction(initial: f64, final_population: f64, tolerance: f64) -> TrendDirection {
    if final_population <= 0.0 {
        TrendDirection::Extinct
    } else if initial <= 0.0 || final_population > initial * (1.0 + tolerance) {
        TrendDirection::Growing
    } else if final_population < initial * (1.0 - tolerance) {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    }
}

fn biodiversity_index(trends: &[PopulationTrend]) -> f64 {
    let survivors: Vec<f64> = trends
        .iter()
        .map(|t| t.final_population)
        .filter(|p| *p > 0.0)
        .collect();
    if survivors.len() < 2 {
        return 0.0;
    }

    let total: f64 = survivors.iter().sum();
    let shannon: f64 = survivors
        .iter()
        .map(|p| {
            let share = p / total;
            -share * share.ln()
        })
        .sum();
    unit(shannon / as_count(trends.len()).ln())
}

fn stability_score(trajectory: &Trajectory, state: &ValidatedState, window: usize) -> f64 {
    let snapshots = trajectory.snapshots();
    let window = window.max(1).min(snapshots.len());
    let start = snapshots.len().saturating_sub(window);
    let tail = snapshots.get(start..).unwrap_or_default();

    let per_species: Vec<f64> = state
        .species()
        .iter()
        .map(|species| {
            let values: Vec<f64> = tail
                .iter()
                .map(|s| s.populations.get(&species.id).copied().unwrap_or(0.0))
                .collect();
            species_stability(&values)
        })
        .collect();

    if per_species.is_empty() {
        return 0.0;
    }
    unit(per_species.iter().sum::<f64>() / as_count(per_species.len()))
}

/// `1 / (1 + CV)`; 0 for an empty or all-zero window.
fn species_stability(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let count = as_count(values.len());
    let mean = values.iter().sum::<f64>() / count;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;
    1.0 / (1.0 + variance.sqrt() / mean)
}

fn sustainability_rating(trends: &[PopulationTrend], runaway_factor: f64) -> f64 {
    if trends.is_empty() {
        return 0.0;
    }
    let healthy = trends
        .iter()
        .filter(|t| is_healthy(t, runaway_factor))
        .count();
    as_count(healthy) / as_count(trends.len())
}

/// Alive at the end and not beyond `runaway_factor` times its start.
pub(crate) fn is_healthy(trend: &PopulationTrend, runaway_factor: f64) -> bool {
    trend.final_population > 0.0 && trend.final_population <= runaway_factor * trend.initial
}

fn trophic_efficiency(trajectory: &Trajectory, state: &ValidatedState) -> f64 {
    let mut produced = 0.0_f64;
    let mut consumed = 0.0_f64;
    for species in state.species() {
        let positive: f64 = trajectory
            .energy_series(&species.id)
            .iter()
            .filter(|e| **e > 0.0)
            .sum();
        if species.species_type == SpeciesType::Producer {
            produced += positive;
        } else {
            consumed += positive;
        }
    }
    if produced <= 0.0 {
        return 0.0;
    }
    unit(consumed / produced)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecosim_types::SpeciesId;

    use super::*;
    use crate::config::{SimulationParams, ValidationRules};
    use crate::simulation::simulate;
    use crate::validation::tests::kelp_and_fish;
    use crate::validation::validate;

    fn trend(initial: f64, final_population: f64) -> PopulationTrend {
        PopulationTrend {
            species_id: SpeciesId::new("x"),
            initial,
            final_population,
            peak: initial.max(final_population),
            minimum: initial.min(final_population),
            direction: direction(initial, final_population, 0.1),
        }
    }

    fn metrics(bio: f64, stab: f64, sus: f64, tro: f64) -> Metrics {
        Metrics {
            biodiversity_index: bio,
            stability_score: stab,
            sustainability_rating: sus,
            trophic_efficiency: tro,
            population_trends: Vec::new(),
        }
    }

    #[test]
    fn even_populations_have_full_biodiversity() {
        let trends = vec![trend(100.0, 50.0), trend(100.0, 50.0), trend(100.0, 50.0)];
        assert!((biodiversity_index(&trends) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_survivor_has_zero_biodiversity() {
        let trends = vec![trend(100.0, 80.0), trend(100.0, 0.0)];
        assert!(biodiversity_index(&trends).abs() < f64::EPSILON);
    }

    #[test]
    fn dead_species_lower_evenness() {
        let all_alive = vec![trend(1.0, 10.0), trend(1.0, 10.0), trend(1.0, 10.0)];
        let one_dead = vec![trend(1.0, 10.0), trend(1.0, 10.0), trend(1.0, 0.0)];
        assert!(biodiversity_index(&one_dead) < biodiversity_index(&all_alive));
    }

    #[test]
    fn constant_series_is_perfectly_stable() {
        assert!((species_stability(&[5.0, 5.0, 5.0]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn oscillating_series_is_less_stable() {
        let s = species_stability(&[10.0, 1.0, 10.0, 1.0]);
        assert!(s > 0.0 && s < 1.0);
    }

    #[test]
    fn extinct_window_scores_zero_stability() {
        assert!(species_stability(&[0.0, 0.0]).abs() < f64::EPSILON);
    }

    #[test]
    fn trend_directions() {
        assert_eq!(direction(100.0, 0.0, 0.1), TrendDirection::Extinct);
        assert_eq!(direction(100.0, 150.0, 0.1), TrendDirection::Growing);
        assert_eq!(direction(100.0, 50.0, 0.1), TrendDirection::Declining);
        assert_eq!(direction(100.0, 105.0, 0.1), TrendDirection::Stable);
    }

    #[test]
    fn sustainability_counts_extinct_and_runaway() {
        let trends = vec![trend(10.0, 20.0), trend(10.0, 0.0), trend(10.0, 500.0), trend(10.0, 10.0)];
        assert!((sustainability_rating(&trends, 10.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn perfect_metrics_score_one_hundred() {
        let breakdown = score(&metrics(1.0, 1.0, 1.0, 1.0), &ScoringWeights::default());
        assert!((breakdown.total() - 100.0).abs() < 1e-9);
        assert!((breakdown.balance - 30.0).abs() < 1e-9);
        assert!((breakdown.survival - 40.0).abs() < 1e-9);
        assert!((breakdown.stability - 30.0).abs() < 1e-9);
    }

    #[test]
    fn empty_metrics_score_zero() {
        let breakdown = score(&metrics(0.0, 0.0, 0.0, 0.0), &ScoringWeights::default());
        assert!(breakdown.total().abs() < f64::EPSILON);
    }

    #[test]
    fn weights_are_normalized() {
        let weights = ScoringWeights {
            balance: 3.0,
            survival: 4.0,
            stability: 3.0,
        };
        let breakdown = score(&metrics(1.0, 1.0, 1.0, 1.0), &weights);
        assert!((breakdown.total() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_fall_back_to_defaults() {
        let weights = ScoringWeights {
            balance: 0.0,
            survival: 0.0,
            stability: 0.0,
        };
        let breakdown = score(&metrics(1.0, 0.0, 1.0, 1.0), &weights);
        assert!((breakdown.total() - 70.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_metrics_are_clamped() {
        let breakdown = score(&metrics(2.0, f64::NAN, -1.0, 1.0), &ScoringWeights::default());
        assert!((breakdown.total() - 30.0).abs() < 1e-9);
    }

    #[test]
    fn simulated_metrics_are_normalized_and_deterministic() {
        let state = validate(kelp_and_fish(), &ValidationRules::default()).unwrap();
        let trajectory = simulate(&state, 365, &SimulationParams::default()).unwrap();
        let params = MetricsParams::default();
        let first = compute_metrics(&trajectory, &state, &params);
        let second = compute_metrics(&trajectory, &state, &params);
        assert_eq!(first, second);
        for value in [
            first.biodiversity_index,
            first.stability_score,
            first.sustainability_rating,
            first.trophic_efficiency,
        ] {
            assert!((0.0..=1.0).contains(&value), "metric out of range: {value}");
        }
        assert_eq!(first.population_trends.len(), 2);
    }
}
