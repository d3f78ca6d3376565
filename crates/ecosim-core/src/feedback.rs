//! Structured guidance for weak ecosystem metrics.
//!
//! Every metric strictly below its configured threshold produces exactly one
//! [`FeedbackEntry`]; metrics at or above threshold produce nothing. Entries
//! are ordered worst first (ascending metric value, ties in area order).

use ecosim_types::{FeedbackArea, FeedbackEntry, Metrics, SpeciesId, TrendDirection};
use tracing::debug;

use crate::config::{FeedbackThresholds, MetricsParams};
use crate::metrics::is_healthy;
use crate::validation::ValidatedState;

/// Feedback entries plus a one-line summary.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackReport {
    /// Entries, worst metric first.
    pub entries: Vec<FeedbackEntry>,
    /// Short overall summary.
    pub summary: String,
}

/// Map each below-threshold metric to a feedback entry.
pub fn generate_feedback(
    metrics: &Metrics,
    state: &ValidatedState,
    thresholds: &FeedbackThresholds,
    params: &MetricsParams,
) -> FeedbackReport {
    let mut entries: Vec<FeedbackEntry> = FeedbackArea::ALL
        .into_iter()
        .filter_map(|area| {
            let current = metrics.value_of(area);
            let target = thresholds.for_area(area);
            (current < target).then(|| FeedbackEntry {
                area,
                message: message_for(area, metrics, state, params),
                current_value: current,
                target_value: target,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        a.current_value
            .total_cmp(&b.current_value)
            .then(a.area.cmp(&b.area))
    });

    let summary = summarize(&entries);
    debug!(entries = entries.len(), "feedback generated");
    FeedbackReport { entries, summary }
}

fn summarize(entries: &[FeedbackEntry]) -> String {
    match entries {
        [] => "Well balanced ecosystem: every metric meets its target.".to_owned(),
        [only] => format!("One area needs work: {}.", only.area.label()),
        [worst, ..] => format!(
            "{} areas need work; start with {}.",
            entries.len(),
            worst.area.label()
        ),
    }
}

fn message_for(
    area: FeedbackArea,
    metrics: &Metrics,
    state: &ValidatedState,
    params: &MetricsParams,
) -> String {
    match area {
        FeedbackArea::Biodiversity => {
            "Populations are dominated by a few species. Balance starting populations \
             and give each consumer more than one prey option."
                .to_owned()
        }
        FeedbackArea::Stability => {
            "Populations swing widely late in the run. Lower predation strength or \
             reproduction rates to damp boom and bust cycles."
                .to_owned()
        }
        FeedbackArea::Sustainability => sustainability_message(metrics, state, params),
        FeedbackArea::TrophicEfficiency => {
            "Little producer energy reaches higher trophic levels. Add consumers that \
             feed directly on producers or a decomposer to recycle losses."
                .to_owned()
        }
    }
}

fn sustainability_message(metrics: &Metrics, state: &ValidatedState, params: &MetricsParams) -> String {
    let name_of = |id: &SpeciesId| {
        state
            .state()
            .species_by_id(id)
            .map_or_else(|| id.to_string(), |s| s.name.clone())
    };

    let extinct: Vec<String> = metrics
        .population_trends
        .iter()
        .filter(|t| t.direction == TrendDirection::Extinct)
        .map(|t| name_of(&t.species_id))
        .collect();
    let runaway: Vec<String> = metrics
        .population_trends
        .iter()
        .filter(|t| {
            t.direction != TrendDirection::Extinct
                && !is_healthy(t, params.runaway_growth_factor)
        })
        .map(|t| name_of(&t.species_id))
        .collect();

    let mut parts = Vec::new();
    if !extinct.is_empty() {
        parts.push(format!(
            "Extinct by the end of the run: {}. Give them more food or fewer predators.",
            extinct.join(", ")
        ));
    }
    if !runaway.is_empty() {
        parts.push(format!(
            "Overpopulated: {}. Add predators or competition to keep them in check.",
            runaway.join(", ")
        ));
    }
    if parts.is_empty() {
        parts.push("Some species are outside a sustainable population range.".to_owned());
    }
    parts.join(" ")
}
