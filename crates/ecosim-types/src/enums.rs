//! Enumeration types for the ecosystem evaluation engine.
//!
//! Wire names are `SCREAMING_SNAKE_CASE` (`"PRODUCER"`, `"PREDATION"`) to
//! match the request payloads produced by the game client.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Trophic roles
// ---------------------------------------------------------------------------

/// Trophic role of a species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SpeciesType {
    /// Generates energy from light (kelp, phytoplankton).
    Producer,
    /// Eats other species.
    Consumer,
    /// Recycles dead biomass.
    Decomposer,
}

impl SpeciesType {
    /// Whether this role generates energy rather than consuming it.
    pub const fn is_producer(self) -> bool {
        matches!(self, Self::Producer)
    }

    /// Lowercase label used in feedback text.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
            Self::Decomposer => "decomposer",
        }
    }
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// Kind of directed relationship between two species.
///
/// The source species is the actor: for [`Predation`](Self::Predation) and
/// [`Parasitism`](Self::Parasitism) it is the one that feeds, for
/// [`Commensalism`](Self::Commensalism) it is the one that benefits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum InteractionType {
    /// Source eats target.
    Predation,
    /// Both species suppress each other's growth.
    Competition,
    /// Both species benefit.
    Symbiosis,
    /// Source feeds on target without killing it outright.
    Parasitism,
    /// Source benefits, target is unaffected.
    Commensalism,
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle status of a simulation attempt as tracked by the caller.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum SimulationStatus {
    /// The user is still assembling the ecosystem.
    #[default]
    Setup,
    /// The attempt is in progress and the clock is running.
    Running,
    /// The attempt was evaluated successfully.
    Completed,
    /// The attempt failed (validation, timeout, or internal error).
    Failed,
}

// ---------------------------------------------------------------------------
// Metrics and feedback
// ---------------------------------------------------------------------------

/// Overall direction of a species population across a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum TrendDirection {
    /// Final population noticeably above the initial one.
    Growing,
    /// Final population close to the initial one.
    Stable,
    /// Final population noticeably below the initial one.
    Declining,
    /// Population reached zero.
    Extinct,
}

/// Ecosystem quality area that a feedback entry addresses.
///
/// Declaration order is the tie-break order when two areas score equally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export, export_to = "bindings/")]
pub enum FeedbackArea {
    /// Evenness of the final population distribution.
    Biodiversity,
    /// Variability of populations over the final window.
    Stability,
    /// Species ending inside the healthy population band.
    Sustainability,
    /// Energy moved from producers up the food chain.
    TrophicEfficiency,
}

impl FeedbackArea {
    /// All areas in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Biodiversity,
        Self::Stability,
        Self::Sustainability,
        Self::TrophicEfficiency,
    ];

    /// Human-readable label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Biodiversity => "biodiversity",
            Self::Stability => "stability",
            Self::Sustainability => "sustainability",
            Self::TrophicEfficiency => "trophic efficiency",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_are_screaming_snake_case() {
        let json = serde_json::to_string(&FeedbackArea::TrophicEfficiency).ok();
        assert_eq!(json.as_deref(), Some("\"TROPHIC_EFFICIENCY\""));

        let parsed: Result<SpeciesType, _> = serde_json::from_str("\"DECOMPOSER\"");
        assert_eq!(parsed.ok(), Some(SpeciesType::Decomposer));
    }

    #[test]
    fn status_defaults_to_setup() {
        assert_eq!(SimulationStatus::default(), SimulationStatus::Setup);
    }

    #[test]
    fn area_order_matches_declaration() {
        let mut areas = FeedbackArea::ALL;
        areas.sort();
        assert_eq!(areas, FeedbackArea::ALL);
    }
}
