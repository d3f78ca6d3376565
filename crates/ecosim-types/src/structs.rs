//! Core value types: the ecosystem a user submits and the result returned
//! after evaluation.
//!
//! Field names serialize in `camelCase` (`energyRequirement`, `lightLevel`)
//! so request payloads from the game client deserialize without mapping.
//! Range checks live in the validator, not here: these types accept any
//! well-typed value so that a malformed attempt can be rejected with a
//! specific rule instead of a generic parse error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{FeedbackArea, InteractionType, SimulationStatus, SpeciesType, TrendDirection};
use crate::ids::{SimulationId, SpeciesId, UserId};

// ---------------------------------------------------------------------------
// Ecosystem input
// ---------------------------------------------------------------------------

/// A species selected by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Species {
    /// Key unique within the owning state.
    pub id: SpeciesId,
    /// Display name.
    pub name: String,
    /// Trophic role.
    #[serde(rename = "type")]
    pub species_type: SpeciesType,
    /// Energy needed to sustain one individual, 0-100.
    pub energy_requirement: f64,
    /// Intrinsic reproduction rate, 0.1-5.0.
    pub reproduction_rate: f64,
    /// Starting population, 1-1000.
    pub population_size: u32,
    /// Species this one feeds on. Required for consumers.
    #[serde(default)]
    pub prey_species: Vec<SpeciesId>,
}

/// Physical conditions of the habitat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EnvironmentParameters {
    /// Water temperature in degrees Celsius, 0-50.
    pub temperature: f64,
    /// Depth in metres, 0-1000 (0-200 for playable scenarios).
    pub depth: f64,
    /// Salinity in parts per thousand, 0-50.
    pub salinity: f64,
    /// Available light, 0-100.
    pub light_level: f64,
}

/// Directed relationship between two species in the same state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SpeciesInteraction {
    /// The acting species.
    pub source_species: SpeciesId,
    /// The affected species.
    pub target_species: SpeciesId,
    /// Kind of relationship.
    pub interaction_type: InteractionType,
    /// Intensity, -1 to 1.
    pub strength: f64,
}

/// A candidate ecosystem as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationState {
    /// Attempt identifier.
    pub id: SimulationId,
    /// Submitting user, for attribution only.
    pub user_id: UserId,
    /// Selected species, 2-8 entries.
    pub species: Vec<Species>,
    /// Habitat conditions.
    pub environment: EnvironmentParameters,
    /// Pre-declared interactions. Prey references add implicit predation.
    #[serde(default)]
    pub interactions: Vec<SpeciesInteraction>,
    /// Seconds left on the attempt clock.
    #[serde(default)]
    pub time_remaining: u64,
    /// Days of ecosystem time to simulate. The engine default applies when
    /// absent.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: SimulationStatus,
}

impl SimulationState {
    /// Look up a species by id.
    pub fn species_by_id(&self, id: &SpeciesId) -> Option<&Species> {
        self.species.iter().find(|s| &s.id == id)
    }

    /// Whether any species with the given id exists.
    pub fn contains_species(&self, id: &SpeciesId) -> bool {
        self.species.iter().any(|s| &s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Evaluation output
// ---------------------------------------------------------------------------

/// How one species' population moved over the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PopulationTrend {
    /// The species described.
    pub species_id: SpeciesId,
    /// Population at tick 0.
    pub initial: f64,
    /// Population at the final tick.
    #[serde(rename = "final")]
    pub final_population: f64,
    /// Highest population observed.
    pub peak: f64,
    /// Lowest population observed.
    pub minimum: f64,
    /// Overall direction.
    pub direction: TrendDirection,
}

/// Ecosystem quality measures, each normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Metrics {
    /// Evenness of the final population distribution.
    pub biodiversity_index: f64,
    /// Inverse population variability over the final window.
    pub stability_score: f64,
    /// Fraction of species inside the healthy band at the end.
    pub sustainability_rating: f64,
    /// Energy retained by consumers relative to producer output.
    pub trophic_efficiency: f64,
    /// Per-species population trends, in species order.
    pub population_trends: Vec<PopulationTrend>,
}

impl Metrics {
    /// The scalar metric that backs a feedback area.
    pub const fn value_of(&self, area: FeedbackArea) -> f64 {
        match area {
            FeedbackArea::Biodiversity => self.biodiversity_index,
            FeedbackArea::Stability => self.stability_score,
            FeedbackArea::Sustainability => self.sustainability_rating,
            FeedbackArea::TrophicEfficiency => self.trophic_efficiency,
        }
    }
}

/// The three weighted components of the overall score, in points.
///
/// With default weights the maxima are 30, 40 and 30, and the three always
/// sum to [`SimulationResult::score`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ScoreBreakdown {
    /// Structure and balance (biodiversity and trophic efficiency).
    pub balance: f64,
    /// Species survival (sustainability).
    pub survival: f64,
    /// Population stability.
    pub stability: f64,
}

impl ScoreBreakdown {
    /// Sum of all components.
    pub const fn total(&self) -> f64 {
        self.balance + self.survival + self.stability
    }
}

/// One actionable piece of feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct FeedbackEntry {
    /// Weak area addressed.
    pub area: FeedbackArea,
    /// Guidance text.
    pub message: String,
    /// The metric value that triggered the entry.
    pub current_value: f64,
    /// The value to aim for.
    pub target_value: f64,
}

/// Complete, internally consistent outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct SimulationResult {
    /// Snapshot of the evaluated state, with status `COMPLETED`.
    pub state: SimulationState,
    /// Computed metrics.
    pub metrics: Metrics,
    /// Overall score, 0-100.
    pub score: f64,
    /// Weighted components of the score.
    pub score_breakdown: ScoreBreakdown,
    /// Feedback entries, worst metric first.
    pub feedback: Vec<FeedbackEntry>,
    /// Short overall summary.
    pub summary: String,
    /// Number of ticks the simulator ran.
    pub ticks_simulated: u32,
    /// When the evaluation completed.
    pub timestamp: DateTime<Utc>,
}
