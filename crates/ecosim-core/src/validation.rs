//! State validation pipeline.
//!
//! Structural checks run first, then the ecological rules, always in the
//! order of [`ValidationRule`] declaration. The first failing stage wins, so
//! the same malformed input always produces the same error.
//!
//! 1. Species count (min, max)
//! 2. Species identity (duplicate ids, blank names)
//! 3. Value ranges (species fields, environment, interaction strength)
//! 4. Playable depth
//! 5. Trophic structure (producer present, consumer present)
//! 6. Reference resolution (prey, interaction endpoints)
//! 7. Edge rules (self-interaction, predation sign)
//! 8. Producer energy, light/depth coupling
//! 9. Clock (running attempts must have time left, requested duration in
//!    range)
//!
//! A successful run yields a [`ValidatedState`]. Its constructor is private to
//! this module, so downstream stages can take one as proof that every
//! invariant holds.

use std::collections::BTreeSet;
use std::fmt;

use ecosim_types::{
    EnvironmentParameters, InteractionType, SimulationState, SimulationStatus, Species, SpeciesId,
    SpeciesType,
};

use crate::config::ValidationRules;

/// Schema range for `energyRequirement`.
const ENERGY_REQUIREMENT_RANGE: (f64, f64) = (0.0, 100.0);
/// Schema range for `reproductionRate`.
const REPRODUCTION_RATE_RANGE: (f64, f64) = (0.1, 5.0);
/// Schema range for `populationSize`.
const POPULATION_SIZE_RANGE: (u32, u32) = (1, 1000);
/// Schema range for `temperature`.
const TEMPERATURE_RANGE: (f64, f64) = (0.0, 50.0);
/// Schema range for `depth`.
const DEPTH_RANGE: (f64, f64) = (0.0, 1000.0);
/// Schema range for `salinity`.
const SALINITY_RANGE: (f64, f64) = (0.0, 50.0);
/// Schema range for `lightLevel`.
const LIGHT_LEVEL_RANGE: (f64, f64) = (0.0, 100.0);
/// Schema range for interaction `strength`.
const STRENGTH_RANGE: (f64, f64) = (-1.0, 1.0);

/// A named validation rule, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValidationRule {
    /// Too few species.
    MinSpecies,
    /// Too many species.
    MaxSpecies,
    /// Two species share an id.
    DuplicateSpeciesId,
    /// A species id or name is blank.
    SpeciesName,
    /// A species field is outside its schema range.
    SpeciesRange,
    /// An environment field is outside its schema range.
    EnvironmentRange,
    /// An interaction strength is outside `[-1, 1]`.
    InteractionStrengthRange,
    /// Depth exceeds the playable limit.
    PlayableDepth,
    /// No producer present.
    ProducerRequired,
    /// No consumer present.
    ConsumerRequired,
    /// A consumer declares no prey.
    MissingPrey,
    /// A prey reference does not resolve.
    UnresolvedPrey,
    /// An interaction endpoint does not resolve.
    UnresolvedInteraction,
    /// A species interacts with itself.
    SelfInteraction,
    /// A predation edge has non-positive strength.
    PredationStrength,
    /// A producer's energy requirement is too high.
    ProducerEnergy,
    /// Deep water with too much light.
    LightDepthCoupling,
    /// A running attempt has no time left.
    TimeRemaining,
    /// The requested simulation duration is not positive or too long.
    SimulationDuration,
}

impl ValidationRule {
    /// Stable machine-readable rule name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MinSpecies => "min_species",
            Self::MaxSpecies => "max_species",
            Self::DuplicateSpeciesId => "duplicate_species_id",
            Self::SpeciesName => "species_name",
            Self::SpeciesRange => "species_range",
            Self::EnvironmentRange => "environment_range",
            Self::InteractionStrengthRange => "interaction_strength_range",
            Self::PlayableDepth => "playable_depth",
            Self::ProducerRequired => "producer_required",
            Self::ConsumerRequired => "consumer_required",
            Self::MissingPrey => "missing_prey",
            Self::UnresolvedPrey => "unresolved_prey",
            Self::UnresolvedInteraction => "unresolved_interaction",
            Self::SelfInteraction => "self_interaction",
            Self::PredationStrength => "predation_strength",
            Self::ProducerEnergy => "producer_energy",
            Self::LightDepthCoupling => "light_depth_coupling",
            Self::TimeRemaining => "time_remaining",
            Self::SimulationDuration => "simulation_duration",
        }
    }
}

impl fmt::Display for ValidationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first rule a candidate state violates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{rule} violated at {field}: {detail}")]
pub struct ValidationError {
    /// The violated rule.
    pub rule: ValidationRule,
    /// Path of the offending field, e.g. `species[fish].preySpecies`.
    pub field: String,
    /// Human-readable explanation.
    pub detail: String,
}

impl ValidationError {
    fn new(rule: ValidationRule, field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            rule,
            field: field.into(),
            detail: detail.into(),
        }
    }
}

/// An interaction edge with both endpoints resolved to species indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedInteraction {
    /// Index of the source species in [`ValidatedState::species`].
    pub source: usize,
    /// Index of the target species.
    pub target: usize,
    /// Kind of relationship.
    pub interaction_type: InteractionType,
    /// Intensity, -1 to 1.
    pub strength: f64,
    /// Whether the edge was derived from a prey reference.
    pub implicit: bool,
}

/// A state that has passed every validation rule.
///
/// Only [`validate`] can build one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedState {
    state: SimulationState,
    interactions: Vec<ResolvedInteraction>,
}

impl ValidatedState {
    /// The underlying state.
    pub const fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Species in submission order.
    pub fn species(&self) -> &[Species] {
        &self.state.species
    }

    /// Habitat conditions.
    pub const fn environment(&self) -> &EnvironmentParameters {
        &self.state.environment
    }

    /// Declared interactions plus implicit predation from prey references.
    pub fn interactions(&self) -> &[ResolvedInteraction] {
        &self.interactions
    }
}

/// Validate a candidate state.
///
/// Pure: reads the state, allocates nothing beyond the returned value.
pub fn validate(
    state: SimulationState,
    rules: &ValidationRules,
) -> Result<ValidatedState, ValidationError> {
    // Structural checks
    validate_species_count(&state, rules)?;
    validate_species_identity(&state)?;
    validate_species_ranges(&state)?;
    validate_environment_ranges(&state.environment)?;
    validate_interaction_strengths(&state)?;
    validate_playable_depth(&state.environment, rules)?;

    // Ecological checks
    validate_trophic_structure(&state)?;
    validate_references(&state)?;
    validate_edges(&state)?;
    validate_producer_energy(&state, rules)?;
    validate_light_depth(&state.environment, rules)?;
    validate_clock(&state)?;
    validate_duration(&state, rules)?;

    let interactions = resolve_interactions(&state, rules);
    Ok(ValidatedState {
        state,
        interactions,
    })
}

fn validate_species_count(
    state: &SimulationState,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    let count = state.species.len();
    if count < rules.min_species {
        return Err(ValidationError::new(
            ValidationRule::MinSpecies,
            "species",
            format!(
                "ecosystem needs at least {} species, got {count}",
                rules.min_species
            ),
        ));
    }
    if count > rules.max_species {
        return Err(ValidationError::new(
            ValidationRule::MaxSpecies,
            "species",
            format!(
                "ecosystem allows at most {} species, got {count}",
                rules.max_species
            ),
        ));
    }
    Ok(())
}

fn validate_species_identity(state: &SimulationState) -> Result<(), ValidationError> {
    let mut seen: BTreeSet<&SpeciesId> = BTreeSet::new();
    for species in &state.species {
        if !seen.insert(&species.id) {
            return Err(ValidationError::new(
                ValidationRule::DuplicateSpeciesId,
                format!("species[{}].id", species.id),
                format!("species id '{}' appears more than once", species.id),
            ));
        }
    }
    for species in &state.species {
        if species.id.as_str().trim().is_empty() {
            return Err(ValidationError::new(
                ValidationRule::SpeciesName,
                "species[].id",
                "species id must not be blank",
            ));
        }
        if species.name.trim().is_empty() {
            return Err(ValidationError::new(
                ValidationRule::SpeciesName,
                format!("species[{}].name", species.id),
                "species name must not be blank",
            ));
        }
    }
    Ok(())
}

fn validate_species_ranges(state: &SimulationState) -> Result<(), ValidationError> {
    for species in &state.species {
        check_range(
            ValidationRule::SpeciesRange,
            &format!("species[{}].energyRequirement", species.id),
            species.energy_requirement,
            ENERGY_REQUIREMENT_RANGE,
        )?;
        check_range(
            ValidationRule::SpeciesRange,
            &format!("species[{}].reproductionRate", species.id),
            species.reproduction_rate,
            REPRODUCTION_RATE_RANGE,
        )?;
        let (min, max) = POPULATION_SIZE_RANGE;
        if !(min..=max).contains(&species.population_size) {
            return Err(ValidationError::new(
                ValidationRule::SpeciesRange,
                format!("species[{}].populationSize", species.id),
                format!(
                    "value {} is outside [{min}, {max}]",
                    species.population_size
                ),
            ));
        }
    }
    Ok(())
}

fn validate_environment_ranges(env: &EnvironmentParameters) -> Result<(), ValidationError> {
    let rule = ValidationRule::EnvironmentRange;
    check_range(rule, "environment.temperature", env.temperature, TEMPERATURE_RANGE)?;
    check_range(rule, "environment.depth", env.depth, DEPTH_RANGE)?;
    check_range(rule, "environment.salinity", env.salinity, SALINITY_RANGE)?;
    check_range(rule, "environment.lightLevel", env.light_level, LIGHT_LEVEL_RANGE)?;
    Ok(())
}

fn validate_interaction_strengths(state: &SimulationState) -> Result<(), ValidationError> {
    for (i, interaction) in state.interactions.iter().enumerate() {
        check_range(
            ValidationRule::InteractionStrengthRange,
            &format!("interactions[{i}].strength"),
            interaction.strength,
            STRENGTH_RANGE,
        )?;
    }
    Ok(())
}

fn validate_playable_depth(
    env: &EnvironmentParameters,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    if env.depth > rules.max_playable_depth {
        return Err(ValidationError::new(
            ValidationRule::PlayableDepth,
            "environment.depth",
            format!(
                "depth {} m exceeds the playable limit of {} m",
                env.depth, rules.max_playable_depth
            ),
        ));
    }
    Ok(())
}

fn validate_trophic_structure(state: &SimulationState) -> Result<(), ValidationError> {
    let has = |role: SpeciesType| state.species.iter().any(|s| s.species_type == role);
    if !has(SpeciesType::Producer) {
        return Err(ValidationError::new(
            ValidationRule::ProducerRequired,
            "species",
            "ecosystem needs at least one producer",
        ));
    }
    if !has(SpeciesType::Consumer) {
        return Err(ValidationError::new(
            ValidationRule::ConsumerRequired,
            "species",
            "ecosystem needs at least one consumer",
        ));
    }
    Ok(())
}

fn validate_references(state: &SimulationState) -> Result<(), ValidationError> {
    for species in &state.species {
        if species.species_type == SpeciesType::Consumer && species.prey_species.is_empty() {
            return Err(ValidationError::new(
                ValidationRule::MissingPrey,
                format!("species[{}].preySpecies", species.id),
                format!(
                    "{} '{}' must feed on at least one species",
                    species.species_type.label(),
                    species.id
                ),
            ));
        }
    }
    for species in &state.species {
        if let Some(missing) = species
            .prey_species
            .iter()
            .find(|prey| !state.contains_species(prey))
        {
            return Err(ValidationError::new(
                ValidationRule::UnresolvedPrey,
                format!("species[{}].preySpecies", species.id),
                format!("prey '{missing}' is not part of this ecosystem"),
            ));
        }
    }
    for (i, interaction) in state.interactions.iter().enumerate() {
        for (end, id) in [
            ("sourceSpecies", &interaction.source_species),
            ("targetSpecies", &interaction.target_species),
        ] {
            if !state.contains_species(id) {
                return Err(ValidationError::new(
                    ValidationRule::UnresolvedInteraction,
                    format!("interactions[{i}].{end}"),
                    format!("species '{id}' is not part of this ecosystem"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_edges(state: &SimulationState) -> Result<(), ValidationError> {
    for (i, interaction) in state.interactions.iter().enumerate() {
        if interaction.source_species == interaction.target_species {
            return Err(ValidationError::new(
                ValidationRule::SelfInteraction,
                format!("interactions[{i}]"),
                format!(
                    "species '{}' cannot interact with itself",
                    interaction.source_species
                ),
            ));
        }
    }
    for species in &state.species {
        if species.prey_species.contains(&species.id) {
            return Err(ValidationError::new(
                ValidationRule::SelfInteraction,
                format!("species[{}].preySpecies", species.id),
                format!("species '{}' cannot prey on itself", species.id),
            ));
        }
    }
    for (i, interaction) in state.interactions.iter().enumerate() {
        if interaction.interaction_type == InteractionType::Predation && interaction.strength <= 0.0
        {
            return Err(ValidationError::new(
                ValidationRule::PredationStrength,
                format!("interactions[{i}].strength"),
                format!(
                    "predation strength must be positive, got {}",
                    interaction.strength
                ),
            ));
        }
    }
    Ok(())
}

fn validate_producer_energy(
    state: &SimulationState,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    for species in &state.species {
        if species.species_type.is_producer()
            && species.energy_requirement > rules.max_producer_energy
        {
            return Err(ValidationError::new(
                ValidationRule::ProducerEnergy,
                format!("species[{}].energyRequirement", species.id),
                format!(
                    "producer energy requirement {} exceeds {}",
                    species.energy_requirement, rules.max_producer_energy
                ),
            ));
        }
    }
    Ok(())
}

fn validate_light_depth(
    env: &EnvironmentParameters,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    if env.depth > rules.deep_water_threshold && env.light_level > rules.deep_water_max_light {
        return Err(ValidationError::new(
            ValidationRule::LightDepthCoupling,
            "environment.lightLevel",
            format!(
                "light level {} is too high below {} m (max {})",
                env.light_level, rules.deep_water_threshold, rules.deep_water_max_light
            ),
        ));
    }
    Ok(())
}

fn validate_clock(state: &SimulationState) -> Result<(), ValidationError> {
    if state.status == SimulationStatus::Running && state.time_remaining == 0 {
        return Err(ValidationError::new(
            ValidationRule::TimeRemaining,
            "timeRemaining",
            "a running attempt must have time remaining",
        ));
    }
    Ok(())
}

fn validate_duration(
    state: &SimulationState,
    rules: &ValidationRules,
) -> Result<(), ValidationError> {
    let Some(days) = state.duration else {
        return Ok(());
    };
    let in_range = days.is_finite() && days > 0.0 && days <= rules.max_duration;
    if !in_range {
        return Err(ValidationError::new(
            ValidationRule::SimulationDuration,
            "duration",
            format!(
                "duration must be in (0, {}] days, got {days}",
                rules.max_duration
            ),
        ));
    }
    Ok(())
}

fn check_range(
    rule: ValidationRule,
    field: &str,
    value: f64,
    (min, max): (f64, f64),
) -> Result<(), ValidationError> {
    // NaN fails `contains`, so non-finite input is rejected here too.
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            rule,
            field,
            format!("value {value} is outside [{min}, {max}]"),
        ))
    }
}

/// Build the interaction graph: declared edges first, then one implicit
/// predation edge per prey reference not already declared.
fn resolve_interactions(state: &SimulationState, rules: &ValidationRules) -> Vec<ResolvedInteraction> {
    let index_of = |id: &SpeciesId| state.species.iter().position(|s| &s.id == id);

    let mut edges: Vec<ResolvedInteraction> = state
        .interactions
        .iter()
        .filter_map(|interaction| {
            Some(ResolvedInteraction {
                source: index_of(&interaction.source_species)?,
                target: index_of(&interaction.target_species)?,
                interaction_type: interaction.interaction_type,
                strength: interaction.strength,
                implicit: false,
            })
        })
        .collect();

    for (source, species) in state.species.iter().enumerate() {
        for prey in &species.prey_species {
            let Some(target) = index_of(prey) else {
                continue;
            };
            let declared = edges.iter().any(|e| {
                e.source == source
                    && e.target == target
                    && e.interaction_type == InteractionType::Predation
            });
            if !declared {
                edges.push(ResolvedInteraction {
                    source,
                    target,
                    interaction_type: InteractionType::Predation,
                    strength: rules.implicit_predation_strength,
                    implicit: true,
                });
            }
        }
    }

    edges
}
