//! Deterministic population dynamics over discrete ticks.
//!
//! Each tick advances every species by `dt = time_step` model time:
//!
//! 1. **Base rate** -- producers grow with their reproduction rate scaled by
//!    environmental suitability; consumers and decomposers pay metabolic
//!    upkeep proportional to their energy requirement.
//! 2. **Crowding** -- every species is limited by a carrying capacity that
//!    shrinks with poor suitability.
//! 3. **Recycling** -- decomposers feed on detritus (individuals lost by other
//!    species on the previous tick) and return nutrients to producers.
//! 4. **Interactions** -- predation and parasitism move individuals from
//!    target to source through a saturating intake; competition suppresses
//!    both parties; symbiosis boosts both; commensalism boosts the source.
//!    Outside feeding, strength is signed and a negative value inverts the
//!    effect.
//! 5. **Update** -- populations are floored at zero, and anything below the
//!    extinction threshold is set to zero.
//!
//! There is no randomness: the same validated state and parameters always
//! produce a bit-identical [`Trajectory`]. The input state is never mutated.

use std::collections::BTreeMap;

use ecosim_types::{EnvironmentParameters, InteractionType, Species, SpeciesId, SpeciesType};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::SimulationParams;
use crate::validation::ValidatedState;

/// Errors that stop a simulation run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The cancel token fired before the run finished.
    #[error("simulation cancelled after {completed_ticks} ticks")]
    Cancelled {
        /// Ticks fully computed before cancellation.
        completed_ticks: u32,
    },

    /// A population or energy value became NaN or infinite.
    #[error("non-finite value for species {species} at tick {tick}")]
    NonFinite {
        /// The species whose value diverged.
        species: SpeciesId,
        /// The tick being computed.
        tick: u32,
    },
}

/// Per-species state at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSnapshot {
    /// Tick number; 0 is the initial state.
    pub tick: u32,
    /// Population per species.
    pub populations: BTreeMap<SpeciesId, f64>,
    /// Net energy gained minus upkeep during this tick, per species.
    pub energy_balances: BTreeMap<SpeciesId, f64>,
}

/// Ordered sequence of snapshots from tick 0 to the final tick.
///
/// Always holds at least the initial snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    snapshots: Vec<TickSnapshot>,
}

impl Trajectory {
    /// All snapshots in tick order.
    pub fn snapshots(&self) -> &[TickSnapshot] {
        &self.snapshots
    }

    /// Number of ticks simulated after the initial state.
    pub fn ticks_simulated(&self) -> u32 {
        self.snapshots
            .last()
            .map_or(0, |snapshot| snapshot.tick)
    }

    /// The initial snapshot.
    pub fn initial(&self) -> Option<&TickSnapshot> {
        self.snapshots.first()
    }

    /// The final snapshot.
    pub fn last(&self) -> Option<&TickSnapshot> {
        self.snapshots.last()
    }

    /// Population time series for one species, in tick order.
    pub fn population_series(&self, species: &SpeciesId) -> Vec<f64> {
        self.snapshots
            .iter()
            .map(|s| s.populations.get(species).copied().unwrap_or(0.0))
            .collect()
    }

    /// Energy balance time series for one species, in tick order.
    pub fn energy_series(&self, species: &SpeciesId) -> Vec<f64> {
        self.snapshots
            .iter()
            .map(|s| s.energy_balances.get(species).copied().unwrap_or(0.0))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Environmental suitability
// ---------------------------------------------------------------------------

/// Preferred value and tolerance width for one environmental dimension.
#[derive(Debug, Clone, Copy)]
struct Tolerance {
    preferred: f64,
    width: f64,
}

impl Tolerance {
    const fn new(preferred: f64, width: f64) -> Self {
        Self { preferred, width }
    }

    fn score(self, actual: f64) -> f64 {
        (1.0 - (actual - self.preferred).abs() / self.width).max(0.0)
    }
}

/// Implicit habitat preferences of a trophic role.
#[derive(Debug, Clone, Copy)]
struct HabitatProfile {
    temperature: Tolerance,
    salinity: Tolerance,
    light: Tolerance,
    depth: Tolerance,
}

const fn habitat_profile(role: SpeciesType) -> HabitatProfile {
    match role {
        SpeciesType::Producer => HabitatProfile {
            temperature: Tolerance::new(18.0, 20.0),
            salinity: Tolerance::new(33.0, 25.0),
            light: Tolerance::new(75.0, 60.0),
            depth: Tolerance::new(15.0, 100.0),
        },
        SpeciesType::Consumer => HabitatProfile {
            temperature: Tolerance::new(18.0, 25.0),
            salinity: Tolerance::new(33.0, 30.0),
            light: Tolerance::new(50.0, 80.0),
            depth: Tolerance::new(40.0, 150.0),
        },
        SpeciesType::Decomposer => HabitatProfile {
            temperature: Tolerance::new(15.0, 30.0),
            salinity: Tolerance::new(30.0, 35.0),
            light: Tolerance::new(20.0, 100.0),
            depth: Tolerance::new(80.0, 200.0),
        },
    }
}

/// How well the environment suits a trophic role, in `[0, 1]`.
///
/// Mean of per-dimension scores over temperature, salinity, light, and depth.
pub fn suitability(role: SpeciesType, env: &EnvironmentParameters) -> f64 {
    let profile = habitat_profile(role);
    let total = profile.temperature.score(env.temperature)
        + profile.salinity.score(env.salinity)
        + profile.light.score(env.light_level)
        + profile.depth.score(env.depth);
    total / 4.0
}

// ---------------------------------------------------------------------------
// Simulation loop
// ---------------------------------------------------------------------------

/// Per-species constants derived once before the loop.
struct SpeciesModel<'a> {
    species: &'a Species,
    suitability: f64,
    capacity: f64,
}

/// Scratch accumulators for one tick.
struct TickRates {
    per_capita: Vec<f64>,
    absolute: Vec<f64>,
    intake: Vec<f64>,
}

impl TickRates {
    fn zeroed(n: usize) -> Self {
        Self {
            per_capita: vec![0.0; n],
            absolute: vec![0.0; n],
            intake: vec![0.0; n],
        }
    }
}

fn add_at(values: &mut [f64], index: usize, amount: f64) {
    if let Some(slot) = values.get_mut(index) {
        *slot += amount;
    }
}

fn value_at(values: &[f64], index: usize) -> f64 {
    values.get(index).copied().unwrap_or(0.0)
}

/// Run the simulation for `ticks` ticks without a deadline.
///
/// # Errors
///
/// Returns [`SimulationError::NonFinite`] if the parameters drive a value to
/// NaN or infinity.
pub fn simulate(
    state: &ValidatedState,
    ticks: u32,
    params: &SimulationParams,
) -> Result<Trajectory, SimulationError> {
    simulate_cancellable(state, ticks, params, &CancelToken::new())
}

/// Run the simulation, checking `cancel` before every tick.
///
/// Overrun past cancellation is bounded by the cost of one tick.
///
/// # Errors
///
/// Returns [`SimulationError::Cancelled`] if the token fires, or
/// [`SimulationError::NonFinite`] if a value diverges.
pub fn simulate_cancellable(
    state: &ValidatedState,
    ticks: u32,
    params: &SimulationParams,
    cancel: &CancelToken,
) -> Result<Trajectory, SimulationError> {
    let env = state.environment();
    let models: Vec<SpeciesModel<'_>> = state
        .species()
        .iter()
        .map(|species| {
            let fit = suitability(species.species_type, env);
            SpeciesModel {
                species,
                suitability: fit,
                capacity: params.carrying_capacity * fit.max(params.suitability_floor),
            }
        })
        .collect();

    let mut populations: Vec<f64> = models
        .iter()
        .map(|m| f64::from(m.species.population_size))
        .collect();
    let mut detritus = 0.0_f64;

    let mut snapshots = vec![snapshot(0, &models, &populations, &vec![0.0; models.len()])];

    debug!(
        species = models.len(),
        interactions = state.interactions().len(),
        ticks,
        "simulation starting"
    );

    for tick in 1..=ticks {
        if cancel.is_cancelled() {
            debug!(completed_ticks = tick.saturating_sub(1), "simulation cancelled");
            return Err(SimulationError::Cancelled {
                completed_ticks: tick.saturating_sub(1),
            });
        }

        let rates = compute_rates(state, &models, &populations, detritus, params);
        let step = advance(&models, &populations, &rates, detritus, params).map_err(|index| {
            SimulationError::NonFinite {
                species: models.get(index).map_or_else(
                    || SpeciesId::new(format!("#{index}")),
                    |m| m.species.id.clone(),
                ),
                tick,
            }
        })?;

        snapshots.push(snapshot(tick, &models, &step.populations, &step.balances));
        populations = step.populations;
        detritus = step.detritus;
    }

    Ok(Trajectory { snapshots })
}

fn snapshot(tick: u32, models: &[SpeciesModel<'_>], populations: &[f64], balances: &[f64]) -> TickSnapshot {
    TickSnapshot {
        tick,
        populations: models
            .iter()
            .zip(populations)
            .map(|(m, p)| (m.species.id.clone(), *p))
            .collect(),
        energy_balances: models
            .iter()
            .zip(balances)
            .map(|(m, e)| (m.species.id.clone(), *e))
            .collect(),
    }
}

/// Per-capita and absolute rates of change for the current populations.
fn compute_rates(
    state: &ValidatedState,
    models: &[SpeciesModel<'_>],
    populations: &[f64],
    detritus: f64,
    params: &SimulationParams,
) -> TickRates {
    let mut rates = TickRates::zeroed(models.len());
    let half = params.half_saturation;

    let decomposers: f64 = models
        .iter()
        .zip(populations)
        .filter(|(m, _)| m.species.species_type == SpeciesType::Decomposer)
        .map(|(_, p)| *p)
        .sum();

    for (i, (model, population)) in models.iter().zip(populations).enumerate() {
        let growth = model.species.reproduction_rate * params.growth_scale;
        let base = match model.species.species_type {
            SpeciesType::Producer => {
                growth * model.suitability
                    + params.recycling_bonus * decomposers / (half + decomposers)
            }
            SpeciesType::Consumer => -upkeep_rate(model.species, params),
            SpeciesType::Decomposer => {
                -upkeep_rate(model.species, params)
                    + params.decomposer_yield * detritus / (half + detritus)
            }
        };
        let crowding = growth * population / model.capacity;
        add_at(&mut rates.per_capita, i, base - crowding);
    }

    for edge in state.interactions() {
        let (Some(source), Some(target)) = (models.get(edge.source), models.get(edge.target))
        else {
            continue;
        };
        let p_source = value_at(populations, edge.source);
        let p_target = value_at(populations, edge.target);
        // Feeding edges use magnitude only.
        let k = edge.strength.abs();

        match edge.interaction_type {
            InteractionType::Predation | InteractionType::Parasitism => {
                let intensity = if edge.interaction_type == InteractionType::Parasitism {
                    0.5
                } else {
                    1.0
                };
                let intake = intensity * k * params.attack_rate * p_target / (half + p_target);
                let taken = intake * p_source;
                add_at(&mut rates.absolute, edge.target, -taken);
                add_at(&mut rates.intake, edge.source, taken);
                add_at(
                    &mut rates.per_capita,
                    edge.source,
                    params.conversion_efficiency * intake * source.species.reproduction_rate,
                );
            }
            InteractionType::Competition => {
                let pressure = edge.strength * params.competition_coefficient;
                add_at(&mut rates.per_capita, edge.source, -pressure * p_target / source.capacity);
                add_at(&mut rates.per_capita, edge.target, -pressure * p_source / target.capacity);
            }
            InteractionType::Symbiosis => {
                let bonus = edge.strength * params.symbiosis_bonus;
                add_at(&mut rates.per_capita, edge.source, bonus * p_target / (half + p_target));
                add_at(&mut rates.per_capita, edge.target, bonus * p_source / (half + p_source));
            }
            InteractionType::Commensalism => {
                let bonus = edge.strength * params.symbiosis_bonus;
                add_at(&mut rates.per_capita, edge.source, bonus * p_target / (half + p_target));
            }
        }
    }

    rates
}

fn upkeep_rate(species: &Species, params: &SimulationParams) -> f64 {
    params.metabolic_rate * (0.5 + species.energy_requirement / 100.0)
}

/// Outcome of one tick.
struct Step {
    populations: Vec<f64>,
    balances: Vec<f64>,
    /// Individuals lost by non-decomposers, feeding decomposers next tick.
    detritus: f64,
}

/// Apply one tick of change.
///
/// Fails with the index of the first species whose rate or energy balance
/// is not finite.
fn advance(
    models: &[SpeciesModel<'_>],
    populations: &[f64],
    rates: &TickRates,
    detritus: f64,
    params: &SimulationParams,
) -> Result<Step, usize> {
    let dt = params.time_step;
    let half = params.half_saturation;
    let mut next = Vec::with_capacity(models.len());
    let mut balances = Vec::with_capacity(models.len());
    let mut lost = 0.0_f64;

    for (i, (model, population)) in models.iter().zip(populations).enumerate() {
        let species = model.species;
        let delta = value_at(&rates.per_capita, i) * population + value_at(&rates.absolute, i);
        if !delta.is_finite() {
            return Err(i);
        }
        let mut updated = (population + dt * delta).max(0.0);
        if updated < params.extinction_threshold {
            updated = 0.0;
        }

        let gain = match species.species_type {
            SpeciesType::Producer => {
                population * model.suitability * params.producer_energy_yield
            }
            SpeciesType::Consumer => value_at(&rates.intake, i) * params.energy_per_individual,
            SpeciesType::Decomposer => {
                let uptake = params.decomposer_yield * detritus / (half + detritus) * population;
                (value_at(&rates.intake, i) + uptake) * params.energy_per_individual
            }
        };
        let upkeep = population * species.energy_requirement / 100.0 * params.metabolic_rate;
        let balance = dt * (gain - upkeep);
        if !balance.is_finite() {
            return Err(i);
        }

        if species.species_type != SpeciesType::Decomposer {
            lost += (population - updated).max(0.0);
        }
        next.push(updated);
        balances.push(balance);
    }

    Ok(Step {
        populations: next,
        balances,
        detritus: lost,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use ecosim_types::{SpeciesInteraction, SpeciesType};

    use super::*;
    use crate::config::ValidationRules;
    use crate::validation::tests::{kelp_and_fish, species};
    use crate::validation::validate;

    fn validated(state: ecosim_types::SimulationState) -> ValidatedState {
        validate(state, &ValidationRules::default()).unwrap()
    }

    #[test]
    fn producer_prefers_its_profile() {
        let ideal = EnvironmentParameters {
            temperature: 18.0,
            depth: 15.0,
            salinity: 33.0,
            light_level: 75.0,
        };
        let dark = EnvironmentParameters {
            temperature: 18.0,
            depth: 200.0,
            salinity: 33.0,
            light_level: 0.0,
        };
        assert!((suitability(SpeciesType::Producer, &ideal) - 1.0).abs() < 1e-12);
        assert!(suitability(SpeciesType::Producer, &dark) < 0.6);
        assert!(
            suitability(SpeciesType::Decomposer, &dark) > suitability(SpeciesType::Producer, &dark)
        );
    }

    #[test]
    fn suitability_stays_in_unit_interval() {
        let hostile = EnvironmentParameters {
            temperature: 50.0,
            depth: 1000.0,
            salinity: 0.0,
            light_level: 100.0,
        };
        for role in [SpeciesType::Producer, SpeciesType::Consumer, SpeciesType::Decomposer] {
            let s = suitability(role, &hostile);
            assert!((0.0..=1.0).contains(&s), "{role:?} suitability {s}");
        }
    }

    #[test]
    fn trajectory_has_initial_plus_one_snapshot_per_tick() {
        let state = validated(kelp_and_fish());
        let trajectory = simulate(&state, 40, &SimulationParams::default()).unwrap();
        assert_eq!(trajectory.snapshots().len(), 41);
        assert_eq!(trajectory.ticks_simulated(), 40);
        let ticks: Vec<u32> = trajectory.snapshots().iter().map(|s| s.tick).collect();
        assert_eq!(ticks, (0..=40).collect::<Vec<u32>>());
    }

    #[test]
    fn initial_snapshot_matches_input() {
        let state = validated(kelp_and_fish());
        let trajectory = simulate(&state, 5, &SimulationParams::default()).unwrap();
        let initial = trajectory.initial().unwrap();
        assert_eq!(initial.populations.get(&SpeciesId::new("kelp")), Some(&100.0));
        assert_eq!(initial.populations.get(&SpeciesId::new("fish")), Some(&100.0));
    }

    #[test]
    fn simulation_is_deterministic() {
        let state = validated(kelp_and_fish());
        let params = SimulationParams::default();
        let first = simulate(&state, 200, &params).unwrap();
        let second = simulate(&state, 200, &params).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn input_is_not_mutated() {
        let original = kelp_and_fish();
        let state = validated(original.clone());
        let _ = simulate(&state, 50, &SimulationParams::default()).unwrap();
        assert_eq!(state.state(), &original);
    }

    #[test]
    fn populations_never_negative() {
        let mut raw = kelp_and_fish();
        raw.species.push(species("shark", SpeciesType::Consumer, &["fish"]));
        raw.species.push(species("worm", SpeciesType::Decomposer, &[]));
        raw.interactions.push(SpeciesInteraction {
            source_species: SpeciesId::new("shark"),
            target_species: SpeciesId::new("fish"),
            interaction_type: InteractionType::Predation,
            strength: 1.0,
        });
        raw.interactions.push(SpeciesInteraction {
            source_species: SpeciesId::new("kelp"),
            target_species: SpeciesId::new("worm"),
            interaction_type: InteractionType::Competition,
            strength: -0.9,
        });
        let state = validated(raw);
        let trajectory = simulate(&state, 500, &SimulationParams::default()).unwrap();
        for snapshot in trajectory.snapshots() {
            for (id, population) in &snapshot.populations {
                assert!(*population >= 0.0, "{id} went negative at tick {}", snapshot.tick);
            }
        }
    }

    #[test]
    fn starving_consumer_goes_extinct() {
        let mut raw = kelp_and_fish();
        if let Some(fish) = raw.species.get_mut(1) {
            fish.population_size = 1;
        }
        raw.interactions.push(SpeciesInteraction {
            source_species: SpeciesId::new("fish"),
            target_species: SpeciesId::new("kelp"),
            interaction_type: InteractionType::Predation,
            strength: 0.01,
        });
        let state = validated(raw);
        let trajectory = simulate(&state, 10, &SimulationParams::default()).unwrap();
        let fish = trajectory.population_series(&SpeciesId::new("fish"));
        assert_eq!(fish.first().copied(), Some(1.0));
        assert!(fish.iter().skip(1).all(|p| p.abs() < f64::EPSILON));
    }

    #[test]
    fn predation_moves_energy_to_predator() {
        let state = validated(kelp_and_fish());
        let trajectory = simulate(&state, 1, &SimulationParams::default()).unwrap();
        let last = trajectory.last().unwrap();
        let fish_energy = last.energy_balances.get(&SpeciesId::new("fish")).copied();
        assert!(fish_energy.is_some_and(|e| e > 0.0));
    }

    #[test]
    fn cancelled_token_stops_before_first_tick() {
        let state = validated(kelp_and_fish());
        let token = CancelToken::new();
        token.cancel();
        let result = simulate_cancellable(&state, 100, &SimulationParams::default(), &token);
        assert_eq!(result, Err(SimulationError::Cancelled { completed_ticks: 0 }));
    }

    #[test]
    fn zero_capacity_reports_non_finite() {
        let state = validated(kelp_and_fish());
        let params = SimulationParams {
            carrying_capacity: 0.0,
            ..SimulationParams::default()
        };
        let result = simulate(&state, 3, &params);
        assert!(matches!(result, Err(SimulationError::NonFinite { tick: 1, .. })));
    }

    fn kelp_series_with(kind: InteractionType, strength: f64) -> Vec<f64> {
        let mut raw = kelp_and_fish();
        raw.interactions.push(SpeciesInteraction {
            source_species: SpeciesId::new("kelp"),
            target_species: SpeciesId::new("fish"),
            interaction_type: kind,
            strength,
        });
        let state = validated(raw);
        let trajectory = simulate(&state, 50, &SimulationParams::default()).unwrap();
        trajectory.population_series(&SpeciesId::new("kelp"))
    }

    #[test]
    fn negative_symbiosis_strength_inverts_the_bonus() {
        let helped = kelp_series_with(InteractionType::Symbiosis, 0.8);
        let harmed = kelp_series_with(InteractionType::Symbiosis, -0.8);
        assert_ne!(helped, harmed);
        assert!(helped.get(1).unwrap() > harmed.get(1).unwrap());
    }

    #[test]
    fn negative_competition_strength_relieves_pressure() {
        let pressed = kelp_series_with(InteractionType::Competition, 0.8);
        let relieved = kelp_series_with(InteractionType::Competition, -0.8);
        assert_ne!(pressed, relieved);
        assert!(pressed.get(1).unwrap() < relieved.get(1).unwrap());
    }

    #[test]
    fn negative_commensalism_strength_inverts_the_bonus() {
        let helped = kelp_series_with(InteractionType::Commensalism, 0.5);
        let harmed = kelp_series_with(InteractionType::Commensalism, -0.5);
        assert!(helped.get(1).unwrap() > harmed.get(1).unwrap());
    }
}
