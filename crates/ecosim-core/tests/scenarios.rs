//! End-to-end scenarios for the evaluation pipeline.
//!
//! Attempts are built from JSON payloads shaped like the ones the game
//! client submits, then pushed through the public [`Evaluator`] API.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::missing_panics_doc
)]

use std::time::Duration;

use ecosim_core::config::{EngineConfig, FeedbackThresholds, MetricsParams, SimulationParams, ValidationRules};
use ecosim_core::feedback::generate_feedback;
use ecosim_core::metrics::compute_metrics;
use ecosim_core::simulation::simulate;
use ecosim_core::validation::validate;
use ecosim_core::{EvaluationError, Evaluator};
use ecosim_types::{FeedbackArea, SimulationState, SimulationStatus, TrendDirection};
use serde_json::{Value, json};

// =============================================================================
// Helpers
// =============================================================================

fn kelp() -> Value {
    json!({
        "id": "kelp",
        "name": "Giant Kelp",
        "type": "PRODUCER",
        "energyRequirement": 10,
        "reproductionRate": 1.2,
        "populationSize": 200
    })
}

fn fish(prey: &[&str]) -> Value {
    json!({
        "id": "fish",
        "name": "Reef Fish",
        "type": "CONSUMER",
        "energyRequirement": 30,
        "reproductionRate": 0.8,
        "populationSize": 40,
        "preySpecies": prey
    })
}

fn attempt(species: Vec<Value>, environment: Value, interactions: Vec<Value>) -> SimulationState {
    let payload = json!({
        "id": "01890a5d-ac96-774b-bcce-b302099a8057",
        "userId": "01890a5d-ac96-774b-bcce-b302099a8058",
        "species": species,
        "environment": environment,
        "interactions": interactions,
        "timeRemaining": 1800,
        "status": "RUNNING"
    });
    serde_json::from_value(payload).expect("attempt payload should deserialize")
}

fn reef() -> Value {
    json!({ "temperature": 20, "depth": 30, "salinity": 34, "lightLevel": 70 })
}

fn evaluator() -> Evaluator {
    Evaluator::new(EngineConfig::default())
}

const GENEROUS: Duration = Duration::from_secs(60);

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn single_species_is_rejected_as_min_species() {
    let raw = attempt(vec![kelp()], reef(), Vec::new());
    let err = evaluator().evaluate(raw, GENEROUS).await.unwrap_err();
    match err {
        EvaluationError::Validation { source } => assert_eq!(source.rule.as_str(), "min_species"),
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn kelp_and_fish_complete_with_bounded_score() {
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let result = evaluator().evaluate(raw, GENEROUS).await.unwrap();

    assert!((0.0..=100.0).contains(&result.score));
    assert_eq!(result.state.status, SimulationStatus::Completed);
    assert_eq!(result.metrics.population_trends.len(), 2);
    assert!(!result.summary.is_empty());

    let serialized = serde_json::to_value(&result).unwrap();
    assert!(serialized.get("scoreBreakdown").is_some());
    assert!(serialized["metrics"]["populationTrends"][0].get("final").is_some());
}

#[tokio::test]
async fn unknown_prey_is_unresolved_prey() {
    let raw = attempt(vec![kelp(), fish(&["plankton"])], reef(), Vec::new());
    let err = evaluator().evaluate(raw, GENEROUS).await.unwrap_err();
    match err {
        EvaluationError::Validation { source } => {
            assert_eq!(source.rule.as_str(), "unresolved_prey");
            assert!(source.field.contains("fish"), "{}", source.field);
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn bright_deep_water_is_light_depth_coupling() {
    let environment = json!({ "temperature": 12, "depth": 150, "salinity": 35, "lightLevel": 80 });
    let raw = attempt(vec![kelp(), fish(&["kelp"])], environment, Vec::new());
    let err = evaluator().evaluate(raw, GENEROUS).await.unwrap_err();
    assert_eq!(err.code(), "validation_error");
    match err {
        EvaluationError::Validation { source } => {
            assert_eq!(source.rule.as_str(), "light_depth_coupling");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[tokio::test]
async fn zero_deadline_times_out() {
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let err = evaluator().evaluate(raw, Duration::ZERO).await.unwrap_err();
    assert_eq!(err, EvaluationError::Timeout { deadline_ms: 0 });
}

#[tokio::test]
async fn one_millisecond_deadline_times_out() {
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let err = evaluator().evaluate(raw, Duration::from_millis(1)).await.unwrap_err();
    assert_eq!(err, EvaluationError::Timeout { deadline_ms: 1 });
}

#[tokio::test]
async fn default_deadline_covers_default_workload() {
    let config = EngineConfig::default();
    let deadline = Duration::from_millis(config.evaluation.attempt_timeout_ms);
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let result = Evaluator::new(config).evaluate(raw, deadline).await.unwrap();
    assert_eq!(result.ticks_simulated, 3650);
}

#[tokio::test]
async fn extinction_is_reported_by_name() {
    let mut starving = fish(&[]);
    starving["populationSize"] = json!(1);
    starving["energyRequirement"] = json!(60);
    let interactions = vec![json!({
        "sourceSpecies": "fish",
        "targetSpecies": "kelp",
        "interactionType": "PREDATION",
        "strength": 0.01
    })];
    let mut with_prey = starving;
    with_prey["preySpecies"] = json!(["kelp"]);

    let raw = attempt(vec![kelp(), with_prey], reef(), interactions);
    let result = evaluator().evaluate(raw, GENEROUS).await.unwrap();

    assert!(result.metrics.sustainability_rating < 1.0);
    let fish_trend = result
        .metrics
        .population_trends
        .iter()
        .find(|t| t.species_id.as_str() == "fish")
        .unwrap();
    assert_eq!(fish_trend.direction, TrendDirection::Extinct);

    let entry = result
        .feedback
        .iter()
        .find(|e| e.area == FeedbackArea::Sustainability)
        .expect("sustainability feedback");
    assert!(entry.message.contains("Reef Fish"), "{}", entry.message);
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn simulation_and_metrics_are_deterministic() {
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let state = validate(raw, &ValidationRules::default()).unwrap();
    let params = SimulationParams::default();

    let first = simulate(&state, params.ticks_for(None), &params).unwrap();
    let second = simulate(&state, params.ticks_for(None), &params).unwrap();
    assert_eq!(first, second);

    let metrics_params = MetricsParams::default();
    assert_eq!(
        compute_metrics(&first, &state, &metrics_params),
        compute_metrics(&second, &state, &metrics_params)
    );
}

#[test]
fn populations_stay_non_negative_under_heavy_predation() {
    let shark = json!({
        "id": "shark",
        "name": "Reef Shark",
        "type": "CONSUMER",
        "energyRequirement": 80,
        "reproductionRate": 5.0,
        "populationSize": 1000,
        "preySpecies": ["fish"]
    });
    let interactions = vec![json!({
        "sourceSpecies": "shark",
        "targetSpecies": "fish",
        "interactionType": "PREDATION",
        "strength": 1.0
    })];
    let raw = attempt(vec![kelp(), fish(&["kelp"]), shark], reef(), interactions);
    let state = validate(raw, &ValidationRules::default()).unwrap();
    let params = SimulationParams::default();
    let trajectory = simulate(&state, 1000, &params).unwrap();

    for snapshot in trajectory.snapshots() {
        for population in snapshot.populations.values() {
            assert!(*population >= 0.0);
        }
    }
}

#[test]
fn metrics_at_threshold_never_produce_feedback() {
    let raw = attempt(vec![kelp(), fish(&["kelp"])], reef(), Vec::new());
    let state = validate(raw, &ValidationRules::default()).unwrap();
    let params = SimulationParams::default();
    let trajectory = simulate(&state, params.ticks_for(None), &params).unwrap();
    let metrics_params = MetricsParams::default();
    let metrics = compute_metrics(&trajectory, &state, &metrics_params);

    // Thresholds equal to the observed values: nothing is strictly below.
    let thresholds = FeedbackThresholds {
        biodiversity: metrics.biodiversity_index,
        stability: metrics.stability_score,
        sustainability: metrics.sustainability_rating,
        trophic_efficiency: metrics.trophic_efficiency,
    };
    let report = generate_feedback(&metrics, &state, &thresholds, &metrics_params);
    assert!(report.entries.is_empty());

    let report = generate_feedback(&metrics, &state, &FeedbackThresholds::default(), &metrics_params);
    for entry in &report.entries {
        assert!(entry.current_value < entry.target_value);
        assert!(metrics.value_of(entry.area) < FeedbackThresholds::default().for_area(entry.area));
    }
}
