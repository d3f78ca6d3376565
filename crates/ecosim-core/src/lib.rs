//! Validation, simulation, scoring, and feedback for ecosystem attempts.
//!
//! This crate owns the evaluation pipeline: a submitted
//! [`SimulationState`](ecosim_types::SimulationState) is validated, simulated
//! over a fixed number of ticks, reduced to metrics and a score, and annotated
//! with feedback, all under a wall-clock deadline.
//!
//! # Modules
//!
//! - [`cancel`] -- Cooperative cancellation token shared with the simulation
//!   worker.
//! - [`config`] -- Configuration loading from `ecosim-config.yaml` into
//!   strongly-typed structs.
//! - [`evaluator`] -- [`Evaluator`] orchestrating the pipeline and its
//!   deadline.
//! - [`feedback`] -- Guidance entries for metrics below threshold.
//! - [`metrics`] -- Biodiversity, stability, sustainability, trophic
//!   efficiency, and the weighted score.
//! - [`simulation`] -- Deterministic tick-based population dynamics.
//! - [`validation`] -- Ordered rule checks producing a [`ValidatedState`].
//!
//! [`Evaluator`]: evaluator::Evaluator
//! [`ValidatedState`]: validation::ValidatedState

pub mod cancel;
pub mod config;
pub mod evaluator;
pub mod feedback;
pub mod metrics;
pub mod simulation;
pub mod validation;

pub use evaluator::{EvaluationError, EvaluationPhase, Evaluator, NoOpObserver, PhaseObserver};
