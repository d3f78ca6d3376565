//! Shared domain types for the ecosystem evaluation engine.
//!
//! This crate is the single source of truth for the values that cross the
//! engine boundary: the candidate ecosystem a caller submits and the
//! [`SimulationResult`] it gets back. Types flow downstream to `TypeScript`
//! via `ts-rs` for the results screen.
//!
//! # Modules
//!
//! - [`ids`] -- Identifier wrappers (attempt, user, species)
//! - [`enums`] -- Trophic roles, interaction kinds, statuses, feedback areas
//! - [`structs`] -- Species, environment, state, metrics, and result structs

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{FeedbackArea, InteractionType, SimulationStatus, SpeciesType, TrendDirection};
pub use ids::{SimulationId, SpeciesId, UserId};
pub use structs::{
    EnvironmentParameters, FeedbackEntry, Metrics, PopulationTrend, ScoreBreakdown,
    SimulationResult, SimulationState, Species, SpeciesInteraction,
};
