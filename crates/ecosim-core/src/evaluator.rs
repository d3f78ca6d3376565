//! Evaluation orchestrator with a hard wall-clock deadline.
//!
//! [`Evaluator::evaluate`] runs one attempt through the full pipeline:
//!
//! 1. **Validate** -- synchronous; the first rule violation short-circuits
//! 2. **Simulate** -- on the blocking pool, polling a [`CancelToken`] between
//!    ticks
//! 3. **Score** -- metrics, weighted score, and feedback
//! 4. **Assemble** -- a [`SimulationResult`] with status `COMPLETED`
//!
//! Stages 2-4 run as one unit raced against the deadline with
//! [`tokio::time::timeout`]. If the deadline wins, the token is cancelled,
//! the worker is abandoned, and [`EvaluationError::Timeout`] is returned.
//! A partial trajectory is never scored.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use ecosim_types::{SimulationResult, SimulationState, SimulationStatus};
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::EngineConfig;
use crate::feedback::{FeedbackReport, generate_feedback};
use crate::metrics::{compute_metrics, score};
use crate::simulation::{SimulationError, Trajectory, simulate_cancellable};
use crate::validation::{ValidatedState, ValidationError, validate};

// ---------------------------------------------------------------------------
// Phases
// ---------------------------------------------------------------------------

/// Lifecycle of a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationPhase {
    /// Accepted, not yet started.
    Pending,
    /// Checking the submitted state.
    Validating,
    /// Running the population model.
    Simulating,
    /// Computing metrics, score, and feedback.
    Scoring,
    /// Result produced.
    Completed,
    /// The deadline elapsed first.
    TimedOut,
    /// Validation or an internal error stopped the run.
    Failed,
}

impl EvaluationPhase {
    /// Whether the phase is final.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Failed)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// The happy path is strictly linear; `TimedOut` and `Failed` are
    /// reachable from any non-terminal phase.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Pending, Self::Validating)
            | (Self::Validating, Self::Simulating)
            | (Self::Simulating, Self::Scoring)
            | (Self::Scoring, Self::Completed) => true,
            (from, Self::TimedOut | Self::Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for EvaluationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Simulating => "simulating",
            Self::Scoring => "scoring",
            Self::Completed => "completed",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
        })
    }
}

/// Receives every phase an evaluation enters.
///
/// Implementations must be cheap: they are called on the evaluating task.
pub trait PhaseObserver: Send + Sync {
    /// Called once per phase entered, in order.
    fn on_phase(&self, phase: EvaluationPhase);
}

/// Observer that ignores every phase.
pub struct NoOpObserver;

impl PhaseObserver for NoOpObserver {
    fn on_phase(&self, _phase: EvaluationPhase) {}
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an evaluation produced no result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluationError {
    /// The submitted state broke a rule.
    #[error("validation failed: {source}")]
    Validation {
        /// The first violated rule.
        #[from]
        source: ValidationError,
    },

    /// The deadline elapsed before a result was ready.
    #[error("evaluation exceeded its {deadline_ms} ms deadline")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        deadline_ms: u64,
    },

    /// The engine failed for a reason unrelated to the input.
    #[error("internal evaluation error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl EvaluationError {
    /// Stable machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal_error",
        }
    }
}

fn deadline_ms(deadline: Duration) -> u64 {
    u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Runs evaluations against a fixed configuration.
///
/// Stateless between calls: concurrent evaluations share nothing but the
/// read-only configuration.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: Arc<EngineConfig>,
}

impl Evaluator {
    /// Create an evaluator for `config`.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The configured attempt timeout.
    pub fn default_deadline(&self) -> Duration {
        self.config.evaluation.attempt_timeout()
    }

    /// Evaluate `raw` within `deadline`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Validation`] for an invalid state,
    /// [`EvaluationError::Timeout`] if the deadline elapses first, or
    /// [`EvaluationError::Internal`] if the engine itself fails.
    pub async fn evaluate(
        &self,
        raw: SimulationState,
        deadline: Duration,
    ) -> Result<SimulationResult, EvaluationError> {
        self.evaluate_with_observer(raw, deadline, &NoOpObserver).await
    }

    /// Evaluate `raw` within `deadline`, reporting each phase to `observer`.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::evaluate`].
    pub async fn evaluate_with_observer(
        &self,
        raw: SimulationState,
        deadline: Duration,
        observer: &dyn PhaseObserver,
    ) -> Result<SimulationResult, EvaluationError> {
        let attempt_id = raw.id;
        observer.on_phase(EvaluationPhase::Pending);

        observer.on_phase(EvaluationPhase::Validating);
        let validated = match validate(raw, &self.config.validation) {
            Ok(validated) => validated,
            Err(err) => {
                debug!(attempt_id = %attempt_id, rule = %err.rule, field = %err.field, "validation rejected attempt");
                observer.on_phase(EvaluationPhase::Failed);
                return Err(err.into());
            }
        };
        debug!(
            attempt_id = %attempt_id,
            species = validated.species().len(),
            interactions = validated.interactions().len(),
            "attempt validated"
        );

        let cancel = CancelToken::with_budget(deadline);
        let _guard = cancel.drop_guard();

        let budget_ms = deadline_ms(deadline);
        let outcome = tokio::time::timeout(
            deadline,
            self.run_pipeline(validated, cancel.clone(), budget_ms, observer),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => {
                observer.on_phase(EvaluationPhase::Completed);
                info!(
                    attempt_id = %attempt_id,
                    score = result.score,
                    ticks = result.ticks_simulated,
                    feedback = result.feedback.len(),
                    "evaluation completed"
                );
                Ok(result)
            }
            Ok(Err(err)) => {
                let phase = if matches!(err, EvaluationError::Timeout { .. }) {
                    EvaluationPhase::TimedOut
                } else {
                    EvaluationPhase::Failed
                };
                warn!(attempt_id = %attempt_id, error = %err, "evaluation failed");
                observer.on_phase(phase);
                Err(err)
            }
            Err(_elapsed) => {
                cancel.cancel();
                warn!(attempt_id = %attempt_id, deadline_ms = budget_ms, "evaluation timed out");
                observer.on_phase(EvaluationPhase::TimedOut);
                Err(EvaluationError::Timeout {
                    deadline_ms: budget_ms,
                })
            }
        }
    }

    /// Simulate, score, and assemble. Raced against the deadline by the caller.
    async fn run_pipeline(
        &self,
        validated: ValidatedState,
        cancel: CancelToken,
        budget_ms: u64,
        observer: &dyn PhaseObserver,
    ) -> Result<SimulationResult, EvaluationError> {
        observer.on_phase(EvaluationPhase::Simulating);
        let validated = Arc::new(validated);
        let worker_state = Arc::clone(&validated);
        let config = Arc::clone(&self.config);
        let worker_cancel = cancel.clone();
        let ticks = config.simulation.ticks_for(validated.state().duration);

        let trajectory = tokio::task::spawn_blocking(move || {
            simulate_cancellable(&worker_state, ticks, &config.simulation, &worker_cancel)
        })
        .await
        .map_err(|e| EvaluationError::Internal {
            message: format!("simulation worker failed: {e}"),
        })?
        .map_err(|e| match e {
            SimulationError::Cancelled { .. } => EvaluationError::Timeout {
                deadline_ms: budget_ms,
            },
            SimulationError::NonFinite { .. } => EvaluationError::Internal {
                message: e.to_string(),
            },
        })?;

        if cancel.is_cancelled() {
            return Err(EvaluationError::Timeout {
                deadline_ms: budget_ms,
            });
        }

        observer.on_phase(EvaluationPhase::Scoring);
        Ok(self.assemble(&validated, &trajectory))
    }

    fn assemble(&self, validated: &ValidatedState, trajectory: &Trajectory) -> SimulationResult {
        let metrics = compute_metrics(trajectory, validated, &self.config.metrics);
        let breakdown = score(&metrics, &self.config.scoring);
        let FeedbackReport { entries, summary } = generate_feedback(
            &metrics,
            validated,
            &self.config.feedback,
            &self.config.metrics,
        );

        let mut state = validated.state().clone();
        state.status = SimulationStatus::Completed;

        SimulationResult {
            state,
            metrics,
            score: breakdown.total(),
            score_breakdown: breakdown,
            feedback: entries,
            summary,
            ticks_simulated: trajectory.ticks_simulated(),
            timestamp: Utc::now(),
        }
    }
}
