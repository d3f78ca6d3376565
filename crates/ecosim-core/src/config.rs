//! Configuration loading and typed config structures for the evaluation engine.
//!
//! The canonical configuration lives in `ecosim-config.yaml`. Every section is
//! optional: missing sections and missing fields fall back to the defaults
//! documented on each struct, so an empty file is a valid configuration.

use std::path::Path;

use serde::Deserialize;

/// Environment variable that overrides [`EvaluationConfig::attempt_timeout_ms`].
pub const ATTEMPT_TIMEOUT_ENV: &str = "ECOSIM_ATTEMPT_TIMEOUT_MS";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level engine configuration.
///
/// Mirrors the structure of `ecosim-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Deadline settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Limits enforced by the validator.
    #[serde(default)]
    pub validation: ValidationRules,

    /// Population dynamics constants.
    #[serde(default)]
    pub simulation: SimulationParams,

    /// Metric window and healthy-band settings.
    #[serde(default)]
    pub metrics: MetricsParams,

    /// Score component weights.
    #[serde(default)]
    pub scoring: ScoringWeights,

    /// Per-metric feedback thresholds.
    #[serde(default)]
    pub feedback: FeedbackThresholds,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `ECOSIM_ATTEMPT_TIMEOUT_MS` overrides `evaluation.attempt_timeout_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        // serde_yml maps an empty document to unit, not to an empty mapping.
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.evaluation.apply_env_overrides();
        Ok(config)
    }
}

/// Deadline configuration for one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EvaluationConfig {
    /// Wall-clock budget for one attempt, in milliseconds.
    ///
    /// The default of 1,800,000 ms is 30 minutes.
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl EvaluationConfig {
    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Values that do not parse as a `u64` are ignored.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ms) = lookup(ATTEMPT_TIMEOUT_ENV).and_then(|v| v.trim().parse::<u64>().ok()) {
            self.attempt_timeout_ms = ms;
        }
    }

    /// The attempt timeout as a [`std::time::Duration`].
    pub const fn attempt_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.attempt_timeout_ms)
    }
}

/// Limits enforced by the validator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidationRules {
    /// Fewest species an ecosystem may contain.
    pub min_species: usize,
    /// Most species an ecosystem may contain.
    pub max_species: usize,
    /// Deepest playable scenario, in metres.
    pub max_playable_depth: f64,
    /// Depth beyond which light is restricted.
    pub deep_water_threshold: f64,
    /// Highest light level allowed beyond `deep_water_threshold`.
    pub deep_water_max_light: f64,
    /// Highest energy requirement a producer may have.
    pub max_producer_energy: f64,
    /// Strength of the predation edge implied by a prey reference.
    pub implicit_predation_strength: f64,
    /// Longest simulation duration an attempt may request, in days.
    pub max_duration: f64,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self {
            min_species: 2,
            max_species: 8,
            max_playable_depth: 200.0,
            deep_water_threshold: 100.0,
            deep_water_max_light: 50.0,
            max_producer_energy: 50.0,
            implicit_predation_strength: 0.5,
            max_duration: 3650.0,
        }
    }
}

/// Population dynamics constants used by the simulator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Days simulated when an attempt does not request a duration.
    pub duration: f64,
    /// Model time (days) advanced per tick.
    pub time_step: f64,
    /// Upper bound on the tick count of one run.
    pub max_ticks: u32,
    /// Multiplier applied to every `reproductionRate`.
    pub growth_scale: f64,
    /// Population a perfectly suited species can sustain.
    pub carrying_capacity: f64,
    /// Lowest suitability used when deriving carrying capacity.
    pub suitability_floor: f64,
    /// Per-capita upkeep rate for consumers and decomposers.
    pub metabolic_rate: f64,
    /// Maximum prey taken per predator per unit time.
    pub attack_rate: f64,
    /// Population at which saturating effects reach half strength.
    pub half_saturation: f64,
    /// Fraction of consumed prey turned into predator growth.
    pub conversion_efficiency: f64,
    /// Growth suppression per unit of competing population.
    pub competition_coefficient: f64,
    /// Maximum per-capita bonus from a symbiotic partner.
    pub symbiosis_bonus: f64,
    /// Maximum per-capita growth decomposers draw from detritus.
    pub decomposer_yield: f64,
    /// Maximum per-capita bonus producers get from decomposer recycling.
    pub recycling_bonus: f64,
    /// Energy one producer individual generates per unit time.
    pub producer_energy_yield: f64,
    /// Energy gained per consumed individual.
    pub energy_per_individual: f64,
    /// Populations below this become extinct.
    pub extinction_threshold: f64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            duration: 365.0,
            time_step: 0.1,
            max_ticks: 50_000,
            growth_scale: 1.0,
            carrying_capacity: 1000.0,
            suitability_floor: 0.05,
            metabolic_rate: 0.2,
            attack_rate: 1.0,
            half_saturation: 50.0,
            conversion_efficiency: 0.5,
            competition_coefficient: 0.5,
            symbiosis_bonus: 0.2,
            decomposer_yield: 0.5,
            recycling_bonus: 0.1,
            producer_energy_yield: 0.1,
            energy_per_individual: 1.0,
            extinction_threshold: 1.0,
        }
    }
}

/// Tolerance subtracted before rounding a duration up to whole ticks.
const TICK_ROUNDING_SLACK: f64 = 1e-9;

impl SimulationParams {
    /// Tick count for a run of `requested` days, or of the configured
    /// `duration` when none is requested.
    ///
    /// Rounds up to whole ticks and never exceeds `max_ticks`. A zero,
    /// negative, or NaN duration yields zero ticks.
    pub fn ticks_for(&self, requested: Option<f64>) -> u32 {
        let days = requested.unwrap_or(self.duration);
        // Absorbs binary rounding so 365 / 0.1 is 3650 ticks, not 3651.
        let raw = (days / self.time_step - TICK_ROUNDING_SLACK).ceil();
        if raw.is_nan() || raw <= 0.0 {
            return 0;
        }
        let limit = f64::from(self.max_ticks);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ticks = raw.min(limit) as u32;
        ticks
    }
}

/// Settings for metric computation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsParams {
    /// Number of trailing ticks used for the stability score.
    pub stability_window: usize,
    /// A final population above `initial * runaway_growth_factor` is runaway growth.
    pub runaway_growth_factor: f64,
    /// Relative change within which a trend counts as stable.
    pub trend_tolerance: f64,
}

impl Default for MetricsParams {
    fn default() -> Self {
        Self {
            stability_window: 50,
            runaway_growth_factor: 10.0,
            trend_tolerance: 0.1,
        }
    }
}

/// Weights of the three score components.
///
/// Weights are normalised by their sum, so only their ratios matter.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Structure and balance.
    pub balance: f64,
    /// Species survival.
    pub survival: f64,
    /// Population stability.
    pub stability: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            balance: 0.30,
            survival: 0.40,
            stability: 0.30,
        }
    }
}

/// Metric values below which feedback is generated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedbackThresholds {
    /// Biodiversity threshold.
    pub biodiversity: f64,
    /// Stability threshold.
    pub stability: f64,
    /// Sustainability threshold.
    pub sustainability: f64,
    /// Trophic efficiency threshold.
    pub trophic_efficiency: f64,
}

impl Default for FeedbackThresholds {
    fn default() -> Self {
        Self {
            biodiversity: 0.5,
            stability: 0.6,
            sustainability: 1.0,
            trophic_efficiency: 0.1,
        }
    }
}

impl FeedbackThresholds {
    /// Threshold for one feedback area.
    pub const fn for_area(&self, area: ecosim_types::FeedbackArea) -> f64 {
        use ecosim_types::FeedbackArea;
        match area {
            FeedbackArea::Biodiversity => self.biodiversity,
            FeedbackArea::Stability => self.stability,
            FeedbackArea::Sustainability => self.sustainability,
            FeedbackArea::TrophicEfficiency => self.trophic_efficiency,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_attempt_timeout_ms() -> u64 {
    1_800_000
}

fn default_log_level() -> String {
    "info".to_owned()
}
