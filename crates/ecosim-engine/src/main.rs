//! Command-line runner for the ecosystem evaluation engine.
//!
//! Evaluates one attempt read from a JSON file and prints the resulting
//! `SimulationResult` as JSON on stdout. Logs go to stderr.
//!
//! # Startup Sequence
//!
//! 1. Parse arguments: `ecosim-engine <scenario.json> [config.yaml]`
//! 2. Load configuration from the given path, else `ecosim-config.yaml`
//! 3. Initialize structured logging (tracing)
//! 4. Read and parse the scenario
//! 5. Evaluate under the configured attempt timeout
//! 6. Print the result

mod error;

use std::path::{Path, PathBuf};

use ecosim_core::Evaluator;
use ecosim_core::config::{EngineConfig, LoggingConfig};
use ecosim_types::SimulationState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file read from the working directory when no path is given.
const DEFAULT_CONFIG_PATH: &str = "ecosim-config.yaml";

/// Parsed command-line arguments.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    scenario: PathBuf,
    config: Option<PathBuf>,
}

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the arguments, configuration, scenario, or
/// evaluation fail.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse arguments.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    // 2. Load configuration.
    let config = load_config(invocation.config.as_deref())?;

    // 3. Initialize structured logging.
    init_tracing(&config.logging);
    info!(
        scenario = %invocation.scenario.display(),
        attempt_timeout_ms = config.evaluation.attempt_timeout_ms,
        "ecosim-engine starting"
    );

    // 4. Read the scenario.
    let raw = read_scenario(&invocation.scenario)?;
    info!(attempt_id = %raw.id, species = raw.species.len(), "Scenario loaded");

    // 5. Evaluate.
    let evaluator = Evaluator::new(config);
    let deadline = evaluator.default_deadline();
    info!(
        ticks = evaluator.config().simulation.ticks_for(raw.duration),
        "Evaluating attempt"
    );
    let result = evaluator
        .evaluate(raw, deadline)
        .await
        .map_err(EngineError::from)?;

    // 6. Print the result.
    println!("{}", serde_json::to_string_pretty(&result)?);
    info!(score = result.score, "ecosim-engine finished");

    Ok(())
}

fn parse_args(args: &[String]) -> Result<Invocation, EngineError> {
    match args {
        [scenario] => Ok(Invocation {
            scenario: PathBuf::from(scenario),
            config: None,
        }),
        [scenario, config] => Ok(Invocation {
            scenario: PathBuf::from(scenario),
            config: Some(PathBuf::from(config)),
        }),
        [] => Err(EngineError::Usage {
            message: "missing scenario path".to_owned(),
        }),
        _ => Err(EngineError::Usage {
            message: format!("expected at most 2 arguments, got {}", args.len()),
        }),
    }
}

/// Load configuration from `explicit`, or from `ecosim-config.yaml` when
/// present, or fall back to defaults.
fn load_config(explicit: Option<&Path>) -> Result<EngineConfig, EngineError> {
    if let Some(path) = explicit {
        return Ok(EngineConfig::from_file(path)?);
    }
    let default_path = Path::new(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        Ok(EngineConfig::from_file(default_path)?)
    } else {
        let mut config = EngineConfig::default();
        config.evaluation.apply_env_overrides();
        Ok(config)
    }
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn read_scenario(path: &Path) -> Result<SimulationState, EngineError> {
    let contents = std::fs::read_to_string(path).map_err(|source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn scenario_only() {
        let invocation = parse_args(&args(&["reef.json"])).unwrap();
        assert_eq!(invocation.scenario, PathBuf::from("reef.json"));
        assert!(invocation.config.is_none());
    }

    #[test]
    fn scenario_and_config() {
        let invocation = parse_args(&args(&["reef.json", "custom.yaml"])).unwrap();
        assert_eq!(invocation.config, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn missing_scenario_is_usage_error() {
        let err = parse_args(&[]).unwrap_err();
        assert!(matches!(err, EngineError::Usage { .. }));
    }

    #[test]
    fn too_many_arguments_is_usage_error() {
        let err = parse_args(&args(&["a", "b", "c"])).unwrap_err();
        assert!(err.to_string().contains("got 3"));
    }

    #[test]
    fn missing_scenario_file_is_io_error() {
        let err = read_scenario(Path::new("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[test]
    fn missing_explicit_config_is_config_error() {
        let err = load_config(Some(Path::new("does-not-exist.yaml"))).unwrap_err();
        assert!(matches!(err, EngineError::Config { .. }));
    }
}
