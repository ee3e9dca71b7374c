// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::infra::errors::BenchError;
use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub dataset: DatasetConfig,

    #[serde(default)]
    pub repair: RepairConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,

    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub producer: ProducerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Dataset JSON file. Required for `solve`, usually given on the CLI.
    pub path: Option<PathBuf>,
    pub split: String,
    /// Independent attempts per problem.
    pub num_iterations: u32,
    pub results_path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            split: "valid".into(),
            num_iterations: 1,
            results_path: PathBuf::from("solution_database.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Round cap for the AI-test repair stage.
    pub max_allowed_calls: u32,
    /// Round cap for the public-test repair stage.
    pub max_public_calls: u32,
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_allowed_calls: 6,
            max_public_calls: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    pub max_concurrent_problems: usize,
    pub max_concurrent_iterations: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_problems: 4,
            max_concurrent_iterations: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub interpreter: String,
    pub args: Vec<String>,
    /// Per test case wall-clock limit.
    pub timeout_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
            args: vec![],
            timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            command: None,
            args: vec![],
            max_retries: 2,
            initial_delay_ms: 1_000,
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = paths::config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with.
    pub fn validate(&self) -> Result<(), BenchError> {
        if self.dataset.num_iterations == 0 {
            return Err(BenchError::Config(
                "dataset.num_iterations must be at least 1".into(),
            ));
        }
        if self.repair.max_allowed_calls == 0 {
            return Err(BenchError::Config(
                "repair.max_allowed_calls must be at least 1".into(),
            ));
        }
        if self.concurrency.max_concurrent_problems == 0
            || self.concurrency.max_concurrent_iterations == 0
        {
            return Err(BenchError::Config(
                "concurrency limits must be at least 1".into(),
            ));
        }
        if self.execution.timeout_ms == 0 {
            return Err(BenchError::Config(
                "execution.timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.dataset.split, "valid");
        assert_eq!(c.dataset.num_iterations, 1);
        assert_eq!(c.repair.max_allowed_calls, 6);
        assert_eq!(c.execution.interpreter, "python3");
        assert_eq!(c.producer.max_retries, 2);
        assert!(c.producer.command.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.dataset.num_iterations, 1);
        assert_eq!(config.concurrency.max_concurrent_problems, 4);
    }

    #[test]
    fn test_parse_partial_section() {
        let toml_str = r#"
[repair]
max_allowed_calls = 3
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.repair.max_allowed_calls, 3);
        assert_eq!(config.repair.max_public_calls, 4);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[dataset]
path = "data/valid_and_test.json"
split = "test"
num_iterations = 5
results_path = "out/results.json"

[repair]
max_allowed_calls = 8
max_public_calls = 2

[concurrency]
max_concurrent_problems = 16
max_concurrent_iterations = 5

[execution]
interpreter = "pypy3"
args = ["-X", "utf8"]
timeout_ms = 10000

[producer]
command = "solver-bridge"
args = ["--model", "large"]
max_retries = 4
initial_delay_ms = 250
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.dataset.path,
            Some(PathBuf::from("data/valid_and_test.json"))
        );
        assert_eq!(config.dataset.split, "test");
        assert_eq!(config.dataset.num_iterations, 5);
        assert_eq!(config.repair.max_public_calls, 2);
        assert_eq!(config.concurrency.max_concurrent_iterations, 5);
        assert_eq!(config.execution.args, vec!["-X", "utf8"]);
        assert_eq!(config.producer.command.as_deref(), Some("solver-bridge"));
        assert_eq!(config.producer.initial_delay_ms, 250);
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let mut c = Config::default();
        c.dataset.num_iterations = 0;
        assert!(matches!(c.validate(), Err(BenchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_calls() {
        let mut c = Config::default();
        c.repair.max_allowed_calls = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(
            deserialized.repair.max_allowed_calls,
            config.repair.max_allowed_calls
        );
        assert_eq!(deserialized.dataset.results_path, config.dataset.results_path);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file_validates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[dataset]\nnum_iterations = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
