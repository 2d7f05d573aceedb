//! CTest invocation configuration loaded from environment variables.

use std::env;

/// Development default values.
pub mod defaults {
    pub const CTEST_PROGRAM: &str = "ctest";
    pub const BUILD_CONFIGURATION: &str = "Debug";
}

/// Configuration for launching the external test runner.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the ctest executable (default: "ctest" on PATH)
    pub ctest_path: String,
    /// Parallel jobs passed as `-j<N>` (default: logical CPU count)
    pub jobs: usize,
    /// Build configuration passed as `-C <cfg>` (default: Debug)
    pub build_configuration: String,
    /// Extra arguments appended to every `ctest -T test` invocation
    pub extra_args: Vec<String>,
    /// Additional environment variables for the test process
    pub test_environment: Vec<(String, String)>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CTEST_PATH`: ctest executable (default: "ctest")
    /// - `CTEST_JOBS`: parallel jobs (default: logical CPU count)
    /// - `CTEST_BUILD_CONFIG`: build configuration (default: Debug)
    /// - `CTEST_EXTRA_ARGS`: whitespace-separated extra arguments
    pub fn from_env() -> Result<Self, ConfigError> {
        let ctest_path =
            env::var("CTEST_PATH").unwrap_or_else(|_| defaults::CTEST_PROGRAM.to_string());

        let jobs = match env::var("CTEST_JOBS") {
            Ok(v) => v
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue("CTEST_JOBS must be a valid number"))?,
            Err(_) => num_cpus::get(),
        };

        let build_configuration = env::var("CTEST_BUILD_CONFIG")
            .unwrap_or_else(|_| defaults::BUILD_CONFIGURATION.to_string());

        let extra_args = env::var("CTEST_EXTRA_ARGS")
            .map(|v| v.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let config = Config {
            ctest_path,
            jobs,
            build_configuration,
            extra_args,
            test_environment: Vec::new(),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.jobs == 0 {
            return Err(ConfigError::InvalidValue("CTEST_JOBS must be at least 1"));
        }
        if self.ctest_path.is_empty() {
            return Err(ConfigError::InvalidValue("CTEST_PATH must not be empty"));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            ctest_path: defaults::CTEST_PROGRAM.to_string(),
            jobs: num_cpus::get().max(1),
            build_configuration: defaults::BUILD_CONFIGURATION.to_string(),
            extra_args: Vec::new(),
            test_environment: Vec::new(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),
}
