//! Configuration for the extended support auditor

use core_config::aws::AwsConfig;
use core_config::{ConfigError, Environment, FromEnv, env_optional, env_or_default, env_parse_or};
use eyre::Result;
use std::path::PathBuf;

use crate::coordinator::DEFAULT_MAX_CONCURRENT_ACCOUNTS;

const DEFAULT_CHECKPOINT_PATH: &str = ".tmp_accounts_cache.json";
const DEFAULT_OUTPUT_DIR: &str = "./output";

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub aws: AwsConfig,
    /// Worker pool ceiling
    pub max_concurrent_accounts: usize,
    /// Accounts completed by an unfinished run
    pub checkpoint_path: PathBuf,
    /// Directory for timestamped reports
    pub output_dir: PathBuf,
    /// Where to write a Prometheus snapshot at exit
    pub metrics_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let max_concurrent_accounts =
            env_parse_or("MAX_CONCURRENT_ACCOUNTS", DEFAULT_MAX_CONCURRENT_ACCOUNTS)?;
        if max_concurrent_accounts == 0 {
            return Err(ConfigError::ParseError {
                key: "MAX_CONCURRENT_ACCOUNTS".to_string(),
                details: "must be at least 1".to_string(),
            }
            .into());
        }

        Ok(Config {
            environment: Environment::from_env(),
            aws: <AwsConfig as FromEnv>::from_env()?,
            max_concurrent_accounts,
            checkpoint_path: PathBuf::from(env_or_default("CHECKPOINT_PATH", DEFAULT_CHECKPOINT_PATH)),
            output_dir: PathBuf::from(env_or_default("OUTPUT_DIR", DEFAULT_OUTPUT_DIR)),
            metrics_file: env_optional("METRICS_FILE").map(PathBuf::from),
        })
    }
}
