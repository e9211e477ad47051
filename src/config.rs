//! Configuration parsing and validation for the gate server
//!
//! This module handles command-line argument parsing and validation using clap.
//! Every option can also be supplied through a `CHATGATE_*` environment variable.
use anyhow::anyhow;
use chatgate::client::PoolConfig;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// The port on which the gate will listen.
    #[arg(short = 'p', long, env = "CHATGATE_PORT", default_value_t = 3000)]
    pub port: u16,

    /// The JSON file from which to read the registered models.
    #[arg(short = 'f', long, env = "CHATGATE_MODELS")]
    pub models: PathBuf,

    /// Whether we should continue watching the models file for changes
    #[arg(short = 'w', long, env = "CHATGATE_WATCH", default_value_t = true)]
    pub watch: bool,

    /// Whether to enable the metrics endpoint.
    #[arg(short = 'm', long, env = "CHATGATE_METRICS", default_value_t = true)]
    pub metrics: bool,

    /// The port on which the metrics server will listen.
    #[arg(long, env = "CHATGATE_METRICS_PORT", default_value_t = 9090)]
    pub metrics_port: u16,

    /// The prefix to use for metrics.
    #[arg(long, env = "CHATGATE_METRICS_PREFIX", default_value = "chatgate")]
    pub metrics_prefix: String,

    /// Maximum number of idle connections kept alive per completion backend.
    #[arg(long, env = "CHATGATE_POOL_MAX_IDLE_PER_HOST", default_value_t = 100)]
    pub pool_max_idle_per_host: usize,

    /// How long (in seconds) to keep idle backend connections alive.
    #[arg(long, env = "CHATGATE_POOL_IDLE_TIMEOUT_SECS", default_value_t = 90)]
    pub pool_idle_timeout_secs: u64,
}

impl Config {
    pub fn validate(self) -> Result<Self, anyhow::Error> {
        if !self.models.exists() {
            return Err(anyhow!(
                "Models file '{}' does not exist",
                self.models.display()
            ));
        }
        if self.metrics && self.metrics_port == self.port {
            return Err(anyhow!(
                "Metrics port {} clashes with the gate port",
                self.metrics_port
            ));
        }
        Ok(self)
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            idle_timeout: Duration::from_secs(self.pool_idle_timeout_secs),
            max_idle_per_host: self.pool_max_idle_per_host,
        }
    }
}
