use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::constants::{DEFAULT_NODE_COUNT, MAX_TICK_RATE_MS, TICK_RATE_MS};
use crate::error::{Error, Result};
use crate::locality::LocalityTier;

/// Terminal map of a simulated cluster with per-node SQL activity rates.
#[derive(Debug, Clone, Parser)]
#[command(name = "cluster_viz", version)]
pub struct Config {
    /// Number of simulated nodes
    #[arg(long, default_value_t = DEFAULT_NODE_COUNT)]
    pub nodes: usize,

    /// Milliseconds between node status refreshes
    #[arg(long, default_value_t = TICK_RATE_MS)]
    pub tick_ms: u64,

    /// Seed for the simulated workload
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Log rates instead of drawing the terminal map
    #[arg(long)]
    pub headless: bool,

    /// Stop a headless run after this many ticks (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    pub ticks: u64,

    /// Write logs here while the terminal map is shown
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Locality tier keys the map groups nodes by
    #[arg(long, value_delimiter = ',', default_values = ["region", "zone"])]
    pub tiers: Vec<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.nodes == 0 {
            return Err(Error::Config("--nodes must be at least 1".into()));
        }
        if self.tick_ms == 0 {
            return Err(Error::Config("--tick-ms must be positive".into()));
        }
        if self.tick_ms > MAX_TICK_RATE_MS {
            return Err(Error::Config(format!("--tick-ms must be at most {}", MAX_TICK_RATE_MS)));
        }
        if self.tiers.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::Config("--tiers must not contain empty keys".into()));
        }
        Ok(())
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Display tiers: keys only, values are filled in per locality.
    pub fn display_tiers(&self) -> Vec<LocalityTier> {
        self.tiers
            .iter()
            .map(|key| LocalityTier::new(key.trim(), ""))
            .collect()
    }
}
