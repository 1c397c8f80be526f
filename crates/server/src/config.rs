use std::path::PathBuf;

use serde::Deserialize;

/// Server configuration, read from `NGCF_*` environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Directory holding movies.dat, the id mappings, graph_adj.dat and model.json
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Recommendations per response
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity for a title match
    #[serde(default = "default_match_cutoff")]
    pub match_cutoff: f64,
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_top_k() -> usize {
    10
}

fn default_match_cutoff() -> f64 {
    lookup::DEFAULT_CUTOFF
}

impl Config {
    /// Load configuration from the environment, after reading `.env` if present
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Load configuration from explicit key/value pairs
    pub fn from_vars<I>(vars: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed("NGCF_")
            .from_iter::<_, Config>(vars)
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
