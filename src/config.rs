use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Number of items returned when the request doesn't ask for a limit
    #[serde(default = "default_limit")]
    pub default_limit: i64,
    /// Hard cap on the number of items a single request can ask for
    #[serde(default = "max_limit")]
    pub max_limit: i64,
    pub feeds: Vec<FeedConfig>,
}

fn default_limit() -> i64 {
    50
}

fn max_limit() -> i64 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}
