use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use loadtest::scenario::{DEFAULT_MAX_THINK_TIME, DEFAULT_MIN_THINK_TIME};

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: Option<String>,
    pub users: usize,

    #[serde(with = "humantime_serde")]
    pub duration: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub spawn_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Option<Duration>,

    pub think_time: ThinkTime,
    pub validate_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote: None,
            users: 1,
            duration: None,
            spawn_interval: Duration::ZERO,
            request_timeout: None,
            think_time: ThinkTime::default(),
            validate_response: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).context("failed to open config file")?;
        serde_yaml::from_reader(file).context("failed to parse config YAML")
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThinkTime {
    #[serde(with = "humantime_serde")]
    pub min: Duration,
    #[serde(with = "humantime_serde")]
    pub max: Duration,
}

impl Default for ThinkTime {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_THINK_TIME,
            max: DEFAULT_MAX_THINK_TIME,
        }
    }
}
