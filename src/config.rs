//! Configuration management for the DTMF relay

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::protocols::dtmf::{
    DEFAULT_DURATION, DEFAULT_INTER_TONE_GAP, MAX_DURATION, MIN_DURATION, MIN_INTER_TONE_GAP,
};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub dtmf: DtmfConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DtmfConfig {
    /// Tone length used when a send does not pick one (ms)
    pub default_duration: u32,
    /// Pause between successive tones (ms)
    pub inter_tone_gap: u32,
}

impl Default for DtmfConfig {
    fn default() -> Self {
        Self {
            default_duration: DEFAULT_DURATION,
            inter_tone_gap: DEFAULT_INTER_TONE_GAP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            format: LogFormat::Full,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogFormat {
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "compact")]
    Compact,
    #[serde(rename = "full")]
    Full,
}

impl RelayConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&contents)
            .map_err(|e| Error::parse(format!("Invalid TOML: {}", e)))?;
        Ok(config)
    }

    /// Defaults overridden by `DTMF_RELAY__<SECTION>__<KEY>` variables
    pub fn load_from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default_config())?)
            .add_source(
                config::Environment::with_prefix("DTMF_RELAY")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = settings.build()?;
        let relay_config = config.try_deserialize()?;
        Ok(relay_config)
    }

    pub fn validate(&self) -> Result<()> {
        let duration = self.dtmf.default_duration;
        if !(MIN_DURATION..=MAX_DURATION).contains(&duration) {
            return Err(Error::parse(format!(
                "DTMF default duration {} outside {}-{} ms",
                duration, MIN_DURATION, MAX_DURATION
            )));
        }

        if self.dtmf.inter_tone_gap < MIN_INTER_TONE_GAP {
            return Err(Error::parse(format!(
                "DTMF inter-tone gap {} below {} ms",
                self.dtmf.inter_tone_gap, MIN_INTER_TONE_GAP
            )));
        }

        crate::utils::logger::parse_log_level(&self.logging.level)?;

        Ok(())
    }

    pub fn default_config() -> Self {
        Self {
            dtmf: DtmfConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
