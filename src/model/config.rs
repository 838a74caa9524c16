use serde::Deserialize;
use std::fs;
use std::path::Path;

const ENV_CONFIG_PATH: &str = "MAITRI_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// IVR call-flow tuning
#[derive(Debug, Clone, Deserialize)]
pub struct IvrConfig {
    /// Conversation turns allowed per call before the line is wrapped up
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Seconds of recording accepted for the first utterance
    #[serde(default = "default_initial_recording_secs")]
    pub initial_recording_secs: u32,
    /// Seconds of recording accepted for follow-up turns
    #[serde(default = "default_followup_recording_secs")]
    pub followup_recording_secs: u32,
    /// Seconds of recording accepted for the village-name capture
    #[serde(default = "default_village_recording_secs")]
    pub village_recording_secs: u32,
}

fn default_max_turns() -> u32 {
    5
}

fn default_initial_recording_secs() -> u32 {
    60
}

fn default_followup_recording_secs() -> u32 {
    30
}

fn default_village_recording_secs() -> u32 {
    10
}

impl Default for IvrConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            initial_recording_secs: default_initial_recording_secs(),
            followup_recording_secs: default_followup_recording_secs(),
            village_recording_secs: default_village_recording_secs(),
        }
    }
}

/// YAML configuration file structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub ivr: IvrConfig,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub ivr: IvrConfig,
    pub port: u16,
    pub host: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ivr: IvrConfig::default(),
            port: 8080,
            host: "127.0.0.1".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let config_path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let ivr = Self::load_config_file(&config_path)
            .map(|cf| cf.ivr)
            .unwrap_or_default();

        Self { ivr, port, host }
    }

    /// Load configuration from YAML file
    fn load_config_file(path: &str) -> Option<ConfigFile> {
        let path = Path::new(path);

        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return None;
        }

        match fs::read_to_string(path) {
            Ok(contents) => {
                let contents = contents.trim();
                if contents.is_empty() {
                    tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
                    return Some(ConfigFile::default());
                }

                match serde_yaml::from_str(contents) {
                    Ok(config) => {
                        tracing::info!(path = %path.display(), "Loaded configuration from file");
                        Some(config)
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to parse config file, using defaults");
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read config file, using defaults");
                None
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ivr_defaults() {
        let ivr = IvrConfig::default();
        assert_eq!(ivr.max_turns, 5);
        assert_eq!(ivr.initial_recording_secs, 60);
        assert_eq!(ivr.followup_recording_secs, 30);
        assert_eq!(ivr.village_recording_secs, 10);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cf: ConfigFile = serde_yaml::from_str("ivr:\n  max_turns: 3\n").unwrap();
        assert_eq!(cf.ivr.max_turns, 3);
        assert_eq!(cf.ivr.followup_recording_secs, 30);
    }
}
