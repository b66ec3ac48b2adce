use crate::error::{Result, ScenescribeError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scene detector tuning knobs, passed through to FFmpeg's scdet filter.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Scene change score threshold (0.0-100.0). Lower = more sensitive.
    pub threshold: f64,
    /// Minimum seconds between accepted scene changes.
    pub min_scene_duration: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            threshold: 10.0,
            min_scene_duration: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub detector: DetectorConfig,
    /// Default input folder for the split subcommand.
    pub split_input: PathBuf,
    /// Default output folder for the split subcommand.
    pub split_output: PathBuf,
    /// Default output folder for the transcribe subcommand.
    pub transcribe_output: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            detector: DetectorConfig::default(),
            split_input: PathBuf::from("vids"),
            split_output: PathBuf::from("vids-split"),
            transcribe_output: PathBuf::from("transcribed_scenes"),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str(&contents).map_err(|e| {
                    ScenescribeError::Config(format!(
                        "Failed to parse {}: {e}",
                        config_path.display()
                    ))
                })?;
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(threshold) = std::env::var("SCENESCRIBE_THRESHOLD") {
            if let Ok(t) = threshold.parse() {
                config.detector.threshold = t;
            }
        }
        if let Ok(min_dur) = std::env::var("SCENESCRIBE_MIN_SCENE_DURATION") {
            if let Ok(d) = min_dur.parse() {
                config.detector.min_scene_duration = d;
            }
        }

        Ok(config)
    }

    /// The transcribe pipeline needs an API key; splitting does not.
    pub fn validate_for_transcribe(&self) -> Result<()> {
        if self.openai_api_key.is_none() {
            return Err(ScenescribeError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-..."
                    .to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.detector.threshold <= 0.0 || self.detector.threshold > 100.0 {
            return Err(ScenescribeError::Config(format!(
                "Detector threshold must be in (0, 100], got {}",
                self.detector.threshold
            )));
        }
        if self.detector.min_scene_duration < 0.0 {
            return Err(ScenescribeError::Config(
                "Minimum scene duration cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("scenescribe").join("config.toml"))
    }
}
