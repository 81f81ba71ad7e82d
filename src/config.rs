use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::predictor::DEFAULT_CONFIDENCE_BAND;

/// Server configuration, loadable from a JSON file. Every field has a
/// default so a partial file (or none at all) still yields a runnable
/// configuration; CLI flags override whatever the file provides.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub model_path: String,
    pub host: String,
    pub port: u16,
    pub confidence_band: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: "model_linear.safetensors".to_string(),
            host: "127.0.0.1".to_string(),
            port: 8080,
            confidence_band: DEFAULT_CONFIDENCE_BAND,
        }
    }
}

impl ServerConfig {
    pub fn load(config_path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        if !Path::new(config_path).exists() {
            return Err(format!("Config file not found at: {}", config_path).into());
        }

        let mut file = File::open(config_path)
            .map_err(|e| format!("Failed to open config file {}: {}", config_path, e))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| format!("Failed to read config file {}: {}", config_path, e))?;

        let config: ServerConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to deserialize JSON from {}: {}", config_path, e))?;

        Ok(config)
    }
}
