//! Model Parameters
//!
//! Parameter files are flat `key = value` lines read as a TOML table. A
//! missing or unparseable file falls back to the model's defaults.

use serde::de::DeserializeOwned;
use std::path::Path;

/// Parses parameters from text.
pub fn parse_params<P: DeserializeOwned>(text: &str) -> Result<P, toml::de::Error> {
    toml::from_str(text)
}

/// Loads parameters from `path`, substituting defaults on any failure.
pub fn load_params<P: DeserializeOwned + Default>(path: Option<&Path>) -> P {
    let Some(path) = path else {
        return P::default();
    };

    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Cannot read parameter file {:?}: {}; using defaults", path, e);
            return P::default();
        }
    };

    match parse_params(&text) {
        Ok(params) => {
            tracing::info!("Loaded parameters from {:?}", path);
            params
        }
        Err(e) => {
            tracing::warn!("Invalid parameter file {:?}: {}; using defaults", path, e);
            P::default()
        }
    }
}
