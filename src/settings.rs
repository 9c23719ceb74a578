use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::renderer::MAX_SHADOW_CASTERS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSettings {
    #[serde(default = "PipelineSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default = "PipelineSettings::default_max_shadow_casters")]
    pub max_shadow_casters: u32,
    #[serde(default)]
    pub log_frame_stats: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: Self::default_shadow_map_size(),
            max_shadow_casters: Self::default_max_shadow_casters(),
            log_frame_stats: false,
        }
    }
}

impl PipelineSettings {
    pub fn load() -> Self {
        Self::load_from_path("pipeline.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<PipelineSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded pipeline settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default pipeline settings.",
                        path, err
                    );
                    PipelineSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Pipeline settings file {:?} not found. Using default settings.",
                    path
                );
                PipelineSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default pipeline settings.",
                    path, err
                );
                PipelineSettings::default()
            }
        }
    }

    fn validate(mut self) -> Self {
        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default value.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.max_shadow_casters == 0 || self.max_shadow_casters > MAX_SHADOW_CASTERS as u32 {
            warn!(
                "Shadow caster count must be within 1..={}. Using default value.",
                MAX_SHADOW_CASTERS
            );
            self.max_shadow_casters = Self::default_max_shadow_casters();
        }

        self
    }

    const fn default_shadow_map_size() -> u32 {
        2048
    }

    const fn default_max_shadow_casters() -> u32 {
        MAX_SHADOW_CASTERS as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let settings: PipelineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.shadow_map_size, 2048);
        assert!(!settings.log_frame_stats);
    }

    #[test]
    fn out_of_range_caster_count_is_rejected() {
        let settings = PipelineSettings {
            max_shadow_casters: 99,
            ..PipelineSettings::default()
        }
        .validate();
        assert_eq!(settings.max_shadow_casters, MAX_SHADOW_CASTERS as u32);
    }
}
