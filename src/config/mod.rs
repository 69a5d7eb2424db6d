//! Configuration types for the scan pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for resampling point sets to a fixed cardinality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Number of points in every output tensor
    #[serde(default = "default_target_points")]
    pub target_points: usize,

    /// Seed for the sampling RNG; unset draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_target_points() -> usize {
    8192
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            target_points: default_target_points(),
            seed: None,
        }
    }
}

/// Configuration for schema extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Replace non-spatial channels with three zero channels so that both
    /// schemas produce a uniform 6-channel tensor
    #[serde(default)]
    pub color_padding: bool,
}

/// Configuration for leg merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    /// File extension of leg files within a session directory
    #[serde(default = "default_leg_extension")]
    pub leg_extension: String,

    /// Write one row file per component id next to the merged artifact
    #[serde(default)]
    pub export_components: bool,
}

fn default_leg_extension() -> String {
    "xyz".to_string()
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            leg_extension: default_leg_extension(),
            export_components: false,
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub formats: FormatConfig,

    #[serde(default)]
    pub merge: MergeConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sampling_config() {
        let config = SamplingConfig::default();
        assert_eq!(config.target_points, 8192);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_default_pipeline_config() {
        let config = PipelineConfig::default();
        assert!(!config.formats.color_padding);
        assert_eq!(config.merge.leg_extension, "xyz");
        assert!(!config.merge.export_components);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "sampling:\n  target_points: 1024\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.sampling.target_points, 1024);
        assert_eq!(config.sampling.seed, None);
        assert_eq!(config.merge.leg_extension, "xyz");
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let mut config = PipelineConfig::default();
        config.sampling.target_points = 2048;
        config.sampling.seed = Some(7);
        config.formats.color_padding = true;

        config.to_yaml(&path).unwrap();
        let loaded = PipelineConfig::from_yaml(&path).unwrap();

        assert_eq!(loaded.sampling.target_points, 2048);
        assert_eq!(loaded.sampling.seed, Some(7));
        assert!(loaded.formats.color_padding);
    }
}
