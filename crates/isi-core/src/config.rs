//! `AnalysisConfig` (spec §3/§6.1): frozen, fully-required run configuration.
//!
//! No field has a default. A missing or out-of-range field is a
//! configuration error surfaced to the caller, never silently
//! substituted.

use serde::Deserialize;

use crate::error::{IsiError, Result};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub coherence_threshold: f32,
    pub magnitude_threshold: f32,
    pub smoothing_sigma: f32,
    pub vfs_threshold_sd: f32,
    pub ring_size_mm: f32,
    pub phase_filter_sigma: f32,
    /// Reserved: central differences are used for gradients regardless of
    /// this value (spec §9 open question).
    pub gradient_window_size: i32,
    pub response_threshold_percent: f32,
    pub area_min_size_mm2: f32,
}

#[derive(Deserialize, Default)]
struct RawAnalysisConfig {
    coherence_threshold: Option<f32>,
    magnitude_threshold: Option<f32>,
    smoothing_sigma: Option<f32>,
    vfs_threshold_sd: Option<f32>,
    ring_size_mm: Option<f32>,
    phase_filter_sigma: Option<f32>,
    gradient_window_size: Option<i32>,
    response_threshold_percent: Option<f32>,
    area_min_size_mm2: Option<f32>,
}

impl AnalysisConfig {
    pub fn from_toml_str(raw_toml: &str) -> Result<Self> {
        let raw: RawAnalysisConfig =
            toml::from_str(raw_toml).map_err(|e| IsiError::InvalidInput(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Accepts a plain key/value map, for a configuration provider that
    /// hands over parsed values rather than TOML text (spec §6.1's
    /// "configuration provider" consumed interface).
    pub fn from_map(map: &std::collections::HashMap<String, f64>) -> Result<Self> {
        let raw = RawAnalysisConfig {
            coherence_threshold: map.get("coherence_threshold").map(|&v| v as f32),
            magnitude_threshold: map.get("magnitude_threshold").map(|&v| v as f32),
            smoothing_sigma: map.get("smoothing_sigma").map(|&v| v as f32),
            vfs_threshold_sd: map.get("vfs_threshold_sd").map(|&v| v as f32),
            ring_size_mm: map.get("ring_size_mm").map(|&v| v as f32),
            phase_filter_sigma: map.get("phase_filter_sigma").map(|&v| v as f32),
            gradient_window_size: map.get("gradient_window_size").map(|&v| v as i32),
            response_threshold_percent: map.get("response_threshold_percent").map(|&v| v as f32),
            area_min_size_mm2: map.get("area_min_size_mm2").map(|&v| v as f32),
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawAnalysisConfig) -> Result<Self> {
        let config = AnalysisConfig {
            coherence_threshold: required(raw.coherence_threshold, "coherence_threshold")?,
            magnitude_threshold: required(raw.magnitude_threshold, "magnitude_threshold")?,
            smoothing_sigma: required(raw.smoothing_sigma, "smoothing_sigma")?,
            vfs_threshold_sd: required(raw.vfs_threshold_sd, "vfs_threshold_sd")?,
            ring_size_mm: required(raw.ring_size_mm, "ring_size_mm")?,
            phase_filter_sigma: required(raw.phase_filter_sigma, "phase_filter_sigma")?,
            gradient_window_size: required(raw.gradient_window_size, "gradient_window_size")?,
            response_threshold_percent: required(
                raw.response_threshold_percent,
                "response_threshold_percent",
            )?,
            area_min_size_mm2: required(raw.area_min_size_mm2, "area_min_size_mm2")?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        in_range(self.coherence_threshold, 0.0, 1.0, "coherence_threshold")?;
        non_negative(self.magnitude_threshold, "magnitude_threshold")?;
        non_negative(self.smoothing_sigma, "smoothing_sigma")?;
        non_negative(self.vfs_threshold_sd, "vfs_threshold_sd")?;
        positive(self.ring_size_mm, "ring_size_mm")?;
        non_negative(self.phase_filter_sigma, "phase_filter_sigma")?;
        in_range(
            self.response_threshold_percent,
            0.0,
            100.0,
            "response_threshold_percent",
        )?;
        positive(self.area_min_size_mm2, "area_min_size_mm2")?;
        Ok(())
    }
}

fn required<T>(value: Option<T>, name: &str) -> Result<T> {
    value.ok_or_else(|| IsiError::ConfigurationMissing(name.to_string()))
}

fn non_negative(value: f32, name: &str) -> Result<()> {
    if value < 0.0 {
        return Err(IsiError::InvalidInput(format!("{name} must be >= 0, got {value}")));
    }
    Ok(())
}

fn positive(value: f32, name: &str) -> Result<()> {
    if value <= 0.0 {
        return Err(IsiError::InvalidInput(format!("{name} must be > 0, got {value}")));
    }
    Ok(())
}

fn in_range(value: f32, lo: f32, hi: f32, name: &str) -> Result<()> {
    if value < lo || value > hi {
        return Err(IsiError::InvalidInput(format!(
            "{name} must be in [{lo}, {hi}], got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_toml() -> &'static str {
        r#"
        coherence_threshold = 0.3
        magnitude_threshold = 1.0
        smoothing_sigma = 2.0
        vfs_threshold_sd = 1.5
        ring_size_mm = 10.0
        phase_filter_sigma = 1.0
        gradient_window_size = 3
        response_threshold_percent = 50.0
        area_min_size_mm2 = 0.05
        "#
    }

    #[test]
    fn parses_complete_config() {
        let config = AnalysisConfig::from_toml_str(complete_toml()).unwrap();
        assert_eq!(config.ring_size_mm, 10.0);
    }

    #[test]
    fn missing_field_is_configuration_error() {
        let raw = "coherence_threshold = 0.3";
        let err = AnalysisConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, IsiError::ConfigurationMissing(_)));
    }

    #[test]
    fn out_of_range_coherence_threshold_is_rejected() {
        let raw = complete_toml().replace("coherence_threshold = 0.3", "coherence_threshold = 1.5");
        let err = AnalysisConfig::from_toml_str(&raw).unwrap_err();
        assert!(matches!(err, IsiError::InvalidInput(_)));
    }

    #[test]
    fn from_map_accepts_plain_key_value_pairs() {
        let mut map = std::collections::HashMap::new();
        map.insert("coherence_threshold".to_string(), 0.3);
        map.insert("magnitude_threshold".to_string(), 1.0);
        map.insert("smoothing_sigma".to_string(), 2.0);
        map.insert("vfs_threshold_sd".to_string(), 1.5);
        map.insert("ring_size_mm".to_string(), 10.0);
        map.insert("phase_filter_sigma".to_string(), 1.0);
        map.insert("gradient_window_size".to_string(), 3.0);
        map.insert("response_threshold_percent".to_string(), 50.0);
        map.insert("area_min_size_mm2".to_string(), 0.05);

        let config = AnalysisConfig::from_map(&map).unwrap();
        assert_eq!(config.gradient_window_size, 3);
        assert_eq!(config.ring_size_mm, 10.0);
    }

    #[test]
    fn from_map_missing_field_is_configuration_error() {
        let mut map = std::collections::HashMap::new();
        map.insert("coherence_threshold".to_string(), 0.3);
        let err = AnalysisConfig::from_map(&map).unwrap_err();
        assert!(matches!(err, IsiError::ConfigurationMissing(_)));
    }
}
