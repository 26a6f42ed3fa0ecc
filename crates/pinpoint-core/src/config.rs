//! Viewer configuration: TOML defaults plus URL query overrides

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interaction::ModifierKey;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidDistance { name: &'static str, value: f32 },
    #[error("min_distance ({min}) must be below max_distance ({max})")]
    BadRange { min: f32, max: f32 },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    #[error("{name} must be a positive finite number, got {value}")]
    InvalidSize { name: &'static str, value: f32 },
    #[error("grid.half_lines must be at most {max}, got {value}")]
    TooManyGridLines { value: u32, max: u32 },
}

/// Upper bound on grid lines per side of the origin
pub const MAX_GRID_HALF_LINES: u32 = 500;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub interaction: InteractionConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub markers: MarkerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Closest the camera may zoom to its focus point
    #[serde(default = "default_min_distance")]
    pub min_distance: f32,
    /// Farthest the camera may zoom out
    #[serde(default = "default_max_distance")]
    pub max_distance: f32,
    #[serde(default = "default_initial_distance")]
    pub initial_distance: f32,
    /// Radians per pixel of drag
    #[serde(default = "default_sensitivity")]
    pub sensitivity: f32,
    #[serde(default = "default_zoom_speed")]
    pub zoom_speed: f32,
    /// Zoom/pan smoothing, higher is snappier
    #[serde(default = "default_smooth_factor")]
    pub smooth_factor: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_distance: default_min_distance(),
            max_distance: default_max_distance(),
            initial_distance: default_initial_distance(),
            sensitivity: default_sensitivity(),
            zoom_speed: default_zoom_speed(),
            smooth_factor: default_smooth_factor(),
        }
    }
}

fn default_min_distance() -> f32 {
    1.0
}

fn default_max_distance() -> f32 {
    50.0
}

fn default_initial_distance() -> f32 {
    6.0
}

fn default_sensitivity() -> f32 {
    0.005
}

fn default_zoom_speed() -> f32 {
    0.1
}

fn default_smooth_factor() -> f32 {
    0.15
}

impl CameraConfig {
    /// Clamp a camera distance into the configured bounds
    pub fn clamp_distance(&self, distance: f32) -> f32 {
        distance.clamp(self.min_distance, self.max_distance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    /// Modifier that switches a click from navigation to annotation
    #[serde(default)]
    pub modifier: ModifierKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Lines on each side of the origin
    #[serde(default = "default_half_lines")]
    pub half_lines: u32,
    #[serde(default = "default_spacing")]
    pub spacing: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            half_lines: default_half_lines(),
            spacing: default_spacing(),
        }
    }
}

fn default_half_lines() -> u32 {
    10
}

fn default_spacing() -> f32 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_marker_radius")]
    pub radius: f32,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            radius: default_marker_radius(),
        }
    }
}

fn default_marker_radius() -> f32 {
    0.04
}

/// Query parameters that are requests rather than settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryRequests {
    /// `?model=` URL to import at startup
    pub model_url: Option<String>,
}

impl ViewerConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        for (name, value) in [
            ("min_distance", cam.min_distance),
            ("max_distance", cam.max_distance),
            ("initial_distance", cam.initial_distance),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidDistance { name, value });
            }
        }
        if cam.min_distance >= cam.max_distance {
            return Err(ConfigError::BadRange {
                min: cam.min_distance,
                max: cam.max_distance,
            });
        }

        for (name, value) in [("grid.spacing", self.grid.spacing), ("markers.radius", self.markers.radius)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidSize { name, value });
            }
        }
        if self.grid.half_lines > MAX_GRID_HALF_LINES {
            return Err(ConfigError::TooManyGridLines {
                value: self.grid.half_lines,
                max: MAX_GRID_HALF_LINES,
            });
        }
        Ok(())
    }

    /// Apply decoded `key=value` pairs from the page URL
    ///
    /// Unknown keys are skipped. A bad value is logged and leaves the
    /// setting as it was; so does an override that breaks validation.
    pub fn apply_query<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> QueryRequests {
        let mut requests = QueryRequests::default();

        for (key, value) in pairs {
            let before = self.clone();
            let applied = match key {
                "model" => {
                    if !value.trim().is_empty() {
                        requests.model_url = Some(value.trim().to_string());
                    }
                    continue;
                }
                "min_distance" => parse_f32(key, value).map(|v| self.camera.min_distance = v),
                "max_distance" => parse_f32(key, value).map(|v| self.camera.max_distance = v),
                "distance" => parse_f32(key, value).map(|v| self.camera.initial_distance = v),
                "modifier" => value
                    .parse::<ModifierKey>()
                    .map(|m| self.interaction.modifier = m)
                    .map_err(|_| invalid(key, value)),
                _ => continue,
            };

            if let Err(e) = applied.and_then(|_| self.validate()) {
                tracing::warn!("Ignoring URL parameter {}={}: {}", key, value, e);
                *self = before;
            }
        }

        self.camera.initial_distance = self.camera.clamp_distance(self.camera.initial_distance);
        requests
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.trim().parse::<f32>().map_err(|_| invalid(key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ViewerConfig::default();
        assert_eq!(config.camera.min_distance, 1.0);
        assert_eq!(config.camera.max_distance, 50.0);
        assert_eq!(config.interaction.modifier, ModifierKey::Shift);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config = ViewerConfig::from_toml_str(
            r#"
            [camera]
            max_distance = 20.0

            [interaction]
            modifier = "alt"
            "#,
        )
        .unwrap();
        assert_eq!(config.camera.max_distance, 20.0);
        assert_eq!(config.camera.min_distance, 1.0);
        assert_eq!(config.interaction.modifier, ModifierKey::Alt);
        assert_eq!(config.grid.half_lines, 10);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = ViewerConfig::from_toml_str(
            r#"
            [camera]
            min_distance = 10.0
            max_distance = 5.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::BadRange { .. }));
    }

    #[test]
    fn test_malformed_toml() {
        let err = ViewerConfig::from_toml_str("[camera\nmin_distance = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_query_overrides() {
        let mut config = ViewerConfig::default();
        let requests = config.apply_query([
            ("min_distance", "0.5"),
            ("max_distance", "10"),
            ("modifier", "ctrl"),
            ("model", "https://example.com/robot.glb"),
            ("utm_source", "newsletter"),
        ]);

        assert_eq!(config.camera.min_distance, 0.5);
        assert_eq!(config.camera.max_distance, 10.0);
        assert_eq!(config.interaction.modifier, ModifierKey::Control);
        assert_eq!(requests.model_url.as_deref(), Some("https://example.com/robot.glb"));
        // Initial distance pulled back inside the new bounds
        assert_eq!(config.camera.initial_distance, 6.0);
    }

    #[test]
    fn test_bad_query_values_ignored() {
        let mut config = ViewerConfig::default();
        config.apply_query([
            ("min_distance", "abc"),
            ("max_distance", "-3"),
            ("min_distance", "80"),
            ("modifier", "hyper"),
        ]);
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn test_initial_distance_clamped() {
        let mut config = ViewerConfig::default();
        config.apply_query([("max_distance", "4")]);
        assert_eq!(config.camera.initial_distance, 4.0);
    }

    #[test]
    fn test_degenerate_grid_and_markers_rejected() {
        let err = ViewerConfig::from_toml_str("[grid]\nspacing = 0.0").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize { name: "grid.spacing", .. }));

        let err = ViewerConfig::from_toml_str("[markers]\nradius = -0.1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize { name: "markers.radius", .. }));

        let err = ViewerConfig::from_toml_str("[markers]\nradius = nan").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize { .. }));
    }

    #[test]
    fn test_grid_half_lines_capped() {
        let err = ViewerConfig::from_toml_str("[grid]\nhalf_lines = 4294967295").unwrap_err();
        assert!(matches!(err, ConfigError::TooManyGridLines { value: u32::MAX, .. }));

        let config = ViewerConfig::from_toml_str(&format!("[grid]\nhalf_lines = {}", MAX_GRID_HALF_LINES)).unwrap();
        assert_eq!(config.grid.half_lines, MAX_GRID_HALF_LINES);
    }

    #[test]
    fn test_legacy_model_section_ignored() {
        let config = ViewerConfig::from_toml_str("[model]\nextension = \"obj\"").unwrap();
        assert_eq!(config, ViewerConfig::default());
    }
}
