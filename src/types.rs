use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::{CropError, Result};

/// Parameters of the edge map preparation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    pub canny_low: f32,
    pub canny_high: f32,
    pub dilate_iterations: u8,
    pub erode_iterations: u8,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        // Low threshold catches faint page edges on plain backgrounds
        Self {
            canny_low: 10.0,
            canny_high: 180.0,
            dilate_iterations: 1,
            erode_iterations: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectFilterConfig {
    /// Raw contour area floor in square pixels.
    pub min_area: f64,
    /// Approximation tolerance as a fraction of the contour perimeter.
    pub approx_factor: f64,
    pub min_angle: f64,
    pub max_angle: f64,
}

impl Default for RectFilterConfig {
    fn default() -> Self {
        Self {
            min_area: 200.0,
            approx_factor: 0.05,
            min_angle: 75.0,
            max_angle: 105.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonFilterConfig {
    pub min_area: f64,
    pub approx_factor: f64,
    pub min_vertices: usize,
}

impl Default for PolygonFilterConfig {
    fn default() -> Self {
        Self {
            min_area: 200.0,
            approx_factor: 0.015,
            min_vertices: 4,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropperConfig {
    pub outline: OutlineConfig,
    pub rect: RectFilterConfig,
    pub polygon: PolygonFilterConfig,
}

impl CropperConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: CropperConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let o = &self.outline;
        if !(o.canny_low >= 0.0 && o.canny_low <= o.canny_high) {
            return Err(CropError::Config(format!(
                "canny thresholds must satisfy 0 <= low <= high, got {} / {}",
                o.canny_low, o.canny_high
            )));
        }

        for (name, factor) in [
            ("rect.approx_factor", self.rect.approx_factor),
            ("polygon.approx_factor", self.polygon.approx_factor),
        ] {
            if !(factor > 0.0 && factor.is_finite()) {
                return Err(CropError::Config(format!("{} must be positive, got {}", name, factor)));
            }
        }

        for (name, area) in [
            ("rect.min_area", self.rect.min_area),
            ("polygon.min_area", self.polygon.min_area),
        ] {
            if !(area >= 0.0) {
                return Err(CropError::Config(format!("{} must be non-negative, got {}", name, area)));
            }
        }

        if !(self.rect.min_angle <= self.rect.max_angle) {
            return Err(CropError::Config(format!(
                "angle range [{}, {}] is empty",
                self.rect.min_angle, self.rect.max_angle
            )));
        }

        if self.polygon.min_vertices < 3 {
            return Err(CropError::Config(format!(
                "polygon.min_vertices must be at least 3, got {}",
                self.polygon.min_vertices
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = CropperConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rect.min_area, 200.0);
        assert_eq!(cfg.rect.approx_factor, 0.05);
        assert_eq!(cfg.polygon.approx_factor, 0.015);
        assert_eq!(cfg.outline.canny_low, 10.0);
        assert_eq!(cfg.outline.canny_high, 180.0);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: CropperConfig = serde_json::from_str(r#"{"rect": {"min_area": 500.0}}"#).unwrap();
        assert_eq!(cfg.rect.min_area, 500.0);
        assert_eq!(cfg.rect.max_angle, 105.0);
        assert_eq!(cfg.polygon, PolygonFilterConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = CropperConfig::default();
        cfg.rect.approx_factor = 0.0;
        assert!(matches!(cfg.validate(), Err(CropError::Config(_))));

        let mut cfg = CropperConfig::default();
        cfg.outline.canny_low = 200.0;
        assert!(cfg.validate().is_err());

        let mut cfg = CropperConfig::default();
        cfg.rect.min_angle = 110.0;
        assert!(cfg.validate().is_err());

        let mut cfg = CropperConfig::default();
        cfg.polygon.min_vertices = 2;
        assert!(cfg.validate().is_err());

        let mut cfg = CropperConfig::default();
        cfg.polygon.min_area = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let path = std::env::temp_dir().join(format!("cropper_cfg_{}.json", std::process::id()));
        std::fs::write(&path, r#"{"outline": {"canny_low": 20.0}}"#).unwrap();
        let cfg = CropperConfig::from_json_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(cfg.outline.canny_low, 20.0);
        assert_eq!(cfg.outline.canny_high, 180.0);
    }
}
