//! Settings file: field, visuals and quality tier in one JSON document.
//!
//! Every section and field is optional; missing values take their defaults.
//! When `quality` is given, its particle count overrides `field.particle_count`.
//!
//! ```json
//! {
//!   "quality": "High",
//!   "field": { "bounds_radius": 10.0, "seed": 7 },
//!   "visuals": { "pulse_amount": 0.4 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::FieldConfig;
use crate::error::ConfigError;
use crate::quality::QualityTier;
use crate::visuals::VisualConfig;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub field: FieldConfig,
    pub visuals: VisualConfig,
    pub quality: Option<QualityTier>,
}

impl Settings {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.field_config().validate()?;
        Ok(settings)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::info!("loading settings from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Tier in effect: the explicit one, or [`QualityTier::default`].
    pub fn tier(&self) -> QualityTier {
        self.quality.unwrap_or_default()
    }

    /// Field configuration with the tier's particle count applied.
    pub fn field_config(&self) -> FieldConfig {
        self.field_config_with(None)
    }

    /// Field configuration after a runtime tier choice.
    ///
    /// `selected` wins over the file's `quality`; with neither,
    /// `field.particle_count` is used as written.
    pub fn field_config_with(&self, selected: Option<QualityTier>) -> FieldConfig {
        match selected.or(self.quality) {
            Some(tier) => self.field.clone().with_particle_count(tier.particle_count()),
            None => self.field.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let settings = Settings::from_json_str("{}").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.field_config(), FieldConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let settings = Settings::from_json_str(
            r#"{ "quality": "Low", "field": { "seed": 7 }, "visuals": { "opacity": 0.5 } }"#,
        )
        .unwrap();
        assert_eq!(settings.field.seed, 7);
        assert_eq!(settings.visuals.opacity, 0.5);
        assert_eq!(settings.field_config().particle_count, 64 * 64);
        assert_eq!(settings.tier(), QualityTier::Low);
    }

    #[test]
    fn test_explicit_count_survives_without_quality() {
        let settings = Settings::from_json_str(r#"{ "field": { "particle_count": 4096 } }"#).unwrap();
        assert_eq!(settings.field_config().particle_count, 4096);
        assert_eq!(settings.field_config_with(None).particle_count, 4096);
        assert_eq!(
            settings.field_config_with(Some(QualityTier::High)).particle_count,
            QualityTier::High.particle_count()
        );
    }

    #[test]
    fn test_selected_tier_overrides_file_tier() {
        let settings = Settings::from_json_str(r#"{ "quality": "Low" }"#).unwrap();
        assert_eq!(
            settings.field_config_with(Some(QualityTier::Medium)).particle_count,
            QualityTier::Medium.particle_count()
        );
    }

    #[test]
    fn test_invalid_field_is_rejected() {
        let err = Settings::from_json_str(r#"{ "field": { "particle_count": 1000 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonSquareParticleCount { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = Settings::from_json_str("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_round_trip() {
        let settings = Settings {
            quality: Some(QualityTier::High),
            ..Settings::default()
        };
        let json = settings.to_json_string().unwrap();
        assert_eq!(Settings::from_json_str(&json).unwrap(), settings);
    }
}
