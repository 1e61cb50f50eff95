use crate::core_modules::classifier::ClassifierConfig;
use crate::core_modules::history::DEFAULT_HISTORY_CAPACITY;
use crate::core_modules::zone::ZoneRegistry;
use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration file, usually `pet_vision.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    /// Zones placed ahead of time. Unset zones simply disable their rule.
    #[serde(default)]
    pub zones: ZoneRegistry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Name reported for the tracked subject.
    #[serde(default = "default_pet_name")]
    pub pet_name: String,
    /// Display refresh rate the detection loop ticks at.
    #[serde(default = "default_display_fps")]
    pub display_fps: u32,
    /// A frame whose inference runs longer than this causes the next frame to be skipped.
    #[serde(default = "default_frame_budget_ms")]
    pub frame_budget_ms: u64,
    /// Capacity of the client-local activity buffer.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Capacity of the broadcast channels feeding subscribers.
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
}

fn default_pet_name() -> String { "Dog".to_string() }
fn default_display_fps() -> u32 { 60 }
fn default_frame_budget_ms() -> u64 { 250 }
fn default_history_capacity() -> usize { DEFAULT_HISTORY_CAPACITY }
fn default_bus_capacity() -> usize { 64 }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pet_name: default_pet_name(),
            display_fps: default_display_fps(),
            frame_budget_ms: default_frame_budget_ms(),
            history_capacity: default_history_capacity(),
            bus_capacity: default_bus_capacity(),
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.display_fps.max(1) as f64)
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Falls back to defaults when the file is missing or invalid.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.as_ref().display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.display_fps == 0 {
            return Err(ConfigError::Invalid {
                field: "session.display_fps",
                reason: "must be at least 1".into(),
            });
        }
        if self.session.pet_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "session.pet_name",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::classifier::AncillaryPolicy;
    use crate::core_modules::zone::{Zone, ZoneKind};

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.session.pet_name, "Dog");
        assert_eq!(config.session.history_capacity, 1000);
        assert_eq!(config.classifier, ClassifierConfig::default());
        assert!(config.zones.iter().next().is_none());
    }

    #[test]
    fn parses_sections() {
        let config = Config::from_toml(
            r#"
            [session]
            pet_name = "Biscuit"
            display_fps = 30

            [classifier]
            bed_zone_radius = 250.0
            ancillary_policy = "prefer-zones"

            [zones]
            bed = { x = 120.0, y = 340.0 }
            "#,
        )
        .unwrap();
        assert_eq!(config.session.pet_name, "Biscuit");
        assert_eq!(config.session.display_fps, 30);
        assert_eq!(config.classifier.bed_zone_radius, 250.0);
        assert_eq!(config.classifier.feeding_zone_radius, 150.0);
        assert_eq!(config.classifier.ancillary_policy, AncillaryPolicy::PreferZones);
        assert_eq!(config.zones.get(ZoneKind::Bed), Some(Zone::new(120.0, 340.0)));
        assert_eq!(config.zones.get(ZoneKind::Food), None);
    }

    #[test]
    fn rejects_zero_fps() {
        let err = Config::from_toml("[session]\ndisplay_fps = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "session.display_fps", .. }));
    }

    #[test]
    fn missing_file_falls_back_to_default() {
        let config = Config::load_or_default("/definitely/not/here.toml");
        assert_eq!(config.session.display_fps, 60);
    }
}
