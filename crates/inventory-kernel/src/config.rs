//! Configuration for the inventory kernel

use inventory_types::DEFAULT_BULGE_MARGIN;
use serde::{Deserialize, Serialize};

/// Main kernel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Mutation guard policy
    #[serde(default)]
    pub guard: GuardConfig,

    /// Overload scanning and container breaking
    #[serde(default)]
    pub overload: OverloadConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How manual deletions are treated by the guard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Deletions always pass
    #[default]
    Unenforced,
    /// Deletions follow the create rule: interaction-originated ones are denied
    SameAsCreate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    #[serde(default)]
    pub delete_policy: DeletePolicy,
}

/// Which committed updates start an overload scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanTrigger {
    #[default]
    EveryUpdate,
    /// Only updates touching quantity, weight, capacity or contents weight
    WeightRelevant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverloadConfig {
    /// Width of the bulging band below capacity
    #[serde(default = "default_bulge_margin")]
    pub bulge_margin: f64,

    #[serde(default)]
    pub scan_trigger: ScanTrigger,

    /// Sound played when a container bursts
    #[serde(default = "default_break_sound")]
    pub break_sound: String,

    /// Appended to the container name to name the remnant
    #[serde(default = "default_broken_suffix")]
    pub broken_suffix: String,

    #[serde(default = "default_broken_description")]
    pub broken_description: String,
}

impl Default for OverloadConfig {
    fn default() -> Self {
        Self {
            bulge_margin: default_bulge_margin(),
            scan_trigger: ScanTrigger::default(),
            break_sound: default_break_sound(),
            broken_suffix: default_broken_suffix(),
            broken_description: default_broken_description(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_bulge_margin() -> f64 {
    DEFAULT_BULGE_MARGIN
}

fn default_break_sound() -> String {
    "sounds/glass-break.mp3".to_string()
}

fn default_broken_suffix() -> String {
    " (Broken)".to_string()
}

fn default_broken_description() -> String {
    "This container shattered from excess weight.".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl KernelConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `INVGUARD__SECTION__KEY` environment variables.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&KernelConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("INVGUARD")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert_eq!(config.guard.delete_policy, DeletePolicy::Unenforced);
        assert_eq!(config.overload.bulge_margin, 5.0);
        assert_eq!(config.overload.scan_trigger, ScanTrigger::EveryUpdate);
        assert_eq!(config.overload.broken_suffix, " (Broken)");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: KernelConfig =
            serde_json::from_str(r#"{"overload": {"bulge_margin": 2.5}}"#).unwrap();
        assert_eq!(config.overload.bulge_margin, 2.5);
        assert_eq!(config.overload.break_sound, "sounds/glass-break.mp3");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[guard]\ndelete_policy = \"same_as_create\"\n\n[overload]\nscan_trigger = \"weight_relevant\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = KernelConfig::load(Some(&path)).unwrap();
        assert_eq!(config.guard.delete_policy, DeletePolicy::SameAsCreate);
        assert_eq!(config.overload.scan_trigger, ScanTrigger::WeightRelevant);
        assert_eq!(config.overload.bulge_margin, 5.0);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = KernelConfig::load(None).unwrap();
        assert_eq!(config.overload.broken_description, default_broken_description());
    }
}
