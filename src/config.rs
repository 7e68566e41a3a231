//! Configuration management
//!
//! Handles loading, parsing, and validating the TOML configuration file.
//! The idle threshold and case policy have no built-in default: both must be
//! set explicitly in the config file (or overridden on the command line).

use color_eyre::eyre::{self, Context, Result};
use serde::Deserialize;
use std::fs;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::idle::IdleSourceKind;
use crate::machine::DEFAULT_REARM_BELOW_MS;
use crate::resolve::MatchCase;

// ============================================================================
// Public Configuration Types
// ============================================================================

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
}

/// Global settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Substring of the target device's display name
    pub target: String,
    /// Idle seconds before switching
    pub threshold_secs: NonZeroU64,
    /// Case-sensitive substring matching
    pub match_case: bool,
    /// Idle value (ms) below which the user counts as active again
    pub rearm_below_ms: u64,
    pub idle_source: IdleSourceKind,
    pub notify_daemon: bool,
    pub notify_switch: bool,
    pub log_level: String,
    /// Size at which the daemon log is rotated
    pub log_max_bytes: u64,
}

/// Per-run overrides from the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<String>,
    pub threshold_secs: Option<u64>,
    pub match_case: Option<bool>,
}

// ============================================================================
// Config File Deserialization (TOML)
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    settings: SettingsFile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    target: String,
    threshold_secs: u64,
    match_case: bool,
    #[serde(default = "default_rearm_below_ms")]
    rearm_below_ms: u64,
    #[serde(default)]
    idle_source: IdleSourceKind,
    #[serde(default = "default_true")]
    notify_daemon: bool,
    #[serde(default = "default_true")]
    notify_switch: bool,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_log_max_bytes")]
    log_max_bytes: u64,
}

const MS_PER_SEC: NonZeroU64 = NonZeroU64::new(1000).unwrap();

fn default_true() -> bool {
    true
}

fn default_rearm_below_ms() -> u64 {
    DEFAULT_REARM_BELOW_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_max_bytes() -> u64 {
    1_000_000
}

/// Smallest accepted `log_max_bytes`; below this the log would rotate every few lines
const MIN_LOG_MAX_BYTES: u64 = 4096;

const DEFAULT_CONFIG: &str = r#"# IDLESW (Idle Switcher) Configuration
#
# Switches the default audio output to `target` after you have been away
# from keyboard and mouse for `threshold_secs` seconds. Switches once per
# idle period; any input re-arms it for the next one.

[settings]
target = "Headphones"      # Substring of the device name (see: idlesw list-sinks)
threshold_secs = 60        # Idle seconds before switching (required)
match_case = false         # Case-sensitive name matching (required)
rearm_below_ms = 1000      # Idle below this counts as fresh activity
idle_source = "auto"       # auto, wayland, xprintidle
notify_daemon = true       # Notifications for daemon start/stop
notify_switch = true       # Notification when the output is switched
log_level = "info"         # error, warn, info, debug, trace
log_max_bytes = 1000000    # Rotate the daemon log at this size (one backup kept)
"#;

// ============================================================================
// Config Implementation
// ============================================================================

impl Config {
    /// Load configuration from the default XDG config path
    ///
    /// Creates a commented default config on first run.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            info!("Creating default config at {:?}", config_path);
            Self::create_default_config(&config_path)?;
        }

        Self::load_from_path(&config_path)
    }

    /// Load configuration from an explicit path
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed or a value is out of range.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config_file: ConfigFile =
            toml::from_str(contents).context("Failed to parse config TOML")?;

        let s = config_file.settings;
        let threshold_secs = NonZeroU64::new(s.threshold_secs)
            .ok_or_else(|| eyre::eyre!("threshold_secs must be greater than 0"))?;

        let config = Config {
            settings: Settings {
                target: s.target,
                threshold_secs,
                match_case: s.match_case,
                rearm_below_ms: s.rearm_below_ms,
                idle_source: s.idle_source,
                notify_daemon: s.notify_daemon,
                notify_switch: s.notify_switch,
                log_level: s.log_level,
                log_max_bytes: s.log_max_bytes,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        match self.settings.log_level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            level => eyre::bail!(
                "Invalid log_level '{level}'. Must be: error, warn, info, debug, or trace"
            ),
        }

        if self.settings.log_max_bytes < MIN_LOG_MAX_BYTES {
            eyre::bail!(
                "log_max_bytes ({}) must be at least {MIN_LOG_MAX_BYTES}",
                self.settings.log_max_bytes
            );
        }

        if self.settings.target.trim().is_empty() {
            eyre::bail!("target must not be empty. Run 'idlesw list-sinks' to see device names");
        }

        let threshold_ms = self.threshold_ms().get();
        if self.settings.rearm_below_ms == 0 {
            eyre::bail!("rearm_below_ms must be greater than 0");
        }
        if self.settings.rearm_below_ms >= threshold_ms {
            eyre::bail!(
                "rearm_below_ms ({}) must be smaller than the idle threshold ({}ms)",
                self.settings.rearm_below_ms,
                threshold_ms
            );
        }

        Ok(())
    }

    /// Apply command-line overrides, re-validating the result
    ///
    /// # Errors
    /// Returns an error if an override produces an invalid configuration.
    pub fn with_overrides(mut self, overrides: Overrides) -> Result<Self> {
        if let Some(target) = overrides.target {
            self.settings.target = target;
        }
        if let Some(secs) = overrides.threshold_secs {
            self.settings.threshold_secs = NonZeroU64::new(secs)
                .ok_or_else(|| eyre::eyre!("--threshold must be greater than 0"))?;
        }
        if let Some(match_case) = overrides.match_case {
            self.settings.match_case = match_case;
        }
        self.validate()?;
        Ok(self)
    }

    /// Switch threshold in milliseconds
    #[must_use]
    pub fn threshold_ms(&self) -> NonZeroU64 {
        self.settings.threshold_secs.saturating_mul(MS_PER_SEC)
    }

    #[must_use]
    pub fn match_case(&self) -> MatchCase {
        MatchCase::from_flag(self.settings.match_case)
    }

    /// Get the XDG config path for IDLESW
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined or created.
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre::eyre!("Could not determine config directory"))?
            .join("idlesw");
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;
        Ok(config_dir.join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<()> {
        fs::write(path, DEFAULT_CONFIG)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        eprintln!("Created default config at: {}", path.display());
        eprintln!();
        eprintln!("Next steps:");
        eprintln!("  1. Run 'idlesw list-sinks' to see available audio outputs");
        eprintln!("  2. Set 'target' and 'threshold_secs' in the config file");
        eprintln!("  3. Run 'idlesw validate' to check your config");
        eprintln!("  4. Run 'idlesw daemon' to start");
        eprintln!();

        Ok(())
    }

    /// Print a human-readable summary of the configuration
    pub fn print_summary(&self) {
        let s = &self.settings;
        println!("✓ Configuration valid\n");

        println!("Settings:");
        println!("  target: {}", s.target);
        println!("  threshold_secs: {}", s.threshold_secs);
        println!("  match_case: {}", s.match_case);
        println!("  rearm_below_ms: {}", s.rearm_below_ms);
        println!("  idle_source: {}", s.idle_source);
        println!("  notify_daemon: {}", s.notify_daemon);
        println!("  notify_switch: {}", s.notify_switch);
        println!("  log_level: {}", s.log_level);
        println!("  log_max_bytes: {}", s.log_max_bytes);

        if let Ok(path) = Self::get_config_path() {
            println!("\nConfig: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ENV_LOCK, XdgTemp};

    const MINIMAL: &str = r#"
[settings]
target = "Headset"
threshold_secs = 15
match_case = true
"#;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        let s = &config.settings;
        assert_eq!(s.target, "Headset");
        assert_eq!(s.threshold_secs.get(), 15);
        assert!(s.match_case);
        assert_eq!(s.rearm_below_ms, 1000);
        assert_eq!(s.idle_source, IdleSourceKind::Auto);
        assert!(s.notify_daemon);
        assert!(s.notify_switch);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.log_max_bytes, 1_000_000);
        assert_eq!(config.threshold_ms().get(), 15_000);
        assert_eq!(config.match_case(), MatchCase::Sensitive);
    }

    #[test]
    fn test_threshold_is_required() {
        let err = Config::from_toml(
            r#"
[settings]
target = "Headset"
match_case = false
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("threshold_secs"));
    }

    #[test]
    fn test_match_case_is_required() {
        let err = Config::from_toml(
            r#"
[settings]
target = "Headset"
threshold_secs = 60
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("match_case"));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = Config::from_toml(&MINIMAL.replace("threshold_secs = 15", "threshold_secs = 0"))
            .unwrap_err();
        assert!(err.to_string().contains("greater than 0"));
    }

    #[test]
    fn test_rearm_must_be_below_threshold() {
        let toml = format!("{MINIMAL}rearm_below_ms = 15000\n");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("rearm_below_ms"));
    }

    #[test]
    fn test_empty_target_rejected() {
        let err = Config::from_toml(&MINIMAL.replace("\"Headset\"", "\"  \"")).unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let toml = format!("{MINIMAL}log_level = \"verbose\"\n");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_log_rotation_size_is_configurable() {
        let toml = format!("{MINIMAL}log_max_bytes = 65536\n");
        let config = Config::from_toml(&toml).unwrap();
        assert_eq!(config.settings.log_max_bytes, 65_536);
    }

    #[test]
    fn test_tiny_log_rotation_size_rejected() {
        let toml = format!("{MINIMAL}log_max_bytes = 100\n");
        let err = Config::from_toml(&toml).unwrap_err();
        assert!(err.to_string().contains("log_max_bytes"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let toml = format!("{MINIMAL}threshold = 30\n");
        assert!(Config::from_toml(&toml).is_err());
    }

    #[test]
    fn test_overrides_replace_settings() {
        let config = Config::from_toml(MINIMAL)
            .unwrap()
            .with_overrides(Overrides {
                target: Some("HDMI".to_string()),
                threshold_secs: Some(120),
                match_case: Some(false),
            })
            .unwrap();
        assert_eq!(config.settings.target, "HDMI");
        assert_eq!(config.threshold_ms().get(), 120_000);
        assert_eq!(config.match_case(), MatchCase::Insensitive);
    }

    #[test]
    fn test_override_zero_threshold_rejected() {
        let result = Config::from_toml(MINIMAL).unwrap().with_overrides(Overrides {
            threshold_secs: Some(0),
            ..Overrides::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_default_config_file_is_valid() {
        let config = Config::from_toml(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.settings.threshold_secs.get(), 60);
        assert!(!config.settings.match_case);
    }

    #[test]
    fn test_load_creates_default_config() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let xdg = XdgTemp::new();

        let config = Config::load().unwrap();

        assert!(xdg.path().join("idlesw").join("config.toml").exists());
        assert_eq!(config.settings.target, "Headphones");
    }
}
