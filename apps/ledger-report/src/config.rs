//! # Report Configuration
//!
//! Where the report looks for its branch, zone and default period.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (highest priority)                               │
//! │     --branch b1 --preset last-7-days                                    │
//! │                                                                         │
//! │  2. Environment Variables                                               │
//! │     REPAIRDESK_BRANCH_ID=b1                                             │
//! │     REPAIRDESK_UTC_OFFSET_MINUTES=420                                   │
//! │                                                                         │
//! │  3. TOML Config File                                                    │
//! │     ~/.config/ledger/ledger.toml (Linux)                                │
//! │     ~/Library/Application Support/com.repairdesk.ledger/ledger.toml     │
//! │                                                                         │
//! │  4. Default Values (lowest priority)                                    │
//! │     all branches, UTC+07:00, this-month                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [engine]
//! branch_id = "b1"           # or "all" for the multi-branch overview
//! utc_offset_minutes = 420   # UTC+07:00
//! default_preset = "this-month"
//!
//! [inventory]
//! warn_on_negative_stock = true
//! ```

use std::path::PathBuf;

use chrono::FixedOffset;
use repairdesk_core::aggregate::BranchScope;
use repairdesk_core::date_range::RangePreset;
use repairdesk_core::{zone_from_minutes, DEFAULT_UTC_OFFSET_MINUTES, MAX_UTC_OFFSET_MINUTES};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ReportError, ReportResult};

/// Branch id that selects every branch.
pub const ALL_BRANCHES: &str = "all";

// =============================================================================
// Engine Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Branch to report on, or [`ALL_BRANCHES`].
    #[serde(default = "default_branch_id")]
    pub branch_id: String,

    /// Offset of the shop's local time from UTC. Decides which calendar day
    /// a record belongs to.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,

    /// Preset used when no period is given on the command line.
    #[serde(default = "default_preset")]
    pub default_preset: String,
}

fn default_branch_id() -> String {
    ALL_BRANCHES.to_string()
}

fn default_utc_offset_minutes() -> i32 {
    DEFAULT_UTC_OFFSET_MINUTES
}

fn default_preset() -> String {
    "this-month".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            branch_id: default_branch_id(),
            utc_offset_minutes: default_utc_offset_minutes(),
            default_preset: default_preset(),
        }
    }
}

// =============================================================================
// Inventory Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// Log a warning for every (part, branch) with negative projected stock.
    #[serde(default = "default_true")]
    pub warn_on_negative_stock: bool,
}

fn default_true() -> bool {
    true
}

impl Default for InventorySettings {
    fn default() -> Self {
        InventorySettings {
            warn_on_negative_stock: true,
        }
    }
}

// =============================================================================
// Main Report Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub inventory: InventorySettings,
}

impl ReportConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (ledger.toml)
    /// 3. Environment variables
    ///
    /// Command-line flags are applied afterwards by the caller.
    pub fn load(config_path: Option<PathBuf>) -> ReportResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading report config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> ReportResult<()> {
        if self.engine.branch_id.trim().is_empty() {
            return Err(ReportError::InvalidConfig(format!(
                "branch_id must not be empty (use '{}' for every branch)",
                ALL_BRANCHES
            )));
        }

        if self.engine.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ReportError::InvalidConfig(format!(
                "utc_offset_minutes must be within ±{}, got {}",
                MAX_UTC_OFFSET_MINUTES, self.engine.utc_offset_minutes
            )));
        }

        if let Err(e) = self.engine.default_preset.parse::<RangePreset>() {
            return Err(ReportError::InvalidConfig(e.to_string()));
        }

        Ok(())
    }

    /// Applies `REPAIRDESK_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(branch) = lookup("REPAIRDESK_BRANCH_ID") {
            debug!(branch_id = %branch, "Overriding branch from environment");
            self.engine.branch_id = branch;
        }

        if let Some(offset) = lookup("REPAIRDESK_UTC_OFFSET_MINUTES") {
            match offset.trim().parse::<i32>() {
                Ok(minutes) => self.engine.utc_offset_minutes = minutes,
                Err(_) => {
                    warn!(value = %offset, "Ignoring non-numeric REPAIRDESK_UTC_OFFSET_MINUTES")
                }
            }
        }

        if let Some(preset) = lookup("REPAIRDESK_DEFAULT_PRESET") {
            self.engine.default_preset = preset;
        }

        if let Some(flag) = lookup("REPAIRDESK_WARN_NEGATIVE_STOCK") {
            match flag.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.inventory.warn_on_negative_stock = true,
                "0" | "false" | "no" => self.inventory.warn_on_negative_stock = false,
                _ => warn!(value = %flag, "Unknown REPAIRDESK_WARN_NEGATIVE_STOCK value"),
            }
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "repairdesk", "ledger")
            .map(|dirs| dirs.config_dir().join("ledger.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn scope(&self) -> BranchScope {
        let branch = self.engine.branch_id.trim();
        if branch.eq_ignore_ascii_case(ALL_BRANCHES) {
            BranchScope::All
        } else {
            BranchScope::branch(branch)
        }
    }

    pub fn zone(&self) -> ReportResult<FixedOffset> {
        zone_from_minutes(self.engine.utc_offset_minutes).ok_or_else(|| {
            ReportError::InvalidConfig(format!(
                "utc_offset_minutes {} is not a valid offset",
                self.engine.utc_offset_minutes
            ))
        })
    }

    pub fn default_preset(&self) -> ReportResult<RangePreset> {
        Ok(self.engine.default_preset.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ReportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scope(), BranchScope::All);
        assert_eq!(config.zone().unwrap().local_minus_utc(), 7 * 3600);
        assert_eq!(config.default_preset().unwrap(), RangePreset::ThisMonth);
        assert!(config.inventory.warn_on_negative_stock);
    }

    #[test]
    fn test_config_validation() {
        let mut config = ReportConfig::default();

        config.engine.branch_id = "  ".to_string();
        assert!(config.validate().is_err());

        config.engine.branch_id = "b1".to_string();
        config.engine.utc_offset_minutes = 15 * 60;
        assert!(config.validate().is_err());

        config.engine.utc_offset_minutes = -5 * 60;
        config.engine.default_preset = "fortnight".to_string();
        assert!(config.validate().is_err());

        config.engine.default_preset = "last-100000000-days".to_string();
        assert!(config.validate().is_err());

        config.engine.default_preset = "last-7-days".to_string();
        assert!(config.validate().is_ok());
        assert_eq!(config.scope(), BranchScope::branch("b1"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ReportConfig = toml::from_str(
            r#"
            [engine]
            branch_id = "b2"
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.branch_id, "b2");
        assert_eq!(config.engine.utc_offset_minutes, 420);
        assert_eq!(config.engine.default_preset, "this-month");
        assert!(config.inventory.warn_on_negative_stock);
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("REPAIRDESK_BRANCH_ID", "b3"),
            ("REPAIRDESK_UTC_OFFSET_MINUTES", "not-a-number"),
            ("REPAIRDESK_DEFAULT_PRESET", "today"),
            ("REPAIRDESK_WARN_NEGATIVE_STOCK", "false"),
        ]
        .into();

        let mut config = ReportConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.engine.branch_id, "b3");
        assert_eq!(config.engine.utc_offset_minutes, 420);
        assert_eq!(config.engine.default_preset, "today");
        assert!(!config.inventory.warn_on_negative_stock);
    }

    #[test]
    fn test_toml_serialization() {
        let toml_str = toml::to_string_pretty(&ReportConfig::default()).unwrap();
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("[inventory]"));
    }
}
