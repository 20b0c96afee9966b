//! Configuration management for fragweb
//!
//! Page profiles declare which named regions a page refreshes, which
//! trigger elements start a refresh, and how requests are built. Profiles
//! are loaded from YAML; every page type of the finance app (account
//! detail, loan detail, transactions, transfers, reports) is one profile.

pub mod error;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use error::{ConfigError, ConfigErrorCode, ConfigErrorDetails, ConfigResult};

// ==================== Configuration Types ====================

/// HTTP settings shared by all page profiles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Origin the page lives on
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Form field name carrying the CSRF token (legacy PUT variant)
    #[serde(default = "default_csrf_field")]
    pub csrf_field: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            csrf_field: default_csrf_field(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_csrf_field() -> String {
    "csrfmiddlewaretoken".to_string()
}

/// CSS classes used to mark the active trigger in a group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Class applied to the selected trigger
    #[serde(default = "default_selected_class")]
    pub selected_class: String,
    /// Class applied to every other trigger in the group
    #[serde(default = "default_deselected_class")]
    pub deselected_class: String,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            selected_class: default_selected_class(),
            deselected_class: default_deselected_class(),
        }
    }
}

fn default_selected_class() -> String {
    "btn-primary".to_string()
}

fn default_deselected_class() -> String {
    "btn-outline-primary".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level: debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// How a page's refresh requests are issued
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    /// Navigational GET returning a full alternate page rendering
    Get,
    /// State-mutating PUT with a JSON `{time}` body and CSRF header,
    /// returning a raw fragment for a single container
    LegacyPut,
}

impl Default for RefreshMode {
    fn default() -> Self {
        RefreshMode::Get
    }
}

impl std::str::FromStr for RefreshMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "get" => Ok(RefreshMode::Get),
            "legacy-put" => Ok(RefreshMode::LegacyPut),
            _ => Err(format!("Invalid refresh mode: {}", s)),
        }
    }
}

impl std::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshMode::Get => write!(f, "get"),
            RefreshMode::LegacyPut => write!(f, "legacy-put"),
        }
    }
}

/// Kinds of trigger elements a page declares
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Time-range selector button (`data-time` / `data-path`)
    Time,
    /// Pagination button (`data-page`)
    Page,
    /// Delete button wiring a confirmation modal (`data-id` / `data-url`)
    Delete,
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Time => write!(f, "time"),
            TriggerKind::Page => write!(f, "page"),
            TriggerKind::Delete => write!(f, "delete"),
        }
    }
}

/// One named, independently replaceable region
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Stable region identifier (e.g. "transaction-table")
    pub id: String,
    /// Selector locating the region in both the live and fetched documents
    pub selector: String,
}

/// One trigger declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Trigger behavior
    pub kind: TriggerKind,
    /// Selector matching the trigger elements
    pub selector: String,
}

/// Refresh configuration for one page type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageProfile {
    /// Request mode
    #[serde(default)]
    pub refresh: RefreshMode,
    /// Path suffix appended to the page path (e.g. "/ajax")
    #[serde(default)]
    pub suffix: String,
    /// Selector of the element carrying persisted `data-path` state
    #[serde(default)]
    pub state_holder: Option<String>,
    /// Regions this page keeps synchronized
    pub regions: Vec<RegionConfig>,
    /// Trigger declarations
    #[serde(default)]
    pub triggers: Vec<TriggerConfig>,
    /// Region id carrying structured chart configuration (JSON)
    #[serde(default)]
    pub chart_region: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP settings
    #[serde(default)]
    pub http: HttpConfig,
    /// Trigger selection classes
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Page profiles keyed by page name
    #[serde(default)]
    pub pages: BTreeMap<String, PageProfile>,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: PathBuf) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    path: path.to_string_lossy().to_string(),
                }
            } else {
                ConfigError::IoError
            }
        })?;

        let config: Config =
            serde_yaml::from_str(&content).map_err(|_| ConfigError::InvalidYaml)?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "http.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        for (name, profile) in &self.pages {
            if profile.regions.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: format!("pages.{}.regions", name),
                    reason: "A page profile must declare at least one region".to_string(),
                });
            }

            let mut seen = std::collections::HashSet::new();
            for region in &profile.regions {
                if region.id.trim().is_empty() || region.selector.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("pages.{}.regions", name),
                        reason: "Region id and selector must be non-empty".to_string(),
                    });
                }
                if !seen.insert(region.id.as_str()) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("pages.{}.regions", name),
                        reason: format!("Duplicate region id: {}", region.id),
                    });
                }
            }

            if let Some(chart_region) = &profile.chart_region {
                if !profile.regions.iter().any(|r| &r.id == chart_region) {
                    return Err(ConfigError::InvalidValue {
                        field: format!("pages.{}.chart_region", name),
                        reason: format!(
                            "chart_region '{}' is not a declared region",
                            chart_region
                        ),
                    });
                }
            }

            for trigger in &profile.triggers {
                if trigger.selector.trim().is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: format!("pages.{}.triggers", name),
                        reason: "Trigger selector must be non-empty".to_string(),
                    });
                }
            }

            if profile.refresh == RefreshMode::LegacyPut && profile.regions.len() != 1 {
                return Err(ConfigError::InvalidValue {
                    field: format!("pages.{}.refresh", name),
                    reason: "legacy-put pages replace exactly one container region"
                        .to_string(),
                });
            }
        }

        Ok(())
    }

    /// Load from a file, falling back to the built-in defaults when the
    /// file does not exist
    pub fn load_or_default(path: PathBuf) -> ConfigResult<Self> {
        match Self::load(path) {
            Err(ConfigError::FileNotFound { .. }) => {
                let config: Config = serde_yaml::from_str(Self::generate_default())
                    .map_err(|_| ConfigError::InvalidYaml)?;
                config.validate()?;
                Ok(config)
            }
            other => other,
        }
    }

    /// Generate a default configuration file
    pub fn generate_default() -> &'static str {
        include_str!("../templates/default_config.yaml")
    }

    /// Look up a page profile by name
    pub fn page(&self, name: &str) -> ConfigResult<&PageProfile> {
        self.pages.get(name).ok_or_else(|| ConfigError::MissingField {
            field: format!("pages.{}", name),
        })
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_template_parses_and_validates() {
        let config: Config = serde_yaml::from_str(Config::generate_default()).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.pages.contains_key("transactions"));
        assert!(config.pages.contains_key("account-detail"));
        assert_eq!(config.selection.selected_class, "btn-primary");
    }

    #[test]
    fn test_legacy_put_profile_mode() {
        let config: Config = serde_yaml::from_str(Config::generate_default()).unwrap();
        let profile = config.page("account-detail").unwrap();
        assert_eq!(profile.refresh, RefreshMode::LegacyPut);
        assert_eq!(profile.regions.len(), 1);
    }

    #[test]
    fn test_duplicate_region_ids_rejected() {
        let yaml = r##"
pages:
  sample:
    regions:
      - { id: report-table, selector: "#report-table" }
      - { id: report-table, selector: "#other" }
"##;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_chart_region_must_be_declared() {
        let yaml = r##"
pages:
  sample:
    chart_region: chart-script
    regions:
      - { id: report-table, selector: "#report-table" }
"##;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_legacy_put_requires_single_region() {
        let yaml = r##"
pages:
  sample:
    refresh: legacy-put
    regions:
      - { id: a, selector: "#a" }
      - { id: b, selector: "#b" }
"##;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_falls_back_when_file_missing() {
        let config = Config::load_or_default(PathBuf::from("/nonexistent/fragweb.yaml")).unwrap();
        assert!(config.pages.contains_key("reports"));
    }

    #[test]
    fn test_unknown_page_lookup() {
        let config = Config::default();
        assert!(matches!(
            config.page("nope"),
            Err(ConfigError::MissingField { .. })
        ));
    }

    #[test]
    fn test_refresh_mode_round_trip() {
        assert_eq!("get".parse::<RefreshMode>().unwrap(), RefreshMode::Get);
        assert_eq!(
            "legacy-put".parse::<RefreshMode>().unwrap(),
            RefreshMode::LegacyPut
        );
        assert_eq!(RefreshMode::LegacyPut.to_string(), "legacy-put");
        assert!("post".parse::<RefreshMode>().is_err());
    }
}
