use crate::core::thresholds::default_rules;
use crate::domain::model::{Country, GithubTarget, ThresholdRule};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, TrackerError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    pub remote: Option<RemoteConfig>,
    pub github: Option<GithubConfig>,
    /// Country name -> maximum days per calendar year.
    #[serde(default)]
    pub thresholds: BTreeMap<String, u32>,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_write_through")]
    pub write_through: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub endpoint: String,
    pub timeout_seconds: Option<u64>,
    pub admin_password: Option<String>,
}

/// Sync target for the exported document in a GitHub repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_github_filename")]
    pub filename: String,
    #[serde(default = "default_github_api")]
    pub api_base: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_user")]
    pub user: String,
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_write_through() -> bool {
    true
}

fn default_github_filename() -> String {
    "country-tracker-data.json".to_string()
}

fn default_github_api() -> String {
    "https://api.github.com".to_string()
}

fn default_user() -> String {
    "cli".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            write_through: default_write_through(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            user: default_user(),
        }
    }
}

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

impl TrackerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(TrackerError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| TrackerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ADMIN_DELETE_PASSWORD})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| TrackerError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Configured rules on top of the defaults. Unknown country names are
    /// rejected by [`Validate`].
    pub fn threshold_rules(&self) -> Vec<ThresholdRule> {
        let mut rules = default_rules();
        for (name, max_days) in &self.thresholds {
            let Ok(country) = name.parse::<Country>() else {
                continue;
            };
            match rules.iter_mut().find(|rule| rule.country == country) {
                Some(rule) => rule.max_days = *max_days,
                None => rules.push(ThresholdRule {
                    country,
                    max_days: *max_days,
                }),
            }
        }
        rules
    }

    pub fn admin_password(&self) -> Option<&str> {
        self.remote.as_ref()?.admin_password.as_deref()
    }
}

impl ConfigProvider for TrackerConfig {
    fn data_dir(&self) -> &str {
        &self.storage.data_dir
    }

    fn remote_endpoint(&self) -> Option<&str> {
        self.remote.as_ref().map(|remote| remote.endpoint.as_str())
    }

    fn github(&self) -> Option<GithubTarget> {
        self.github.as_ref().map(|github| GithubTarget {
            api_base: github.api_base.clone(),
            owner: github.owner.clone(),
            repo: github.repo.clone(),
            path: github.filename.clone(),
            token: github.token.clone(),
        })
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.remote
                .as_ref()
                .and_then(|remote| remote.timeout_seconds)
                .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
        )
    }

    fn write_through(&self) -> bool {
        self.storage.write_through
    }

    fn thresholds(&self) -> Vec<ThresholdRule> {
        self.threshold_rules()
    }

    fn user(&self) -> &str {
        &self.defaults.user
    }
}

impl Validate for TrackerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("storage.data_dir", &self.storage.data_dir)?;
        validation::validate_non_empty_string("defaults.user", &self.defaults.user)?;

        if let Some(remote) = &self.remote {
            validation::validate_url("remote.endpoint", &remote.endpoint)?;
            if let Some(timeout) = remote.timeout_seconds {
                validation::validate_range("remote.timeout_seconds", timeout, 1, 300)?;
            }
        }

        if let Some(github) = &self.github {
            validation::validate_non_empty_string("github.token", &github.token)?;
            validation::validate_non_empty_string("github.owner", &github.owner)?;
            validation::validate_non_empty_string("github.repo", &github.repo)?;
            validation::validate_non_empty_string("github.filename", &github.filename)?;
            validation::validate_url("github.api_base", &github.api_base)?;
        }

        for (name, max_days) in &self.thresholds {
            name.parse::<Country>()
                .map_err(|_| TrackerError::InvalidConfigValueError {
                    field: "thresholds".to_string(),
                    value: name.clone(),
                    reason: format!(
                        "Unknown country. Known countries: {}",
                        Country::ALL.map(|c| c.as_str()).join(", ")
                    ),
                })?;
            validation::validate_positive_number(&format!("thresholds.{}", name), *max_days, 1)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[storage]
data_dir = "/var/lib/country-tracker"
write_through = false

[remote]
endpoint = "https://tracker.example.com/api/trips"
timeout_seconds = 5

[thresholds]
Greece = 183
UK = 90

[defaults]
user = "alex"
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.data_dir(), "/var/lib/country-tracker");
        assert!(!config.write_through());
        assert_eq!(
            config.remote_endpoint(),
            Some("https://tracker.example.com/api/trips")
        );
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.user(), "alex");

        let rules = config.thresholds();
        let uk = rules.iter().find(|r| r.country == Country::Uk).unwrap();
        assert_eq!(uk.max_days, 90);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TrackerConfig::from_toml_str("").unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.data_dir(), "./data");
        assert!(config.write_through());
        assert_eq!(config.remote_endpoint(), None);
        assert!(config.github().is_none());
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert_eq!(config.thresholds(), default_rules());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("COUNTRY_TRACKER_TEST_PASSWORD", "s3cret");

        let toml_content = r#"
[remote]
endpoint = "https://tracker.example.com/api/trips"
admin_password = "${COUNTRY_TRACKER_TEST_PASSWORD}"
"#;

        let config = TrackerConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.admin_password(), Some("s3cret"));

        std::env::remove_var("COUNTRY_TRACKER_TEST_PASSWORD");
    }

    #[test]
    fn test_config_validation() {
        let bad_endpoint = TrackerConfig::from_toml_str(
            r#"
[remote]
endpoint = "redis://localhost:6379"
"#,
        )
        .unwrap();
        assert!(bad_endpoint.validate().is_err());

        let bad_country = TrackerConfig::from_toml_str(
            r#"
[thresholds]
France = 183
"#,
        )
        .unwrap();
        assert!(bad_country.validate().is_err());

        let bad_timeout = TrackerConfig::from_toml_str(
            r#"
[remote]
endpoint = "https://tracker.example.com"
timeout_seconds = 0
"#,
        )
        .unwrap();
        assert!(bad_timeout.validate().is_err());
    }

    #[test]
    fn test_github_section() {
        std::env::set_var("COUNTRY_TRACKER_TEST_GITHUB_TOKEN", "ghp_example");

        let config = TrackerConfig::from_toml_str(
            r#"
[github]
token = "${COUNTRY_TRACKER_TEST_GITHUB_TOKEN}"
owner = "alex"
repo = "travel"
"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        let target = config.github().unwrap();
        assert_eq!(target.token, "ghp_example");
        assert_eq!(target.path, "country-tracker-data.json");
        assert_eq!(target.api_base, "https://api.github.com");

        let blank_repo = TrackerConfig::from_toml_str(
            r#"
[github]
token = "t"
owner = "alex"
repo = ""
"#,
        )
        .unwrap();
        assert!(blank_repo.validate().is_err());

        std::env::remove_var("COUNTRY_TRACKER_TEST_GITHUB_TOKEN");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[storage]\ndata_dir = \"./trips\"\n")
            .unwrap();

        let config = TrackerConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.data_dir(), "./trips");
    }
}
