use crate::adapters::http::HttpSettings;
use crate::domain::model::Member;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, ReviewError};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, validate_range,
    validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid placeholder pattern"));

const GITHUB_TOKEN_ENV: &str = "GITHUB_PAT";
const SLACK_TOKEN_ENV: &str = "SLACK_TOKEN";

fn default_calendar_folder() -> String {
    "calendars".to_string()
}

fn default_output_dir() -> String {
    "docs".to_string()
}

fn default_data_dir() -> String {
    "data/raw".to_string()
}

fn default_github_api_url() -> String {
    crate::adapters::github::DEFAULT_GITHUB_API_URL.to_string()
}

fn default_slack_api_url() -> String {
    crate::adapters::slack::DEFAULT_SLACK_API_URL.to_string()
}

fn default_request_delay_ms() -> u64 {
    500
}

fn default_max_retries() -> u32 {
    5
}

fn default_max_rate_limit_wait_seconds() -> u64 {
    3600
}

fn default_timeout_seconds() -> u64 {
    30
}

/// The team file: who is on the team, where their activity lives, and how to classify it.
#[derive(Clone, Serialize, Deserialize)]
pub struct TeamConfig {
    pub team_name: String,
    pub year: i32,
    #[serde(default)]
    pub github_pat: String,
    #[serde(default)]
    pub slack_token: String,
    /// `owner/name` repositories scanned for commits.
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default = "default_calendar_folder")]
    pub calendar_folder: String,
    pub members: Vec<Member>,
    /// Keyword category -> keywords.
    #[serde(default)]
    pub project_keywords: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_max_rate_limit_wait_seconds")]
    pub max_rate_limit_wait_seconds: u64,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl fmt::Debug for TeamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &str| if token.is_empty() { "" } else { "***" };
        f.debug_struct("TeamConfig")
            .field("team_name", &self.team_name)
            .field("year", &self.year)
            .field("github_pat", &redact(&self.github_pat))
            .field("slack_token", &redact(&self.slack_token))
            .field("repositories", &self.repositories)
            .field("calendar_folder", &self.calendar_folder)
            .field("members", &self.members)
            .field("project_keywords", &self.project_keywords)
            .field("output_dir", &self.output_dir)
            .field("data_dir", &self.data_dir)
            .field("github_api_url", &self.github_api_url)
            .field("slack_api_url", &self.slack_api_url)
            .finish_non_exhaustive()
    }
}

impl TeamConfig {
    /// Loads a `.toml` or JSON team file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let mut config: Self = serde_json::from_str(&processed)?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let mut config: Self = toml::from_str(&processed)?;
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// Empty or unresolved tokens fall back to `GITHUB_PAT` / `SLACK_TOKEN`.
    fn apply_env_fallbacks(&mut self) {
        fn resolve(token: &mut String, var: &str) {
            let unset = token.trim().is_empty() || ENV_PLACEHOLDER.is_match(token);
            if unset {
                *token = std::env::var(var).unwrap_or_default();
            }
        }
        resolve(&mut self.github_pat, GITHUB_TOKEN_ENV);
        resolve(&mut self.slack_token, SLACK_TOKEN_ENV);
    }

    pub fn http_settings(&self) -> HttpSettings {
        HttpSettings {
            timeout: Duration::from_secs(self.timeout_seconds),
            request_delay: Duration::from_millis(self.request_delay_ms),
            max_retries: self.max_retries,
            max_rate_limit_wait: Duration::from_secs(self.max_rate_limit_wait_seconds),
        }
    }

    fn validate_members(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(ReviewError::MissingConfigError {
                field: "members".to_string(),
            });
        }

        for (i, member) in self.members.iter().enumerate() {
            validate_non_empty_string(&format!("members[{}].name", i), &member.name)?;
        }

        let calendar_files: Vec<String> = self
            .members
            .iter()
            .filter_map(|m| m.calendar_path().map(str::to_string))
            .collect();
        validate_file_extensions("members.calendar_file", &calendar_files, &["ics", "zip"])
    }

    fn validate_repositories(&self) -> Result<()> {
        for repo in &self.repositories {
            let valid = repo
                .split_once('/')
                .is_some_and(|(owner, name)| {
                    !owner.is_empty() && !name.is_empty() && !name.contains('/')
                });
            if !valid {
                return Err(ReviewError::InvalidConfigValueError {
                    field: "repositories".to_string(),
                    value: repo.clone(),
                    reason: "Expected owner/name".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl Validate for TeamConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("team_name", &self.team_name)?;
        validate_range("year", self.year, 2000, 2100)?;
        self.validate_members()?;
        self.validate_repositories()?;
        validate_url("github_api_url", &self.github_api_url)?;
        validate_url("slack_api_url", &self.slack_api_url)?;
        validate_path("output_dir", &self.output_dir)?;
        validate_path("data_dir", &self.data_dir)?;
        validate_path("calendar_folder", &self.calendar_folder)?;
        validate_range("timeout_seconds", self.timeout_seconds, 1, 600)?;
        validate_range("max_retries", self.max_retries, 0, 20)?;
        Ok(())
    }
}

impl ConfigProvider for TeamConfig {
    fn team_name(&self) -> &str {
        &self.team_name
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn members(&self) -> &[Member] {
        &self.members
    }

    fn project_keywords(&self) -> &BTreeMap<String, Vec<String>> {
        &self.project_keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_JSON: &str = r#"{
        "team_name": "Platform",
        "year": 2025,
        "github_pat": "ghp_inline",
        "slack_token": "xoxb-inline",
        "members": [{ "name": "Jane Doe", "github": "jdoe" }]
    }"#;

    #[test]
    fn test_json_defaults() {
        let config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();

        assert_eq!(config.team_name(), "Platform");
        assert_eq!(config.output_dir, "docs");
        assert_eq!(config.data_dir, "data/raw");
        assert_eq!(config.github_api_url, "https://api.github.com");
        assert_eq!(config.slack_api_url, "https://slack.com/api");
        assert_eq!(config.max_retries, 5);
        assert!(config.project_keywords().is_empty());

        let settings = config.http_settings();
        assert_eq!(settings.request_delay, Duration::from_millis(500));
        assert_eq!(settings.max_rate_limit_wait, Duration::from_secs(3600));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_file_with_env_substitution() {
        std::env::set_var("YEAR_REVIEW_TEST_TEAM", "Data Platform");
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
team_name = "${{YEAR_REVIEW_TEST_TEAM}}"
year = 2024
github_pat = "inline"
slack_token = "inline"
repositories = ["acme/api"]

[[members]]
name = "Jane Doe"
github = "jdoe"
has_calendar = true
calendar_file = "jane.zip"

[project_keywords]
security = ["rbac", "auth"]
"#
        )
        .unwrap();

        let config = TeamConfig::from_file(file.path()).unwrap();
        std::env::remove_var("YEAR_REVIEW_TEST_TEAM");

        assert_eq!(config.team_name, "Data Platform");
        assert_eq!(config.year, 2024);
        assert_eq!(config.members[0].calendar_path(), Some("jane.zip"));
        assert_eq!(config.project_keywords["security"], vec!["rbac", "auth"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unresolved_token_falls_back_to_environment() {
        std::env::set_var("SLACK_TOKEN", "xoxb-from-env");
        let config = TeamConfig::from_json_str(
            r#"{
                "team_name": "Platform",
                "year": 2025,
                "slack_token": "${YEAR_REVIEW_UNSET_TOKEN}",
                "members": [{ "name": "Jane" }]
            }"#,
        )
        .unwrap();
        std::env::remove_var("SLACK_TOKEN");

        assert_eq!(config.slack_token, "xoxb-from-env");
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("ghp_inline"));
        assert!(!debug.contains("xoxb-inline"));
        assert!(debug.contains("Platform"));
    }

    #[test]
    fn test_validation_errors() {
        let mut config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();
        config.members.clear();
        assert!(matches!(
            config.validate(),
            Err(ReviewError::MissingConfigError { .. })
        ));

        let mut config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();
        config.repositories = vec!["just-a-name".to_string()];
        assert!(config.validate().is_err());

        let mut config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();
        config.members[0].has_calendar = true;
        config.members[0].calendar_file = Some("jane.pdf".to_string());
        assert!(config.validate().is_err());

        let mut config = TeamConfig::from_json_str(MINIMAL_JSON).unwrap();
        config.github_api_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = TeamConfig::from_json_str("{ \"team_name\": ").unwrap_err();
        assert!(matches!(err, ReviewError::SerializationError(_)));
    }
}
