use anyhow::Context;
use learnportal_core::BackendDomain;
use learnportal_egress::facade::DEFAULT_LOGIN_URL;
use learnportal_egress::{EndpointMap, HttpClientConfig, LearningApiConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub backends: EndpointMap,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default = "default_login_url")]
    pub login_url: String,

    #[serde(default = "default_session_file")]
    pub session_file: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            backends: EndpointMap::default(),
            http: HttpClientConfig::default(),
            login_url: default_login_url(),
            session_file: default_session_file(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl PortalConfig {
    /// Load from a TOML (by extension) or YAML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    fn merge_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        // Backend base URLs, e.g. LEARNPORTAL_EMPLOYEE_SYNC_API
        for domain in BackendDomain::ALL {
            let key = format!("LEARNPORTAL_{}_API", domain.as_str().to_uppercase());
            if let Some(url) = lookup(&key) {
                self.backends.set(domain, url);
            }
        }

        if let Some(val) = lookup("LEARNPORTAL_LOGIN_URL") {
            self.login_url = val;
        }

        if let Some(val) = lookup("LEARNPORTAL_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.http.timeout_secs = secs,
                Err(_) => warn!(
                    "Invalid LEARNPORTAL_TIMEOUT_SECS '{}', keeping {}s",
                    val, self.http.timeout_secs
                ),
            }
        }

        if let Some(val) = lookup("LEARNPORTAL_SESSION_FILE") {
            self.session_file = val;
        }

        if let Some(val) = lookup("LEARNPORTAL_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Check the merged configuration before any client is built
    pub fn validate(&self) -> anyhow::Result<()> {
        self.backends
            .validate()
            .context("Invalid backend configuration")?;

        if self.login_url.trim().is_empty() {
            anyhow::bail!("login_url must not be empty");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than zero");
        }
        Ok(())
    }

    /// Session file path with `~` expanded
    pub fn session_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.session_file).to_string())
    }

    pub fn api_config(&self) -> LearningApiConfig {
        LearningApiConfig::new(self.backends.clone())
            .with_client_config(self.http.clone())
            .with_login_url(self.login_url.clone())
    }
}

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_session_file() -> String {
    "~/.learnportal/session.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PortalConfig::default();
        assert_eq!(config.login_url, "http://localhost:3005/login");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portal.yaml");
        std::fs::write(
            &path,
            r#"
backends:
  course: "https://courses.corp.example/api/v1"
  employee_sync: "https://people.corp.example/api/v1"
http:
  timeout_secs: 10
login_url: "https://sso.corp.example/login"
"#,
        )
        .unwrap();

        let config = PortalConfig::from_file(&path).unwrap();
        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::Course),
            "https://courses.corp.example/api/v1"
        );
        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::Skill),
            "http://localhost:10094/api/v1"
        );
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.http.connect_timeout_secs, 10);
        assert_eq!(config.login_url, "https://sso.corp.example/login");
        assert_eq!(config.session_file, "~/.learnportal/session.json");
    }

    #[test]
    fn test_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("portal.toml");
        std::fs::write(
            &path,
            r#"
login_url = "https://sso.corp.example/login"

[backends]
project = "https://projects.corp.example/api/v1"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = PortalConfig::from_file(&path).unwrap();
        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::Project),
            "https://projects.corp.example/api/v1"
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_missing_file() {
        let err = PortalConfig::from_file("/nonexistent/portal.yaml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/portal.yaml"));
    }

    #[test]
    fn test_merge_vars_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("LEARNPORTAL_ASSIGNMENT_API", "https://assign.corp.example/api/v1"),
            ("LEARNPORTAL_EMPLOYEE_SYNC_API", "https://people.corp.example/api/v1"),
            ("LEARNPORTAL_LOGIN_URL", "https://sso.corp.example/login"),
            ("LEARNPORTAL_TIMEOUT_SECS", "45"),
            ("LEARNPORTAL_LOG_LEVEL", "trace"),
        ]);

        let mut config = PortalConfig::default();
        config.merge_vars(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::Assignment),
            "https://assign.corp.example/api/v1"
        );
        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::EmployeeSync),
            "https://people.corp.example/api/v1"
        );
        assert_eq!(config.login_url, "https://sso.corp.example/login");
        assert_eq!(config.http.timeout_secs, 45);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_merge_vars_ignores_bad_timeout() {
        let mut config = PortalConfig::default();
        config.merge_vars(|key| (key == "LEARNPORTAL_TIMEOUT_SECS").then(|| "soon".to_string()));
        assert_eq!(config.http.timeout_secs, 30);
    }

    #[test]
    #[serial_test::serial]
    fn test_merge_env_reads_process_env() {
        // Serialized test prevents races with other env-reading tests
        unsafe {
            std::env::set_var("LEARNPORTAL_SKILL_API", "https://skills.corp.example/api/v1");
        }

        let mut config = PortalConfig::default();
        config.merge_env();
        assert_eq!(
            config.backends.resolve_base_url(BackendDomain::Skill),
            "https://skills.corp.example/api/v1"
        );

        unsafe {
            std::env::remove_var("LEARNPORTAL_SKILL_API");
        }
    }

    #[test]
    fn test_validate_rejects_broken_backend() {
        let mut config = PortalConfig::default();
        config.backends.set(BackendDomain::Certification, "certs");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_config_carries_settings() {
        let mut config = PortalConfig::default();
        config.login_url = "https://sso.corp.example/login".to_string();
        config.http.timeout_secs = 12;

        let api_config = config.api_config();
        assert_eq!(api_config.login_url, "https://sso.corp.example/login");
        assert_eq!(api_config.client_config.timeout_secs, 12);
        assert_eq!(api_config.endpoints, config.backends);
    }
}
