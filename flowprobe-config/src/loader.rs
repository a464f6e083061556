use crate::config::{HarnessConfig, OracleConfig};
use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// On-disk formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// `.json` is JSON, anything else YAML
    pub fn of(path: &Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Loads harness configuration from files or strings
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<HarnessConfig> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;

        match ConfigFormat::of(path) {
            ConfigFormat::Yaml => Self::from_yaml_str(&content),
            ConfigFormat::Json => Self::from_json_str(&content),
        }
        .with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<HarnessConfig> {
        serde_yaml::from_str(content).context("Malformed YAML config")
    }

    pub fn from_json_str(content: &str) -> Result<HarnessConfig> {
        serde_json::from_str(content).context("Malformed JSON config")
    }

    /// Write `config` in the format the extension of `path` names
    pub fn save<P: AsRef<Path>>(config: &HarnessConfig, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::of(path) {
            ConfigFormat::Yaml => serde_yaml::to_string(config)
                .context("Cannot encode config as YAML")?,
            ConfigFormat::Json => serde_json::to_string_pretty(config)
                .context("Cannot encode config as JSON")?,
        };
        fs::write(path, content)
            .with_context(|| format!("Cannot write config {}", path.display()))
    }

    /// Apply `FLOWPROBE_*` overrides from the process environment
    pub fn apply_process_env(config: &mut HarnessConfig) {
        Self::apply_env_overrides(config, |key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup; absent keys leave values alone
    pub fn apply_env_overrides<F>(config: &mut HarnessConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FLOWPROBE_BACKEND_URL") {
            config.target.backend_url = url;
        }
        if let Some(url) = lookup("FLOWPROBE_FRONTEND_URL") {
            config.target.frontend_url = Some(url);
        }
        if let Some(url) = lookup("FLOWPROBE_DASHBOARD_URL") {
            config.target.dashboard_url = Some(url);
        }
        if let Some(password) = lookup("FLOWPROBE_PASSWORD") {
            config.identity.password = password;
        }
        match &mut config.oracle {
            OracleConfig::Postgres { database_url, .. } => {
                if let Some(url) = lookup("FLOWPROBE_DATABASE_URL") {
                    *database_url = url;
                }
            }
            OracleConfig::AdminApi { admin_token, .. } => {
                if let Some(token) = lookup("FLOWPROBE_ADMIN_TOKEN") {
                    *admin_token = Some(token);
                }
            }
        }
    }

    /// Reject configurations that cannot produce a meaningful run
    pub fn validate(config: &HarnessConfig) -> Result<()> {
        if config.target.backend_url.trim().is_empty() {
            return Err(anyhow::anyhow!("target.backend_url cannot be empty"));
        }

        if config.http.request_timeout_ms == 0 || config.http.step_timeout_ms == 0
        {
            return Err(anyhow::anyhow!("http timeouts must be greater than zero"));
        }

        let endpoints = &config.endpoints;
        for (name, endpoint) in [
            ("register", &endpoints.register),
            ("verify", &endpoints.verify),
            ("token", &endpoints.token.endpoint),
            ("products", &endpoints.products),
        ] {
            if endpoint.expect.is_empty() {
                return Err(anyhow::anyhow!(
                    "endpoints.{} must accept at least one status",
                    name
                ));
            }
        }

        for rule in &config.resource.diagnostics {
            Regex::new(&rule.pattern).with_context(|| {
                format!("Invalid diagnostic pattern: {}", rule.pattern)
            })?;
        }

        if let OracleConfig::Postgres {
            users_table,
            products_table,
            ..
        } = &config.oracle
        {
            for table in [users_table, products_table] {
                if !is_identifier(table) {
                    return Err(anyhow::anyhow!(
                        "Invalid table name: {}",
                        table
                    ));
                }
            }
        }

        tracing::debug!(backend = %config.target.backend_url, "configuration validated");
        Ok(())
    }
}

/// Table names end up inside SQL text, so only `[A-Za-z_][A-Za-z0-9_]*`
/// (optionally schema-qualified) passes.
fn is_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_load_from_yaml_str() {
        let yaml_content = r#"
target:
  backend_url: "http://backend:8000"
  frontend_url: "http://frontend:5173"
http:
  request_timeout_ms: 2000
  step_timeout_ms: 5000
endpoints:
  register: { path: "/api/users/register_request/", expect: [201] }
  verify: { path: "/api/users/verify_otp/", expect: [200] }
  token: { path: "/api/users/token/", expect: [200], access_field: "access" }
  products: { path: "/api/products/", expect: [200, 201] }
  discover_registration: true
oracle:
  kind: postgres
  database_url: "postgres://u:p@db/app"
"#;

        let config = ConfigLoader::from_yaml_str(yaml_content).unwrap();
        assert_eq!(config.target.backend_url, "http://backend:8000");
        assert_eq!(config.target.dashboard_url, None);
        assert_eq!(config.target.health_path, "/admin/");
        assert_eq!(config.http.request_timeout_ms, 2000);
        assert!(config.endpoints.discover_registration);
        assert_eq!(config.endpoints.candidate_registration_paths.len(), 3);
        assert_eq!(config.endpoints.token.access_field, "access");
        assert!(config.endpoints.products.accepts(201));
        assert_eq!(config.resource.expected_status, "pending");
        match config.oracle {
            OracleConfig::Postgres { users_table, .. } => {
                assert_eq!(users_table, "users_user")
            }
            other => panic!("unexpected oracle: {other:?}"),
        }
        assert!(ConfigLoader::validate(&ConfigLoader::from_yaml_str(yaml_content).unwrap()).is_ok());
    }

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("flowprobe-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_saved_config_loads_back() {
        let mut config = HarnessConfig::default();
        config.target.backend_url = "http://staging:8000".to_string();
        config.endpoints.discover_registration = true;
        config.resource.category = serde_json::json!("electronics");

        for name in ["saved.yaml", "saved.json"] {
            let path = scratch_path(name);
            ConfigLoader::save(&config, &path).unwrap();
            let loaded = ConfigLoader::from_file(&path).unwrap();
            std::fs::remove_file(&path).unwrap();

            assert_eq!(loaded.target.backend_url, "http://staging:8000");
            assert!(loaded.endpoints.discover_registration);
            assert_eq!(loaded.resource.category, "electronics");
            assert_eq!(loaded.resource.price, 99.99);
            assert!(matches!(loaded.oracle, OracleConfig::Postgres { .. }));
        }
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(ConfigFormat::of(Path::new("a.JSON")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::of(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::of(Path::new("config")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = ConfigLoader::from_file(scratch_path("absent.yaml")).unwrap_err();
        assert!(format!("{err:#}").contains("absent.yaml"));
    }

    #[test]
    fn test_load_admin_api_oracle_from_json() {
        let json = r#"{
            "oracle": { "kind": "admin_api", "admin_token": "secret" }
        }"#;

        let config = ConfigLoader::from_json_str(json).unwrap();
        match config.oracle {
            OracleConfig::AdminApi {
                base_url,
                admin_token,
                my_products_path,
                ..
            } => {
                assert_eq!(base_url, None);
                assert_eq!(admin_token.as_deref(), Some("secret"));
                assert_eq!(my_products_path, "/api/products/my_products/");
            }
            other => panic!("unexpected oracle: {other:?}"),
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("FLOWPROBE_BACKEND_URL", "http://staging:8000"),
            ("FLOWPROBE_DATABASE_URL", "postgres://staging/db"),
            ("FLOWPROBE_PASSWORD", "Other123!"),
        ]
        .into_iter()
        .collect();

        let mut config = HarnessConfig::default();
        ConfigLoader::apply_env_overrides(&mut config, |key| {
            env.get(key).map(|v| v.to_string())
        });

        assert_eq!(config.target.backend_url, "http://staging:8000");
        assert_eq!(config.identity.password, "Other123!");
        assert_eq!(
            config.target.frontend_url.as_deref(),
            Some("http://localhost:5173")
        );
        match config.oracle {
            OracleConfig::Postgres { database_url, .. } => {
                assert_eq!(database_url, "postgres://staging/db")
            }
            other => panic!("unexpected oracle: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = HarnessConfig::default();
        assert!(ConfigLoader::validate(&config).is_ok());

        config.http.request_timeout_ms = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = HarnessConfig::default();
        config.endpoints.verify.expect.clear();
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = HarnessConfig::default();
        config.resource.diagnostics[0].pattern = "(".to_string();
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = HarnessConfig::default();
        config.oracle = OracleConfig::Postgres {
            database_url: "postgres://x".into(),
            users_table: "users; drop table x".into(),
            products_table: "products_product".into(),
        };
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn test_identifier_check() {
        assert!(is_identifier("users_user"));
        assert!(is_identifier("public.products_product"));
        assert!(!is_identifier("1users"));
        assert!(!is_identifier("users user"));
        assert!(!is_identifier(""));
    }
}
