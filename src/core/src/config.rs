use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FactoryError, Result};

/// Default external container tool.
pub const DEFAULT_BUILD_TOOL: &str = "docker";

/// Default HTTP listen port for `serve`.
pub const DEFAULT_LISTEN_PORT: u16 = 8080;

/// Per-invocation configuration.
///
/// Every component receives this explicitly; nothing is read from
/// process-wide state once an invocation has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactoryConfig {
    /// Asset root containing `dockerfiles/` and `deployments/` (`~` allowed)
    pub base_directory: PathBuf,

    /// Registry base path, e.g. `registry.example.com/team`
    pub registry_base_path: Option<String>,

    /// Build tag (falls back to the invoking account name)
    pub tag: Option<String>,

    /// Deployment tag (falls back to the build tag)
    pub deployment_tag: Option<String>,

    /// Bypass the build cache
    pub force_rebuild: bool,

    /// Push built images to the remote registry
    pub push: bool,

    /// Upper bound on simultaneous build subprocesses (unbounded when unset)
    pub max_parallel_builds: Option<usize>,

    /// External container tool executable
    pub build_tool: String,

    /// Warn about `FROM` lines that look like declarations but do not parse
    pub strict_declarations: bool,

    /// Port for the HTTP front-end
    pub listen_port: u16,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            base_directory: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            registry_base_path: None,
            tag: None,
            deployment_tag: None,
            force_rebuild: false,
            push: true,
            max_parallel_builds: None,
            build_tool: DEFAULT_BUILD_TOOL.to_string(),
            strict_declarations: false,
            listen_port: DEFAULT_LISTEN_PORT,
        }
    }
}

impl FactoryConfig {
    /// Load configuration from a YAML or JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FactoryError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let config: Self = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that can never work.
    pub fn validate(&self) -> Result<()> {
        if self.base_directory.as_os_str().is_empty() {
            return Err(FactoryError::ConfigError(
                "Base directory must be specified".to_string(),
            ));
        }
        if self.max_parallel_builds == Some(0) {
            return Err(FactoryError::ConfigError(
                "max_parallel_builds must be greater than zero".to_string(),
            ));
        }
        if self.build_tool.trim().is_empty() {
            return Err(FactoryError::ConfigError(
                "build_tool must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Registry base path, required by every build operation.
    pub fn require_registry(&self) -> Result<&str> {
        match self.registry_base_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(path.trim_end_matches('/')),
            _ => Err(FactoryError::ConfigError(
                "Registry Base Path must be specified".to_string(),
            )),
        }
    }

    /// Build tag, defaulting to the invoking account name.
    pub fn resolved_tag(&self) -> Result<String> {
        if let Some(tag) = non_empty(self.tag.as_deref()) {
            return Ok(tag.to_string());
        }
        current_username().ok_or_else(|| {
            FactoryError::ConfigError(
                "No image tag given and the current user name is unknown".to_string(),
            )
        })
    }

    /// Deployment tag, defaulting to the build tag.
    pub fn resolved_deployment_tag(&self) -> Result<String> {
        match non_empty(self.deployment_tag.as_deref()) {
            Some(tag) => Ok(tag.to_string()),
            None => self.resolved_tag(),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Name of the account running this process.
///
/// Asks the OS account database first, then the login environment.
fn current_username() -> Option<String> {
    match whoami::fallible::username() {
        Ok(name) if !name.trim().is_empty() => return Some(name),
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "Account lookup failed, trying environment"),
    }
    username_from_env(|key| std::env::var(key).ok())
}

fn username_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .filter_map(|key| lookup(key))
        .find(|name| !name.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FactoryConfig::default();
        assert!(config.push);
        assert!(!config.force_rebuild);
        assert_eq!(config.build_tool, "docker");
        assert_eq!(config.listen_port, 8080);
        assert!(config.max_parallel_builds.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_require_registry_missing() {
        let config = FactoryConfig::default();
        let err = config.require_registry().unwrap_err();
        assert!(matches!(err, FactoryError::ConfigError(_)));
        assert_eq!(err.exit_code(), 100);
    }

    #[test]
    fn test_require_registry_blank() {
        let config = FactoryConfig {
            registry_base_path: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(config.require_registry().is_err());
    }

    #[test]
    fn test_require_registry_strips_trailing_slash() {
        let config = FactoryConfig {
            registry_base_path: Some("registry.example.com/team/".to_string()),
            ..Default::default()
        };
        assert_eq!(config.require_registry().unwrap(), "registry.example.com/team");
    }

    #[test]
    fn test_explicit_tags() {
        let config = FactoryConfig {
            tag: Some("v1".to_string()),
            deployment_tag: Some("release-3".to_string()),
            ..Default::default()
        };
        assert_eq!(config.resolved_tag().unwrap(), "v1");
        assert_eq!(config.resolved_deployment_tag().unwrap(), "release-3");
    }

    #[test]
    fn test_deployment_tag_defaults_to_build_tag() {
        let config = FactoryConfig {
            tag: Some("v1".to_string()),
            deployment_tag: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.resolved_deployment_tag().unwrap(), "v1");
    }

    #[test]
    fn test_tag_defaults_to_username() {
        let config = FactoryConfig::default();
        match current_username() {
            Some(name) => assert_eq!(config.resolved_tag().unwrap(), name),
            None => assert!(config.resolved_tag().is_err()),
        }
    }

    #[test]
    fn test_username_prefers_account_lookup() {
        if let Ok(name) = whoami::fallible::username() {
            if !name.trim().is_empty() {
                assert_eq!(current_username(), Some(name));
            }
        }
    }

    #[test]
    fn test_username_from_env_skips_blank() {
        let env = |key: &str| match key {
            "USER" => Some("  ".to_string()),
            "LOGNAME" => Some("builder".to_string()),
            _ => None,
        };
        assert_eq!(username_from_env(env), Some("builder".to_string()));
        assert_eq!(username_from_env(|_| None), None);
    }

    #[test]
    fn test_validate_rejects_zero_parallelism() {
        let config = FactoryConfig {
            max_parallel_builds: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FactoryError::ConfigError(_))));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("factory.yaml");
        std::fs::write(
            &path,
            "base_directory: /srv/images\nregistry_base_path: registry.example.com/team\ntag: v1\nmax_parallel_builds: 4\n",
        )
        .unwrap();

        let config = FactoryConfig::from_file(&path).unwrap();
        assert_eq!(config.base_directory, PathBuf::from("/srv/images"));
        assert_eq!(config.require_registry().unwrap(), "registry.example.com/team");
        assert_eq!(config.max_parallel_builds, Some(4));
        // Unset fields keep their defaults
        assert!(config.push);
        assert_eq!(config.build_tool, "docker");
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("factory.json");
        std::fs::write(&path, r#"{"base_directory": "/srv/images", "push": false}"#).unwrap();

        let config = FactoryConfig::from_file(&path).unwrap();
        assert!(!config.push);
    }

    #[test]
    fn test_from_missing_file() {
        let err = FactoryConfig::from_file(Path::new("/nonexistent/factory.yaml")).unwrap_err();
        assert!(matches!(err, FactoryError::ConfigError(_)));
    }
}
