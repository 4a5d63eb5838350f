//! Asset directory resolution.
//!
//! A factory base directory holds two trees: `dockerfiles/` with the base
//! image build instructions and `deployments/` with application images.

use std::path::{Component, Path, PathBuf};

use container_factory_core::error::{FactoryError, Result};

/// Directory holding base image build instructions.
pub const DOCKERFILE_DIR: &str = "dockerfiles";

/// Directory holding deployment build instructions.
pub const DEPLOYMENT_DIR: &str = "deployments";

/// Resolved absolute paths for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryPaths {
    /// Asset root; also the working directory for base image builds
    pub base_directory: PathBuf,
    /// Root of the build instruction tree
    pub dockerfile_directory: PathBuf,
    /// Root of the deployment tree
    pub deployment_directory: PathBuf,
}

impl FactoryPaths {
    /// Resolve a configured base directory into absolute paths.
    ///
    /// The base directory itself must exist; the two subtrees are checked
    /// lazily by the operations that need them.
    pub fn resolve(base: &Path) -> Result<Self> {
        if base.as_os_str().is_empty() {
            return Err(FactoryError::ConfigError(
                "Base directory must be specified".to_string(),
            ));
        }

        let base_directory = absolutize(&expand_home(base)?)?;
        if !base_directory.is_dir() {
            return Err(FactoryError::ConfigError(format!(
                "Base directory does not exist: {}",
                base_directory.display()
            )));
        }

        tracing::info!(
            base_directory = %base_directory.display(),
            "Setting base directory"
        );

        let paths = Self {
            dockerfile_directory: base_directory.join(DOCKERFILE_DIR),
            deployment_directory: base_directory.join(DEPLOYMENT_DIR),
            base_directory,
        };
        tracing::debug!(path = %paths.dockerfile_directory.display(), "Set dockerfile directory");
        tracing::debug!(path = %paths.deployment_directory.display(), "Set deployment directory");
        Ok(paths)
    }

    /// The build instruction root, which must be an existing directory.
    pub fn require_dockerfile_directory(&self) -> Result<&Path> {
        require_dir(&self.dockerfile_directory)
    }

    /// The deployment root, which must be an existing directory.
    pub fn require_deployment_directory(&self) -> Result<&Path> {
        require_dir(&self.deployment_directory)
    }
}

fn require_dir(path: &Path) -> Result<&Path> {
    if path.is_dir() {
        Ok(path)
    } else {
        Err(FactoryError::ConfigError(format!(
            "Directory does not exist: {}",
            path.display()
        )))
    }
}

/// Expand a leading `~` to the current user's home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => {
            let home = dirs::home_dir().ok_or_else(|| {
                FactoryError::ConfigError("Cannot determine home directory".to_string())
            })?;
            Ok(home.join(components.as_path()))
        }
        _ => Ok(path.to_path_buf()),
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
