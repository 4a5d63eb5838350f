//! Deployment images.
//!
//! A deployment is a single build instruction file under `deployments/`,
//! usually rooted on one of the factory's base images. It is built on its
//! own, always without cache, as `<registry>/deployments/<name>:<tag>`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use container_factory_core::error::{FactoryError, Result};

use crate::discovery::list_files;
use crate::publisher::RegistryPublisher;
use crate::rewrite::InstructionRewriter;
use crate::scheduler::BuildReport;
use crate::tool::{BuildRequest, ImageTool};

/// Registry namespace for deployment images.
pub const DEPLOYMENT_NAMESPACE: &str = "deployments";

/// List deployment names under `root`, sorted.
pub fn list_deployments(root: &Path) -> Result<Vec<String>> {
    let mut deployments = list_files(root)?;
    deployments.sort();
    Ok(deployments)
}

/// Resolve a deployment name to its file under `root`.
///
/// Names are relative paths that stay inside the deployment tree and
/// name only files that [`list_deployments`] would show, so hidden
/// components are rejected.
pub fn deployment_path(root: &Path, name: &str) -> Result<PathBuf> {
    let relative = Path::new(name);
    let invalid = relative.components().any(|c| match c {
        Component::Normal(part) => part.to_string_lossy().starts_with('.'),
        _ => true,
    });
    if name.trim().is_empty() || invalid {
        return Err(FactoryError::DeploymentNotFound(name.to_string()));
    }

    let path = root.join(relative);
    if !path.is_file() {
        return Err(FactoryError::DeploymentNotFound(name.to_string()));
    }
    Ok(path)
}

/// `<registry>/deployments/<name>` (untagged).
pub fn deployment_image(registry_base_path: &str, name: &str) -> String {
    format!(
        "{}/{}/{}",
        registry_base_path.trim_end_matches('/'),
        DEPLOYMENT_NAMESPACE,
        name
    )
}

/// Settings for one deployment build.
#[derive(Debug, Clone)]
pub struct DeploymentBuild {
    pub name: String,
    pub registry_base_path: String,
    /// Tag pinned into internal base image references
    pub build_tag: String,
    /// Tag applied to the deployment image
    pub deployment_tag: String,
    pub push: bool,
}

impl DeploymentBuild {
    /// Build (and optionally push) the deployment found under `root`.
    ///
    /// `root` doubles as the build context. A hidden temp directory is
    /// created inside it for the rewritten file and removed afterwards.
    pub async fn run(&self, root: &Path, tool: Arc<dyn ImageTool>) -> Result<BuildReport> {
        let source = deployment_path(root, &self.name)?;

        let temp_dir = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(root)?;
        tracing::debug!(path = %temp_dir.path().display(), "Created temp directory");

        let outcome = self.build_in(root, &source, temp_dir.path(), tool).await;

        if let Err(e) = temp_dir.close() {
            tracing::warn!(error = %e, "Failed to remove temp directory");
        }
        outcome
    }

    async fn build_in(
        &self,
        root: &Path,
        source: &Path,
        temp_dir: &Path,
        tool: Arc<dyn ImageTool>,
    ) -> Result<BuildReport> {
        let rewriter =
            InstructionRewriter::new(temp_dir, self.registry_base_path.as_str(), self.build_tag.as_str());
        let dockerfile = rewriter.rewrite(source)?;

        let request = BuildRequest {
            image: deployment_image(&self.registry_base_path, &self.name),
            tag: self.deployment_tag.clone(),
            dockerfile,
            no_cache: true,
            working_dir: root.to_path_buf(),
        };
        let reference = request.reference();

        tracing::info!(image = %reference, "Building deployment");
        if let Err(e) = tool.build(&request).await {
            tracing::error!(image = %reference, error = %e, "Deployment failed to build");
            return Err(e);
        }
        tracing::info!(image = %reference, "Deployment built");

        let mut report = BuildReport {
            built: vec![self.name.clone()],
            ..Default::default()
        };

        if self.push {
            if let Err(e) = RegistryPublisher::new(tool).publish(&reference).await {
                tracing::error!(image = %reference, error = %e, "Deployment failed to push");
                report.push_failed.push(self.name.clone());
            }
        }
        Ok(report)
    }
}
