//! Per-invocation facade.
//!
//! A [`Factory`] owns the validated configuration, the resolved asset paths
//! and the image tool for one command or request. Nothing here is global, so
//! concurrent invocations with different settings never interfere.

use std::sync::Arc;

use container_factory_core::config::FactoryConfig;
use container_factory_core::error::Result;

use crate::deployment::{list_deployments, DeploymentBuild};
use crate::discovery::{discover_instructions, DiscoveryOptions};
use crate::hierarchy::Hierarchy;
use crate::inventory::{DeploymentInventory, ImageInventory};
use crate::paths::FactoryPaths;
use crate::scheduler::{BuildOptions, BuildReport, BuildScheduler};
use crate::tool::{CommandTool, ImageTool};

pub struct Factory {
    config: FactoryConfig,
    paths: FactoryPaths,
    tool: Arc<dyn ImageTool>,
}

impl Factory {
    /// Create a factory driving the configured external build tool.
    pub fn new(config: FactoryConfig) -> Result<Self> {
        let tool = Arc::new(CommandTool::new(config.build_tool.clone()));
        Self::with_tool(config, tool)
    }

    /// Create a factory with an explicit [`ImageTool`].
    pub fn with_tool(config: FactoryConfig, tool: Arc<dyn ImageTool>) -> Result<Self> {
        config.validate()?;
        let paths = FactoryPaths::resolve(&config.base_directory)?;
        Ok(Self {
            config,
            paths,
            tool,
        })
    }

    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    pub fn paths(&self) -> &FactoryPaths {
        &self.paths
    }

    /// Discover build instructions and index them by parent.
    pub fn load_hierarchy(&self) -> Result<Hierarchy> {
        let root = self.paths.require_dockerfile_directory()?;
        let options = DiscoveryOptions {
            strict_declarations: self.config.strict_declarations,
        };
        Hierarchy::build(discover_instructions(root, options)?)
    }

    pub fn image_inventory(&self) -> Result<ImageInventory> {
        Ok(ImageInventory::from_hierarchy(&self.load_hierarchy()?))
    }

    pub fn deployment_inventory(&self) -> Result<DeploymentInventory> {
        let root = self.paths.require_deployment_directory()?;
        Ok(DeploymentInventory::new(list_deployments(root)?))
    }

    /// Build every buildable base image, parents before children.
    ///
    /// Individual build or push failures are logged and reported; only
    /// configuration, discovery and rewrite errors are returned as `Err`.
    pub async fn build_base_images(&self) -> Result<BuildReport> {
        let registry = self.config.require_registry()?.to_string();
        let tag = self.config.resolved_tag()?;

        tracing::info!(registry = %registry, tag = %tag, "Building all images");
        if self.config.force_rebuild {
            tracing::warn!("Force rebuild enabled, build cache is bypassed");
        }
        if !self.config.push {
            tracing::warn!("Local only build, images will not be pushed");
        }

        let hierarchy = Arc::new(self.load_hierarchy()?);
        let dockerfile_directory = self.paths.require_dockerfile_directory()?;

        let temp_dir = tempfile::Builder::new()
            .prefix(".tmp-")
            .tempdir_in(dockerfile_directory)?;
        tracing::debug!(path = %temp_dir.path().display(), "Created temp directory");

        let options = BuildOptions {
            registry_base_path: registry,
            tag,
            force_rebuild: self.config.force_rebuild,
            push: self.config.push,
            max_parallel_builds: self.config.max_parallel_builds,
            working_dir: self.paths.base_directory.clone(),
            temp_dir: temp_dir.path().to_path_buf(),
        };
        let outcome = BuildScheduler::new(hierarchy, Arc::clone(&self.tool), options)
            .run()
            .await;

        if let Err(e) = temp_dir.close() {
            tracing::warn!(error = %e, "Failed to remove temp directory");
        }

        let report = outcome?;
        tracing::info!(
            built = report.built.len(),
            failed = report.failed.len(),
            push_failed = report.push_failed.len(),
            "Finished building images"
        );
        Ok(report)
    }

    /// Build one deployment image.
    pub async fn build_deployment(&self, name: &str) -> Result<BuildReport> {
        let registry = self.config.require_registry()?.to_string();
        let build_tag = self.config.resolved_tag()?;
        let deployment_tag = self.config.resolved_deployment_tag()?;
        let root = self.paths.require_deployment_directory()?;

        tracing::info!(
            deployment = name,
            tag = %build_tag,
            deployment_tag = %deployment_tag,
            "Building deployment"
        );

        DeploymentBuild {
            name: name.to_string(),
            registry_base_path: registry,
            build_tag,
            deployment_tag,
            push: self.config.push,
        }
        .run(root, Arc::clone(&self.tool))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::BuildRequest;
    use async_trait::async_trait;
    use container_factory_core::error::FactoryError;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTool {
        built: Mutex<Vec<String>>,
        pushed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ImageTool for RecordingTool {
        async fn build(&self, request: &BuildRequest) -> Result<()> {
            self.built.lock().push(request.reference());
            Ok(())
        }

        async fn push(&self, reference: &str) -> Result<()> {
            self.pushed.lock().push(reference.to_string());
            Ok(())
        }
    }

    fn layout() -> tempfile::TempDir {
        let dir = tempfile::TempDir::new().unwrap();
        let dockerfiles = dir.path().join("dockerfiles");
        std::fs::create_dir_all(dockerfiles.join("lang")).unwrap();
        std::fs::write(dockerfiles.join("base"), "FROM ubuntu:22.04\n").unwrap();
        std::fs::write(dockerfiles.join("lang/python"), "FROM {{ local }}/base\n").unwrap();
        let deployments = dir.path().join("deployments/api");
        std::fs::create_dir_all(&deployments).unwrap();
        std::fs::write(deployments.join("service-a"), "FROM {{ local }}/lang/python\n").unwrap();
        dir
    }

    fn config(dir: &tempfile::TempDir) -> FactoryConfig {
        FactoryConfig {
            base_directory: dir.path().to_path_buf(),
            registry_base_path: Some("registry.example.com/team".to_string()),
            tag: Some("v1".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_base_images() {
        let dir = layout();
        let tool = Arc::new(RecordingTool::default());
        let factory = Factory::with_tool(config(&dir), tool.clone()).unwrap();

        let report = factory.build_base_images().await.unwrap();
        assert_eq!(report.built, vec!["base", "lang/python"]);
        assert_eq!(
            *tool.built.lock(),
            vec![
                "registry.example.com/team/base:v1",
                "registry.example.com/team/lang/python:v1"
            ]
        );
        assert_eq!(tool.pushed.lock().len(), 2);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("dockerfiles"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().starts_with(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_registry_required() {
        let dir = layout();
        let mut config = config(&dir);
        config.registry_base_path = None;
        let tool = Arc::new(RecordingTool::default());
        let factory = Factory::with_tool(config, tool.clone()).unwrap();

        let err = factory.build_base_images().await.unwrap_err();
        assert!(matches!(err, FactoryError::ConfigError(_)));
        assert_eq!(err.exit_code(), 100);
        assert!(tool.built.lock().is_empty());
    }

    #[tokio::test]
    async fn test_build_deployment_uses_deployment_tag() {
        let dir = layout();
        let mut config = config(&dir);
        config.deployment_tag = Some("release".to_string());
        config.push = false;
        let tool = Arc::new(RecordingTool::default());
        let factory = Factory::with_tool(config, tool.clone()).unwrap();

        factory.build_deployment("api/service-a").await.unwrap();
        assert_eq!(
            *tool.built.lock(),
            vec!["registry.example.com/team/deployments/api/service-a:release"]
        );
        assert!(tool.pushed.lock().is_empty());
    }

    #[tokio::test]
    async fn test_missing_deployment_exit_code() {
        let dir = layout();
        let factory =
            Factory::with_tool(config(&dir), Arc::new(RecordingTool::default())).unwrap();
        let err = factory.build_deployment("nope").await.unwrap_err();
        assert_eq!(err.exit_code(), 101);
    }

    #[test]
    fn test_inventories() {
        let dir = layout();
        let factory =
            Factory::with_tool(config(&dir), Arc::new(RecordingTool::default())).unwrap();

        let images = factory.image_inventory().unwrap();
        assert_eq!(images.buildable_images.len(), 1);
        assert_eq!(images.buildable_images[0].name, "base");
        assert_eq!(images.buildable_images[0].children[0].name, "lang/python");
        assert!(images.orphaned_images.is_empty());

        let deployments = factory.deployment_inventory().unwrap();
        assert_eq!(deployments.deployments, vec!["api/service-a"]);
    }

    #[test]
    fn test_missing_base_directory() {
        let config = FactoryConfig {
            base_directory: "/nonexistent/factory".into(),
            ..Default::default()
        };
        assert!(matches!(
            Factory::new(config),
            Err(FactoryError::ConfigError(_))
        ));
    }
}
