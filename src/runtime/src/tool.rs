//! External container tool seam.
//!
//! Image construction and registry pushes are delegated to a container CLI
//! (`docker` by default) run as a subprocess; success is its exit status.

use std::path::PathBuf;
use std::process::ExitStatus;

use async_trait::async_trait;
use container_factory_core::error::{FactoryError, Result};
use tokio::process::Command;

/// One image build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    /// Fully qualified image name without tag
    pub image: String,
    /// Tag applied to the built image
    pub tag: String,
    /// Rewritten build instruction file
    pub dockerfile: PathBuf,
    /// Bypass the build cache
    pub no_cache: bool,
    /// Working directory (build context) for the subprocess
    pub working_dir: PathBuf,
}

impl BuildRequest {
    /// `<image>:<tag>`
    pub fn reference(&self) -> String {
        format!("{}:{}", self.image, self.tag)
    }

    /// `build -t <image>:<tag> -f <file> [--no-cache=true] .`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "build".to_string(),
            "-t".to_string(),
            self.reference(),
            "-f".to_string(),
            self.dockerfile.to_string_lossy().into_owned(),
        ];
        if self.no_cache {
            args.push("--no-cache=true".to_string());
        }
        args.push(".".to_string());
        args
    }
}

/// Builds and pushes images.
#[async_trait]
pub trait ImageTool: Send + Sync {
    /// Build one image; `Err` when the build did not succeed.
    async fn build(&self, request: &BuildRequest) -> Result<()>;

    /// Push one `<image>:<tag>` reference, single attempt.
    async fn push(&self, reference: &str) -> Result<()>;
}

/// [`ImageTool`] backed by a container CLI subprocess.
#[derive(Debug, Clone)]
pub struct CommandTool {
    executable: String,
}

impl CommandTool {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl Default for CommandTool {
    fn default() -> Self {
        Self::new(container_factory_core::config::DEFAULT_BUILD_TOOL)
    }
}

#[async_trait]
impl ImageTool for CommandTool {
    async fn build(&self, request: &BuildRequest) -> Result<()> {
        let reference = request.reference();
        tracing::debug!(
            executable = %self.executable,
            args = ?request.args(),
            working_dir = %request.working_dir.display(),
            "Running build subprocess"
        );

        let status = Command::new(&self.executable)
            .args(request.args())
            .current_dir(&request.working_dir)
            .status()
            .await
            .map_err(|e| FactoryError::BuildFailed {
                image: reference.clone(),
                message: format!("failed to spawn {}: {}", self.executable, e),
            })?;

        check_status(status).map_err(|message| FactoryError::BuildFailed {
            image: reference,
            message,
        })
    }

    async fn push(&self, reference: &str) -> Result<()> {
        tracing::debug!(executable = %self.executable, image = reference, "Running push subprocess");

        let status = Command::new(&self.executable)
            .args(["push", reference])
            .status()
            .await
            .map_err(|e| FactoryError::PushFailed {
                image: reference.to_string(),
                attempts: 1,
                message: format!("failed to spawn {}: {}", self.executable, e),
            })?;

        check_status(status).map_err(|message| FactoryError::PushFailed {
            image: reference.to_string(),
            attempts: 1,
            message,
        })
    }
}

fn check_status(status: ExitStatus) -> std::result::Result<(), String> {
    if status.success() {
        Ok(())
    } else {
        Err(status.to_string())
    }
}
