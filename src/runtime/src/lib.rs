//! Container Factory Runtime - image build engine.
//!
//! Discovers build instruction files, indexes them into a parent/child
//! hierarchy, pins internal base image references to the build tag, and
//! builds and publishes every buildable image in dependency order.

#![allow(clippy::result_large_err)]

pub mod deployment;
pub mod discovery;
pub mod dockerfile;
pub mod factory;
pub mod hierarchy;
pub mod inventory;
pub mod paths;
pub mod publisher;
pub mod rewrite;
pub mod scheduler;
pub mod tool;

// Re-export common types
pub use deployment::{deployment_image, list_deployments, DeploymentBuild};
pub use discovery::{discover_instructions, BuildInstruction, DiscoveryOptions};
pub use dockerfile::{find_declarations, first_declaration, BaseImageDeclaration};
pub use factory::Factory;
pub use hierarchy::{BuildableImage, Hierarchy, OrphanedImage, ROOT_KEY};
pub use inventory::{DeploymentInventory, ImageInventory, OutputFormat};
pub use paths::FactoryPaths;
pub use publisher::{RegistryPublisher, PUSH_ATTEMPTS};
pub use rewrite::InstructionRewriter;
pub use scheduler::{BuildOptions, BuildReport, BuildScheduler};
pub use tool::{BuildRequest, CommandTool, ImageTool};

/// Container Factory Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
