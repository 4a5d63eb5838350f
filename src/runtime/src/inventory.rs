//! Inventory reporting: buildable/orphaned images and deployments.
//!
//! Renderers are shared by the command line and the HTTP front-end.

use std::fmt::Write as _;

use container_factory_core::error::Result;
use serde::{Deserialize, Serialize};

use crate::hierarchy::{BuildableImage, Hierarchy, OrphanedImage};

/// Output format for inventory listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Indented human-readable text
    #[default]
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    /// HTTP content type for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Text => "text/plain; charset=utf-8",
            Self::Json => "application/json",
            Self::Yaml => "application/yaml",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "text" | "stdout" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(format!(
                "unknown output format: '{}' (supported: text, json, yaml)",
                s
            )),
        }
    }
}

/// Buildable and orphaned images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInventory {
    pub buildable_images: Vec<BuildableImage>,
    pub orphaned_images: Vec<OrphanedImage>,
}

impl ImageInventory {
    pub fn from_hierarchy(hierarchy: &Hierarchy) -> Self {
        let (buildable_images, orphaned_images) = hierarchy.partition();
        Self {
            buildable_images,
            orphaned_images,
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self.render_text()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }

    /// ```text
    /// Buildable Images:
    /// base
    ///   ↳mid
    ///      ↳leaf
    ///
    /// Orphaned Images:
    /// orphan (Missing parent: missing-parent)
    /// ```
    pub fn render_text(&self) -> String {
        let mut out = String::from("Buildable Images:\n");
        for image in &self.buildable_images {
            out.push_str(&image.name);
            out.push('\n');
            render_children(image, "", &mut out);
        }
        out.push_str("\nOrphaned Images:\n");
        for orphan in &self.orphaned_images {
            let _ = writeln!(out, "{} (Missing parent: {})", orphan.name, orphan.parent_name);
        }
        out
    }
}

fn render_children(image: &BuildableImage, prefix: &str, out: &mut String) {
    for child in &image.children {
        let _ = writeln!(out, "{}  ↳{}", prefix, child.name);
        render_children(child, &format!("   {}", prefix), out);
    }
}

/// Deployment definitions, lexically sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentInventory {
    pub deployments: Vec<String>,
}

impl DeploymentInventory {
    pub fn new(mut deployments: Vec<String>) -> Self {
        deployments.sort();
        Self { deployments }
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Text => Ok(self
                .deployments
                .iter()
                .map(|d| format!("{}\n", d))
                .collect()),
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(self)?),
        }
    }
}
