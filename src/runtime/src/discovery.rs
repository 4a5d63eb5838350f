//! Build instruction discovery.
//!
//! Walks an instruction root recursively and turns every non-hidden file
//! that declares a base image into a [`BuildInstruction`]. The image name is
//! the file's path relative to the root, with `/` as namespace separator.

use std::path::{Path, PathBuf};

use container_factory_core::error::{FactoryError, Result};
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::dockerfile::{first_declaration, looks_like_declaration};

/// One discovered build instruction file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInstruction {
    /// Image name, e.g. `lang/python`
    pub name: String,
    /// Parent image name for internally rooted instructions, empty otherwise
    pub parent_name: String,
    /// Absolute path of the original file
    pub source_path: PathBuf,
    /// Tag-rewritten copy, present only during a build pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewritten_path: Option<PathBuf>,
    /// Whether the declared base image is built by this factory
    pub has_internal_dependency: bool,
}

/// Discovery behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveryOptions {
    /// Warn about files whose `FROM` line looks like a declaration but
    /// does not parse. Such files are skipped either way.
    pub strict_declarations: bool,
}

/// Discover every build instruction under `root`, in file-name order.
pub fn discover_instructions(
    root: &Path,
    options: DiscoveryOptions,
) -> Result<Vec<BuildInstruction>> {
    tracing::info!(root = %root.display(), "Loading build instructions");

    let mut instructions = Vec::new();
    for relative in list_files(root)? {
        let source_path = root.join(&relative);
        if let Some(instruction) = load_instruction(&source_path, relative, options)? {
            instructions.push(instruction);
        }
    }

    tracing::debug!(count = instructions.len(), "Discovered build instructions");
    Ok(instructions)
}

/// List non-hidden files under `root` as `/`-separated relative paths.
///
/// Hidden entries (leading `.`) are skipped together with their contents,
/// which also keeps in-progress `.tmp-*` build directories out of the way.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry));

    for entry in walker {
        let entry = entry.map_err(|e| FactoryError::DiscoveryError {
            path: e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| root.to_path_buf()),
            message: e.to_string(),
        })?;

        if entry.file_type().is_dir() {
            tracing::debug!(namespace = %entry.path().display(), "Processing directory");
            continue;
        }
        files.push(relative_name(root, entry.path())?);
    }
    Ok(files)
}

fn load_instruction(
    source_path: &Path,
    name: String,
    options: DiscoveryOptions,
) -> Result<Option<BuildInstruction>> {
    let bytes = std::fs::read(source_path).map_err(|e| FactoryError::DiscoveryError {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })?;
    let Some(declaration) = first_declaration(&bytes) else {
        if options.strict_declarations {
            let content = String::from_utf8_lossy(&bytes);
            if let Some(line) = content.lines().find(|line| looks_like_declaration(line)) {
                tracing::warn!(
                    path = %source_path.display(),
                    line = line.trim(),
                    "Malformed base image declaration, skipping file"
                );
                return Ok(None);
            }
        }
        tracing::debug!(path = %source_path.display(), "No base image declaration, skipping file");
        return Ok(None);
    };

    let instruction = BuildInstruction {
        name,
        parent_name: declaration.parent_name().unwrap_or_default().to_string(),
        source_path: source_path.to_path_buf(),
        rewritten_path: None,
        has_internal_dependency: declaration.internal,
    };
    tracing::debug!(
        image = %instruction.name,
        parent = %instruction.parent_name,
        "Loaded build instruction"
    );
    Ok(Some(instruction))
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| FactoryError::DiscoveryError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}
