//! Dynamic build instruction rewriting.
//!
//! Internal base image references (`{{ local }}/<role>`) are replaced by
//! `<registry>/<role>:<tag>` in a copy of the instruction file written to a
//! per-invocation temp directory. The copy is named by the SHA-256 of the
//! source path, so the same source always maps to the same file and
//! concurrent builds never share one. The source file is never touched.

use std::path::{Path, PathBuf};

use container_factory_core::error::{FactoryError, Result};
use sha2::{Digest, Sha256};

use crate::dockerfile::find_declarations;

/// Writes tag-pinned copies of build instruction files.
#[derive(Debug, Clone)]
pub struct InstructionRewriter {
    temp_dir: PathBuf,
    registry_base_path: String,
    tag: String,
}

impl InstructionRewriter {
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        registry_base_path: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            temp_dir: temp_dir.into(),
            registry_base_path: registry_base_path.into().trim_end_matches('/').to_string(),
            tag: tag.into(),
        }
    }

    /// Path the rewritten copy of `source` is written to.
    pub fn target_path(&self, source: &Path) -> PathBuf {
        self.temp_dir.join(temp_file_name(source))
    }

    /// Rewrite `source` into the temp directory and return the new path.
    pub fn rewrite(&self, source: &Path) -> Result<PathBuf> {
        let target = self.target_path(source);
        tracing::debug!(
            temp_dir = %self.temp_dir.display(),
            source = %source.display(),
            target = %target.display(),
            "Creating dynamic build instruction file"
        );

        let content = std::fs::read(source).map_err(|e| FactoryError::RewriteError {
            path: source.to_path_buf(),
            message: format!("failed to read: {}", e),
        })?;

        let rewritten = self.rewrite_content(&content);

        std::fs::write(&target, rewritten).map_err(|e| FactoryError::RewriteError {
            path: target.clone(),
            message: format!("failed to write: {}", e),
        })?;
        set_standard_permissions(&target)?;

        Ok(target)
    }

    /// Replace every internal base image reference in `content`.
    ///
    /// Bytes outside the replaced spans are copied verbatim, whatever their
    /// encoding.
    pub fn rewrite_content(&self, content: &[u8]) -> Vec<u8> {
        let mut output = Vec::with_capacity(content.len());
        let mut copied = 0;
        for declaration in find_declarations(content) {
            if !declaration.internal {
                continue;
            }
            output.extend_from_slice(&content[copied..declaration.span.start]);
            output.extend_from_slice(self.qualified_reference(&declaration.role).as_bytes());
            copied = declaration.span.end;
        }
        output.extend_from_slice(&content[copied..]);
        output
    }

    /// `<registry>/<role>:<tag>`
    pub fn qualified_reference(&self, role: &str) -> String {
        format!("{}/{}:{}", self.registry_base_path, role, self.tag)
    }
}

/// Hex SHA-256 of the source path.
pub fn temp_file_name(source: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(unix)]
fn set_standard_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).map_err(|e| {
        FactoryError::RewriteError {
            path: path.to_path_buf(),
            message: format!("failed to set permissions: {}", e),
        }
    })
}

#[cfg(not(unix))]
fn set_standard_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
