use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cover_contracts::ImageData;

pub const EXPORT_FILE_STEM: &str = "blog-visual-16x9";

/// File name used when exporting into a directory.
pub fn default_export_name(image: &ImageData) -> String {
    format!("{EXPORT_FILE_STEM}.{}", image.file_extension())
}

/// Writes the decoded image bytes. A directory target receives
/// [`default_export_name`]; anything else is taken as the file path.
pub fn export_image(image: &ImageData, target: &Path) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(default_export_name(image))
    } else {
        target.to_path_buf()
    };
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let bytes = image
        .decode_bytes()
        .context("image payload is not valid base64")?;
    fs::write(&path, bytes).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "exported image");
    Ok(path)
}
