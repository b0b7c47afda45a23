//! Upload intake.
//!
//! Validates the screenshot type and stores a copy under a fresh UUID name
//! so every later artifact (composite, OCR reply) can be traced back to it.

use anyhow::{anyhow, Context, Result};
use image::ImageFormat;
use std::fs;
use std::path::{Path, PathBuf};

/// Image types accepted as uploads.
const ACCEPTED_FORMATS: [ImageFormat; 3] = [ImageFormat::Jpeg, ImageFormat::Png, ImageFormat::Gif];

/// A screenshot copied into the upload directory.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// UUID used for every artifact of this upload
    pub name: String,
    pub path: PathBuf,
}

impl StoredUpload {
    /// Deletes the stored copy; used when the upload is rejected.
    pub fn remove(&self) {
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("Failed to remove {}: {}", self.path.display(), e);
        }
    }
}

/// Checks the upload type from its content and stores it in `upload_dir`.
pub fn store_upload(source: &Path, upload_dir: &Path) -> Result<StoredUpload> {
    let bytes = fs::read(source)
        .with_context(|| format!("Failed to read upload: {}", source.display()))?;

    let format = image::guess_format(&bytes)
        .map_err(|_| anyhow!("Invalid file type: {}", source.display()))?;
    if !ACCEPTED_FORMATS.contains(&format) {
        return Err(anyhow!(
            "Invalid file type {:?}: {}",
            format,
            source.display()
        ));
    }

    let name = uuid::Uuid::new_v4().to_string();
    let extension = format.extensions_str().first().copied().unwrap_or("img");
    let path = upload_dir.join(format!("{}.{}", name, extension));
    fs::write(&path, &bytes).with_context(|| format!("Failed to store upload: {}", path.display()))?;

    log::info!(
        "Stored {:?} upload {} as {}",
        format,
        source.display(),
        path.display()
    );
    Ok(StoredUpload { name, path })
}
