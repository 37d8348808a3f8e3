//! Recipe image storage on the local filesystem.

use std::path::{Path, PathBuf};

use cookbook_core::AppError;
use image::ImageFormat;
use tokio::{fs, io::AsyncWriteExt};
use tracing::debug;
use uuid::Uuid;

pub const UPLOAD_DIR: &str = "uploads/recipe";

const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Decodes the payload fully; a file whose header looks like an image but
/// whose body is corrupt is rejected too.
pub async fn check_image(bytes: Vec<u8>) -> Result<(Vec<u8>, ImageFormat), AppError> {
    tokio::task::spawn_blocking(move || {
        let format = image::guess_format(&bytes).map_err(|_| invalid())?;
        image::load_from_memory_with_format(&bytes, format).map_err(|_| invalid())?;
        Ok((bytes, format))
    })
    .await
    .map_err(|e| AppError::Internal(e.into()))?
}

fn invalid() -> AppError {
    AppError::field("image", INVALID_IMAGE)
}

/// `uploads/recipe/<uuid>.<ext>`. The uploaded extension is kept only when it
/// is one the decoded format answers to; anything else gets the format's own.
pub fn image_file_path(original_name: Option<&str>, format: ImageFormat) -> String {
    let known = format.extensions_str();
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|ext| known.contains(&ext.as_str()))
        .or_else(|| known.first().map(|e| (*e).to_owned()))
        .unwrap_or_else(|| "img".to_owned());
    format!("{UPLOAD_DIR}/{}.{ext}", Uuid::new_v4())
}

/// Writes `bytes` at `relative` under `media_root`. Never overwrites.
pub async fn store(media_root: &Path, relative: &str, bytes: &[u8]) -> Result<PathBuf, AppError> {
    let full = media_root.join(relative);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).await?;
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&full)
        .await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    debug!(path = %full.display(), size = bytes.len(), "stored upload");
    Ok(full)
}
