//! Local reference to a captured photo.

use crate::client::AuthError;
use image::ImageFormat;
use std::path::{Path, PathBuf};
use url::Url;

/// A photo on local storage, given as a path or a `file://` URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    path: PathBuf,
}

impl ImageRef {
    /// Parse a camera output reference.
    pub fn parse(reference: &str) -> Result<Self, AuthError> {
        if reference.starts_with("file:") {
            let path = Url::parse(reference)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| AuthError::InvalidImageRef(reference.to_string()))?;
            return Ok(Self { path });
        }
        if reference.trim().is_empty() {
            return Err(AuthError::InvalidImageRef(reference.to_string()));
        }
        Ok(Self {
            path: PathBuf::from(reference),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the image bytes.
    ///
    /// Uploads always declare JPEG; other content is sent as-is with a warning.
    pub async fn read(&self) -> Result<Vec<u8>, AuthError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| AuthError::ImageRead {
                path: self.path.clone(),
                source,
            })?;

        match image::guess_format(&bytes) {
            Ok(ImageFormat::Jpeg) => {}
            Ok(other) => {
                tracing::warn!(path = %self.path.display(), format = ?other, "image is not JPEG; uploading anyway")
            }
            Err(_) => {
                tracing::warn!(path = %self.path.display(), "unrecognized image data; uploading anyway")
            }
        }
        Ok(bytes)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}
