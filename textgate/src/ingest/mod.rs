//! Upload ingestion: extension checks, request-unique storage and scoped cleanup.
//!
//! Every upload is written under its own generated name and handed to the caller as
//! an [`UploadedImage`]. The handle owns the stored file: dropping it removes the file,
//! so cleanup happens on every exit path of a request, including errors and client
//! disconnects.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::{Error, Result};

/// Image formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageExtension {
    Png,
    Jpg,
    Jpeg,
}

impl ImageExtension {
    /// Resolve the extension of `file_name`.
    ///
    /// With `case_sensitive` only the lowercase spellings match; otherwise `.PNG`, `.Jpg`
    /// and friends are accepted too.
    pub fn from_file_name(file_name: &str, case_sensitive: bool) -> Option<Self> {
        let extension = Path::new(file_name).extension()?.to_str()?;
        let extension = if case_sensitive {
            extension.to_string()
        } else {
            extension.to_ascii_lowercase()
        };

        match extension.as_str() {
            "png" => Some(Self::Png),
            "jpg" => Some(Self::Jpg),
            "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
            Self::Jpeg => "jpeg",
        }
    }
}

/// A validated upload stored on local disk.
///
/// Owned by exactly one request. The stored file is removed when this is dropped.
#[derive(Debug)]
pub struct UploadedImage {
    file_id: Uuid,
    storage_path: PathBuf,
    original_name: String,
    extension: ImageExtension,
    size: u64,
    released: bool,
}

impl UploadedImage {
    pub fn file_id(&self) -> Uuid {
        self.file_id
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn extension(&self) -> ImageExtension {
        self.extension
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Remove the stored file without blocking the runtime. `Drop` covers every path that skips this.
    pub async fn release(mut self) {
        match tokio::fs::remove_file(&self.storage_path).await {
            Ok(()) => {
                debug!(file_id = %self.file_id, "Released stored upload");
                self.released = true;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.released = true,
            // Left to the drop guard
            Err(e) => debug!(file_id = %self.file_id, error = %e, "Async removal failed, retrying on drop"),
        }
    }
}

impl Drop for UploadedImage {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        // Blocking, but a single unlink
        match std::fs::remove_file(&self.storage_path) {
            Ok(()) => debug!(file_id = %self.file_id, path = %self.storage_path.display(), "Removed stored upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                file_id = %self.file_id,
                path = %self.storage_path.display(),
                error = %e,
                "Failed to remove stored upload"
            ),
        }
    }
}

/// Filesystem store for uploads in flight.
///
/// The directory is shared by all requests; each request only touches the file it created.
#[derive(Debug, Clone)]
pub struct ImageStore {
    directory: PathBuf,
    case_sensitive_extensions: bool,
    max_file_size: u64,
}

impl ImageStore {
    pub async fn new(directory: impl Into<PathBuf>, case_sensitive_extensions: bool, max_file_size: u64) -> Result<Self> {
        let directory = directory.into();

        // Create storage directory if it doesn't exist
        tokio::fs::create_dir_all(&directory)
            .await
            .map_err(|e| Error::storage(format!("create storage directory {}", directory.display()), e))?;

        Ok(Self {
            directory,
            case_sensitive_extensions,
            max_file_size,
        })
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.storage.directory,
            config.storage.case_sensitive_extensions,
            config.limits.max_file_size,
        )
        .await
    }

    /// Validate `original_name` and stream the upload to a request-unique file.
    ///
    /// Nothing is written when the extension is rejected. A stream that ends without
    /// bytes, fails midway or exceeds the size limit leaves no file behind.
    #[instrument(skip(self, stream), fields(file_id = tracing::field::Empty))]
    pub async fn ingest<S, E>(&self, original_name: &str, stream: S) -> Result<UploadedImage>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<Error>,
    {
        let extension =
            ImageExtension::from_file_name(original_name, self.case_sensitive_extensions).ok_or_else(|| Error::UnsupportedFormat {
                file_name: original_name.to_string(),
            })?;

        let file_id = Uuid::new_v4();
        tracing::Span::current().record("file_id", tracing::field::display(file_id));

        let storage_path = self.directory.join(format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            file_id,
            sanitize_file_name(original_name)
        ));

        let file = tokio::fs::File::create(&storage_path)
            .await
            .map_err(|e| Error::storage("create upload file", e))?;

        // From here on the handle owns the path, so any early return removes the partial file
        let mut image = UploadedImage {
            file_id,
            storage_path,
            original_name: original_name.to_string(),
            extension,
            size: 0,
            released: false,
        };
        let mut writer = BufWriter::new(file);
        let mut stream = std::pin::pin!(stream);

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::<Error>::into)?;
            image.size += chunk.len() as u64;

            // Check size limit incrementally to fail fast
            if image.size > self.max_file_size {
                warn!(
                    size = image.size,
                    max_file_size = self.max_file_size,
                    "File size limit exceeded, aborting upload"
                );
                return Err(Error::PayloadTooLarge {
                    message: format!(
                        "File size exceeds maximum allowed size of {} bytes ({} MB)",
                        self.max_file_size,
                        self.max_file_size / (1024 * 1024)
                    ),
                });
            }

            writer.write_all(&chunk).await.map_err(|e| Error::storage("write upload file", e))?;
        }

        writer.flush().await.map_err(|e| Error::storage("flush upload file", e))?;

        if image.size == 0 {
            debug!(original_name, "Upload contained no bytes");
            return Err(Error::EmptyUpload);
        }

        info!(
            original_name,
            extension = image.extension.as_str(),
            size = image.size,
            path = %image.storage_path.display(),
            "Upload stored"
        );

        Ok(image)
    }

    /// Read the stored bytes of an upload.
    pub async fn read(&self, image: &UploadedImage) -> Result<Bytes> {
        tokio::fs::read(&image.storage_path)
            .await
            .map(Bytes::from)
            .map_err(|e| Error::storage("read upload file", e))
    }
}

/// Keep only the last path component and replace anything outside `[A-Za-z0-9._-]`.
fn sanitize_file_name(original_name: &str) -> String {
    let base = original_name.rsplit(['/', '\\']).next().unwrap_or(original_name);
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect()
}
