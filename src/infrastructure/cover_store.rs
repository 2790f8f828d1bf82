//! Filesystem storage for book covers.
//!
//! Uploads land under `<root>/books/<year>/<uuid>.<ext>`; the returned
//! reference is the path relative to the root.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use image::ImageFormat;
use uuid::Uuid;

use crate::domain::{CoverStore, DomainError};

pub struct LocalCoverStore {
    root: PathBuf,
}

impl LocalCoverStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn extension_for(bytes: &[u8], file_name: &str) -> Result<&'static str, DomainError> {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Png) => Ok("png"),
        Ok(ImageFormat::Jpeg) => Ok("jpg"),
        _ => Err(DomainError::Validation(format!(
            "cover \"{}\" is not a PNG or JPEG image",
            file_name
        ))),
    }
}

#[async_trait]
impl CoverStore for LocalCoverStore {
    async fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, DomainError> {
        let ext = extension_for(bytes, file_name)?;
        let reference = format!("books/{}/{}.{}", Utc::now().year(), Uuid::new_v4(), ext);

        let path = self.root.join(&reference);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::info!("Stored cover {} as {}", file_name, reference);
        Ok(reference)
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(reference);
        // References never leave the media root
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(DomainError::Validation(format!(
                "invalid cover reference \"{}\"",
                reference
            )));
        }
        Ok(self.root.join(relative))
    }

    async fn remove(&self, reference: &str) -> Result<(), DomainError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(DomainError::not_found("Cover", reference))
            }
            Err(e) => Err(e.into()),
        }
    }
}
