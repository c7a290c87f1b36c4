use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// Extensions accepted for uploaded images, compared case-sensitively.
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &[".jpeg", ".png"];

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("failed to retrieve image")]
    NoFile,
    #[error("invalid image format. only jpeg and png are supported")]
    BadExtension,
    #[error("failed to save image")]
    StorageFailure(#[source] io::Error),
}

/// A file part received with a request. Only its name (for the extension)
/// and its bytes are used; the content is never inspected.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    User,
    Tag,
}

impl ImageKind {
    fn dir_name(self) -> &'static str {
        match self {
            ImageKind::User => "users",
            ImageKind::Tag => "tags",
        }
    }

    /// Path segment under which images of this kind are served.
    pub fn url_segment(self) -> &'static str {
        match self {
            ImageKind::User => "user",
            ImageKind::Tag => "tag",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn dir(&self, kind: ImageKind) -> PathBuf {
        self.root.join(kind.dir_name())
    }

    pub async fn ensure_dirs(&self) -> io::Result<()> {
        for kind in [ImageKind::User, ImageKind::Tag] {
            fs::create_dir_all(self.dir(kind)).await?;
        }
        Ok(())
    }

    /// Stores `file` under a freshly generated name and returns that name.
    pub async fn save(
        &self,
        kind: ImageKind,
        file: Option<&UploadedFile>,
        allowed_extensions: &[&str],
    ) -> Result<String, UploadError> {
        let file = file.ok_or(UploadError::NoFile)?;

        let extension = Path::new(&file.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .filter(|ext| allowed_extensions.contains(&ext.as_str()))
            .ok_or(UploadError::BadExtension)?;

        let filename = format!("{}{}", Uuid::new_v4(), extension);
        let dir = self.dir(kind);
        fs::create_dir_all(&dir)
            .await
            .map_err(UploadError::StorageFailure)?;
        fs::write(dir.join(&filename), &file.bytes)
            .await
            .map_err(UploadError::StorageFailure)?;

        info!(kind = kind.url_segment(), %filename, size = file.bytes.len(), "Stored uploaded image.");
        Ok(filename)
    }

    pub async fn remove(&self, kind: ImageKind, filename: &str) -> io::Result<()> {
        fs::remove_file(self.dir(kind).join(filename)).await
    }

    /// Best-effort removal used for images that are no longer referenced.
    /// Failures are logged and otherwise ignored.
    pub async fn discard(&self, kind: ImageKind, filename: &str) {
        if let Err(e) = self.remove(kind, filename).await {
            warn!(kind = kind.url_segment(), %filename, error = %e, "Failed to remove unreferenced image.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn upload(name: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            bytes: Bytes::from_static(b"\x89PNG fake image"),
        }
    }

    #[tokio::test]
    async fn test_save_generates_unique_name_with_extension() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path());

        let first = store
            .save(ImageKind::User, Some(&upload("me.png")), ALLOWED_IMAGE_EXTENSIONS)
            .await
            .unwrap();
        let second = store
            .save(ImageKind::User, Some(&upload("me.png")), ALLOWED_IMAGE_EXTENSIONS)
            .await
            .unwrap();

        assert!(first.ends_with(".png"));
        assert_ne!(first, second);
        assert!(store.dir(ImageKind::User).join(&first).exists());
    }

    #[tokio::test]
    async fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path());

        let result = store.save(ImageKind::Tag, None, ALLOWED_IMAGE_EXTENSIONS).await;
        assert!(matches!(result, Err(UploadError::NoFile)));
    }

    #[tokio::test]
    async fn test_rejects_extensions_outside_allow_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path());

        for name in ["me.gif", "me.jpg", "me.PNG", "no_extension"] {
            let result = store
                .save(ImageKind::Tag, Some(&upload(name)), ALLOWED_IMAGE_EXTENSIONS)
                .await;
            assert!(matches!(result, Err(UploadError::BadExtension)), "{name}");
        }
    }

    #[tokio::test]
    async fn test_remove_and_discard() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path());

        let name = store
            .save(ImageKind::Tag, Some(&upload("t.jpeg")), ALLOWED_IMAGE_EXTENSIONS)
            .await
            .unwrap();
        store.remove(ImageKind::Tag, &name).await.unwrap();
        assert!(!store.dir(ImageKind::Tag).join(&name).exists());

        assert!(store.remove(ImageKind::Tag, &name).await.is_err());
        store.discard(ImageKind::Tag, &name).await;
    }
}
