use std::path::PathBuf;

use log::{debug, error};
use uuid::Uuid;

use crate::config::UploadConfig;
use crate::errors::ServiceError;
use crate::validations::sanitize_file_name;

type Result<T> = std::result::Result<T, ServiceError>;

/// Public URL prefix of stored files
pub const UPLOAD_URL_PREFIX: &str = "/uploads";

/// A file written to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Name as sent by the client, used for exercise titles
    pub original_name: String,
    /// Name on disk inside the upload directory
    pub file_name: String,
    pub url: String,
}

/// Writes uploaded files under a single directory with collision-free names
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    max_file_bytes: usize,
    max_files: usize,
    max_request_bytes: usize,
}

impl FileStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            max_file_bytes: config.max_file_bytes,
            max_files: config.max_files,
            max_request_bytes: config.max_request_bytes,
        }
    }

    pub fn max_file_bytes(&self) -> usize {
        self.max_file_bytes
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    pub fn max_request_bytes(&self) -> usize {
        self.max_request_bytes
    }

    /// Fails with a validation error once `size` goes past the per-file limit
    pub fn check_size(&self, size: usize) -> Result<()> {
        if size > self.max_file_bytes {
            return Err(ServiceError::Validation(format!(
                "File exceeds the {} byte limit",
                self.max_file_bytes
            )));
        }
        Ok(())
    }

    /// Stores `bytes` as `<uuid>-<sanitised name>`
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<StoredFile> {
        self.check_size(bytes.len())?;

        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        let path = self.dir.join(&file_name);

        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            error!("Failed to create upload directory {:?}: {}", self.dir, e);
            ServiceError::Internal("Could not store uploaded file".to_string())
        })?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            error!("Failed to write upload {:?}: {}", path, e);
            ServiceError::Internal("Could not store uploaded file".to_string())
        })?;

        debug!("Stored upload {:?} ({} bytes)", path, bytes.len());
        Ok(StoredFile {
            original_name: original_name.to_string(),
            url: format!("{}/{}", UPLOAD_URL_PREFIX, file_name),
            file_name,
        })
    }

    /// Deletes a previously stored file
    pub async fn remove(&self, stored: &StoredFile) -> std::io::Result<()> {
        tokio::fs::remove_file(self.dir.join(&stored.file_name)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(max_file_bytes: usize) -> (FileStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("classroom-uploads-{}", Uuid::new_v4()));
        let config = UploadConfig {
            dir: dir.to_string_lossy().into_owned(),
            max_file_bytes,
            max_files: 4,
            max_request_bytes: 4 * max_file_bytes,
        };
        (FileStore::new(&config), dir)
    }

    #[actix_web::test]
    async fn test_save_writes_file_with_unique_name() {
        let (store, dir) = store(1024);

        let stored = store.save("../notes/week 1.pdf", b"%PDF").await.unwrap();
        assert_eq!(stored.original_name, "../notes/week 1.pdf");
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.url.ends_with("-week_1.pdf"));

        assert_eq!(stored.url, format!("/uploads/{}", stored.file_name));
        let written = tokio::fs::read(dir.join(&stored.file_name)).await.unwrap();
        assert_eq!(written, b"%PDF");

        let again = store.save("../notes/week 1.pdf", b"%PDF").await.unwrap();
        assert_ne!(again.url, stored.url);

        store.remove(&stored).await.unwrap();
        assert!(!dir.join(&stored.file_name).exists());

        let _ = tokio::fs::remove_dir_all(dir).await;
    }

    #[actix_web::test]
    async fn test_save_rejects_oversized_file() {
        let (store, dir) = store(3);
        let err = store.save("big.bin", b"1234").await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        assert!(!dir.exists());
    }
}
