use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

use super::{
    default_name, key_from_url, validate_key_part, FileStorage, StorageError, StorageResult,
};

/// Files on disk under `root`, addressed by URLs starting with `public_prefix`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    public_prefix: String,
}

impl LocalStorage {
    pub async fn new(root: impl Into<PathBuf>, public_prefix: &str) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        })
    }

    fn marker(&self) -> String {
        format!("{}/", self.public_prefix)
    }

    fn path_for_url(&self, url: &str) -> StorageResult<PathBuf> {
        let key = key_from_url(url, &self.marker());
        validate_key_part(&key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        folder: &str,
        filename: Option<&str>,
        content_type: &str,
    ) -> StorageResult<String> {
        let name = filename
            .map(str::to_string)
            .unwrap_or_else(|| default_name(content_type));
        validate_key_part(folder)?;
        validate_key_part(&name)?;

        let key = format!("{folder}/{name}");
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, bytes).await?;

        tracing::debug!(key = %key, "Stored upload on local disk");
        Ok(format!("{}/{}", self.public_prefix, key))
    }

    async fn delete(&self, url: &str) -> StorageResult<()> {
        let path = self.path_for_url(url)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(url.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, url: &str) -> StorageResult<bool> {
        let path = self.path_for_url(url)?;
        Ok(fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false))
    }

    async fn signed_url(&self, url: &str, _ttl: Duration) -> StorageResult<String> {
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_exists_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media").await.unwrap();

        let url = storage
            .upload(b"%PDF-1.4".to_vec(), "cvs", Some("cv_2210511.pdf"), "application/pdf")
            .await
            .unwrap();
        assert_eq!(url, "/media/cvs/cv_2210511.pdf");
        assert!(dir.path().join("cvs/cv_2210511.pdf").exists());
        assert!(storage.exists(&url).await.unwrap());

        storage.delete(&url).await.unwrap();
        assert!(!storage.exists(&url).await.unwrap());
        assert!(matches!(storage.delete(&url).await, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn generates_a_name_when_none_given() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/").await.unwrap();
        let url = storage
            .upload(vec![1, 2, 3], "letters", None, "image/png")
            .await
            .unwrap();
        assert!(url.starts_with("/media/letters/"));
        assert!(url.ends_with(".png"));
        assert!(storage.exists(&url).await.unwrap());
    }

    #[tokio::test]
    async fn refuses_paths_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media").await.unwrap();
        let result = storage.upload(vec![0], "../outside", Some("x.pdf"), "application/pdf").await;
        assert!(matches!(result, Err(StorageError::InvalidName(_))));
    }
}
