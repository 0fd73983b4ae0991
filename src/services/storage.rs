//! File storage abstraction.
//!
//! Uploaded documents, resumes and generated offer letters are stored as opaque
//! handles (`dir/uuid-name`). The database keeps only the handle.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Blob storage used by the document vault and the offer engine.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` under `dir` and returns the handle.
    async fn put(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> Result<String>;
    /// Reads the bytes behind `handle`.
    async fn get(&self, handle: &str) -> Result<Vec<u8>>;
    /// Removes `handle`. Removing a missing handle is not an error.
    async fn delete(&self, handle: &str) -> Result<()>;
}

/// Reduces a client-supplied name to `[A-Za-z0-9._-]`, keeping the extension.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

fn new_handle(dir: &str, file_name: &str) -> String {
    format!(
        "{}/{}-{}",
        dir.trim_matches('/'),
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

/// Stores files below a root directory on local disk.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, handle: &str) -> Result<PathBuf> {
        let relative = Path::new(handle);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if handle.is_empty() || escapes {
            return Err(Error::not_found("File", handle));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let handle = new_handle(dir, file_name);
        let path = self.resolve(&handle)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>> {
        let path = self.resolve(handle)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("File", handle))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, handle: &str) -> Result<()> {
        let path = self.resolve(handle)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Keeps files in memory; used by tests and ephemeral setups.
#[derive(Debug, Default, Clone)]
pub struct MemoryFileStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryFileStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `handle` currently exists.
    pub async fn contains(&self, handle: &str) -> bool {
        self.files.read().await.contains_key(handle)
    }

    /// Number of stored files.
    pub async fn len(&self) -> usize {
        self.files.read().await.len()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(&self, dir: &str, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let handle = new_handle(dir, file_name);
        self.files.write().await.insert(handle.clone(), bytes);
        Ok(handle)
    }

    async fn get(&self, handle: &str) -> Result<Vec<u8>> {
        self.files
            .read()
            .await
            .get(handle)
            .cloned()
            .ok_or_else(|| Error::not_found("File", handle))
    }

    async fn delete(&self, handle: &str) -> Result<()> {
        self.files.write().await.remove(handle);
        Ok(())
    }
}
