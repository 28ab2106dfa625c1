use super::{ConnectionInfo, EntryType, RemoteEntry, StorageBackend, StorageSettings};
use crate::constants::protocol::{LOCAL, CHECK_FILE_PREFIX};
use crate::error::{MoverError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// 本地磁盘存储
#[derive(Debug, Clone, Default)]
pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        Self
    }

    fn storage_root(settings: &StorageSettings) -> Result<PathBuf> {
        match settings.storage_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Err(MoverError::validation("本地存储未配置 storage_path")),
        }
    }

    /// 存储目录下的目标路径，拒绝 `..`
    fn resolve(settings: &StorageSettings, remote_path: &str) -> Result<PathBuf> {
        let root = Self::storage_root(settings)?;
        let relative = Path::new(remote_path.trim_start_matches(['/', '\\']));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(MoverError::validation(format!(
                "非法的存储路径: {remote_path}"
            )));
        }
        Ok(root.join(relative))
    }
}

/// 存储目录所在文件系统的可用与总空间
#[cfg(unix)]
fn disk_space(path: &Path) -> (Option<u64>, Option<u64>) {
    match nix::sys::statvfs::statvfs(path) {
        Ok(stat) => {
            let unit = stat.fragment_size() as u64;
            (
                Some(stat.blocks_available() as u64 * unit),
                Some(stat.blocks() as u64 * unit),
            )
        }
        Err(e) => {
            debug!("读取磁盘空间失败: {}", e);
            (None, None)
        }
    }
}

#[cfg(not(unix))]
fn disk_space(_path: &Path) -> (Option<u64>, Option<u64>) {
    (None, None)
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn protocol(&self) -> &str {
        LOCAL
    }

    async fn test_connection(&self, settings: &StorageSettings) -> Result<ConnectionInfo> {
        let root = Self::storage_root(settings)?;
        fs::create_dir_all(&root)
            .await
            .map_err(|e| MoverError::transfer(format!("无法创建存储目录 {}: {e}", root.display())))?;

        let marker = root.join(format!("{CHECK_FILE_PREFIX}{}.tmp", Uuid::new_v4()));
        fs::write(&marker, b"site-mover write check")
            .await
            .map_err(|e| MoverError::transfer(format!("存储目录不可写 {}: {e}", root.display())))?;
        fs::remove_file(&marker).await?;

        let (free_bytes, total_bytes) = disk_space(&root);
        info!("本地存储连接测试通过: {}", root.display());

        Ok(ConnectionInfo {
            protocol: LOCAL.to_string(),
            target: root.display().to_string(),
            directory: root.display().to_string(),
            message: "存储目录可写".to_string(),
            free_bytes,
            total_bytes,
        })
    }

    async fn upload(
        &self,
        local_file: &Path,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<()> {
        if !fs::try_exists(local_file).await.unwrap_or(false) {
            return Err(MoverError::SourceNotFound(local_file.display().to_string()));
        }
        let target = Self::resolve(settings, remote_path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                MoverError::transfer(format!("无法创建目录 {}: {e}", parent.display()))
            })?;
        }
        let bytes = fs::copy(local_file, &target).await.map_err(|e| {
            MoverError::transfer(format!(
                "复制 {} -> {} 失败: {e}",
                local_file.display(),
                target.display()
            ))
        })?;

        debug!("本地上传完成: {} ({} 字节)", target.display(), bytes);
        Ok(())
    }

    async fn download(
        &self,
        remote_path: &str,
        local_file: &Path,
        settings: &StorageSettings,
    ) -> Result<()> {
        let source = Self::resolve(settings, remote_path)?;
        if let Some(parent) = local_file.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(&source, local_file).await.map_err(|e| {
            MoverError::transfer(format!(
                "复制 {} -> {} 失败: {e}",
                source.display(),
                local_file.display()
            ))
        })?;
        Ok(())
    }

    async fn list_files(
        &self,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<Vec<RemoteEntry>> {
        let dir = Self::resolve(settings, remote_path)?;
        let mut reader = match fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let metadata = entry.metadata().await?;
            let entry_type = if metadata.is_dir() {
                EntryType::Directory
            } else {
                EntryType::File
            };
            entries.push(RemoteEntry {
                name: entry.file_name().to_string_lossy().to_string(),
                size: metadata.is_file().then(|| metadata.len()),
                entry_type,
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn delete(&self, remote_path: &str, settings: &StorageSettings) -> Result<()> {
        let target = Self::resolve(settings, remote_path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, remote_path: &str, settings: &StorageSettings) -> bool {
        match Self::resolve(settings, remote_path) {
            Ok(target) => fs::try_exists(&target).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    async fn file_size(&self, remote_path: &str, settings: &StorageSettings) -> Result<u64> {
        let target = Self::resolve(settings, remote_path)?;
        match fs::metadata(&target).await {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            Ok(_) => Err(MoverError::NotFound(target.display().to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(MoverError::NotFound(target.display().to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings(root: &Path) -> StorageSettings {
        StorageSettings::local(root.to_string_lossy().to_string())
    }

    #[tokio::test]
    async fn test_connection_check_leaves_no_files() {
        let temp = tempdir().unwrap();
        let storage = temp.path().join("backups");
        let backend = LocalBackend::new();

        let info = backend.test_connection(&settings(&storage)).await.unwrap();
        assert_eq!(info.protocol, "local");
        assert_eq!(std::fs::read_dir(&storage).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp = tempdir().unwrap();
        let settings = settings(temp.path());
        let backend = LocalBackend::new();

        let source = temp.path().join("source.zip");
        std::fs::write(&source, b"archive").unwrap();
        backend.upload(&source, "nested/a.zip", &settings).await.unwrap();
        assert!(backend.exists("nested/a.zip", &settings).await);
        assert_eq!(backend.file_size("nested/a.zip", &settings).await.unwrap(), 7);

        backend.delete("nested/a.zip", &settings).await.unwrap();
        backend.delete("nested/a.zip", &settings).await.unwrap();
        assert!(!backend.exists("nested/a.zip", &settings).await);
        assert!(matches!(
            backend.file_size("nested/a.zip", &settings).await,
            Err(MoverError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_errors() {
        let temp = tempdir().unwrap();
        let backend = LocalBackend::new();

        let missing = backend
            .upload(&temp.path().join("nope.zip"), "a.zip", &settings(temp.path()))
            .await;
        assert!(matches!(missing, Err(MoverError::SourceNotFound(_))));

        let source = temp.path().join("source.zip");
        std::fs::write(&source, b"archive").unwrap();
        // 存储目录是普通文件，无法写入
        let blocker = temp.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let blocked = backend.upload(&source, "a.zip", &settings(&blocker)).await;
        assert!(matches!(blocked, Err(MoverError::Transfer(_))));

        let escape = backend.upload(&source, "../a.zip", &settings(temp.path())).await;
        assert!(matches!(escape, Err(MoverError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_files() {
        let temp = tempdir().unwrap();
        let settings = settings(temp.path());
        let backend = LocalBackend::new();

        assert!(backend.list_files("missing", &settings).await.unwrap().is_empty());

        std::fs::create_dir_all(temp.path().join("dir/sub")).unwrap();
        std::fs::write(temp.path().join("dir/b.zip"), b"bb").unwrap();
        let entries = backend.list_files("dir", &settings).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "b.zip");
        assert_eq!(entries[0].size, Some(2));
        assert_eq!(entries[1].entry_type, EntryType::Directory);
    }

    #[tokio::test]
    async fn test_missing_storage_path() {
        let backend = LocalBackend::new();
        let result = backend.test_connection(&StorageSettings::default()).await;
        assert!(matches!(result, Err(MoverError::Validation(_))));
    }
}
