use super::*;
use crate::error::MoverError;
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

/// 内存中的远程服务器
#[derive(Default)]
struct MemoryServer {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    dirs: Mutex<BTreeSet<String>>,
    open_sessions: AtomicUsize,
    total_sessions: AtomicUsize,
}

struct MemoryConnector {
    protocol: &'static str,
    server: Arc<MemoryServer>,
}

struct MemorySession {
    server: Arc<MemoryServer>,
}

impl RemoteConnector for MemoryConnector {
    fn protocol(&self) -> &'static str {
        self.protocol
    }

    fn default_port(&self) -> u16 {
        2121
    }

    fn connect(&self, settings: &StorageSettings) -> Result<Box<dyn RemoteSession>> {
        if settings.password != "secret" {
            return Err(MoverError::transfer("login incorrect"));
        }
        self.server.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.server.total_sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            server: Arc::clone(&self.server),
        }))
    }
}

impl RemoteSession for MemorySession {
    fn mkdir(&mut self, path: &str) -> Result<()> {
        let mut dirs = self.server.dirs.lock().unwrap();
        if !dirs.insert(path.to_string()) {
            return Err(MoverError::transfer("550 directory exists"));
        }
        Ok(())
    }

    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64> {
        let parent = remote_parent(path).unwrap_or("");
        if !parent.is_empty() && !self.server.dirs.lock().unwrap().contains(parent) {
            return Err(MoverError::transfer("553 no such directory"));
        }
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        let len = data.len() as u64;
        self.server.files.lock().unwrap().insert(path.to_string(), data);
        Ok(len)
    }

    fn get(&mut self, path: &str, writer: &mut dyn Write) -> Result<u64> {
        let files = self.server.files.lock().unwrap();
        let data = files
            .get(path)
            .ok_or_else(|| MoverError::transfer("550 not found"))?;
        writer.write_all(data)?;
        Ok(data.len() as u64)
    }

    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>> {
        if !self.server.dirs.lock().unwrap().contains(path) {
            return Err(MoverError::transfer("550 no such directory"));
        }
        let prefix = format!("{path}/");
        Ok(self
            .server
            .files
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(name, data)| {
                let rest = name.strip_prefix(&prefix)?;
                (!rest.contains('/')).then(|| RemoteEntry {
                    name: rest.to_string(),
                    size: Some(data.len() as u64),
                    entry_type: EntryType::File,
                    modified_at: None,
                })
            })
            .collect())
    }

    fn remove(&mut self, path: &str) -> Result<()> {
        self.server
            .files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| MoverError::transfer("550 not found"))
    }

    fn size(&mut self, path: &str) -> Result<Option<u64>> {
        Ok(self
            .server
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|data| data.len() as u64))
    }

    fn close(self: Box<Self>) {
        self.server.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

fn remote_settings() -> StorageSettings {
    StorageSettings {
        host: "backup.example.com".to_string(),
        username: "mover".to_string(),
        password: "secret".to_string(),
        directory: "/srv/backups".to_string(),
        ..Default::default()
    }
}

fn memory_backend(protocol: &'static str) -> (RemoteBackend<MemoryConnector>, Arc<MemoryServer>) {
    let server = Arc::new(MemoryServer::default());
    let backend = RemoteBackend::new(MemoryConnector {
        protocol,
        server: Arc::clone(&server),
    });
    (backend, server)
}

#[test]
fn test_join_remote_path() {
    assert_eq!(join_remote_path("/srv/backups/", "/nightly.zip"), "/srv/backups/nightly.zip");
    assert_eq!(join_remote_path("/", "a/b.zip"), "/a/b.zip");
    assert_eq!(join_remote_path("", "b.zip"), "/b.zip");
    assert_eq!(join_remote_path("/srv", ""), "/srv");
    assert_eq!(remote_parent("/srv/backups/a.zip"), Some("/srv/backups"));
    assert_eq!(
        remote_dir_prefixes("/srv/backups/2024"),
        vec!["/srv", "/srv/backups", "/srv/backups/2024"]
    );
}

/// 各协议上传后再下载，内容一致
#[tokio::test]
async fn test_protocol_uniformity() {
    let temp = tempdir().unwrap();
    let payload: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let source = temp.path().join("nightly.zip");
    std::fs::write(&source, &payload).unwrap();

    let (ftp, _) = memory_backend("ftp");
    let (sftp, _) = memory_backend("sftp");
    let local = LocalBackend::new();

    let cases: Vec<(&dyn StorageBackend, StorageSettings)> = vec![
        (
            &local,
            StorageSettings::local(temp.path().join("store").to_string_lossy().to_string()),
        ),
        (&ftp, remote_settings()),
        (&sftp, remote_settings()),
    ];

    for (backend, settings) in cases {
        backend
            .upload(&source, "2024/nightly.zip", &settings)
            .await
            .unwrap();
        assert!(backend.exists("2024/nightly.zip", &settings).await);
        assert_eq!(
            backend.file_size("2024/nightly.zip", &settings).await.unwrap(),
            payload.len() as u64
        );

        let restored = temp
            .path()
            .join(format!("restored-{}/nightly.zip", backend.protocol()));
        backend
            .download("2024/nightly.zip", &restored, &settings)
            .await
            .unwrap();
        assert_eq!(std::fs::read(&restored).unwrap(), payload, "{}", backend.protocol());

        let listed = backend.list_files("2024", &settings).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "nightly.zip");
        assert!(backend.list_files("missing", &settings).await.unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_sessions_closed_on_success_and_error() {
    let temp = tempdir().unwrap();
    let (backend, server) = memory_backend("ftp");
    let settings = remote_settings();

    let source = temp.path().join("a.zip");
    std::fs::write(&source, b"abc").unwrap();
    backend.upload(&source, "a.zip", &settings).await.unwrap();

    // 远程删除不存在的文件是协议错误
    let missing = backend.delete("missing.zip", &settings).await;
    assert!(matches!(missing, Err(MoverError::Transfer(_))));

    let download = backend
        .download("missing.zip", &temp.path().join("out.zip"), &settings)
        .await;
    assert!(matches!(download, Err(MoverError::Transfer(_))));

    assert!(matches!(
        backend.file_size("missing.zip", &settings).await,
        Err(MoverError::NotFound(_))
    ));

    assert_eq!(server.open_sessions.load(Ordering::SeqCst), 0);
    assert_eq!(server.total_sessions.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_upload_creates_directories_and_checks_source() {
    let temp = tempdir().unwrap();
    let (backend, server) = memory_backend("sftp");
    let settings = remote_settings();

    let missing = backend
        .upload(&temp.path().join("nope.zip"), "a.zip", &settings)
        .await;
    assert!(matches!(missing, Err(MoverError::SourceNotFound(_))));
    // 本地文件缺失时不建立连接
    assert_eq!(server.total_sessions.load(Ordering::SeqCst), 0);

    let source = temp.path().join("a.zip");
    std::fs::write(&source, b"abc").unwrap();
    backend.upload(&source, "x/y/a.zip", &settings).await.unwrap();
    // 第二次上传时目录已存在，不应失败
    backend.upload(&source, "x/y/b.zip", &settings).await.unwrap();

    let dirs = server.dirs.lock().unwrap().clone();
    assert!(dirs.contains("/srv/backups/x/y"));
}

#[tokio::test]
async fn test_login_failure_is_transfer_error() {
    let (backend, server) = memory_backend("ftp");
    let settings = StorageSettings {
        password: "wrong".to_string(),
        ..remote_settings()
    };

    let result = backend.test_connection(&settings).await;
    assert!(matches!(result, Err(MoverError::Transfer(_))));
    assert!(!backend.exists("a.zip", &settings).await);
    assert_eq!(server.open_sessions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_test_connection_reports_target() {
    let (backend, _) = memory_backend("ftp");
    let info = backend.test_connection(&remote_settings()).await.unwrap();
    assert_eq!(info.target, "backup.example.com:2121");
    assert_eq!(info.directory, "/srv/backups");
}

/// 不可达主机必须返回错误
#[tokio::test]
async fn test_unreachable_host() {
    let settings = StorageSettings {
        host: "127.0.0.1".to_string(),
        port: Some(1),
        timeout_secs: 2,
        ..remote_settings()
    };

    let ftp = RemoteBackend::new(FtpConnector);
    assert!(matches!(
        ftp.test_connection(&settings).await,
        Err(MoverError::Transfer(_))
    ));

    let sftp = RemoteBackend::new(SftpConnector);
    assert!(matches!(
        sftp.test_connection(&settings).await,
        Err(MoverError::Transfer(_))
    ));
}
