use super::{
    ConnectionInfo, RemoteEntry, StorageBackend, StorageSettings, join_remote_path,
    remote_dir_prefixes, remote_parent,
};
use crate::error::{MoverError, Result};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单次调用期间持有的远程会话（阻塞 IO）
pub trait RemoteSession: Send {
    /// 创建单级目录
    fn mkdir(&mut self, path: &str) -> Result<()>;
    /// 写入远程文件，返回字节数
    fn put(&mut self, path: &str, reader: &mut dyn Read) -> Result<u64>;
    /// 读取远程文件，返回字节数
    fn get(&mut self, path: &str, writer: &mut dyn Write) -> Result<u64>;
    /// 列出目录，目录不存在时可以返回错误
    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>>;
    fn remove(&mut self, path: &str) -> Result<()>;
    /// 文件大小，不存在时返回 None
    fn size(&mut self, path: &str) -> Result<Option<u64>>;
    /// 主动关闭连接
    fn close(self: Box<Self>);
}

/// 建立远程会话的协议实现
pub trait RemoteConnector: Send + Sync + 'static {
    fn protocol(&self) -> &'static str;
    fn default_port(&self) -> u16;
    /// 连接并完成登录
    fn connect(&self, settings: &StorageSettings) -> Result<Box<dyn RemoteSession>>;
}

/// 基于连接器的远程存储：每次调用都新建会话并在返回前关闭
pub struct RemoteBackend<C: RemoteConnector> {
    connector: Arc<C>,
}

impl<C: RemoteConnector> RemoteBackend<C> {
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
        }
    }

    /// 在阻塞线程上打开会话、执行操作并关闭会话，无论成功与否
    async fn with_session<T, F>(&self, settings: &StorageSettings, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn RemoteSession, &StorageSettings) -> Result<T> + Send + 'static,
    {
        let connector = Arc::clone(&self.connector);
        let settings = settings.clone();

        tokio::task::spawn_blocking(move || {
            let mut session = connector.connect(&settings)?;
            let result = op(session.as_mut(), &settings);
            session.close();
            result
        })
        .await?
    }
}

/// 逐级创建目录，已存在的目录不视为错误
fn ensure_remote_dir(session: &mut dyn RemoteSession, dir: &str) {
    for prefix in remote_dir_prefixes(dir) {
        if let Err(e) = session.mkdir(&prefix) {
            debug!("创建远程目录 {} 跳过: {}", prefix, e);
        }
    }
}

#[async_trait]
impl<C: RemoteConnector> StorageBackend for RemoteBackend<C> {
    fn protocol(&self) -> &str {
        self.connector.protocol()
    }

    async fn test_connection(&self, settings: &StorageSettings) -> Result<ConnectionInfo> {
        let protocol = self.connector.protocol();
        let port = settings.port_or(self.connector.default_port());
        let target = format!("{}:{}", settings.host, port);

        self.with_session(settings, |_session, _settings| Ok(()))
            .await?;

        info!("{} 连接测试通过: {}", protocol, target);
        Ok(ConnectionInfo {
            protocol: protocol.to_string(),
            target,
            directory: settings.directory.clone(),
            message: "登录成功".to_string(),
            free_bytes: None,
            total_bytes: None,
        })
    }

    async fn upload(
        &self,
        local_file: &Path,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<()> {
        if !local_file.is_file() {
            return Err(MoverError::SourceNotFound(local_file.display().to_string()));
        }

        let local_file: PathBuf = local_file.to_path_buf();
        let remote_path = remote_path.to_string();
        let protocol = self.connector.protocol();

        let bytes = self
            .with_session(settings, move |session, settings| {
                let full_path = join_remote_path(&settings.directory, &remote_path);
                if let Some(parent) = remote_parent(&full_path) {
                    ensure_remote_dir(session, parent);
                }

                let mut reader = BufReader::new(File::open(&local_file)?);
                session
                    .put(&full_path, &mut reader)
                    .map_err(|e| MoverError::transfer(format!("{protocol} 上传 {full_path} 失败: {e}")))
            })
            .await?;

        debug!("{} 上传完成 ({} 字节)", protocol, bytes);
        Ok(())
    }

    async fn download(
        &self,
        remote_path: &str,
        local_file: &Path,
        settings: &StorageSettings,
    ) -> Result<()> {
        if let Some(parent) = local_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let local_file: PathBuf = local_file.to_path_buf();
        let remote_path = remote_path.to_string();
        let protocol = self.connector.protocol();

        self.with_session(settings, move |session, settings| {
            let full_path = join_remote_path(&settings.directory, &remote_path);
            let mut writer = BufWriter::new(File::create(&local_file)?);
            session
                .get(&full_path, &mut writer)
                .and_then(|bytes| {
                    writer.flush()?;
                    Ok(bytes)
                })
                .map_err(|e| {
                    MoverError::transfer(format!("{protocol} 下载 {full_path} 失败: {e}"))
                })
        })
        .await?;
        Ok(())
    }

    async fn list_files(
        &self,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<Vec<RemoteEntry>> {
        let remote_path = remote_path.to_string();
        self.with_session(settings, move |session, settings| {
            let full_path = join_remote_path(&settings.directory, &remote_path);
            match session.list(&full_path) {
                Ok(mut entries) => {
                    entries.sort_by(|a, b| a.name.cmp(&b.name));
                    Ok(entries)
                }
                Err(e) => {
                    // 目录不存在按空目录处理
                    debug!("列出远程目录 {} 失败，按空目录处理: {}", full_path, e);
                    Ok(Vec::new())
                }
            }
        })
        .await
    }

    async fn delete(&self, remote_path: &str, settings: &StorageSettings) -> Result<()> {
        let remote_path = remote_path.to_string();
        let protocol = self.connector.protocol();
        self.with_session(settings, move |session, settings| {
            let full_path = join_remote_path(&settings.directory, &remote_path);
            session
                .remove(&full_path)
                .map_err(|e| MoverError::transfer(format!("{protocol} 删除 {full_path} 失败: {e}")))
        })
        .await
    }

    async fn exists(&self, remote_path: &str, settings: &StorageSettings) -> bool {
        let remote_path = remote_path.to_string();
        let result = self
            .with_session(settings, move |session, settings| {
                let full_path = join_remote_path(&settings.directory, &remote_path);
                session.size(&full_path)
            })
            .await;

        match result {
            Ok(size) => size.is_some(),
            Err(e) => {
                warn!("检查远程文件失败，视为不存在: {}", e);
                false
            }
        }
    }

    async fn file_size(&self, remote_path: &str, settings: &StorageSettings) -> Result<u64> {
        let remote_path = remote_path.to_string();
        self.with_session(settings, move |session, settings| {
            let full_path = join_remote_path(&settings.directory, &remote_path);
            session
                .size(&full_path)?
                .ok_or(MoverError::NotFound(full_path))
        })
        .await
    }
}
