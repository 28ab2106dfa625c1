//! 存储协议层：本地、FTP、SFTP 的统一传输接口
//!
//! 每次调用独立建立连接并在返回前释放，后端之间不共享可变的连接状态。
//! 设置由调用方按值传入，后端不做缓存。

mod ftp;
mod local;
mod registry;
mod remote;
mod sftp;

#[cfg(test)]
mod tests;

pub use ftp::{FtpBackend, FtpConnector};
pub use local::LocalBackend;
pub use registry::{BackendFactory, ProtocolRegistry};
pub use remote::{RemoteBackend, RemoteConnector, RemoteSession};
pub use sftp::{SftpBackend, SftpConnector};

use crate::constants::protocol::DEFAULT_TIMEOUT_SECS;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 远程认证方式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    #[default]
    Password,
    Key,
}

/// 协议连接参数
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StorageSettings {
    /// 本地存储目录
    pub storage_path: Option<String>,
    pub host: String,
    /// 为空时使用协议默认端口
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    /// 远程基础目录
    pub directory: String,
    /// FTP 被动模式
    pub passive: bool,
    pub auth_method: AuthMethod,
    /// SFTP 私钥内容（PEM）
    pub private_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            storage_path: None,
            host: String::new(),
            port: None,
            username: String::new(),
            password: String::new(),
            directory: "/".to_string(),
            passive: true,
            auth_method: AuthMethod::Password,
            private_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl StorageSettings {
    /// 本地存储设置
    pub fn local(storage_path: impl Into<String>) -> Self {
        Self {
            storage_path: Some(storage_path.into()),
            ..Default::default()
        }
    }

    pub fn port_or(&self, default_port: u16) -> u16 {
        self.port.filter(|port| *port != 0).unwrap_or(default_port)
    }
}

/// 连接测试结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub protocol: String,
    /// 本地为存储目录，远程为 `host:port`
    pub target: String,
    pub directory: String,
    pub message: String,
    pub free_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
}

/// 远程条目类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// 目录列表条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub size: Option<u64>,
    pub entry_type: EntryType,
    pub modified_at: Option<DateTime<Utc>>,
}

/// 存储后端的统一接口
///
/// `remote_path` 均为相对路径，由后端与配置中的基础目录拼接。
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// 协议名称
    fn protocol(&self) -> &str;

    /// 测试连通性：本地写入并删除探测文件，远程完成一次登录握手
    async fn test_connection(&self, settings: &StorageSettings) -> Result<ConnectionInfo>;

    /// 本地文件不存在时返回 `SourceNotFound`，传输失败返回 `Transfer`
    async fn upload(
        &self,
        local_file: &Path,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<()>;

    /// 自动创建本地父目录
    async fn download(
        &self,
        remote_path: &str,
        local_file: &Path,
        settings: &StorageSettings,
    ) -> Result<()>;

    /// 目录不存在或为空时返回空列表
    async fn list_files(
        &self,
        remote_path: &str,
        settings: &StorageSettings,
    ) -> Result<Vec<RemoteEntry>>;

    /// 本地删除幂等；远程删除不存在的文件由协议决定是否报错
    async fn delete(&self, remote_path: &str, settings: &StorageSettings) -> Result<()>;

    /// 任何错误都视为不存在
    async fn exists(&self, remote_path: &str, settings: &StorageSettings) -> bool;

    /// 不存在时返回 `NotFound`
    async fn file_size(&self, remote_path: &str, settings: &StorageSettings) -> Result<u64>;
}

/// 拼接远程基础目录与相对路径
pub fn join_remote_path(directory: &str, path: &str) -> String {
    let base = directory.trim_end_matches('/');
    let relative = path.trim_start_matches('/');
    if relative.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        }
    } else {
        format!("{base}/{relative}")
    }
}

/// 远程路径的父目录，逐级创建时使用
pub fn remote_parent(path: &str) -> Option<&str> {
    let trimmed = path.trim_end_matches('/');
    trimmed.rfind('/').map(|index| &trimmed[..index])
}

/// 远程路径的逐级前缀，例如 `/a/b/c` -> `/a`, `/a/b`, `/a/b/c`
pub fn remote_dir_prefixes(dir: &str) -> Vec<String> {
    let absolute = dir.starts_with('/');
    let mut prefixes = Vec::new();
    let mut current = String::new();
    for component in dir.split('/').filter(|c| !c.is_empty()) {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(component);
        prefixes.push(current.clone());
    }
    prefixes
}
