use super::{FtpConnector, LocalBackend, RemoteBackend, SftpConnector, StorageBackend};
use crate::constants::protocol::{FTP, LOCAL, SFTP};
use crate::error::{MoverError, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 协议后端工厂
pub type BackendFactory = Arc<dyn Fn() -> Arc<dyn StorageBackend> + Send + Sync>;

/// 协议名称到后端工厂的映射，可注册新的协议
#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}

impl ProtocolRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// 内置 local、ftp、sftp
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(LOCAL, || Arc::new(LocalBackend::new()));
        registry.register(FTP, || Arc::new(RemoteBackend::new(FtpConnector)));
        registry.register(SFTP, || Arc::new(RemoteBackend::new(SftpConnector)));
        registry
    }

    /// 注册协议，同名协议会被替换
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Arc<dyn StorageBackend> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.trim().to_lowercase(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.trim().to_lowercase())
    }

    /// 创建后端，未注册时返回 `UnsupportedProtocol`
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn StorageBackend>> {
        self.factories
            .get(&name.trim().to_lowercase())
            .map(|factory| factory())
            .ok_or_else(|| MoverError::UnsupportedProtocol(name.to_string()))
    }

    /// 已注册的协议名称（排序）
    pub fn protocols(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}
