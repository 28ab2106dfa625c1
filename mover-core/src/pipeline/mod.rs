//! 导出与导入流水线
//!
//! 每个操作按固定顺序串行执行各阶段，阶段之间不会并发。
//! 临时目录归单个操作独占，无论成功失败都会被清理。

mod export;
mod import;


pub use export::{EXPORT_STAGES, ExportPipeline, ExportStage, archive_file_name};
pub use import::{IMPORT_STAGES, ImportPipeline, ImportStage};

use crate::config::AppConfig;
use crate::config_manager::{ConfigManager, Tunables};
use crate::database::{ConfigStore, Database, OperationStore};
use crate::error::{MoverError, Result};
use crate::operation::{OperationId, OperationStatus};
use crate::progress::ProgressTracker;
use crate::resources;
use crate::site::{DuckDbSite, SiteDatabase, SiteLayout};
use crate::storage::{ProtocolRegistry, StorageBackend, StorageSettings};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// 流水线运行所需的全部依赖
pub struct AppContext {
    pub config: Arc<dyn ConfigStore>,
    pub operations: Arc<dyn OperationStore>,
    pub progress: ProgressTracker,
    pub registry: ProtocolRegistry,
    pub site: SiteLayout,
    pub site_db: Arc<dyn SiteDatabase>,
    /// 临时目录与本地归档缓存所在目录
    pub work_dir: PathBuf,
    /// local 协议未配置存储目录时的默认位置
    pub default_backup_dir: PathBuf,
}

impl AppContext {
    /// 按配置文件打开记录库与站点数据库
    pub async fn open(config: &AppConfig) -> Result<Self> {
        config.ensure_work_dirs()?;

        let database = Arc::new(Database::connect(&config.storage.database).await?);
        ConfigManager::new(database.as_ref())
            .seed_defaults(&config.tunables)
            .await?;

        let site_db = DuckDbSite::open(&config.site.database)?;

        Ok(Self {
            config: database.clone(),
            operations: database,
            progress: ProgressTracker::in_memory(),
            registry: ProtocolRegistry::with_defaults(),
            site: config.site_layout(),
            site_db: Arc::new(site_db),
            work_dir: config.get_work_dir(),
            default_backup_dir: config.get_backup_dir(),
        })
    }

    pub fn config_manager(&self) -> ConfigManager<'_> {
        ConfigManager::new(self.config.as_ref())
    }

    pub async fn tunables(&self) -> Result<Tunables> {
        self.config_manager().tunables().await
    }

    /// 解析协议后端及其连接参数
    pub async fn backend_for(
        &self,
        protocol: &str,
    ) -> Result<(Arc<dyn StorageBackend>, StorageSettings)> {
        let backend = self.registry.resolve(protocol)?;
        let name = protocol.trim().to_lowercase();
        let settings = self
            .config_manager()
            .storage_settings(&name, &self.default_backup_dir)
            .await?;
        Ok((backend, settings))
    }

    /// 写入失败状态，写入本身失败只记录日志
    pub(crate) async fn mark_failed(&self, id: OperationId, error: &MoverError) {
        if let Err(e) = self
            .operations
            .update_status(id, OperationStatus::Failed, Some(error.to_string()))
            .await
        {
            warn!("操作 {} 写入失败状态出错: {}", id, e);
        }
    }
}

/// 进度区间内的单个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageEntry<S> {
    pub stage: S,
    pub name: &'static str,
    pub start: u8,
    pub end: u8,
}

/// 单个操作独占的临时目录，离开作用域时删除
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    pub fn create(path: PathBuf) -> Result<Self> {
        fs::create_dir_all(&path)
            .map_err(|e| MoverError::ScratchDir(format!("{}: {e}", path.display())))?;
        debug!("创建临时目录: {}", path.display());
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cleanup(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;
        if self.path.exists() {
            match fs::remove_dir_all(&self.path) {
                Ok(()) => debug!("已清理临时目录: {}", self.path.display()),
                Err(e) => warn!("清理临时目录 {} 失败: {}", self.path.display(), e),
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.remove();
    }
}

/// 导出归档在上传成功前的所有权守卫，失败或被中断时删除文件
#[derive(Debug)]
pub(crate) struct ArchiveGuard {
    path: PathBuf,
    kept: bool,
}

impl ArchiveGuard {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, kept: false }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// 归档已登记到操作记录，保留文件
    pub(crate) fn keep(mut self) {
        self.kept = true;
    }
}

impl Drop for ArchiveGuard {
    fn drop(&mut self) {
        if self.kept {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("已删除未完成的归档: {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("删除未完成的归档 {} 失败: {}", self.path.display(), e),
        }
    }
}

/// 在阻塞线程池上执行同步任务
pub(crate) async fn run_blocking<T, F>(task: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(task).await?
}

/// 尝试按配置提高进程内存上限，失败不影响流程
pub(crate) fn apply_memory_limit(limit: &str) {
    match resources::parse_memory_limit(limit) {
        Some(bytes) => {
            if resources::raise_memory_ceiling(bytes) {
                debug!("内存上限已调整为 {}", limit);
            }
        }
        None => debug!("内存上限 {} 不做调整", limit),
    }
}
