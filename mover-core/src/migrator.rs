//! 迁移编排：校验参数、创建操作记录、驱动流水线并保证失败状态落库

use crate::constants::workspace::STALE_SCRATCH_SECS;
use crate::error::{MoverError, Result};
use crate::operation::{
    NewOperation, Operation, OperationFilter, OperationId, OperationKind, OperationStatus,
};
use crate::options::{ExportOptions, ImportOptions, ImportSource};
use crate::pipeline::{AppContext, ExportPipeline, ImportPipeline};
use crate::progress::ProgressView;
use crate::retention::{self, SweepReport};
use crate::storage::ConnectionInfo;
use chrono::Utc;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

/// 轮询等待的结果
#[derive(Debug, Clone)]
pub enum WaitOutcome {
    Terminal(Operation),
    /// 超过轮询上限，状态未知
    TimedOut,
}

/// 删除操作的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteReport {
    pub record_deleted: bool,
    pub cache_removed: bool,
    pub remote_removed: bool,
}

/// 后台运行中的操作
#[derive(Debug)]
pub struct OperationHandle {
    id: OperationId,
    task: JoinHandle<Result<()>>,
}

impl OperationHandle {
    pub fn id(&self) -> OperationId {
        self.id
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 等待流水线结束，返回其结果
    pub async fn join(self) -> Result<()> {
        self.task.await?
    }
}

/// 迁移编排器
#[derive(Clone)]
pub struct MigrationOrchestrator {
    ctx: Arc<AppContext>,
}

impl MigrationOrchestrator {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    // ========================================
    // 参数校验
    // ========================================

    /// 规范化导出参数并确认协议已注册
    pub fn validate_export(&self, options: ExportOptions) -> Result<ExportOptions> {
        let options = options.normalized(Utc::now());
        if !self.ctx.registry.contains(&options.protocol) {
            return Err(MoverError::UnsupportedProtocol(options.protocol));
        }
        Ok(options)
    }

    /// 校验导入来源互斥与协议
    pub fn validate_import(&self, mut options: ImportOptions) -> Result<ImportOptions> {
        options.source()?;
        options.protocol = options.protocol.trim().to_lowercase();
        if !self.ctx.registry.contains(&options.protocol) {
            return Err(MoverError::UnsupportedProtocol(options.protocol));
        }
        Ok(options)
    }

    async fn prepare_export(&self, options: ExportOptions) -> Result<(OperationId, ExportOptions)> {
        let options = self.validate_export(options)?;
        let id = self
            .ctx
            .operations
            .insert(NewOperation {
                kind: OperationKind::Export,
                name: options.name.clone(),
                status: OperationStatus::Pending,
                source: None,
            })
            .await?;
        info!("创建导出操作 {}: {} -> {}", id, options.name, options.protocol);
        Ok((id, options))
    }

    async fn prepare_import(&self, options: ImportOptions) -> Result<(OperationId, ImportOptions)> {
        let options = self.validate_import(options)?;
        let source = options.source()?;
        let id = self
            .ctx
            .operations
            .insert(NewOperation {
                kind: OperationKind::Import,
                name: import_name(&source),
                status: OperationStatus::Pending,
                source: Some(source.describe()),
            })
            .await?;
        info!("创建导入操作 {}: {}", id, source.describe());
        Ok((id, options))
    }

    // ========================================
    // 触发入口
    // ========================================

    /// 执行导出并等待结束，返回操作 ID
    pub async fn start_export(&self, options: ExportOptions) -> Result<OperationId> {
        let (id, options) = self.prepare_export(options).await?;
        self.run_export(id, options).await?;
        Ok(id)
    }

    /// 执行导入并等待结束，返回操作 ID
    pub async fn start_import(&self, options: ImportOptions) -> Result<OperationId> {
        let (id, options) = self.prepare_import(options).await?;
        self.run_import(id, options).await?;
        Ok(id)
    }

    /// 后台执行导出，返回可等待的句柄
    pub async fn launch_export(&self, options: ExportOptions) -> Result<OperationHandle> {
        let (id, options) = self.prepare_export(options).await?;
        let orchestrator = self.clone();
        let task = tokio::spawn(async move { orchestrator.run_export(id, options).await });
        Ok(OperationHandle { id, task })
    }

    /// 后台执行导入，返回可等待的句柄
    pub async fn launch_import(&self, options: ImportOptions) -> Result<OperationHandle> {
        let (id, options) = self.prepare_import(options).await?;
        let orchestrator = self.clone();
        let task = tokio::spawn(async move { orchestrator.run_import(id, options).await });
        Ok(OperationHandle { id, task })
    }

    /// 后台执行导出，立即返回操作 ID
    ///
    /// 任务随运行时存活，调用方需保证运行时在操作结束前不退出。
    pub async fn spawn_export(&self, options: ExportOptions) -> Result<OperationId> {
        Ok(self.launch_export(options).await?.id())
    }

    /// 后台执行导入，立即返回操作 ID
    pub async fn spawn_import(&self, options: ImportOptions) -> Result<OperationId> {
        Ok(self.launch_import(options).await?.id())
    }

    async fn run_export(&self, id: OperationId, options: ExportOptions) -> Result<()> {
        let pipeline = ExportPipeline::new(Arc::clone(&self.ctx));
        self.supervise(id, pipeline.run(id, &options)).await
    }

    async fn run_import(&self, id: OperationId, options: ImportOptions) -> Result<()> {
        let pipeline = ImportPipeline::new(Arc::clone(&self.ctx));
        self.supervise(id, pipeline.run(id, &options)).await
    }

    /// 施加执行时间上限；任何错误都保证记录进入 Failed，不重试
    async fn supervise<F>(&self, id: OperationId, pipeline: F) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let timeout = match self.ctx.tunables().await {
            Ok(tunables) => tunables.execution_timeout(),
            Err(e) => {
                self.ensure_failed(id, &e).await;
                return Err(e);
            }
        };

        let result = match timeout {
            None => pipeline.await,
            Some(limit) => match tokio::time::timeout(limit, pipeline).await {
                Ok(result) => result,
                Err(_) => Err(MoverError::Timeout(limit.as_secs())),
            },
        };

        if let Err(e) = &result {
            self.ensure_failed(id, e).await;
        }
        result
    }

    /// 记录尚未进入终态时写入 Failed
    async fn ensure_failed(&self, id: OperationId, error: &MoverError) {
        match self.ctx.operations.get(id).await {
            Ok(Some(operation)) if operation.status.is_terminal() => {}
            Ok(_) => self.ctx.mark_failed(id, error).await,
            Err(e) => warn!("读取操作 {} 失败: {}", id, e),
        }
    }

    // ========================================
    // 查询
    // ========================================

    /// 进度视图：终态以记录为准，否则取最新快照
    pub async fn get_progress(&self, id: OperationId) -> Result<ProgressView> {
        let operation = self.ctx.operations.get(id).await?;
        let record = self.ctx.progress.snapshot(id);
        Ok(ProgressView::resolve(
            id,
            operation.as_ref().map(|op| op.status),
            operation.as_ref().and_then(|op| op.error_message.as_deref()),
            record,
        ))
    }

    /// 按固定间隔轮询直到终态或超过上限
    pub async fn wait_for_terminal(
        &self,
        id: OperationId,
        interval: Duration,
        ceiling: Duration,
    ) -> Result<WaitOutcome> {
        let deadline = Instant::now() + ceiling;
        loop {
            let operation = self
                .ctx
                .operations
                .get(id)
                .await?
                .ok_or(MoverError::OperationNotFound(id))?;
            if operation.status.is_terminal() {
                return Ok(WaitOutcome::Terminal(operation));
            }
            if Instant::now() >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            tokio::time::sleep(interval).await;
        }
    }

    pub async fn get_operation(&self, id: OperationId) -> Result<Option<Operation>> {
        self.ctx.operations.get(id).await
    }

    /// 按条件列出操作，最新的在前
    pub async fn list_operations(&self, filter: &OperationFilter) -> Result<Vec<Operation>> {
        self.ctx.operations.list(filter).await
    }

    // ========================================
    // 删除与维护
    // ========================================

    /// 删除操作记录，同时尽力删除本地缓存与存储中的归档
    pub async fn delete_operation(&self, id: OperationId) -> Result<DeleteReport> {
        let operation = self
            .ctx
            .operations
            .get(id)
            .await?
            .ok_or(MoverError::OperationNotFound(id))?;
        if !operation.status.is_terminal() {
            return Err(MoverError::validation(format!(
                "操作 {id} 仍在执行中，无法删除"
            )));
        }

        let mut report = DeleteReport::default();
        if let Some(location) = &operation.location {
            if let Some(cache) = location.local_cache_path.as_deref() {
                report.cache_removed = retention::remove_cached_archive(Path::new(cache)).await;
            }

            match self.ctx.backend_for(&location.protocol).await {
                Ok((backend, settings)) => {
                    match backend.delete(&location.remote_path, &settings).await {
                        Ok(()) => report.remote_removed = true,
                        Err(e) => warn!("删除存储中的归档 {} 失败: {}", location.remote_path, e),
                    }
                }
                Err(e) => warn!("无法解析协议 {}: {}", location.protocol, e),
            }
        }

        report.record_deleted = self.ctx.operations.delete(id).await?;
        info!("已删除操作 {}", id);
        Ok(report)
    }

    /// 测试协议连接
    pub async fn test_connection(&self, protocol: &str) -> Result<ConnectionInfo> {
        let (backend, settings) = self.ctx.backend_for(protocol).await?;
        backend.test_connection(&settings).await
    }

    /// 按保留天数清理过期备份，并删除遗留的临时目录
    pub async fn run_maintenance(&self) -> Result<SweepReport> {
        let tunables = self.ctx.tunables().await?;
        let mut report =
            retention::sweep_expired(&self.ctx, tunables.backup_retention_days).await?;
        report.scratch_dirs =
            retention::cleanup_stale_scratch(&self.ctx.work_dir, STALE_SCRATCH_SECS).await?;
        Ok(report)
    }
}

fn import_name(source: &ImportSource) -> String {
    match source {
        ImportSource::Operation(id) => format!("import-from-{id}"),
        ImportSource::Path(path) => path
            .file_stem()
            .map(|stem| format!("import-{}", stem.to_string_lossy()))
            .unwrap_or_else(|| "import".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::progress::INITIALIZING_STAGE;
    use crate::storage::{
        LocalBackend, ProtocolRegistry, RemoteEntry, StorageBackend, StorageSettings,
    };
    use crate::pipeline::archive_file_name;
    use crate::progress::{MokaProgressStore, ProgressRecord, ProgressStore, ProgressTracker};
    use crate::test_support::{fixture, fixture_with, fixture_with_registry};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn export_options(name: &str) -> ExportOptions {
        ExportOptions {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// 上传永远不会结束的存储
    struct StalledBackend;

    #[async_trait]
    impl StorageBackend for StalledBackend {
        fn protocol(&self) -> &str {
            "stalled"
        }

        async fn test_connection(&self, settings: &StorageSettings) -> Result<ConnectionInfo> {
            LocalBackend::new().test_connection(settings).await
        }

        async fn upload(&self, _local: &Path, _remote: &str, _settings: &StorageSettings) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn download(&self, _remote: &str, _local: &Path, _settings: &StorageSettings) -> Result<()> {
            Err(MoverError::transfer("stalled"))
        }

        async fn list_files(&self, _remote: &str, _settings: &StorageSettings) -> Result<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _remote: &str, _settings: &StorageSettings) -> Result<()> {
            Ok(())
        }

        async fn exists(&self, _remote: &str, _settings: &StorageSettings) -> bool {
            false
        }

        async fn file_size(&self, remote_path: &str, _settings: &StorageSettings) -> Result<u64> {
            Err(MoverError::NotFound(remote_path.to_string()))
        }
    }

    /// 上传在放行前一直阻塞的存储
    struct GatedBackend {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl StorageBackend for GatedBackend {
        fn protocol(&self) -> &str {
            "gated"
        }

        async fn test_connection(&self, settings: &StorageSettings) -> Result<ConnectionInfo> {
            LocalBackend::new().test_connection(settings).await
        }

        async fn upload(&self, _local: &Path, _remote: &str, _settings: &StorageSettings) -> Result<()> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }

        async fn download(&self, _remote: &str, _local: &Path, _settings: &StorageSettings) -> Result<()> {
            Err(MoverError::transfer("gated"))
        }

        async fn list_files(&self, _remote: &str, _settings: &StorageSettings) -> Result<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _remote: &str, _settings: &StorageSettings) -> Result<()> {
            Ok(())
        }

        async fn exists(&self, _remote: &str, _settings: &StorageSettings) -> bool {
            false
        }

        async fn file_size(&self, remote_path: &str, _settings: &StorageSettings) -> Result<u64> {
            Err(MoverError::NotFound(remote_path.to_string()))
        }
    }

    /// 记录每次写入百分比的进度存储
    struct RecordingStore {
        inner: MokaProgressStore,
        seen: Mutex<Vec<u8>>,
    }

    impl ProgressStore for RecordingStore {
        fn set(&self, id: OperationId, record: ProgressRecord, ttl: Duration) {
            self.seen.lock().unwrap().push(record.percent);
            self.inner.set(id, record, ttl);
        }

        fn get(&self, id: OperationId) -> Option<ProgressRecord> {
            self.inner.get(id)
        }

        fn clear(&self, id: OperationId) {
            self.inner.clear(id);
        }
    }

    #[tokio::test]
    async fn test_start_export_completes() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let id = orchestrator
            .start_export(export_options("Site Backup #1"))
            .await
            .unwrap();

        let op = orchestrator.get_operation(id).await.unwrap().unwrap();
        assert_eq!(op.name, "Site-Backup-1");
        assert_eq!(op.status, OperationStatus::Completed);

        let progress = orchestrator.get_progress(id).await.unwrap();
        assert_eq!(progress.percent, 100);
        assert!(progress.is_terminal());
    }

    #[tokio::test]
    async fn test_validation_happens_before_record_creation() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let options = ExportOptions {
            protocol: "S3".to_string(),
            ..export_options("cloud")
        };
        assert!(matches!(
            orchestrator.start_export(options).await,
            Err(MoverError::UnsupportedProtocol(p)) if p == "s3"
        ));

        let both = ImportOptions {
            source_operation_id: Some(1),
            source_path: Some("/tmp/a.zip".into()),
            ..Default::default()
        };
        assert!(matches!(
            orchestrator.start_import(both).await,
            Err(MoverError::Validation(_))
        ));
        assert!(matches!(
            orchestrator.start_import(ImportOptions::default()).await,
            Err(MoverError::Validation(_))
        ));

        let all = orchestrator
            .list_operations(&OperationFilter::default())
            .await
            .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_and_wait_for_terminal() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let export_id = orchestrator
            .spawn_export(export_options("background"))
            .await
            .unwrap();
        let outcome = orchestrator
            .wait_for_terminal(export_id, Duration::from_millis(20), Duration::from_secs(60))
            .await
            .unwrap();
        let WaitOutcome::Terminal(op) = outcome else {
            panic!("导出未在时限内结束");
        };
        assert_eq!(op.status, OperationStatus::Completed);

        let import_id = orchestrator
            .spawn_import(ImportOptions {
                source_operation_id: Some(export_id),
                ..Default::default()
            })
            .await
            .unwrap();
        let outcome = orchestrator
            .wait_for_terminal(import_id, Duration::from_millis(20), Duration::from_secs(60))
            .await
            .unwrap();
        let WaitOutcome::Terminal(op) = outcome else {
            panic!("导入未在时限内结束");
        };
        assert_eq!(op.status, OperationStatus::Completed);
        assert_eq!(op.source.as_deref(), Some(format!("operation:{export_id}").as_str()));
    }

    #[tokio::test]
    async fn test_wait_for_unknown_operation() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());
        assert!(matches!(
            orchestrator
                .wait_for_terminal(404, Duration::from_millis(10), Duration::from_millis(50))
                .await,
            Err(MoverError::OperationNotFound(404))
        ));

        let progress = orchestrator.get_progress(404).await.unwrap();
        assert_eq!(progress.percent, 0);
        assert_eq!(progress.stage, INITIALIZING_STAGE);
        assert_eq!(progress.status, None);
    }

    #[tokio::test]
    async fn test_execution_timeout_marks_failed() {
        let mut registry = ProtocolRegistry::with_defaults();
        registry.register("stalled", || Arc::new(StalledBackend));
        let fx = fixture_with_registry(registry).await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let manager = fx.ctx.config_manager();
        manager.set_max_execution_time(1).await.unwrap();
        manager
            .set_storage_settings(
                "stalled",
                &StorageSettings::local(fx.backup_dir.to_string_lossy().to_string()),
            )
            .await
            .unwrap();

        let options = ExportOptions {
            protocol: "stalled".to_string(),
            ..export_options("slow")
        };
        let err = orchestrator.start_export(options).await.unwrap_err();
        assert!(matches!(err, MoverError::Timeout(1)));

        let ops = orchestrator
            .list_operations(&OperationFilter::kind(OperationKind::Export))
            .await
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].status, OperationStatus::Failed);
        assert!(ops[0].error_message.as_deref().unwrap().contains("超时"));

        let progress = orchestrator.get_progress(ops[0].id).await.unwrap();
        assert_eq!(progress.stage, "failed");
        // 超时后临时目录与未完成的归档随流水线一起释放
        assert!(!fx.work_dir.join(format!("temp-{}", ops[0].id)).exists());
        assert!(!fx.work_dir.join(archive_file_name("slow", ops[0].id)).exists());
    }

    #[tokio::test]
    async fn test_launched_export_is_completed_after_join() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let handle = orchestrator
            .launch_export(export_options("joined"))
            .await
            .unwrap();
        let id = handle.id();
        handle.join().await.unwrap();

        let op = orchestrator.get_operation(id).await.unwrap().unwrap();
        assert_eq!(op.status, OperationStatus::Completed);
        assert!(fx.backup_dir.join(archive_file_name("joined", id)).is_file());
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_with_skipped_stages() {
        let store = Arc::new(RecordingStore {
            inner: MokaProgressStore::default(),
            seen: Mutex::new(Vec::new()),
        });
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());

        let mut registry = ProtocolRegistry::with_defaults();
        let (gate_started, gate_release) = (started.clone(), release.clone());
        registry.register("gated", move || {
            Arc::new(GatedBackend {
                started: gate_started.clone(),
                release: gate_release.clone(),
            })
        });
        let fx = fixture_with(registry, ProgressTracker::new(store.clone())).await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());
        fx.ctx
            .config_manager()
            .set_storage_settings(
                "gated",
                &StorageSettings::local(fx.backup_dir.to_string_lossy().to_string()),
            )
            .await
            .unwrap();

        let options = ExportOptions {
            protocol: "gated".to_string(),
            include_themes: false,
            include_plugins: false,
            ..export_options("partial")
        };
        let id = orchestrator.spawn_export(options).await.unwrap();

        // 上传阶段阻塞期间记录处于运行中
        started.notified().await;
        let running = orchestrator.get_operation(id).await.unwrap().unwrap();
        assert_eq!(running.status, OperationStatus::Running);
        let view = orchestrator.get_progress(id).await.unwrap();
        assert!(view.percent < 100);

        release.notify_one();
        let outcome = orchestrator
            .wait_for_terminal(id, Duration::from_millis(20), Duration::from_secs(60))
            .await
            .unwrap();
        let WaitOutcome::Terminal(op) = outcome else {
            panic!("导出未在时限内结束");
        };
        assert_eq!(op.status, OperationStatus::Completed);

        let seen = store.seen.lock().unwrap().clone();
        assert!(seen.len() > 2);
        assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "进度回退: {seen:?}");
        assert_eq!(seen.last(), Some(&100));
    }

    #[tokio::test]
    async fn test_same_name_exports_keep_separate_archives() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());

        let first = orchestrator
            .start_export(export_options("nightly"))
            .await
            .unwrap();
        let second = orchestrator
            .start_export(export_options("nightly"))
            .await
            .unwrap();

        let first_op = orchestrator.get_operation(first).await.unwrap().unwrap();
        let second_op = orchestrator.get_operation(second).await.unwrap().unwrap();
        assert_ne!(first_op.location, second_op.location);

        orchestrator.delete_operation(first).await.unwrap();

        let second_name = archive_file_name("nightly", second);
        assert!(fx.work_dir.join(&second_name).is_file());
        assert!(fx.backup_dir.join(&second_name).is_file());

        let import_id = orchestrator
            .start_import(ImportOptions {
                source_operation_id: Some(second),
                ..Default::default()
            })
            .await
            .unwrap();
        let import = orchestrator.get_operation(import_id).await.unwrap().unwrap();
        assert_eq!(import.status, OperationStatus::Completed);
    }

    #[tokio::test]
    async fn test_delete_operation_removes_copies() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());
        let id = orchestrator
            .start_export(export_options("disposable"))
            .await
            .unwrap();

        let report = orchestrator.delete_operation(id).await.unwrap();
        assert_eq!(
            report,
            DeleteReport {
                record_deleted: true,
                cache_removed: true,
                remote_removed: true,
            }
        );
        let file_name = archive_file_name("disposable", id);
        assert!(!fx.work_dir.join(&file_name).exists());
        assert!(!fx.backup_dir.join(&file_name).exists());
        assert!(orchestrator.get_operation(id).await.unwrap().is_none());

        assert!(matches!(
            orchestrator.delete_operation(id).await,
            Err(MoverError::OperationNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_retention_sweep() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());
        let id = orchestrator
            .start_export(export_options("old"))
            .await
            .unwrap();

        // 刚创建的备份不在保留期外
        let report = orchestrator.run_maintenance().await.unwrap();
        assert_eq!(report.operations, 0);

        let cutoff = Utc::now() + chrono::Duration::seconds(1);
        let report = retention::sweep_before(&fx.ctx, cutoff).await.unwrap();
        assert_eq!(report.operations, 1);
        assert_eq!(report.archives, 1);
        assert!(orchestrator.get_operation(id).await.unwrap().is_none());
        // 存储中的副本保留
        assert!(fx.backup_dir.join(archive_file_name("old", id)).is_file());
    }

    #[tokio::test]
    async fn test_local_connection_check() {
        let fx = fixture().await;
        let orchestrator = MigrationOrchestrator::new(fx.ctx.clone());
        let info = orchestrator.test_connection("local").await.unwrap();
        assert_eq!(info.protocol, "local");
        assert!(fx.backup_dir.is_dir());

        assert!(matches!(
            orchestrator.test_connection("sftp").await,
            Err(MoverError::Validation(_))
        ));
    }
}
