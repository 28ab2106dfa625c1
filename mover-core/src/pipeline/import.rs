use super::{AppContext, ScratchDir, StageEntry, apply_memory_limit, run_blocking};
use crate::archive::extract_archive;
use crate::constants::archive::{DATABASE_DUMP_FILE, DOWNLOADED_ARCHIVE_NAME, EXTRACT_DIR_NAME};
use crate::constants::protocol::LOCAL;
use crate::constants::site::CONTENT_DIR_NAME;
use crate::constants::workspace::IMPORT_SCRATCH_PREFIX;
use crate::error::{MoverError, Result};
use crate::fs_walk::{copy_file_if_exists, copy_tree};
use crate::operation::{OperationId, OperationStatus};
use crate::options::{ImportOptions, ImportSource};
use crate::progress::ProgressReporter;
use crate::sql_dump::apply_dump;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 导入阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStage {
    Acquire,
    Extract,
    Database,
    Files,
    Cleanup,
}

/// 导入阶段表
pub const IMPORT_STAGES: &[StageEntry<ImportStage>] = &[
    StageEntry {
        stage: ImportStage::Acquire,
        name: "acquire",
        start: 0,
        end: 20,
    },
    StageEntry {
        stage: ImportStage::Extract,
        name: "extract",
        start: 25,
        end: 40,
    },
    StageEntry {
        stage: ImportStage::Database,
        name: "database",
        start: 45,
        end: 70,
    },
    StageEntry {
        stage: ImportStage::Files,
        name: "files",
        start: 75,
        end: 90,
    },
    StageEntry {
        stage: ImportStage::Cleanup,
        name: "cleanup",
        start: 100,
        end: 100,
    },
];

impl ImportStage {
    fn enabled(&self, options: &ImportOptions) -> bool {
        match self {
            Self::Database => options.overwrite_database,
            Self::Files => options.overwrite_files,
            Self::Acquire | Self::Extract | Self::Cleanup => true,
        }
    }

    fn start_message(&self) -> &'static str {
        match self {
            Self::Acquire => "正在获取备份文件",
            Self::Extract => "正在解压归档",
            Self::Database => "正在导入数据库",
            Self::Files => "正在恢复站点文件",
            Self::Cleanup => "正在清理临时文件",
        }
    }

    fn done_message(&self) -> &'static str {
        match self {
            Self::Acquire => "备份文件已就绪",
            Self::Extract => "归档解压完成",
            Self::Database => "数据库导入完成",
            Self::Files => "站点文件恢复完成",
            Self::Cleanup => "导入完成",
        }
    }
}

/// 单次导入在阶段之间传递的状态
struct ImportRun<'a> {
    id: OperationId,
    source: &'a ImportSource,
    protocol: &'a str,
    scratch: &'a Path,
    archive_path: Option<PathBuf>,
}

impl ImportRun<'_> {
    fn extract_dir(&self) -> PathBuf {
        self.scratch.join(EXTRACT_DIR_NAME)
    }
}

/// 导入流水线
pub struct ImportPipeline {
    ctx: Arc<AppContext>,
}

impl ImportPipeline {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// 执行导入；失败时写入 Failed 并返回原始错误
    pub async fn run(&self, id: OperationId, options: &ImportOptions) -> Result<()> {
        let result = match self.execute(id, options).await {
            Ok(()) => {
                self.ctx
                    .operations
                    .update_status(id, OperationStatus::Completed, None)
                    .await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => {
                info!("导入 {} 完成", id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("导入 {} 失败: {}", id, e);
                self.ctx.mark_failed(id, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, id: OperationId, options: &ImportOptions) -> Result<()> {
        let source = options.source()?;
        let tunables = self.ctx.tunables().await?;
        let reporter = self.ctx.progress.reporter(id, tunables.enable_logging);

        self.ctx
            .operations
            .update_status(id, OperationStatus::Running, None)
            .await?;

        apply_memory_limit(&tunables.memory_limit);

        let scratch = ScratchDir::create(
            self.ctx
                .work_dir
                .join(format!("{IMPORT_SCRATCH_PREFIX}{id}")),
        )?;

        let protocol = options.protocol.trim().to_lowercase();
        let mut run = ImportRun {
            id,
            source: &source,
            protocol: &protocol,
            scratch: scratch.path(),
            archive_path: None,
        };
        let outcome = self.run_stages(&mut run, options, &reporter).await;
        scratch.cleanup();
        outcome
    }

    async fn run_stages(
        &self,
        run: &mut ImportRun<'_>,
        options: &ImportOptions,
        reporter: &ProgressReporter,
    ) -> Result<()> {
        for entry in IMPORT_STAGES {
            if !entry.stage.enabled(options) {
                debug!("导入 {} 跳过阶段 {}", run.id, entry.name);
                reporter.report(entry.end, entry.name, "已跳过");
                continue;
            }

            reporter.report(entry.start, entry.name, entry.stage.start_message());
            match entry.stage {
                ImportStage::Acquire => {
                    let archive = self.acquire(run).await?;
                    run.archive_path = Some(archive);
                }
                ImportStage::Extract => self.extract(run).await?,
                ImportStage::Database => self.apply_database(run).await?,
                ImportStage::Files => self.apply_files(run).await?,
                // 临时目录在流水线返回前删除
                ImportStage::Cleanup => {}
            }
            reporter.report(entry.end, entry.name, entry.stage.done_message());
        }
        Ok(())
    }

    /// 定位或下载备份归档
    async fn acquire(&self, run: &ImportRun<'_>) -> Result<PathBuf> {
        let download_target = run.scratch.join(DOWNLOADED_ARCHIVE_NAME);

        match run.source {
            ImportSource::Operation(source_id) => {
                let operation = self
                    .ctx
                    .operations
                    .get(*source_id)
                    .await?
                    .ok_or_else(|| {
                        MoverError::validation(format!("来源操作 {source_id} 不存在"))
                    })?;
                let location = operation.location.ok_or_else(|| {
                    MoverError::validation(format!("来源操作 {source_id} 没有可用的备份文件"))
                })?;

                let cached = location
                    .local_cache_path
                    .as_deref()
                    .map(PathBuf::from)
                    .filter(|path| path.is_file());
                if let Some(cached) = cached {
                    debug!("使用本地缓存归档: {}", cached.display());
                    return Ok(cached);
                }

                let (backend, settings) = self.ctx.backend_for(&location.protocol).await?;
                backend
                    .download(&location.remote_path, &download_target, &settings)
                    .await?;
                info!(
                    "已从 {} 下载备份 {}",
                    location.protocol, location.remote_path
                );
                Ok(download_target)
            }
            ImportSource::Path(path) => {
                if run.protocol == LOCAL {
                    if !path.is_file() {
                        return Err(MoverError::SourceNotFound(path.display().to_string()));
                    }
                    return Ok(path.clone());
                }

                let remote_path = path.to_string_lossy().to_string();
                let (backend, settings) = self.ctx.backend_for(run.protocol).await?;
                backend
                    .download(&remote_path, &download_target, &settings)
                    .await?;
                info!("已从 {} 下载备份 {}", run.protocol, remote_path);
                Ok(download_target)
            }
        }
    }

    async fn extract(&self, run: &ImportRun<'_>) -> Result<()> {
        let archive = run
            .archive_path
            .clone()
            .ok_or_else(|| MoverError::custom("尚未获取备份归档"))?;
        let destination = run.extract_dir();

        let entries = run_blocking(move || extract_archive(&archive, &destination)).await?;
        debug!("导入 {} 解压 {} 个条目", run.id, entries);
        Ok(())
    }

    async fn apply_database(&self, run: &ImportRun<'_>) -> Result<()> {
        let dump_path = run.extract_dir().join(DATABASE_DUMP_FILE);
        if !dump_path.is_file() {
            return Err(MoverError::MissingDatabaseDump(
                dump_path.display().to_string(),
            ));
        }

        let sql = tokio::fs::read_to_string(&dump_path).await?;
        let site_db = Arc::clone(&self.ctx.site_db);
        let executed = run_blocking(move || apply_dump(site_db.as_ref(), &sql)).await?;
        info!("导入 {} 执行 {} 条 SQL 语句", run.id, executed);
        Ok(())
    }

    /// 内容目录覆盖合并，根目录配置文件存在时覆盖
    async fn apply_files(&self, run: &ImportRun<'_>) -> Result<()> {
        let extracted = run.extract_dir();
        let content_source = extracted.join(CONTENT_DIR_NAME);
        let content_target = self.ctx.site.content_dir();
        let root_files = [
            self.ctx.site.root_config_file(),
            self.ctx.site.access_control_file(),
        ];

        run_blocking(move || {
            if content_source.is_dir() {
                let stats = copy_tree(&content_source, &content_target, |_| false)?;
                debug!("恢复内容目录: {} 个文件, {} 字节", stats.files, stats.bytes);
            }
            for target in root_files {
                let Some(name) = target.file_name() else {
                    continue;
                };
                if copy_file_if_exists(&extracted.join(name), &target)? {
                    debug!("已覆盖站点文件: {}", target.display());
                }
            }
            Ok(())
        })
        .await
    }
}
