use super::{AppContext, ArchiveGuard, ScratchDir, StageEntry, apply_memory_limit, run_blocking};
use crate::archive::create_archive;
use crate::constants::archive::{ARCHIVE_EXTENSION, DATABASE_DUMP_FILE};
use crate::constants::site::{CONTENT_DIR_NAME, PLUGINS_DIR_NAME, THEMES_DIR_NAME, UPLOADS_DIR_NAME};
use crate::constants::workspace::EXPORT_SCRATCH_PREFIX;
use crate::error::Result;
use crate::fs_walk::{SkipRules, copy_file_if_exists, copy_tree};
use crate::operation::{LocationDescriptor, OperationId, OperationStatus};
use crate::options::ExportOptions;
use crate::progress::ProgressReporter;
use crate::sql_dump::write_dump;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// 导出阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Database,
    Content,
    Media,
    Plugins,
    Themes,
    Archive,
    Upload,
}

/// 导出阶段表，按顺序执行
pub const EXPORT_STAGES: &[StageEntry<ExportStage>] = &[
    StageEntry {
        stage: ExportStage::Database,
        name: "database",
        start: 10,
        end: 20,
    },
    StageEntry {
        stage: ExportStage::Content,
        name: "content",
        start: 25,
        end: 40,
    },
    StageEntry {
        stage: ExportStage::Media,
        name: "media",
        start: 45,
        end: 60,
    },
    StageEntry {
        stage: ExportStage::Plugins,
        name: "plugins",
        start: 65,
        end: 70,
    },
    StageEntry {
        stage: ExportStage::Themes,
        name: "themes",
        start: 75,
        end: 80,
    },
    StageEntry {
        stage: ExportStage::Archive,
        name: "archive",
        start: 85,
        end: 90,
    },
    StageEntry {
        stage: ExportStage::Upload,
        name: "upload",
        start: 95,
        end: 100,
    },
];

impl ExportStage {
    fn enabled(&self, options: &ExportOptions) -> bool {
        match self {
            Self::Database => options.include_database,
            Self::Media => options.media_enabled(),
            Self::Plugins => options.include_plugins,
            Self::Themes => options.include_themes,
            Self::Content | Self::Archive | Self::Upload => true,
        }
    }

    fn start_message(&self) -> &'static str {
        match self {
            Self::Database => "正在导出数据库",
            Self::Content => "正在复制站点配置文件",
            Self::Media => "正在复制媒体文件",
            Self::Plugins => "正在复制插件",
            Self::Themes => "正在复制主题",
            Self::Archive => "正在打包归档",
            Self::Upload => "正在上传归档",
        }
    }

    fn done_message(&self) -> &'static str {
        match self {
            Self::Database => "数据库导出完成",
            Self::Content => "站点配置文件复制完成",
            Self::Media => "媒体文件复制完成",
            Self::Plugins => "插件复制完成",
            Self::Themes => "主题复制完成",
            Self::Archive => "归档打包完成",
            Self::Upload => "归档上传完成",
        }
    }
}

/// 单次导出在阶段之间传递的状态
struct ExportRun<'a> {
    id: OperationId,
    options: &'a ExportOptions,
    scratch: &'a Path,
    /// 本地缓存与存储中共用的文件名
    file_name: String,
    archive_path: PathBuf,
}

/// 导出流水线
pub struct ExportPipeline {
    ctx: Arc<AppContext>,
}

impl ExportPipeline {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    /// 执行导出；失败时写入 Failed 并返回原始错误
    pub async fn run(&self, id: OperationId, options: &ExportOptions) -> Result<()> {
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
                info!("导出 {} 完成: {}", id, options.name);
                Ok(())
            }
            Err(e) => {
                tracing::error!("导出 {} 失败: {}", id, e);
                self.ctx.mark_failed(id, &e).await;
                Err(e)
            }
        }
    }

    async fn execute(&self, id: OperationId, options: &ExportOptions) -> Result<()> {
        let tunables = self.ctx.tunables().await?;
        let reporter = self.ctx.progress.reporter(id, tunables.enable_logging);

        self.ctx
            .operations
            .update_status(id, OperationStatus::Running, None)
            .await?;
        reporter.report(0, "init", "开始导出");

        apply_memory_limit(&tunables.memory_limit);

        let scratch = ScratchDir::create(
            self.ctx
                .work_dir
                .join(format!("{EXPORT_SCRATCH_PREFIX}{id}")),
        )?;

        let file_name = archive_file_name(&options.name, id);
        let archive = ArchiveGuard::new(self.ctx.work_dir.join(&file_name));

        let run = ExportRun {
            id,
            options,
            scratch: scratch.path(),
            archive_path: archive.path().to_path_buf(),
            file_name,
        };
        let outcome = self.run_stages(&run, &reporter).await;
        scratch.cleanup();
        if outcome.is_ok() {
            archive.keep();
        }
        outcome
    }

    async fn run_stages(&self, run: &ExportRun<'_>, reporter: &ProgressReporter) -> Result<()> {
        for entry in EXPORT_STAGES {
            if !entry.stage.enabled(run.options) {
                debug!("导出 {} 跳过阶段 {}", run.id, entry.name);
                reporter.report(entry.end, entry.name, "已跳过");
                continue;
            }

            reporter.report(entry.start, entry.name, entry.stage.start_message());
            match entry.stage {
                ExportStage::Database => self.export_database(run).await?,
                ExportStage::Content => self.export_content(run).await?,
                ExportStage::Media => self.export_media(run).await?,
                ExportStage::Plugins => {
                    let source = self.ctx.site.plugins_dir();
                    copy_into_scratch(run.scratch, source, PLUGINS_DIR_NAME).await?
                }
                ExportStage::Themes => {
                    let source = self.ctx.site.themes_dir();
                    copy_into_scratch(run.scratch, source, THEMES_DIR_NAME).await?
                }
                ExportStage::Archive => self.package(run).await?,
                ExportStage::Upload => self.upload(run).await?,
            }
            reporter.report(entry.end, entry.name, entry.stage.done_message());
        }
        Ok(())
    }

    async fn export_database(&self, run: &ExportRun<'_>) -> Result<()> {
        let site_db = Arc::clone(&self.ctx.site_db);
        let output = run.scratch.join(DATABASE_DUMP_FILE);

        let stats = run_blocking(move || write_dump(site_db.as_ref(), &output)).await?;
        info!(
            "导出 {} 数据库: {} 张表, {} 行",
            run.id, stats.tables, stats.rows
        );
        Ok(())
    }

    /// 建立内容目录骨架，并复制根目录下的配置文件
    async fn export_content(&self, run: &ExportRun<'_>) -> Result<()> {
        let scratch = run.scratch.to_path_buf();
        let root_config = self.ctx.site.root_config_file();
        let access_file = self.ctx.site.access_control_file();

        run_blocking(move || {
            fs::create_dir_all(scratch.join(CONTENT_DIR_NAME))?;
            for source in [root_config, access_file] {
                let Some(name) = source.file_name() else {
                    continue;
                };
                if !copy_file_if_exists(&source, &scratch.join(name))? {
                    debug!("站点文件不存在，跳过: {}", source.display());
                }
            }
            Ok(())
        })
        .await
    }

    /// 复制媒体目录，跳过工作目录与缓存目录
    async fn export_media(&self, run: &ExportRun<'_>) -> Result<()> {
        let uploads = self.ctx.site.uploads_dir();
        if !uploads.is_dir() {
            debug!("媒体目录不存在，跳过: {}", uploads.display());
            return Ok(());
        }

        let source = canonical_or_self(&uploads);
        let rules = SkipRules::none()
            .skip_dir(canonical_or_self(&self.ctx.work_dir))
            .skip_dir(canonical_or_self(&self.ctx.site.cache_dir()))
            .skip_dir(source.join("cache"));
        let destination = run.scratch.join(CONTENT_DIR_NAME).join(UPLOADS_DIR_NAME);

        let stats =
            run_blocking(move || copy_tree(&source, &destination, |p| rules.is_skipped(p))).await?;
        debug!("媒体文件: {} 个文件, {} 字节", stats.files, stats.bytes);
        Ok(())
    }

    async fn package(&self, run: &ExportRun<'_>) -> Result<()> {
        let source = run.scratch.to_path_buf();
        let archive_path = run.archive_path.clone();
        let compression = run.options.compression;

        let size =
            run_blocking(move || create_archive(&source, &archive_path, compression)).await?;
        self.ctx.operations.set_size(run.id, size).await?;
        info!(
            "导出 {} 归档完成: {} ({} 字节)",
            run.id,
            run.archive_path.display(),
            size
        );
        Ok(())
    }

    async fn upload(&self, run: &ExportRun<'_>) -> Result<()> {
        let (backend, settings) = self.ctx.backend_for(&run.options.protocol).await?;
        let remote_path = run.file_name.clone();

        backend
            .upload(&run.archive_path, &remote_path, &settings)
            .await?;

        let location = LocationDescriptor {
            protocol: run.options.protocol.clone(),
            remote_path,
            local_cache_path: Some(run.archive_path.to_string_lossy().to_string()),
        };
        self.ctx.operations.set_location(run.id, &location).await?;
        info!(
            "导出 {} 已上传至 {}:{}",
            run.id, location.protocol, location.remote_path
        );
        Ok(())
    }
}

/// 归档文件名 `{name}-{id}.zip`，同名备份的每次导出互不覆盖
pub fn archive_file_name(name: &str, id: OperationId) -> String {
    format!("{name}-{id}.{ARCHIVE_EXTENSION}")
}

/// 复制 `wp-content` 下的某个子目录到临时目录，源目录不存在时跳过
async fn copy_into_scratch(scratch: &Path, source: PathBuf, dir_name: &'static str) -> Result<()> {
    if !source.is_dir() {
        debug!("目录不存在，跳过: {}", source.display());
        return Ok(());
    }
    let destination = scratch.join(CONTENT_DIR_NAME).join(dir_name);
    let stats = run_blocking(move || copy_tree(&source, &destination, |_| false)).await?;
    debug!("{}: {} 个文件, {} 字节", dir_name, stats.files, stats.bytes);
    Ok(())
}

fn canonical_or_self(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
