//! 过期备份与遗留临时目录的清理

use crate::constants::workspace::EXPORT_SCRATCH_PREFIX;
use crate::error::Result;
use crate::operation::OperationFilter;
use crate::pipeline::AppContext;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

/// 清理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub operations: usize,
    pub archives: usize,
    pub scratch_dirs: usize,
}

/// 删除本地缓存归档，返回是否实际删除
pub async fn remove_cached_archive(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("已删除本地归档: {}", path.display());
            true
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("删除本地归档 {} 失败: {}", path.display(), e);
            false
        }
    }
}

/// 删除创建时间早于 `retention_days` 天的操作记录及其本地缓存归档
///
/// 存储中的远程副本不受影响；仍在执行的操作跳过；0 表示不清理。
pub async fn sweep_expired(ctx: &AppContext, retention_days: u32) -> Result<SweepReport> {
    if retention_days == 0 {
        return Ok(SweepReport::default());
    }
    let cutoff = Utc::now() - chrono::Duration::days(i64::from(retention_days));
    sweep_before(ctx, cutoff).await
}

/// 删除创建时间早于 `cutoff` 的已结束操作
pub async fn sweep_before(ctx: &AppContext, cutoff: DateTime<Utc>) -> Result<SweepReport> {
    let mut report = SweepReport::default();
    let filter = OperationFilter {
        created_before: Some(cutoff),
        ..Default::default()
    };

    for operation in ctx.operations.list(&filter).await? {
        if !operation.status.is_terminal() {
            debug!("操作 {} 未结束，跳过清理", operation.id);
            continue;
        }

        let cache = operation
            .location
            .as_ref()
            .and_then(|location| location.local_cache_path.as_deref());
        if let Some(cache) = cache {
            if remove_cached_archive(Path::new(cache)).await {
                report.archives += 1;
            }
        }

        if ctx.operations.delete(operation.id).await? {
            report.operations += 1;
        }
    }

    if report.operations > 0 {
        info!(
            "已清理 {} 条过期记录，{} 个本地归档",
            report.operations, report.archives
        );
    }
    Ok(report)
}

/// 删除工作目录下修改时间早于 `max_age_secs` 的 `temp-*` 目录
pub async fn cleanup_stale_scratch(work_dir: &Path, max_age_secs: u64) -> Result<usize> {
    let mut entries = match tokio::fs::read_dir(work_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let max_age = Duration::from_secs(max_age_secs);
    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(EXPORT_SCRATCH_PREFIX) {
            continue;
        }
        let metadata = entry.metadata().await?;
        if !metadata.is_dir() {
            continue;
        }

        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                debug!("已删除遗留临时目录: {}", entry.path().display());
                removed += 1;
            }
            Err(e) => warn!("删除遗留临时目录 {} 失败: {}", entry.path().display(), e),
        }
    }
    Ok(removed)
}
