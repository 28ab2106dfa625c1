use crate::utils::{format_size, truncate};
use mover_core::archive::{archive_info, validate_archive};
use mover_core::{MoverError, error::Result};
use std::path::Path;
use tracing::info;

/// 显示归档概要
pub async fn run_archive_info(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let info_result = tokio::task::spawn_blocking(move || archive_info(&owned)).await??;

    info!("🗜️  归档: {}", path.display());
    info!("   大小: {}", format_size(info_result.size_bytes));
    info!("   条目数: {}", info_result.entry_count);
    info!("{:<60} {:>12} {:>12}", "条目", "原始大小", "压缩后");
    info!("{}", "-".repeat(86));
    for entry in &info_result.entries {
        if entry.is_dir {
            info!("{:<60}", truncate(&entry.name, 60));
        } else {
            info!(
                "{:<60} {:>12} {:>12}",
                truncate(&entry.name, 60),
                format_size(entry.size),
                format_size(entry.compressed_size)
            );
        }
    }
    if info_result.entry_count > info_result.entries.len() {
        info!(
            "   ... 另有 {} 个条目未显示",
            info_result.entry_count - info_result.entries.len()
        );
    }
    Ok(())
}

/// 校验归档能否完整读取
pub async fn run_verify(path: &Path) -> Result<()> {
    let owned = path.to_path_buf();
    let valid = tokio::task::spawn_blocking(move || validate_archive(&owned)).await?;
    if valid {
        info!("✅ 归档完整: {}", path.display());
        Ok(())
    } else {
        Err(MoverError::ArchiveOpen(path.display().to_string()))
    }
}
