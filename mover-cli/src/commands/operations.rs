use crate::app::CliApp;
use crate::cli::{KindArg, StatusArg};
use crate::commands::watch_operation;
use crate::utils::{format_size, truncate};
use chrono::Local;
use mover_core::operation::OperationFilter;
use mover_core::{MoverError, OperationId, OperationKind, OperationStatus, error::Result};
use tracing::info;

impl From<KindArg> for OperationKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Export => OperationKind::Export,
            KindArg::Import => OperationKind::Import,
        }
    }
}

impl From<StatusArg> for OperationStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Pending => OperationStatus::Pending,
            StatusArg::Running => OperationStatus::Running,
            StatusArg::Completed => OperationStatus::Completed,
            StatusArg::Failed => OperationStatus::Failed,
        }
    }
}

/// 列出操作记录
pub async fn run_list(
    app: &CliApp,
    kind: Option<KindArg>,
    status: Option<StatusArg>,
    limit: usize,
) -> Result<()> {
    let filter = OperationFilter {
        kind: kind.map(Into::into),
        status: status.map(Into::into),
        created_before: None,
        limit: Some(limit),
    };
    let operations = app.orchestrator.list_operations(&filter).await?;

    if operations.is_empty() {
        info!("📦 暂无操作记录");
        return Ok(());
    }

    info!("📦 操作记录");
    info!(
        "{:<6} {:<8} {:<10} {:<20} {:<12} {:<30}",
        "ID", "类型", "状态", "创建时间", "大小", "名称"
    );
    info!("{}", "-".repeat(100));

    for operation in &operations {
        let size = operation
            .size_bytes
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        info!(
            "{:<6} {:<8} {:<10} {:<20} {:<12} {:<30}",
            operation.id,
            operation.kind,
            operation.status,
            operation
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S"),
            size,
            truncate(&operation.name, 30)
        );
        if let Some(message) = &operation.error_message {
            info!("       ↳ {}", truncate(message, 90));
        }
    }

    info!("共 {} 条记录", operations.len());
    Ok(())
}

/// 删除操作记录及其归档
pub async fn run_delete(app: &CliApp, id: OperationId) -> Result<()> {
    let report = app.orchestrator.delete_operation(id).await?;
    info!("🗑️  操作 {} 已删除", id);
    if report.cache_removed {
        info!("   ✅ 已删除本地缓存归档");
    }
    if report.remote_removed {
        info!("   ✅ 已删除存储中的归档");
    }
    Ok(())
}

/// 查看操作进度
pub async fn run_progress(app: &CliApp, id: OperationId, watch: bool) -> Result<()> {
    if app.orchestrator.get_operation(id).await?.is_none() {
        return Err(MoverError::OperationNotFound(id));
    }

    if watch {
        let operation = watch_operation(&app.orchestrator, id, "进度").await?;
        info!("✅ 操作 {} 已结束: {}", id, operation.status);
        return Ok(());
    }

    let view = app.orchestrator.get_progress(id).await?;
    info!("📊 操作 {} 进度: {}%", id, view.percent);
    info!("   阶段: {}", view.stage);
    info!("   信息: {}", view.message);
    if let Some(status) = view.status {
        info!("   状态: {}", status);
    }
    Ok(())
}
