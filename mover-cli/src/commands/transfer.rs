use crate::app::CliApp;
use crate::utils::{format_size, percent_bar};
use mover_core::constants::progress::{POLL_CEILING, POLL_INTERVAL};
use mover_core::{
    ExportOptions, ImportOptions, MigrationOrchestrator, MoverError, Operation, OperationHandle,
    OperationId, OperationStatus, error::Result,
};
use tokio::time::Instant;
use tracing::{info, warn};

/// 导出站点
///
/// 命令在流水线结束后才返回，运行时不会在操作进行中被销毁。
pub async fn run_export(app: &CliApp, options: ExportOptions, show_progress: bool) -> Result<()> {
    info!("📦 开始导出站点: {}", app.config.site.root);
    let handle = app.orchestrator.launch_export(options).await?;
    info!("   操作 ID: {}", handle.id());

    let prefix = show_progress.then_some("导出");
    let operation = follow(&app.orchestrator, handle, prefix).await?;
    info!("✅ 导出完成: {}", operation.name);
    if let Some(size) = operation.size_bytes {
        info!("   归档大小: {}", format_size(size));
    }
    if let Some(location) = &operation.location {
        info!("   存储位置: {} ({})", location.remote_path, location.protocol);
    }
    Ok(())
}

/// 从备份恢复站点
pub async fn run_import(app: &CliApp, options: ImportOptions, show_progress: bool) -> Result<()> {
    if !options.overwrite_database && !options.overwrite_files {
        warn!("⚠️  已同时跳过数据库与文件，导入只会校验并解压归档");
    }
    let handle = app.orchestrator.launch_import(options).await?;
    info!("📥 开始导入，操作 ID: {}", handle.id());

    let prefix = show_progress.then_some("导入");
    let operation = follow(&app.orchestrator, handle, prefix).await?;
    info!("✅ 导入完成: {}", operation.name);
    Ok(())
}

/// 等待本进程启动的操作结束，`prefix` 为空时不显示进度条
async fn follow(
    orchestrator: &MigrationOrchestrator,
    handle: OperationHandle,
    prefix: Option<&str>,
) -> Result<Operation> {
    let id = handle.id();
    let bar = prefix.map(percent_bar);

    if let Some(bar) = &bar {
        while !handle.is_finished() {
            match orchestrator.get_progress(id).await {
                Ok(view) => {
                    bar.set_position(u64::from(view.percent));
                    bar.set_message(format!("[{}] {}", view.stage, view.message));
                }
                Err(e) => warn!("读取操作 {} 进度失败: {}", id, e),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    if let Err(e) = handle.join().await {
        if let Some(bar) = &bar {
            bar.abandon_with_message("失败");
        }
        return Err(e);
    }

    let operation = orchestrator
        .get_operation(id)
        .await?
        .ok_or(MoverError::OperationNotFound(id))?;
    if let Some(bar) = &bar {
        bar.set_position(100);
        bar.finish_with_message("完成");
    }
    Ok(operation)
}

/// 以进度条跟踪操作直到终态
///
/// 操作失败时返回错误，进程以非零状态退出。
pub async fn watch_operation(
    orchestrator: &MigrationOrchestrator,
    id: OperationId,
    prefix: &str,
) -> Result<Operation> {
    let bar = percent_bar(prefix);
    let deadline = Instant::now() + POLL_CEILING;

    loop {
        let view = orchestrator.get_progress(id).await?;
        bar.set_position(u64::from(view.percent));
        bar.set_message(format!("[{}] {}", view.stage, view.message));

        if view.is_terminal() {
            break;
        }
        if Instant::now() >= deadline {
            bar.abandon_with_message("等待超时，操作仍在后台执行");
            return Err(MoverError::custom(format!(
                "等待操作 {id} 超时，请稍后使用 'site-mover progress {id}' 查看"
            )));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    let operation = orchestrator
        .get_operation(id)
        .await?
        .ok_or(MoverError::OperationNotFound(id))?;

    match operation.status {
        OperationStatus::Failed => {
            bar.abandon_with_message("失败");
            Err(MoverError::custom(format!(
                "操作 {} 失败: {}",
                id,
                operation.error_message.as_deref().unwrap_or("未知错误")
            )))
        }
        _ => {
            bar.finish_with_message("完成");
            Ok(operation)
        }
    }
}
