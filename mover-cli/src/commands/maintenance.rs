use crate::app::CliApp;
use mover_core::error::Result;
use tracing::info;

/// 按保留天数清理过期备份，并删除遗留临时目录
pub async fn run_cleanup(app: &CliApp) -> Result<()> {
    info!("🧹 开始清理...");
    let report = app.orchestrator.run_maintenance().await?;
    info!("   删除过期记录: {}", report.operations);
    info!("   删除本地归档: {}", report.archives);
    info!("   删除临时目录: {}", report.scratch_dirs);
    info!("✅ 清理完成");
    Ok(())
}
