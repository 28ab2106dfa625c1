use crate::app::CliApp;
use crate::utils::format_size;
use mover_core::storage::StorageSettings;
use mover_core::{MoverError, error::Result};
use std::path::Path;
use tracing::info;

/// 测试存储协议连接
pub async fn run_test_connection(app: &CliApp, protocol: &str) -> Result<()> {
    info!("🔌 测试 {} 连接...", protocol);
    let connection = app.orchestrator.test_connection(protocol).await?;

    info!("✅ {}", connection.message);
    info!("   目标: {}", connection.target);
    info!("   目录: {}", connection.directory);
    if let (Some(free), Some(total)) = (connection.free_bytes, connection.total_bytes) {
        info!("   可用空间: {} / {}", format_size(free), format_size(total));
    }
    Ok(())
}

/// 显示运行参数与已注册的协议
pub async fn show_settings(app: &CliApp) -> Result<()> {
    let context = app.orchestrator.context();
    let tunables = context.tunables().await?;

    info!("⚙️  运行参数");
    info!(
        "   最大执行时间: {}",
        match tunables.max_execution_time {
            0 => "不限制".to_string(),
            secs => format!("{secs} 秒"),
        }
    );
    info!("   内存上限: {}", tunables.memory_limit);
    info!("   备份保留天数: {}", tunables.backup_retention_days);
    info!(
        "   进度日志: {}",
        if tunables.enable_logging { "启用" } else { "禁用" }
    );

    info!("🔌 存储协议");
    let manager = context.config_manager();
    for protocol in context.registry.protocols() {
        let state = match manager
            .storage_settings(&protocol, &context.default_backup_dir)
            .await
        {
            Ok(settings) if settings.host.is_empty() => settings
                .storage_path
                .map(|path| format!("目录 {path}"))
                .unwrap_or_else(|| "已配置".to_string()),
            Ok(settings) => format!("{}@{}", settings.username, settings.host),
            Err(_) => "未配置".to_string(),
        };
        info!("   {:<8} {}", protocol, state);
    }
    Ok(())
}

/// 从 JSON 文件读取协议连接参数并保存
pub async fn set_storage_from_file(app: &CliApp, protocol: &str, file: &Path) -> Result<()> {
    let protocol = protocol.trim().to_lowercase();
    let context = app.orchestrator.context();
    if !context.registry.contains(&protocol) {
        return Err(MoverError::UnsupportedProtocol(protocol));
    }

    let content = tokio::fs::read_to_string(file).await?;
    let settings: StorageSettings = serde_json::from_str(&content)?;
    context
        .config_manager()
        .set_storage_settings(&protocol, &settings)
        .await?;

    info!("✅ 已保存 {} 的连接参数", protocol);
    info!("💡 运行 'site-mover test-connection {}' 验证连接", protocol);
    Ok(())
}
