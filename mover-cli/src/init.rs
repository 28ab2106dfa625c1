use mover_core::config_manager::ConfigManager;
use mover_core::database::Database;
use mover_core::storage::ProtocolRegistry;
use mover_core::{AppConfig, error::Result};
use std::path::Path;
use tracing::{info, warn};

/// 运行独立的初始化流程
pub async fn run_init(config_path: &Path, force: bool) -> Result<()> {
    info!("📦 Site Mover 初始化");
    info!("======================");

    if !force && config_path.exists() {
        warn!("⚠️  检测到已存在的配置文件: {}", config_path.display());
        info!("如果您要重新初始化，请使用 --force 参数");
        info!("示例: site-mover init --force");
        return Ok(());
    }

    info!("📋 步骤 1: 创建配置文件和目录结构");

    let config = AppConfig::default();
    config.save_to_file(config_path)?;
    info!("   ✅ 创建配置文件: {}", config_path.display());

    config.ensure_work_dirs()?;
    info!("   ✅ 创建目录结构:");
    info!("      - {}   (工作目录与归档缓存)", config.storage.work_dir);
    info!("      - {}   (本地备份存储目录)", config.storage.backup_dir);

    info!("📋 步骤 2: 初始化记录数据库");

    let database = Database::connect(&config.storage.database).await?;
    info!("   ✅ 创建DuckDB数据库: {}", config.storage.database);

    let seeded = ConfigManager::new(&database)
        .seed_defaults(&config.tunables)
        .await?;
    info!("   ✅ 写入 {} 项运行参数默认值", seeded);

    let protocols = ProtocolRegistry::with_defaults().protocols();
    info!("   ✅ 可用存储协议: {}", protocols.join(", "));

    info!("🎉 初始化完成！");
    info!("");
    info!("📝 接下来的步骤:");
    info!("   1️⃣  编辑 {} 设置站点根目录与站点数据库", config_path.display());
    info!("   2️⃣  运行 'site-mover test-connection local' 检查本地存储");
    info!("   3️⃣  运行 'site-mover export' 创建第一个备份");
    info!("");
    info!("💡 提示:");
    info!("   - 远程存储: 'site-mover settings set-storage sftp --file sftp.json'");
    info!("   - 使用 'site-mover --help' 查看所有可用命令");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_keeps_existing_config_without_force() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("mover.toml");
        std::fs::write(&path, "# custom").unwrap();

        run_init(&path, false).await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# custom");
    }
}
