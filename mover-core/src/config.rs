use crate::constants::{config, site, tunables, workspace};
use crate::error::Result;
use crate::site::SiteLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 应用配置结构
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub storage: StorageConfig,
    /// 首次初始化时写入配置存储的默认值
    #[serde(default)]
    pub tunables: TunablesConfig,
}

/// 站点相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SiteConfig {
    /// 站点根目录（包含根配置文件与内容目录）
    pub root: String,
    /// 内容目录，为空时使用根目录下的 wp-content
    #[serde(default)]
    pub content_dir: Option<String>,
    /// 站点数据库文件
    pub database: String,
}

/// 运行参数默认值
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct TunablesConfig {
    /// 最大执行时间（秒），0 表示不限制
    pub max_execution_time: u64,
    pub memory_limit: String,
    /// 备份保留天数
    pub backup_retention: u32,
    pub enable_logging: bool,
}

impl Default for TunablesConfig {
    fn default() -> Self {
        Self {
            max_execution_time: tunables::DEFAULT_MAX_EXECUTION_TIME,
            memory_limit: tunables::DEFAULT_MEMORY_LIMIT.to_string(),
            backup_retention: tunables::DEFAULT_BACKUP_RETENTION_DAYS,
            enable_logging: tunables::DEFAULT_ENABLE_LOGGING,
        }
    }
}

/// 存储相关配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConfig {
    /// 工作目录：临时目录与本地归档缓存
    pub work_dir: String,
    /// 本地协议的默认存储目录
    pub backup_dir: String,
    /// 操作记录数据库文件
    pub database: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            site: SiteConfig {
                root: site::get_default_site_root().to_string_lossy().to_string(),
                content_dir: None,
                database: site::get_default_site_database()
                    .to_string_lossy()
                    .to_string(),
            },
            storage: StorageConfig {
                work_dir: workspace::get_default_work_dir()
                    .to_string_lossy()
                    .to_string(),
                backup_dir: workspace::get_default_backup_dir()
                    .to_string_lossy()
                    .to_string(),
                database: config::get_database_path().to_string_lossy().to_string(),
            },
            tunables: TunablesConfig::default(),
        }
    }
}

impl AppConfig {
    /// 智能查找并加载配置文件
    /// 按优先级查找：mover.toml -> .mover.toml
    pub fn find_and_load_config() -> Result<Self> {
        let config_files = [config::CONFIG_FILE_NAME, ".mover.toml"];

        for config_file in &config_files {
            if Path::new(config_file).exists() {
                tracing::info!("找到配置文件: {}", config_file);
                return Self::load_from_file(config_file);
            }
        }

        // 如果没找到配置文件，创建默认配置
        tracing::warn!("未找到配置文件，创建默认配置: {}", config::CONFIG_FILE_NAME);
        let default_config = Self::default();
        default_config.save_to_file(config::CONFIG_FILE_NAME)?;
        Ok(default_config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: AppConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = self.to_toml_with_comments();
        fs::write(&path, content)?;
        Ok(())
    }

    /// 生成带注释的TOML配置
    fn to_toml_with_comments(&self) -> String {
        const TEMPLATE: &str = include_str!("../templates/mover.toml.template");

        TEMPLATE
            .replace("{site_root}", &escape_toml(&self.site.root))
            .replace("{site_database}", &escape_toml(&self.site.database))
            .replace("{work_dir}", &escape_toml(&self.storage.work_dir))
            .replace("{backup_dir}", &escape_toml(&self.storage.backup_dir))
            .replace("{record_database}", &escape_toml(&self.storage.database))
            .replace(
                "{content_dir}",
                &self
                    .site
                    .content_dir
                    .as_deref()
                    .map(|dir| format!("content_dir = \"{}\"", escape_toml(dir)))
                    .unwrap_or_else(|| "# content_dir = \"./site/wp-content\"".to_string()),
            )
            .replace(
                "{max_execution_time}",
                &self.tunables.max_execution_time.to_string(),
            )
            .replace("{memory_limit}", &escape_toml(&self.tunables.memory_limit))
            .replace(
                "{backup_retention}",
                &self.tunables.backup_retention.to_string(),
            )
            .replace("{enable_logging}", &self.tunables.enable_logging.to_string())
    }

    /// 确保工作目录存在
    pub fn ensure_work_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.storage.work_dir)?;
        fs::create_dir_all(&self.storage.backup_dir)?;
        Ok(())
    }

    /// 获取站点目录布局
    pub fn site_layout(&self) -> SiteLayout {
        let layout = SiteLayout::new(PathBuf::from(&self.site.root));
        match self.site.content_dir.as_deref().filter(|dir| !dir.is_empty()) {
            Some(dir) => layout.with_content_dir(dir),
            None => layout,
        }
    }

    /// 获取工作目录路径
    pub fn get_work_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.work_dir)
    }

    /// 获取本地备份目录路径
    pub fn get_backup_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.backup_dir)
    }
}

/// 模板中的路径写在双引号字符串里，Windows 路径需要转义反斜杠
fn escape_toml(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("mover.toml");

        let mut config = AppConfig::default();
        config.site.root = "/srv/www/example".to_string();
        config.storage.backup_dir = "C:\\backups\\site".to_string();
        config.tunables.memory_limit = "1G".to_string();
        config.save_to_file(&path).unwrap();

        let loaded = AppConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.site.root, "/srv/www/example");
        assert_eq!(loaded.storage.backup_dir, "C:\\backups\\site");
        assert_eq!(loaded.storage.work_dir, config.storage.work_dir);
        assert_eq!(loaded.site.content_dir, None);
        assert_eq!(loaded.tunables.memory_limit, "1G");
        assert_eq!(loaded.tunables.backup_retention, 30);
    }

    #[test]
    fn test_missing_tunables_section_uses_defaults() {
        let content = r#"
[site]
root = "/srv/www"
database = "/srv/www/site.duckdb"

[storage]
work_dir = "/var/lib/mover/work"
backup_dir = "/var/lib/mover/backups"
database = "/var/lib/mover/mover.duckdb"
"#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert_eq!(config.tunables, TunablesConfig::default());
    }

    #[test]
    fn test_custom_content_dir() {
        let mut config = AppConfig::default();
        config.site.root = "/srv/www".to_string();
        config.site.content_dir = Some("/data/content".to_string());
        assert_eq!(
            config.site_layout().uploads_dir(),
            PathBuf::from("/data/content/uploads")
        );
    }

    #[test]
    fn test_site_layout_from_config() {
        let mut config = AppConfig::default();
        config.site.root = "/srv/www/example".to_string();
        let layout = config.site_layout();
        assert_eq!(
            layout.content_dir(),
            PathBuf::from("/srv/www/example").join("wp-content")
        );
    }
}
