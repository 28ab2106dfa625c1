/// 站点目录结构相关常量
pub mod site {
    use std::path::{Path, PathBuf};

    /// 站点根配置文件
    pub const ROOT_CONFIG_FILE: &str = "wp-config.php";

    /// 访问控制文件（重写规则）
    pub const ACCESS_CONTROL_FILE: &str = ".htaccess";

    /// 内容目录名
    pub const CONTENT_DIR_NAME: &str = "wp-content";

    /// 媒体上传目录名（位于内容目录下）
    pub const UPLOADS_DIR_NAME: &str = "uploads";

    /// 插件目录名（位于内容目录下）
    pub const PLUGINS_DIR_NAME: &str = "plugins";

    /// 主题目录名（位于内容目录下）
    pub const THEMES_DIR_NAME: &str = "themes";

    /// 缓存目录名，媒体备份时跳过
    pub const CACHE_DIR_NAME: &str = "cache";

    /// 默认站点根目录
    pub fn get_default_site_root() -> PathBuf {
        Path::new(".").join("site")
    }

    /// 默认站点数据库文件
    pub fn get_default_site_database() -> PathBuf {
        Path::new(".").join("site").join("site.duckdb")
    }
}

/// 归档相关常量
pub mod archive {
    /// 归档文件扩展名
    pub const ARCHIVE_EXTENSION: &str = "zip";

    /// 归档中的数据库导出文件名
    pub const DATABASE_DUMP_FILE: &str = "database.sql";

    /// 归档信息预览的最大条目数
    pub const PREVIEW_LIMIT: usize = 100;

    /// 导入时从远程下载的归档文件名
    pub const DOWNLOADED_ARCHIVE_NAME: &str = "backup.zip";

    /// 导入时解压目录名
    pub const EXTRACT_DIR_NAME: &str = "extracted";
}

/// 工作目录相关常量
pub mod workspace {
    use std::path::{Path, PathBuf};

    /// 导出临时目录前缀
    pub const EXPORT_SCRATCH_PREFIX: &str = "temp-";

    /// 导入临时目录前缀
    pub const IMPORT_SCRATCH_PREFIX: &str = "temp-import-";

    /// 遗留临时目录的最大保留时间（秒）
    pub const STALE_SCRATCH_SECS: u64 = 3600;

    /// 默认工作目录（临时目录与本地归档缓存）
    pub fn get_default_work_dir() -> PathBuf {
        Path::new(".").join("data").join("work")
    }

    /// 默认本地备份存储目录
    pub fn get_default_backup_dir() -> PathBuf {
        Path::new(".").join("data").join("backups")
    }
}

/// 配置相关常量
pub mod config {
    use std::path::{Path, PathBuf};

    /// 默认配置文件名
    pub const CONFIG_FILE_NAME: &str = "mover.toml";

    /// 操作记录数据库文件名
    pub const DATABASE_FILE_NAME: &str = "mover.duckdb";

    /// 获取配置文件路径
    pub fn get_config_file_path() -> PathBuf {
        Path::new(".").join(CONFIG_FILE_NAME)
    }

    /// 获取操作记录数据库路径
    pub fn get_database_path() -> PathBuf {
        Path::new(".").join("data").join(DATABASE_FILE_NAME)
    }
}

/// 配置存储中的键名及默认值
pub mod tunables {
    /// 配置键前缀
    pub const KEY_PREFIX: &str = "mover.";

    /// 最大执行时间（秒），0 表示不限制
    pub const MAX_EXECUTION_TIME_KEY: &str = "mover.max_execution_time";
    pub const DEFAULT_MAX_EXECUTION_TIME: u64 = 1800;

    /// 内存上限
    pub const MEMORY_LIMIT_KEY: &str = "mover.memory_limit";
    pub const DEFAULT_MEMORY_LIMIT: &str = "512M";

    /// 备份保留天数
    pub const BACKUP_RETENTION_KEY: &str = "mover.backup_retention";
    pub const DEFAULT_BACKUP_RETENTION_DAYS: u32 = 30;

    /// 是否记录操作日志
    pub const ENABLE_LOGGING_KEY: &str = "mover.enable_logging";
    pub const DEFAULT_ENABLE_LOGGING: bool = true;

    /// 协议设置键名，例如 `mover.ftp_settings`
    pub fn protocol_settings_key(protocol: &str) -> String {
        format!("{KEY_PREFIX}{protocol}_settings")
    }
}

/// 进度相关常量
pub mod progress {
    use std::time::Duration;

    /// 进度记录的存活时间
    pub const RECORD_TTL: Duration = Duration::from_secs(60 * 60);

    /// 外部轮询的建议上限
    pub const POLL_CEILING: Duration = Duration::from_secs(30 * 60);

    /// 外部轮询间隔
    pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

    /// 尚无进度记录时的阶段名
    pub const INITIALIZING_STAGE: &str = "initializing";
}

/// 存储协议相关常量
pub mod protocol {
    /// 本地存储
    pub const LOCAL: &str = "local";

    /// FTP
    pub const FTP: &str = "ftp";

    /// SFTP
    pub const SFTP: &str = "sftp";

    /// FTP 默认端口
    pub const FTP_DEFAULT_PORT: u16 = 21;

    /// SFTP 默认端口
    pub const SFTP_DEFAULT_PORT: u16 = 22;

    /// 默认连接超时（秒）
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

    /// 本地存储连通性测试文件前缀
    pub const CHECK_FILE_PREFIX: &str = "test-";
}
