use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 操作类型过滤
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Export,
    Import,
}

/// 操作状态过滤
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Pending,
    Running,
    Completed,
    Failed,
}

/// 运行时设置相关命令
#[derive(Subcommand, Debug)]
pub enum SettingsCommand {
    /// 显示运行参数与已配置的协议
    Show,
    /// 从 JSON 文件写入协议连接参数
    SetStorage {
        /// 协议名称，例如 ftp、sftp、local
        protocol: String,
        /// 包含连接参数的 JSON 文件
        #[arg(long)]
        file: PathBuf,
    },
    /// 设置最大执行时间（秒），0 表示不限制
    MaxExecutionTime { seconds: u64 },
    /// 设置内存上限，例如 512M、1G
    MemoryLimit { limit: String },
    /// 设置备份保留天数
    Retention { days: u32 },
    /// 启用或禁用进度日志
    Logging {
        /// true 启用，false 禁用
        #[arg(action = clap::ArgAction::Set)]
        enabled: bool,
    },
}

/// Site Mover - 站点备份、迁移与恢复工具
#[derive(Parser)]
#[command(name = "site-mover")]
#[command(about = "站点备份、迁移与恢复工具")]
#[command(version)]
pub struct Cli {
    /// 配置文件路径，未指定时依次查找 mover.toml、.mover.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 详细输出
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 创建配置文件、工作目录与记录数据库
    Init {
        /// 如果配置文件已存在，强制覆盖
        #[arg(long)]
        force: bool,
    },
    /// 导出站点为归档并上传到存储
    Export {
        /// 备份名称，默认按时间生成
        #[arg(long)]
        name: Option<String>,
        /// 存储协议
        #[arg(long, default_value = "local")]
        protocol: String,
        #[arg(long)]
        no_database: bool,
        #[arg(long)]
        no_media: bool,
        #[arg(long)]
        no_plugins: bool,
        #[arg(long)]
        no_themes: bool,
        /// 不压缩，仅存储
        #[arg(long)]
        store: bool,
        /// 不显示进度条，直接等待完成
        #[arg(long)]
        no_progress: bool,
    },
    /// 从备份恢复站点
    Import {
        /// 来源导出操作 ID
        #[arg(long, conflicts_with = "path")]
        from: Option<i64>,
        /// 来源归档路径（本地路径或远程路径）
        #[arg(long)]
        path: Option<PathBuf>,
        /// 来源路径所在的存储协议
        #[arg(long, default_value = "local")]
        protocol: String,
        /// 不导入数据库
        #[arg(long)]
        skip_database: bool,
        /// 不恢复站点文件
        #[arg(long)]
        skip_files: bool,
        /// 不显示进度条，直接等待完成
        #[arg(long)]
        no_progress: bool,
    },
    /// 列出操作记录
    List {
        #[arg(long, value_enum)]
        kind: Option<KindArg>,
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// 删除操作记录及其归档
    Delete {
        id: i64,
    },
    /// 查看操作进度
    Progress {
        id: i64,
        /// 持续刷新直到结束
        #[arg(long)]
        watch: bool,
    },
    /// 测试存储协议连接
    TestConnection {
        #[arg(default_value = "local")]
        protocol: String,
    },
    /// 显示归档信息
    ArchiveInfo {
        path: PathBuf,
    },
    /// 校验归档完整性
    Verify {
        path: PathBuf,
    },
    /// 清理过期备份与遗留临时目录
    Cleanup,
    /// 运行时设置
    #[command(subcommand)]
    Settings(SettingsCommand),
}
