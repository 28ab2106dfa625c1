use thiserror::Error;

pub type Result<T> = std::result::Result<T, MoverError>;

#[derive(Error, Debug)]
pub enum MoverError {
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("不支持的协议: {0}")]
    UnsupportedProtocol(String),

    #[error("无法创建临时目录: {0}")]
    ScratchDir(String),

    #[error("无法创建归档: {0}")]
    ArchiveWrite(String),

    #[error("归档创建不完整: {0}")]
    ArchiveIncomplete(String),

    #[error("归档文件不存在: {0}")]
    ArchiveNotFound(String),

    #[error("无法打开归档: {0}")]
    ArchiveOpen(String),

    #[error("归档解压失败: {0}")]
    ArchiveExtract(String),

    #[error("源文件不存在: {0}")]
    SourceNotFound(String),

    #[error("文件不存在: {0}")]
    NotFound(String),

    #[error("传输失败: {0}")]
    Transfer(String),

    #[error("数据库导出失败: {0}")]
    DatabaseExport(String),

    #[error("数据库导入失败: {0}")]
    DatabaseImport(String),

    #[error("备份中缺少数据库文件: {0}")]
    MissingDatabaseDump(String),

    #[error("操作记录不存在: {0}")]
    OperationNotFound(i64),

    #[error("操作 {id} 已处于终态 {status}，不允许再变更")]
    TerminalState { id: i64, status: String },

    #[error("执行超时: 超过 {0} 秒")]
    Timeout(u64),

    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("DuckDB数据库错误: {0}")]
    DuckDb(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("任务执行错误: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("ZIP 文件错误: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("目录遍历错误: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("路径错误: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("自定义错误: {0}")]
    Custom(String),
}

/// 错误分类，对应对外暴露的错误体系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Resource,
    Transfer,
    Database,
    Archive,
    Configuration,
    Internal,
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Resource => "resource",
            Self::Transfer => "transfer",
            Self::Database => "database",
            Self::Archive => "archive",
            Self::Configuration => "configuration",
            Self::Internal => "internal",
        };
        f.write_str(name)
    }
}

// 为DuckDB错误实现From trait
impl From<duckdb::Error> for MoverError {
    fn from(err: duckdb::Error) -> Self {
        MoverError::DuckDb(err.to_string())
    }
}

impl MoverError {
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transfer(msg: impl Into<String>) -> Self {
        Self::Transfer(msg.into())
    }

    pub fn database_export(msg: impl Into<String>) -> Self {
        Self::DatabaseExport(msg.into())
    }

    pub fn database_import(msg: impl Into<String>) -> Self {
        Self::DatabaseImport(msg.into())
    }

    /// 返回错误所属的分类
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation(_) | Self::OperationNotFound(_) | Self::TerminalState { .. } => {
                ErrorClass::Validation
            }
            Self::UnsupportedProtocol(_) | Self::Config(_) => ErrorClass::Configuration,
            Self::ScratchDir(_)
            | Self::SourceNotFound(_)
            | Self::NotFound(_)
            | Self::Io(_)
            | Self::WalkDir(_)
            | Self::StripPrefix(_)
            | Self::Timeout(_) => ErrorClass::Resource,
            Self::Transfer(_) => ErrorClass::Transfer,
            Self::DatabaseExport(_)
            | Self::DatabaseImport(_)
            | Self::MissingDatabaseDump(_)
            | Self::DuckDb(_) => ErrorClass::Database,
            Self::ArchiveWrite(_)
            | Self::ArchiveIncomplete(_)
            | Self::ArchiveNotFound(_)
            | Self::ArchiveOpen(_)
            | Self::ArchiveExtract(_)
            | Self::Zip(_) => ErrorClass::Archive,
            Self::Serde(_) | Self::Join(_) | Self::Custom(_) => ErrorClass::Internal,
        }
    }
}
