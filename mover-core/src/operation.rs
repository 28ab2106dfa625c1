use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MoverError;

/// 操作 ID（数据库自增）
pub type OperationId = i64;

/// 操作类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Export,
    Import,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Export => "export",
            Self::Import => "import",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = MoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "export" => Ok(Self::Export),
            "import" => Ok(Self::Import),
            other => Err(MoverError::custom(format!("未知的操作类型: {other}"))),
        }
    }
}

/// 操作状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// 终态之后不允许再变更
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationStatus {
    type Err = MoverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(MoverError::custom(format!("未知的操作状态: {other}"))),
        }
    }
}

/// 归档存放位置，上传成功后写入且只写一次
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocationDescriptor {
    pub protocol: String,
    pub remote_path: String,
    pub local_cache_path: Option<String>,
}

/// 一次导出或导入的记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub kind: OperationKind,
    pub name: String,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub size_bytes: Option<u64>,
    pub location: Option<LocationDescriptor>,
    pub error_message: Option<String>,
    /// 导入来源的描述（操作 ID 或路径）
    pub source: Option<String>,
}

/// 新建操作记录时的参数
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub kind: OperationKind,
    pub name: String,
    pub status: OperationStatus,
    pub source: Option<String>,
}

/// 列表查询条件，结果按创建时间倒序
#[derive(Debug, Clone, Default)]
pub struct OperationFilter {
    pub kind: Option<OperationKind>,
    pub status: Option<OperationStatus>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl OperationFilter {
    pub fn kind(kind: OperationKind) -> Self {
        Self {
            kind: Some(kind),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: OperationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// 记录是否满足过滤条件（不含 limit）
    pub fn matches(&self, operation: &Operation) -> bool {
        self.kind.is_none_or(|kind| kind == operation.kind)
            && self.status.is_none_or(|status| status == operation.status)
            && self
                .created_before
                .is_none_or(|cutoff| operation.created_at < cutoff)
    }
}
