use crate::db::{DuckDbManager, OperationRow};
use crate::error::{MoverError, Result};
use crate::operation::{
    LocationDescriptor, NewOperation, Operation, OperationFilter, OperationId, OperationStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;

/// 键值配置存储
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// 操作记录存储，按操作 ID 追加与查询
///
/// 终态（Completed / Failed）记录拒绝任何状态变更，存放位置只允许写入一次。
#[async_trait]
pub trait OperationStore: Send + Sync {
    async fn insert(&self, operation: NewOperation) -> Result<OperationId>;
    async fn update_status(
        &self,
        id: OperationId,
        status: OperationStatus,
        message: Option<String>,
    ) -> Result<()>;
    async fn set_size(&self, id: OperationId, size_bytes: u64) -> Result<()>;
    async fn set_location(&self, id: OperationId, location: &LocationDescriptor) -> Result<()>;
    async fn get(&self, id: OperationId) -> Result<Option<Operation>>;
    async fn list(&self, filter: &OperationFilter) -> Result<Vec<Operation>>;
    async fn delete(&self, id: OperationId) -> Result<bool>;
}

/// 数据库管理器 - DuckDB适配器
#[derive(Debug, Clone)]
pub struct Database {
    manager: DuckDbManager,
}

impl Database {
    /// 连接到数据库
    pub async fn connect<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let manager = DuckDbManager::new(db_path).await?;
        Ok(Database { manager })
    }

    /// 连接到内存数据库 (主要用于测试)
    pub async fn connect_memory() -> Result<Self> {
        let manager = DuckDbManager::new_memory().await?;
        Ok(Database { manager })
    }

    /// 将数据库行转换为操作记录
    fn row_to_operation(row: OperationRow) -> Result<Operation> {
        let location = match row.location {
            Some(json) => Some(serde_json::from_str::<LocationDescriptor>(&json)?),
            None => None,
        };

        Ok(Operation {
            id: row.id,
            kind: row.kind.parse()?,
            name: row.name,
            status: row.status.parse()?,
            created_at: parse_timestamp(&row.created_at)?,
            completed_at: row
                .completed_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
            size_bytes: row.size_bytes.map(|size| size.max(0) as u64),
            location,
            error_message: row.error_message,
            source: row.source,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| MoverError::custom(format!("无效的时间戳 {value}: {e}")))
}

#[async_trait]
impl ConfigStore for Database {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.manager.get_config(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.manager.set_config(key, value).await
    }
}

#[async_trait]
impl OperationStore for Database {
    async fn insert(&self, operation: NewOperation) -> Result<OperationId> {
        self.manager
            .insert_operation(
                operation.kind.as_str(),
                &operation.name,
                operation.status.as_str(),
                operation.source,
            )
            .await
    }

    async fn update_status(
        &self,
        id: OperationId,
        status: OperationStatus,
        message: Option<String>,
    ) -> Result<()> {
        self.manager
            .update_status(id, status.as_str(), message)
            .await
    }

    async fn set_size(&self, id: OperationId, size_bytes: u64) -> Result<()> {
        let size = i64::try_from(size_bytes)
            .map_err(|_| MoverError::custom(format!("归档大小超出范围: {size_bytes}")))?;
        self.manager.set_size(id, size).await
    }

    async fn set_location(&self, id: OperationId, location: &LocationDescriptor) -> Result<()> {
        let json = serde_json::to_string(location)?;
        self.manager.set_location(id, json).await
    }

    async fn get(&self, id: OperationId) -> Result<Option<Operation>> {
        self.manager
            .get_operation(id)
            .await?
            .map(Self::row_to_operation)
            .transpose()
    }

    async fn list(&self, filter: &OperationFilter) -> Result<Vec<Operation>> {
        let rows = self
            .manager
            .list_operations(
                filter.kind.map(|kind| kind.as_str().to_string()),
                filter.status.map(|status| status.as_str().to_string()),
            )
            .await?;

        let mut operations = Vec::with_capacity(rows.len());
        for row in rows {
            let operation = Self::row_to_operation(row)?;
            if filter.matches(&operation) {
                operations.push(operation);
            }
        }

        if let Some(limit) = filter.limit {
            operations.truncate(limit);
        }
        Ok(operations)
    }

    async fn delete(&self, id: OperationId) -> Result<bool> {
        self.manager.delete_operation(id).await
    }
}
