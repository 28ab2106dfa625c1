use crate::{MoverError, Result};
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

use super::actor::DuckDbActor;
use super::messages::DbMessage;
use super::models::OperationRow;

/// DuckDB数据库管理器
#[derive(Debug, Clone)]
pub struct DuckDbManager {
    sender: mpsc::Sender<DbMessage>,
}

impl DuckDbManager {
    /// 创建新的DuckDB管理器
    pub async fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // 确保数据库文件的父目录存在
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let actor = DuckDbActor::new(db_path)?;
        Self::start(actor).await
    }

    /// 创建内存数据库管理器
    pub async fn new_memory() -> Result<Self> {
        let actor = DuckDbActor::new_memory()?;
        Self::start(actor).await
    }

    /// 启动Actor并初始化数据库表
    async fn start(actor: DuckDbActor) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(100);
        tokio::spawn(actor.run(receiver));

        let manager = Self { sender };
        manager
            .request(|respond_to| DbMessage::InitTables { respond_to })
            .await?;

        Ok(manager)
    }

    /// 发送消息并等待Actor响应
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T>>) -> DbMessage,
    ) -> Result<T> {
        let (respond_to, receiver) = oneshot::channel();

        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| MoverError::custom("数据库Actor已关闭"))?;

        receiver
            .await
            .map_err(|_| MoverError::custom("数据库Actor未返回响应"))?
    }

    /// 获取配置值
    pub async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.request(|respond_to| DbMessage::GetConfig { key, respond_to })
            .await
    }

    /// 设置配置值
    pub async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.request(|respond_to| DbMessage::SetConfig {
            key,
            value,
            respond_to,
        })
        .await
    }

    /// 新建操作记录
    pub async fn insert_operation(
        &self,
        kind: &str,
        name: &str,
        status: &str,
        source: Option<String>,
    ) -> Result<i64> {
        let kind = kind.to_string();
        let name = name.to_string();
        let status = status.to_string();
        self.request(|respond_to| DbMessage::InsertOperation {
            kind,
            name,
            status,
            source,
            respond_to,
        })
        .await
    }

    /// 更新操作状态
    pub async fn update_status(&self, id: i64, status: &str, message: Option<String>) -> Result<()> {
        let status = status.to_string();
        self.request(|respond_to| DbMessage::UpdateStatus {
            id,
            status,
            message,
            respond_to,
        })
        .await
    }

    /// 写入归档大小
    pub async fn set_size(&self, id: i64, size_bytes: i64) -> Result<()> {
        self.request(|respond_to| DbMessage::SetSize {
            id,
            size_bytes,
            respond_to,
        })
        .await
    }

    /// 写入存放位置
    pub async fn set_location(&self, id: i64, location: String) -> Result<()> {
        self.request(|respond_to| DbMessage::SetLocation {
            id,
            location,
            respond_to,
        })
        .await
    }

    /// 根据ID获取记录
    pub async fn get_operation(&self, id: i64) -> Result<Option<OperationRow>> {
        self.request(|respond_to| DbMessage::GetOperation { id, respond_to })
            .await
    }

    /// 按条件列出记录
    pub async fn list_operations(
        &self,
        kind: Option<String>,
        status: Option<String>,
    ) -> Result<Vec<OperationRow>> {
        self.request(|respond_to| DbMessage::ListOperations {
            kind,
            status,
            respond_to,
        })
        .await
    }

    /// 删除记录
    pub async fn delete_operation(&self, id: i64) -> Result<bool> {
        self.request(|respond_to| DbMessage::DeleteOperation { id, respond_to })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_config_round_trip() {
        let manager = DuckDbManager::new_memory().await.unwrap();

        assert_eq!(manager.get_config("mover.memory_limit").await.unwrap(), None);
        manager.set_config("mover.memory_limit", "256M").await.unwrap();
        manager.set_config("mover.memory_limit", "1G").await.unwrap();
        assert_eq!(
            manager.get_config("mover.memory_limit").await.unwrap(),
            Some("1G".to_string())
        );
    }

    #[tokio::test]
    async fn test_terminal_status_is_final() {
        let manager = DuckDbManager::new_memory().await.unwrap();
        let id = manager
            .insert_operation("export", "nightly", "running", None)
            .await
            .unwrap();

        manager.update_status(id, "completed", None).await.unwrap();
        let err = manager
            .update_status(id, "failed", Some("late".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, MoverError::TerminalState { .. }));

        let row = manager.get_operation(id).await.unwrap().unwrap();
        assert_eq!(row.status, "completed");
        assert!(row.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_location_written_once() {
        let manager = DuckDbManager::new_memory().await.unwrap();
        let id = manager
            .insert_operation("export", "nightly", "running", None)
            .await
            .unwrap();

        manager
            .set_location(id, "{\"protocol\":\"local\"}".to_string())
            .await
            .unwrap();
        assert!(
            manager
                .set_location(id, "{\"protocol\":\"ftp\"}".to_string())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_list_newest_first_with_filter() {
        let manager = DuckDbManager::new_memory().await.unwrap();
        let first = manager
            .insert_operation("export", "a", "pending", None)
            .await
            .unwrap();
        let second = manager
            .insert_operation("import", "b", "pending", Some("#1".to_string()))
            .await
            .unwrap();
        let third = manager
            .insert_operation("export", "c", "pending", None)
            .await
            .unwrap();

        let all = manager.list_operations(None, None).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|row| row.id).collect();
        assert_eq!(ids, vec![third, second, first]);

        let exports = manager
            .list_operations(Some("export".to_string()), None)
            .await
            .unwrap();
        assert_eq!(exports.len(), 2);

        assert!(manager.delete_operation(second).await.unwrap());
        assert!(!manager.delete_operation(second).await.unwrap());
    }
}
