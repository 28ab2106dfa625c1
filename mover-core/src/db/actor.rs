use crate::Result;
use crate::error::MoverError;
use crate::operation::OperationStatus;
use chrono::{SecondsFormat, Utc};
use duckdb::{Connection, params, params_from_iter};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::messages::DbMessage;
use super::models::OperationRow;

const OPERATION_COLUMNS: &str = "id, kind, name, status, size_bytes, location, error_message, source, created_at, completed_at";

/// DuckDB Actor - 确保单线程访问DuckDB
pub struct DuckDbActor {
    connection: Connection,
}

impl DuckDbActor {
    /// 创建新的DuckDB Actor
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let connection = Connection::open(db_path)?;
        Ok(Self { connection })
    }

    /// 创建内存DuckDB Actor
    pub fn new_memory() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        Ok(Self { connection })
    }

    /// 运行Actor消息循环
    pub async fn run(mut self, mut receiver: mpsc::Receiver<DbMessage>) {
        info!("DuckDB Actor 已启动");

        while let Some(message) = receiver.recv().await {
            self.handle_message(message);
        }

        info!("DuckDB Actor 已关闭");
    }

    /// 处理数据库消息
    fn handle_message(&mut self, message: DbMessage) {
        match message {
            DbMessage::InitTables { respond_to } => {
                let _ = respond_to.send(self.init_tables());
            }
            DbMessage::GetConfig { key, respond_to } => {
                let _ = respond_to.send(self.get_config(&key));
            }
            DbMessage::SetConfig {
                key,
                value,
                respond_to,
            } => {
                let _ = respond_to.send(self.set_config(&key, &value));
            }
            DbMessage::InsertOperation {
                kind,
                name,
                status,
                source,
                respond_to,
            } => {
                let result = self.insert_operation(&kind, &name, &status, source.as_deref());
                let _ = respond_to.send(result);
            }
            DbMessage::UpdateStatus {
                id,
                status,
                message,
                respond_to,
            } => {
                let result = self.update_status(id, &status, message.as_deref());
                let _ = respond_to.send(result);
            }
            DbMessage::SetSize {
                id,
                size_bytes,
                respond_to,
            } => {
                let _ = respond_to.send(self.set_size(id, size_bytes));
            }
            DbMessage::SetLocation {
                id,
                location,
                respond_to,
            } => {
                let _ = respond_to.send(self.set_location(id, &location));
            }
            DbMessage::GetOperation { id, respond_to } => {
                let _ = respond_to.send(self.get_operation(id));
            }
            DbMessage::ListOperations {
                kind,
                status,
                respond_to,
            } => {
                let result = self.list_operations(kind.as_deref(), status.as_deref());
                let _ = respond_to.send(result);
            }
            DbMessage::DeleteOperation { id, respond_to } => {
                let _ = respond_to.send(self.delete_operation(id));
            }
        }
    }

    /// 初始化数据库表
    fn init_tables(&mut self) -> Result<()> {
        debug!("正在初始化DuckDB表...");

        // 读取并执行SQL初始化脚本
        let sql_content = include_str!("../../migrations/init_duckdb.sql");

        // 脚本只包含建表语句，按分号分割即可
        for statement in sql_content.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                self.connection.execute(trimmed, [])?;
            }
        }

        info!("DuckDB表初始化完成");
        Ok(())
    }

    /// 获取配置值
    fn get_config(&mut self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .connection
            .prepare("SELECT config_value FROM app_config WHERE config_key = ?")?;
        let mut rows = stmt.query(params![key])?;

        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    /// 设置配置值
    fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        let now = now_timestamp();
        // 首先尝试更新现有配置
        let updated = self.connection.execute(
            "UPDATE app_config SET config_value = ?, updated_at = ? WHERE config_key = ?",
            params![value, now, key],
        )?;

        // 如果没有更新任何行，则插入新配置
        if updated == 0 {
            self.connection.execute(
                "INSERT INTO app_config (config_key, config_value, updated_at) VALUES (?, ?, ?)",
                params![key, value, now],
            )?;
        }
        Ok(())
    }

    /// 新建操作记录
    fn insert_operation(
        &mut self,
        kind: &str,
        name: &str,
        status: &str,
        source: Option<&str>,
    ) -> Result<i64> {
        // 插入记录，让数据库自动生成ID
        self.connection.execute(
            "INSERT INTO operations (kind, name, status, source, created_at)
             VALUES (?, ?, ?, ?, ?)",
            params![kind, name, status, source, now_timestamp()],
        )?;

        // 获取最后插入的ID
        let id: i64 = self
            .connection
            .query_row("SELECT currval('operation_id_seq')", [], |row| row.get(0))?;

        debug!("新建操作记录: id={}, kind={}, name={}", id, kind, name);
        Ok(id)
    }

    /// 读取当前状态，记录不存在时报错
    fn current_status(&mut self, id: i64) -> Result<OperationStatus> {
        let mut stmt = self
            .connection
            .prepare("SELECT status FROM operations WHERE id = ?")?;
        let mut rows = stmt.query(params![id])?;

        match rows.next()? {
            Some(row) => row.get::<_, String>(0)?.parse(),
            None => Err(MoverError::OperationNotFound(id)),
        }
    }

    /// 更新操作状态
    fn update_status(&mut self, id: i64, status: &str, message: Option<&str>) -> Result<()> {
        let current = self.current_status(id)?;
        if current.is_terminal() {
            return Err(MoverError::TerminalState {
                id,
                status: current.to_string(),
            });
        }

        let next: OperationStatus = status.parse()?;
        if next.is_terminal() {
            self.connection.execute(
                "UPDATE operations SET status = ?, error_message = ?, completed_at = ? WHERE id = ?",
                params![status, message, now_timestamp(), id],
            )?;
        } else {
            self.connection.execute(
                "UPDATE operations SET status = ?, error_message = ? WHERE id = ?",
                params![status, message, id],
            )?;
        }
        Ok(())
    }

    /// 写入归档大小
    fn set_size(&mut self, id: i64, size_bytes: i64) -> Result<()> {
        let updated = self.connection.execute(
            "UPDATE operations SET size_bytes = ? WHERE id = ?",
            params![size_bytes, id],
        )?;
        if updated == 0 {
            return Err(MoverError::OperationNotFound(id));
        }
        Ok(())
    }

    /// 写入存放位置，已有位置时拒绝
    fn set_location(&mut self, id: i64, location: &str) -> Result<()> {
        let existing: Option<String> = {
            let mut stmt = self
                .connection
                .prepare("SELECT location FROM operations WHERE id = ?")?;
            let mut rows = stmt.query(params![id])?;
            match rows.next()? {
                Some(row) => row.get(0)?,
                None => return Err(MoverError::OperationNotFound(id)),
            }
        };

        if existing.is_some() {
            return Err(MoverError::custom(format!("操作 {id} 的存放位置已写入")));
        }

        self.connection.execute(
            "UPDATE operations SET location = ? WHERE id = ?",
            params![location, id],
        )?;
        Ok(())
    }

    /// 根据ID获取记录
    fn get_operation(&mut self, id: i64) -> Result<Option<OperationRow>> {
        let sql = format!("SELECT {OPERATION_COLUMNS} FROM operations WHERE id = ?");
        let mut stmt = self.connection.prepare(&sql)?;
        let mut rows = stmt.query(params![id])?;

        if let Some(row) = rows.next()? {
            Ok(Some(Self::map_row(row)?))
        } else {
            Ok(None)
        }
    }

    /// 按条件列出记录
    fn list_operations(
        &mut self,
        kind: Option<&str>,
        status: Option<&str>,
    ) -> Result<Vec<OperationRow>> {
        let mut conditions = Vec::new();
        let mut values = Vec::new();
        if let Some(kind) = kind {
            conditions.push("kind = ?");
            values.push(kind.to_string());
        }
        if let Some(status) = status {
            conditions.push("status = ?");
            values.push(status.to_string());
        }

        let mut sql = format!("SELECT {OPERATION_COLUMNS} FROM operations");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");

        let mut stmt = self.connection.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), Self::map_row)?;

        let mut operations = Vec::new();
        for row in rows {
            operations.push(row?);
        }
        Ok(operations)
    }

    /// 删除记录，返回是否存在
    fn delete_operation(&mut self, id: i64) -> Result<bool> {
        let deleted = self
            .connection
            .execute("DELETE FROM operations WHERE id = ?", params![id])?;
        Ok(deleted > 0)
    }

    fn map_row(row: &duckdb::Row<'_>) -> duckdb::Result<OperationRow> {
        Ok(OperationRow {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            status: row.get(3)?,
            size_bytes: row.get(4)?,
            location: row.get(5)?,
            error_message: row.get(6)?,
            source: row.get(7)?,
            created_at: row.get(8)?,
            completed_at: row.get(9)?,
        })
    }
}

/// 统一的时间戳格式，字典序与时间顺序一致
fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
