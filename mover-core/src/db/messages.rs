use crate::Result;
use tokio::sync::oneshot;

use super::models::OperationRow;

/// DuckDB数据库操作消息
#[derive(Debug)]
pub enum DbMessage {
    /// 初始化数据库表
    InitTables {
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 获取配置值
    GetConfig {
        key: String,
        respond_to: oneshot::Sender<Result<Option<String>>>,
    },
    /// 设置配置值
    SetConfig {
        key: String,
        value: String,
        respond_to: oneshot::Sender<Result<()>>,
    },

    // ========== 操作记录 ==========
    /// 新建操作记录
    InsertOperation {
        kind: String,
        name: String,
        status: String,
        source: Option<String>,
        respond_to: oneshot::Sender<Result<i64>>,
    },
    /// 更新操作状态，终态记录拒绝变更
    UpdateStatus {
        id: i64,
        status: String,
        message: Option<String>,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 写入归档大小
    SetSize {
        id: i64,
        size_bytes: i64,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 写入存放位置（只允许一次）
    SetLocation {
        id: i64,
        location: String,
        respond_to: oneshot::Sender<Result<()>>,
    },
    /// 根据ID获取记录
    GetOperation {
        id: i64,
        respond_to: oneshot::Sender<Result<Option<OperationRow>>>,
    },
    /// 获取全部记录（按创建时间倒序）
    ListOperations {
        kind: Option<String>,
        status: Option<String>,
        respond_to: oneshot::Sender<Result<Vec<OperationRow>>>,
    },
    /// 删除记录
    DeleteOperation {
        id: i64,
        respond_to: oneshot::Sender<Result<bool>>,
    },
}
