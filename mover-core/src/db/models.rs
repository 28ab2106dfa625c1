use serde::{Deserialize, Serialize};

/// 操作记录的原始行，状态与时间均以字符串保存
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRow {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub status: String,
    pub size_bytes: Option<i64>,
    /// JSON 编码的存放位置
    pub location: Option<String>,
    pub error_message: Option<String>,
    pub source: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
}
