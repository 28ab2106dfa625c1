use crate::constants::progress::{INITIALIZING_STAGE, RECORD_TTL};
use crate::operation::{OperationId, OperationStatus};
use chrono::{DateTime, Utc};
use moka::Expiry;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// 单个操作的进度快照
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressRecord {
    pub operation_id: OperationId,
    /// 0..=100
    pub percent: u8,
    pub stage: String,
    pub message: String,
    pub updated_at: DateTime<Utc>,
}

/// 带 TTL 的进度存储
pub trait ProgressStore: Send + Sync {
    fn set(&self, id: OperationId, record: ProgressRecord, ttl: Duration);
    fn get(&self, id: OperationId) -> Option<ProgressRecord>;
    fn clear(&self, id: OperationId);
}

#[derive(Clone)]
struct ProgressEntry {
    record: ProgressRecord,
    ttl: Duration,
}

/// 每条记录按写入时携带的 TTL 过期，更新时重新计时
struct EntryTtl;

impl Expiry<OperationId, ProgressEntry> for EntryTtl {
    fn expire_after_create(
        &self,
        _key: &OperationId,
        value: &ProgressEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &OperationId,
        value: &ProgressEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// 基于 moka 的内存进度存储
pub struct MokaProgressStore {
    cache: Cache<OperationId, ProgressEntry>,
}

impl MokaProgressStore {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaProgressStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl ProgressStore for MokaProgressStore {
    fn set(&self, id: OperationId, record: ProgressRecord, ttl: Duration) {
        self.cache.insert(id, ProgressEntry { record, ttl });
    }

    fn get(&self, id: OperationId) -> Option<ProgressRecord> {
        self.cache.get(&id).map(|entry| entry.record)
    }

    fn clear(&self, id: OperationId) {
        self.cache.invalidate(&id);
    }
}

/// 进度跟踪器：保证同一操作的百分比单调不减
#[derive(Clone)]
pub struct ProgressTracker {
    store: Arc<dyn ProgressStore>,
    ttl: Duration,
}

impl ProgressTracker {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self {
            store,
            ttl: RECORD_TTL,
        }
    }

    /// 使用默认的 moka 存储
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MokaProgressStore::default()))
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// 写入进度，百分比被限制在 0..=100 且不低于上一次的值
    pub fn update(
        &self,
        id: OperationId,
        percent: u8,
        stage: &str,
        message: &str,
    ) -> ProgressRecord {
        let mut percent = percent.min(100);
        if let Some(previous) = self.store.get(id) {
            percent = percent.max(previous.percent);
        }

        let record = ProgressRecord {
            operation_id: id,
            percent,
            stage: stage.to_string(),
            message: message.to_string(),
            updated_at: Utc::now(),
        };
        self.store.set(id, record.clone(), self.ttl);
        record
    }

    pub fn snapshot(&self, id: OperationId) -> Option<ProgressRecord> {
        self.store.get(id)
    }

    pub fn clear(&self, id: OperationId) {
        self.store.clear(id);
    }

    /// 绑定到单个操作的上报句柄
    pub fn reporter(&self, id: OperationId, log_enabled: bool) -> ProgressReporter {
        ProgressReporter {
            tracker: self.clone(),
            id,
            log_enabled,
        }
    }
}

/// 流水线使用的进度上报句柄
#[derive(Clone)]
pub struct ProgressReporter {
    tracker: ProgressTracker,
    id: OperationId,
    log_enabled: bool,
}

impl ProgressReporter {
    pub fn report(&self, percent: u8, stage: &str, message: &str) {
        let record = self.tracker.update(self.id, percent, stage, message);
        if self.log_enabled {
            info!(
                operation_id = self.id,
                stage = stage,
                "[{}%] {}",
                record.percent,
                message
            );
        }
    }
}

/// 对外暴露的进度视图
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressView {
    pub operation_id: OperationId,
    pub percent: u8,
    pub stage: String,
    pub message: String,
    /// 操作记录的状态，记录不存在时为空
    pub status: Option<OperationStatus>,
}

impl ProgressView {
    /// 终态优先于缓存中的进度；无记录视为初始化中
    pub fn resolve(
        id: OperationId,
        status: Option<OperationStatus>,
        error_message: Option<&str>,
        record: Option<ProgressRecord>,
    ) -> Self {
        match status {
            Some(OperationStatus::Completed) => Self {
                operation_id: id,
                percent: 100,
                stage: "done".to_string(),
                message: "操作已完成".to_string(),
                status,
            },
            Some(OperationStatus::Failed) => Self {
                operation_id: id,
                percent: record.as_ref().map_or(0, |r| r.percent),
                stage: "failed".to_string(),
                message: error_message.unwrap_or("操作失败").to_string(),
                status,
            },
            _ => match record {
                Some(record) => Self {
                    operation_id: id,
                    percent: record.percent,
                    stage: record.stage,
                    message: record.message,
                    status,
                },
                None => Self {
                    operation_id: id,
                    percent: 0,
                    stage: INITIALIZING_STAGE.to_string(),
                    message: "正在初始化".to_string(),
                    status,
                },
            },
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(|status| status.is_terminal())
    }
}
