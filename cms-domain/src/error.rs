//! 领域层统一错误定义
//!
//! 命令校验失败分为两类：请求本身不合法（`InvalidCommand`，400）与
//! 状态冲突（`Conflict`，409）；追加事件时的版本冲突单独归为存储失败。
//!
use crate::entity::{AggregateId, UserId};
use thiserror::Error;
use uuid::Uuid;

pub const CODE_BAD_REQUEST: u16 = 400;
pub const CODE_CONFLICT: u16 = 409;

/// 聚合校验命令时给出的拒绝原因，由命令总线补全命令与聚合标识
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("conflict: {0}")]
    Conflict(String),
}

impl Rejection {
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest(reason.into())
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict(reason.into())
    }
}

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum DomainError {
    // --- 序列化/事件上抬 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error("upcast failed: type={event_type}, from_version={from_version}, reason={reason}")]
    UpcastFailed {
        event_type: String,
        from_version: usize,
        reason: String,
    },
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch { expected: String, found: String },

    // --- 仓储/持久化 ---
    #[error("event repository error: {reason}")]
    EventRepository { reason: String },
    #[error("snapshot repository error: {reason}")]
    SnapshotRepository { reason: String },
    #[error("version conflict on {aggregate_uuid}: expected={expected}, actual={actual}")]
    VersionConflict {
        aggregate_uuid: AggregateId,
        expected: usize,
        actual: usize,
    },
    #[error(
        "stale queue on {aggregate_uuid} for user {user_id}: based on v{base_version}, stream is at v{stream_version}"
    )]
    StaleQueue {
        aggregate_uuid: AggregateId,
        user_id: UserId,
        base_version: usize,
        stream_version: usize,
    },

    // --- 命令校验 ---
    #[error("invalid command {command_uuid} on {aggregate_uuid}: {reason}")]
    InvalidCommand {
        command_uuid: Uuid,
        aggregate_uuid: AggregateId,
        reason: String,
    },
    #[error("conflicting command {command_uuid} on {aggregate_uuid}: {reason}")]
    Conflict {
        command_uuid: Uuid,
        aggregate_uuid: AggregateId,
        reason: String,
    },

    #[error("not found: {reason}")]
    NotFound { reason: String },
}

impl DomainError {
    pub fn from_rejection(
        rejection: Rejection,
        command_uuid: Uuid,
        aggregate_uuid: AggregateId,
    ) -> Self {
        match rejection {
            Rejection::BadRequest(reason) => Self::InvalidCommand {
                command_uuid,
                aggregate_uuid,
                reason,
            },
            Rejection::Conflict(reason) => Self::Conflict {
                command_uuid,
                aggregate_uuid,
                reason,
            },
        }
    }

    /// 面向展示层的消息码；基础设施类错误没有对应码
    pub fn code(&self) -> Option<u16> {
        match self {
            Self::InvalidCommand { .. } => Some(CODE_BAD_REQUEST),
            Self::Conflict { .. } | Self::StaleQueue { .. } => Some(CODE_CONFLICT),
            _ => None,
        }
    }

    /// 追加竞争失败：调用方可重新读取当前版本后重试整条命令
    pub fn is_store_conflict(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

/// 统一 Result 类型别名
pub type DomainResult<T> = Result<T, DomainError>;

impl From<uuid::Error> for DomainError {
    fn from(err: uuid::Error) -> Self {
        DomainError::Parse {
            reason: err.to_string(),
        }
    }
}
