//! 静默队列统一错误定义
//!
//! 聚焦序列化/反序列化、存储、事件处理器与提交失败等最小必要集合，
//! 便于在宿主侧统一转换为 `SilentError`。
//!
use crate::transport::SubmitError;
use std::fmt;
use thiserror::Error;

/// 统一错误类型（引擎最小必要集）
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SilentError {
    // --- 序列化/反序列化 ---
    #[error("serialization error: {source}")]
    Serde {
        #[from]
        source: serde_json::Error,
    },
    #[error("invalid pattern: {source}")]
    Pattern {
        #[from]
        source: regex::Error,
    },
    #[error("parse error: {reason}")]
    Parse { reason: String },
    #[error("value not serializable: {reason}")]
    Serialize { reason: String },
    #[error("unknown serializer: name={name}")]
    UnknownSerializer { name: String },

    // --- 存储 ---
    #[error("storage error: {reason}")]
    Storage { reason: String },

    // --- 事件系统 ---
    #[error("event handler error: event={event}, reason={reason}")]
    EventHandler { event: String, reason: String },

    // --- 提交/引擎 ---
    #[error("submit failed: {0}")]
    Submit(#[from] SubmitError),
    #[error("silent queue already booted")]
    AlreadyBooted,
    #[error("not found: {reason}")]
    NotFound { reason: String },
}

impl SilentError {
    pub fn storage(reason: impl Into<String>) -> Self {
        SilentError::Storage {
            reason: reason.into(),
        }
    }

    pub fn event_handler(event: impl fmt::Display, reason: impl fmt::Display) -> Self {
        SilentError::EventHandler {
            event: event.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn serialize(reason: impl Into<String>) -> Self {
        SilentError::Serialize {
            reason: reason.into(),
        }
    }
}

/// 统一 Result 类型别名
pub type SilentResult<T> = Result<T, SilentError>;

impl From<chrono::ParseError> for SilentError {
    fn from(err: chrono::ParseError) -> Self {
        SilentError::Parse {
            reason: err.to_string(),
        }
    }
}
