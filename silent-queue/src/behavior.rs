//! 提交行为（Behavior）与行为解析
//!
//! - `static`：直接调用传输层，不经过队列；
//! - `queue`：进入队列但不持久化；
//! - `silent`：进入队列并持久化，进程重启后恢复。
//!
//! 行为可以是固定值，也可以是在每次提交时求值的回调（例如根据网络状态切换）。
//!
use crate::error::SilentError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Behavior {
    Static,
    #[default]
    Queue,
    Silent,
}

impl Behavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            Behavior::Static => "static",
            Behavior::Queue => "queue",
            Behavior::Silent => "silent",
        }
    }

    pub fn is_queued(&self) -> bool {
        !matches!(self, Behavior::Static)
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, Behavior::Silent)
    }
}

impl fmt::Display for Behavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Behavior {
    type Err = SilentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static" => Ok(Behavior::Static),
            "queue" => Ok(Behavior::Queue),
            "silent" => Ok(Behavior::Silent),
            other => Err(SilentError::Parse {
                reason: format!("unknown behavior: {other}"),
            }),
        }
    }
}

/// 行为配置：固定值或提交时求值的回调
#[derive(Clone)]
pub enum BehaviorConfig {
    Fixed(Behavior),
    Dynamic(Arc<dyn Fn() -> Behavior + Send + Sync>),
}

impl BehaviorConfig {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn() -> Behavior + Send + Sync + 'static,
    {
        BehaviorConfig::Dynamic(Arc::new(f))
    }

    /// 在提交时刻解析实际行为
    pub fn resolve(&self) -> Behavior {
        match self {
            BehaviorConfig::Fixed(b) => *b,
            BehaviorConfig::Dynamic(f) => f(),
        }
    }
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        BehaviorConfig::Fixed(Behavior::default())
    }
}

impl From<Behavior> for BehaviorConfig {
    fn from(value: Behavior) -> Self {
        BehaviorConfig::Fixed(value)
    }
}

impl fmt::Debug for BehaviorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BehaviorConfig::Fixed(b) => f.debug_tuple("Fixed").field(b).finish(),
            BehaviorConfig::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}
