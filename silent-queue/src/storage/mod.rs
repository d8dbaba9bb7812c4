//! 持久化适配器（storage）
//!
//! 引擎只依赖按键读写字符串的最小能力，由宿主环境注入具体实现。
//!
mod memory;

pub use memory::MemoryStorage;

use crate::error::SilentResult as Result;
use async_trait::async_trait;
use std::sync::Arc;

/// 持久化适配器：按键读写 JSON 文本
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<T> StorageAdapter for Arc<T>
where
    T: StorageAdapter + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key).await
    }
}
