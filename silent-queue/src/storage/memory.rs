//! 内存版持久化适配器（MemoryStorage）
//!
//! 克隆共享同一份数据，可用于测试、示例，以及模拟进程重启后的恢复。
//!
use super::StorageAdapter;
use crate::error::SilentResult as Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    map: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前保存的全部键（排序后返回）
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.map.lock().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn len(&self) -> usize {
        self.map.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.lock().await.is_empty()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.map.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.map.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let storage = MemoryStorage::new();
        storage.set("k", "v".into()).await.unwrap();
        assert_eq!(storage.get("k").await.unwrap().as_deref(), Some("v"));

        storage.remove("k").await.unwrap();
        assert_eq!(storage.get("k").await.unwrap(), None);
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn clones_share_data() {
        let storage = MemoryStorage::new();
        let other = storage.clone();
        storage.set("b", "2".into()).await.unwrap();
        other.set("a", "1".into()).await.unwrap();
        assert_eq!(storage.keys().await, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(other.len().await, 2);
    }
}
