//! 队列持久化（QueuePersistence）
//!
//! 存储布局：
//! - `{ns}.index`：队列名到有序描述符 id 的映射；
//! - `{ns}.method.{id}`：单个描述符的 `SerializedSilentMethod` JSON。
//!
//! 所有写入都在同一把异步锁内完成，记录与索引总是依据内存队列重新计算。
//!
use super::store::QueueStore;
use crate::error::SilentResult as Result;
use crate::method::{MethodHandlers, SerializedSilentMethod, SilentMethod};
use crate::serializer::SerializerRegistry;
use crate::storage::StorageAdapter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 恢复时为描述符重新挂载运行时回调
pub type Rehydrator = Arc<dyn Fn(&SilentMethod) -> Option<MethodHandlers> + Send + Sync>;

/// 恢复过程中被丢弃的记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootDiagnostic {
    pub id: String,
    pub queue: String,
    pub reason: String,
}

impl fmt::Display for BootDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}: {}", self.queue, self.id, self.reason)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedIndex {
    #[serde(default)]
    queues: BTreeMap<String, Vec<String>>,
}

pub(crate) struct QueuePersistence {
    storage: Arc<dyn StorageAdapter>,
    namespace: String,
    lock: Mutex<()>,
}

impl QueuePersistence {
    pub(crate) fn new(storage: Arc<dyn StorageAdapter>, namespace: impl Into<String>) -> Self {
        Self {
            storage,
            namespace: namespace.into(),
            lock: Mutex::new(()),
        }
    }

    fn index_key(&self) -> String {
        format!("{}.index", self.namespace)
    }

    fn method_key(&self, id: &str) -> String {
        format!("{}.method.{}", self.namespace, id)
    }

    async fn write_index_locked(&self, store: &QueueStore) -> Result<()> {
        let index = PersistedIndex {
            queues: store.persisted_index(),
        };
        self.storage
            .set(&self.index_key(), serde_json::to_string(&index)?)
            .await
    }

    /// 按内存中的最新状态写入（或覆盖）一条记录并刷新索引
    ///
    /// 记录在锁内依据 `store` 重新编码；描述符已不在内存队列中时不写入，
    /// 避免与并发的移除交错后留下孤立记录。
    pub(crate) async fn save(
        &self,
        id: &str,
        registry: &SerializerRegistry,
        store: &QueueStore,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;
        let Some(method) = store.get(id) else {
            tracing::debug!(id, "silent method gone before save, record not written");
            return Ok(());
        };
        let record = SerializedSilentMethod::encode(&method, registry)?;
        self.storage
            .set(&self.method_key(id), serde_json::to_string(&record)?)
            .await?;
        self.write_index_locked(store).await
    }

    /// 删除一条记录并刷新索引
    pub(crate) async fn remove(&self, id: &str, store: &QueueStore) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.storage.remove(&self.method_key(id)).await?;
        self.write_index_locked(store).await
    }

    pub(crate) async fn write_index(&self, store: &QueueStore) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.write_index_locked(store).await
    }

    /// 读取全部已持久化的描述符
    ///
    /// 无法解析、解码或重新挂载回调的记录会被删除并以诊断信息返回；
    /// 已在内存中的 id 直接跳过。索引损坏时视为空队列并给出诊断。
    /// 读取存储本身失败时返回错误且不删除任何记录，调用方可稍后重试。
    pub(crate) async fn restore(
        &self,
        registry: &SerializerRegistry,
        rehydrator: Option<&Rehydrator>,
        store: &QueueStore,
    ) -> Result<(Vec<SilentMethod>, Vec<BootDiagnostic>)> {
        let _guard = self.lock.lock().await;
        let mut restored = Vec::new();
        let mut dropped = Vec::new();

        let index = match self.storage.get(&self.index_key()).await? {
            None => PersistedIndex::default(),
            Some(json) => match serde_json::from_str(&json) {
                Ok(index) => index,
                Err(err) => {
                    let diagnostic = BootDiagnostic {
                        id: String::new(),
                        queue: String::new(),
                        reason: format!("index unreadable: {err}"),
                    };
                    tracing::warn!(reason = %diagnostic.reason, "silent queue index dropped");
                    dropped.push(diagnostic);
                    return Ok((restored, dropped));
                }
            },
        };

        for (queue, ids) in index.queues {
            for id in ids {
                if store.contains(&id) {
                    continue;
                }
                match self.restore_one(&id, registry, rehydrator).await? {
                    Ok(method) => restored.push(method),
                    Err(reason) => dropped.push(BootDiagnostic {
                        id,
                        queue: queue.clone(),
                        reason,
                    }),
                }
            }
        }

        // 全部读取成功后才删除被丢弃的记录
        for diagnostic in &dropped {
            tracing::warn!(
                id = %diagnostic.id,
                queue = %diagnostic.queue,
                reason = %diagnostic.reason,
                "silent method dropped on restore"
            );
            if let Err(err) = self.storage.remove(&self.method_key(&diagnostic.id)).await {
                tracing::warn!(id = %diagnostic.id, error = %err, "failed to remove dropped record");
            }
        }

        tracing::debug!(restored = restored.len(), dropped = dropped.len(), "silent queue restored");
        Ok((restored, dropped))
    }

    /// 外层错误为存储读取失败，内层为记录无法还原的原因
    async fn restore_one(
        &self,
        id: &str,
        registry: &SerializerRegistry,
        rehydrator: Option<&Rehydrator>,
    ) -> Result<std::result::Result<SilentMethod, String>> {
        let Some(json) = self.storage.get(&self.method_key(id)).await? else {
            return Ok(Err("record missing".to_string()));
        };
        Ok(Self::revive(&json, registry, rehydrator))
    }

    fn revive(
        json: &str,
        registry: &SerializerRegistry,
        rehydrator: Option<&Rehydrator>,
    ) -> std::result::Result<SilentMethod, String> {
        let record: SerializedSilentMethod =
            serde_json::from_str(json).map_err(|e| format!("malformed record: {e}"))?;
        let needs_fallback = record.needs_fallback();
        let mut method = record.decode(registry).map_err(|e| e.to_string())?;

        match rehydrator.and_then(|f| (**f)(&method)) {
            Some(handlers) => method.set_handlers(handlers),
            None if needs_fallback => {
                return Err("fallback handlers could not be reattached".to_string());
            }
            None => {}
        }
        Ok(method)
    }
}

impl fmt::Debug for QueuePersistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuePersistence")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::error::SilentError;
    use crate::method::{Method, MethodType};
    use crate::options::SubmitOptions;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn silent(url: &str, queue: &str) -> SilentMethod {
        let options = SubmitOptions::builder()
            .behavior(Behavior::Silent)
            .queue(queue)
            .build();
        SilentMethod::new(Method::new(MethodType::Post, url), Behavior::Silent, &options)
    }

    /// 键包含 `pattern` 的前 `failures` 次读取返回存储错误
    struct FlakyReads {
        inner: MemoryStorage,
        pattern: &'static str,
        failures: AtomicUsize,
    }

    #[async_trait]
    impl StorageAdapter for FlakyReads {
        async fn get(&self, key: &str) -> Result<Option<String>> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 && key.contains(self.pattern) {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(SilentError::storage("disk busy"));
            }
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String) -> Result<()> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test]
    async fn save_remove_keep_index_in_sync() {
        let storage = MemoryStorage::new();
        let persistence = QueuePersistence::new(Arc::new(storage.clone()), "t");
        let store = QueueStore::new();
        let registry = SerializerRegistry::default();

        let a = silent("/a", "q");
        let b = silent("/b", "q");
        for m in [&a, &b] {
            store.push(m.clone());
            persistence.save(m.id(), &registry, &store).await.unwrap();
        }
        // 非 silent 描述符不进入索引
        store.push(SilentMethod::new(
            Method::new(MethodType::Get, "/c"),
            Behavior::Queue,
            &SubmitOptions::default(),
        ));
        persistence.write_index(&store).await.unwrap();

        let index: PersistedIndex =
            serde_json::from_str(&storage.get("t.index").await.unwrap().unwrap()).unwrap();
        assert_eq!(index.queues.len(), 1);
        assert_eq!(index.queues["q"], vec![a.id().to_string(), b.id().to_string()]);
        assert_eq!(storage.len().await, 3);

        store.remove("q", a.id());
        persistence.remove(a.id(), &store).await.unwrap();
        assert_eq!(
            storage.keys().await,
            vec!["t.index".to_string(), format!("t.method.{}", b.id())]
        );
    }

    #[tokio::test]
    async fn save_after_removal_writes_nothing() {
        let storage = MemoryStorage::new();
        let persistence = QueuePersistence::new(Arc::new(storage.clone()), "t");
        let store = QueueStore::new();
        let registry = SerializerRegistry::default();

        let a = silent("/a", "q");
        store.push(a.clone());
        store.remove("q", a.id());
        persistence.remove(a.id(), &store).await.unwrap();
        persistence.save(a.id(), &registry, &store).await.unwrap();

        assert_eq!(storage.keys().await, vec!["t.index".to_string()]);
    }

    #[tokio::test]
    async fn save_writes_latest_in_memory_state() {
        let storage = MemoryStorage::new();
        let persistence = QueuePersistence::new(Arc::new(storage.clone()), "t");
        let store = QueueStore::new();
        let registry = SerializerRegistry::default();

        let mut a = silent("/a", "q");
        store.push(a.clone());
        a.record_failure("timeout".to_string());
        store.mark_retry(&a, None);
        persistence.save(a.id(), &registry, &store).await.unwrap();

        let json = storage.get(&format!("t.method.{}", a.id())).await.unwrap().unwrap();
        let record: SerializedSilentMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(record.attempts_used(), 1);
        assert_eq!(record.last_error(), Some("timeout"));
    }

    #[tokio::test]
    async fn restore_skips_ids_already_in_memory() {
        let storage = Arc::new(MemoryStorage::new());
        let persistence = QueuePersistence::new(storage.clone(), "t");
        let registry = SerializerRegistry::default();
        let store = QueueStore::new();

        let a = silent("/a", "q");
        let b = silent("/b", "q");
        for m in [&a, &b] {
            store.push(m.clone());
            persistence.save(m.id(), &registry, &store).await.unwrap();
        }

        let fresh = QueueStore::new();
        fresh.push(a.clone());
        let (restored, dropped) = persistence.restore(&registry, None, &fresh).await.unwrap();
        assert!(dropped.is_empty());
        assert_eq!(restored.len(), 1);
        assert_eq!(restored[0].id(), b.id());
    }

    #[tokio::test]
    async fn corrupt_index_yields_empty_restore() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set("t.index", "not json".to_string()).await.unwrap();
        let persistence = QueuePersistence::new(storage, "t");

        let (restored, dropped) = persistence
            .restore(&SerializerRegistry::default(), None, &QueueStore::new())
            .await
            .unwrap();
        assert!(restored.is_empty());
        assert_eq!(dropped.len(), 1);
        assert!(dropped[0].reason.starts_with("index unreadable"));
    }

    #[tokio::test]
    async fn storage_failure_keeps_records() {
        let inner = MemoryStorage::new();
        let registry = SerializerRegistry::default();
        let store = QueueStore::new();
        let a = silent("/a", "q");
        store.push(a.clone());
        QueuePersistence::new(Arc::new(inner.clone()), "t")
            .save(a.id(), &registry, &store)
            .await
            .unwrap();
        let keys = inner.keys().await;

        // 索引可读，记录本身读取失败
        let flaky = Arc::new(FlakyReads {
            inner: inner.clone(),
            pattern: ".method.",
            failures: AtomicUsize::new(1),
        });
        let persistence = QueuePersistence::new(flaky, "t");
        let err = persistence
            .restore(&registry, None, &QueueStore::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SilentError::Storage { .. }));
        assert_eq!(inner.keys().await, keys);

        let (restored, dropped) = persistence
            .restore(&registry, None, &QueueStore::new())
            .await
            .unwrap();
        assert!(dropped.is_empty());
        assert_eq!(restored[0].id(), a.id());
    }

    #[tokio::test]
    async fn missing_record_is_reported() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set("t.index", r#"{"queues":{"q":["ghost"]}}"#.to_string())
            .await
            .unwrap();
        let persistence = QueuePersistence::new(storage, "t");

        let (restored, dropped) = persistence
            .restore(&SerializerRegistry::default(), None, &QueueStore::new())
            .await
            .unwrap();
        assert!(restored.is_empty());
        assert_eq!(
            dropped,
            vec![BootDiagnostic {
                id: "ghost".into(),
                queue: "q".into(),
                reason: "record missing".into(),
            }]
        );
    }
}
