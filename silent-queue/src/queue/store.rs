//! 内存队列（QueueStore）
//!
//! 按队列名维护有序的描述符序列。每个条目带有调度状态：
//! - `Pending`：可在下一次唤醒时提交；
//! - `InFlight`：正在被提交循环处理；
//! - `RetryWait`：失败后等待下一轮，`until` 为空表示下一次唤醒即到期。
//!
//! 队首条目未到期时整个队列阻塞，保证同一队列内严格先进先出。
//!
use crate::method::{Method, SilentMethod};
use dashmap::DashMap;
use std::collections::{BTreeMap, VecDeque};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryState {
    Pending,
    InFlight,
    RetryWait { until: Option<Instant> },
}

impl EntryState {
    fn is_due(&self, now: Instant) -> bool {
        match self {
            EntryState::Pending => true,
            EntryState::InFlight => false,
            EntryState::RetryWait { until } => until.is_none_or(|t| t <= now),
        }
    }
}

#[derive(Debug, Clone)]
struct QueueEntry {
    method: SilentMethod,
    state: EntryState,
}

#[derive(Debug, Default)]
pub(crate) struct QueueStore {
    queues: DashMap<String, VecDeque<QueueEntry>>,
}

impl QueueStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, method: SilentMethod) {
        self.queues
            .entry(method.queue().to_string())
            .or_default()
            .push_back(QueueEntry {
                method,
                state: EntryState::Pending,
            });
    }

    /// 将恢复的描述符按原顺序放到各自队列的最前面
    pub(crate) fn restore(&self, methods: Vec<SilentMethod>) {
        for method in methods.into_iter().rev() {
            self.queues
                .entry(method.queue().to_string())
                .or_default()
                .push_front(QueueEntry {
                    method,
                    state: EntryState::Pending,
                });
        }
    }

    /// 取出队首连续的到期条目并标记为处理中
    pub(crate) fn dequeue_due(&self, queue: &str, now: Instant) -> Vec<SilentMethod> {
        let Some(mut entries) = self.queues.get_mut(queue) else {
            return Vec::new();
        };
        let mut batch = Vec::new();
        for entry in entries.iter_mut() {
            if !entry.state.is_due(now) {
                break;
            }
            entry.state = EntryState::InFlight;
            batch.push(entry.method.clone());
        }
        batch
    }

    /// 将未处理的条目放回待提交状态
    pub(crate) fn release(&self, queue: &str, ids: &[String]) {
        if let Some(mut entries) = self.queues.get_mut(queue) {
            for entry in entries.iter_mut() {
                if entry.state == EntryState::InFlight && ids.iter().any(|id| id == entry.method.id()) {
                    entry.state = EntryState::Pending;
                }
            }
        }
    }

    /// 写回失败后的描述符并进入等待；条目已被移除时返回 `None`
    pub(crate) fn mark_retry(
        &self,
        method: &SilentMethod,
        until: Option<Instant>,
    ) -> Option<SilentMethod> {
        let mut entries = self.queues.get_mut(method.queue())?;
        let entry = entries.iter_mut().find(|e| e.method.id() == method.id())?;
        let mut updated = method.clone();
        // 处理期间可能被替换过请求内容
        updated.set_method(entry.method.method().clone());
        entry.method = updated.clone();
        entry.state = EntryState::RetryWait { until };
        Some(updated)
    }

    pub(crate) fn remove(&self, queue: &str, id: &str) -> Option<SilentMethod> {
        let removed = {
            let mut entries = self.queues.get_mut(queue)?;
            let pos = entries.iter().position(|e| e.method.id() == id)?;
            entries.remove(pos).map(|e| e.method)
        };
        self.queues.remove_if(queue, |_, entries| entries.is_empty());
        removed
    }

    pub(crate) fn remove_by_id(&self, id: &str) -> Option<SilentMethod> {
        let queue = self.get(id)?.queue().to_string();
        self.remove(&queue, id)
    }

    pub(crate) fn get(&self, id: &str) -> Option<SilentMethod> {
        self.queues.iter().find_map(|q| {
            q.value()
                .iter()
                .find(|e| e.method.id() == id)
                .map(|e| e.method.clone())
        })
    }

    pub(crate) fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// 替换请求内容，保持其在队列中的位置与调度状态
    pub(crate) fn replace_method(&self, id: &str, method: Method) -> Option<SilentMethod> {
        self.queues.iter_mut().find_map(|mut q| {
            q.value_mut()
                .iter_mut()
                .find(|e| e.method.id() == id)
                .map(|e| {
                    e.method.set_method(method.clone());
                    e.method.clone()
                })
        })
    }

    pub(crate) fn snapshot(&self, queue: &str) -> Vec<SilentMethod> {
        self.queues
            .get(queue)
            .map(|entries| entries.iter().map(|e| e.method.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.iter().map(|q| q.key().clone()).collect();
        names.sort();
        names
    }

    pub(crate) fn len(&self, queue: &str) -> usize {
        self.queues.get(queue).map(|q| q.len()).unwrap_or(0)
    }

    /// 需要持久化（silent）的描述符 id，按队列与队内顺序组织
    pub(crate) fn persisted_index(&self) -> BTreeMap<String, Vec<String>> {
        self.queues
            .iter()
            .filter_map(|q| {
                let ids: Vec<String> = q
                    .value()
                    .iter()
                    .filter(|e| e.method.behavior().is_persisted())
                    .map(|e| e.method.id().to_string())
                    .collect();
                (!ids.is_empty()).then(|| (q.key().clone(), ids))
            })
            .collect()
    }

    #[cfg(test)]
    fn state_of(&self, queue: &str, id: &str) -> Option<EntryState> {
        self.queues
            .get(queue)?
            .iter()
            .find(|e| e.method.id() == id)
            .map(|e| e.state)
    }
}
