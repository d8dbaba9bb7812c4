use crate::error::{SilentError, SilentResult as Result};
use crate::eventing::{EventKind, PushQueueEvent, PushedQueueEvent, SubmitEvent};
use std::fmt;
use std::sync::Arc;

pub type SubmitHandlerFn = Arc<dyn Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync>;
pub type PushQueueHandlerFn = Arc<dyn Fn(&PushQueueEvent) -> anyhow::Result<()> + Send + Sync>;
pub type PushedQueueHandlerFn =
    Arc<dyn Fn(&PushedQueueEvent) -> anyhow::Result<()> + Send + Sync>;

/// 单个描述符上的运行时回调
///
/// 回调无法持久化。绑定了 fallback 的 silent 描述符在重启恢复时
/// 需要通过 rehydrator 重新挂载回调，否则会被丢弃。
#[derive(Clone, Default)]
pub struct MethodHandlers {
    fallback: Vec<SubmitHandlerFn>,
    before_push_queue: Vec<PushQueueHandlerFn>,
    pushed_queue: Vec<PushedQueueHandlerFn>,
}

impl MethodHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// 重试耗尽或遇到不可重试错误后触发，仅对 silent 行为有效
    pub fn on_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.fallback.push(Arc::new(f));
        self
    }

    /// 入队前触发，可在此剔除队列中的重复项或放弃本次入队
    pub fn on_before_push_queue<F>(mut self, f: F) -> Self
    where
        F: Fn(&PushQueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_push_queue.push(Arc::new(f));
        self
    }

    pub fn on_pushed_queue<F>(mut self, f: F) -> Self
    where
        F: Fn(&PushedQueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.pushed_queue.push(Arc::new(f));
        self
    }

    pub fn has_fallback(&self) -> bool {
        !self.fallback.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.fallback.is_empty() && self.before_push_queue.is_empty() && self.pushed_queue.is_empty()
    }

    pub(crate) fn emit_fallback(&self, event: &SubmitEvent) -> Result<()> {
        for h in &self.fallback {
            h(event).map_err(|e| SilentError::event_handler(EventKind::Fallback, e))?;
        }
        Ok(())
    }

    pub(crate) fn emit_before_push_queue(&self, event: &PushQueueEvent) -> Result<()> {
        for h in &self.before_push_queue {
            h(event).map_err(|e| SilentError::event_handler(EventKind::BeforePushQueue, e))?;
        }
        Ok(())
    }

    pub(crate) fn emit_pushed_queue(&self, event: &PushedQueueEvent) -> Result<()> {
        for h in &self.pushed_queue {
            h(event).map_err(|e| SilentError::event_handler(EventKind::PushedQueue, e))?;
        }
        Ok(())
    }
}

impl fmt::Debug for MethodHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodHandlers")
            .field("fallback", &self.fallback.len())
            .field("before_push_queue", &self.before_push_queue.len())
            .field("pushed_queue", &self.pushed_queue.len())
            .finish()
    }
}
