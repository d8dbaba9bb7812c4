//! 进程内事件总线（EventBus）
//!
//! 按注册顺序同步分发事件。分发前复制处理器列表，
//! 处理器内部再次注册新的处理器不会影响本次分发。
//!
use super::handler::{EventHandler, FnHandler};
use super::{EventKind, SilentEvent};
use crate::error::{SilentError, SilentResult as Result};
use parking_lot::RwLock;
use std::sync::Arc;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<Arc<dyn EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handler: Arc<dyn EventHandler>) {
        tracing::debug!(
            handler = handler.handler_name(),
            kind = ?handler.handled_event_kind(),
            "event handler registered"
        );
        self.handlers.write().push(handler);
    }

    /// 以闭包订阅单类事件
    pub fn on<F>(&self, kind: EventKind, f: F)
    where
        F: Fn(&SilentEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(Arc::new(FnHandler::new(kind.as_str(), kind, f)));
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }

    fn matching(&self, kind: EventKind) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .iter()
            .filter(|h| h.handled_event_kind().accepts(kind))
            .cloned()
            .collect()
    }

    /// 分发事件，遇到第一个失败的处理器即返回错误
    pub fn emit(&self, event: &SilentEvent) -> Result<()> {
        let kind = event.kind();
        for h in self.matching(kind) {
            if let Err(err) = h.handle(event) {
                tracing::debug!(handler = h.handler_name(), %kind, error = %err, "event handler failed");
                return Err(SilentError::event_handler(kind, err));
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("handlers", &self.len())
            .finish()
    }
}
