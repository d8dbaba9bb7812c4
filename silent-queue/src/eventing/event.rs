//! 队列生命周期事件
//!
use crate::filter::MethodFilter;
use crate::method::SilentMethod;
use crate::transport::SubmitError;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Boot,
    BeforePushQueue,
    PushedQueue,
    Success,
    Error,
    Fallback,
    Complete,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Boot => "boot",
            EventKind::BeforePushQueue => "before_push_queue",
            EventKind::PushedQueue => "pushed_queue",
            EventKind::Success => "success",
            EventKind::Error => "error",
            EventKind::Fallback => "fallback",
            EventKind::Complete => "complete",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一次提交尝试的结果（success/error/fallback/complete 共用）
#[derive(Debug, Clone)]
pub struct SubmitEvent {
    /// 触发事件时的描述符快照
    pub method: SilentMethod,
    pub success: bool,
    /// 已重试次数，首次尝试不计入
    pub retried_times: usize,
    pub error: Option<SubmitError>,
}

impl SubmitEvent {
    pub(crate) fn succeeded(method: SilentMethod) -> Self {
        // 成功时之前的每一次失败都对应一次重试
        Self {
            retried_times: method.attempts_used(),
            method,
            success: true,
            error: None,
        }
    }

    pub(crate) fn failed(method: SilentMethod, error: SubmitError) -> Self {
        Self {
            retried_times: method.retried_times(),
            method,
            success: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
struct PushDecision {
    evict: Vec<String>,
    skip: bool,
}

/// 入队前事件
///
/// 处理器可以基于 `queued` 快照剔除已排队的描述符，或放弃本次入队。
/// 同一事件的多个处理器共享一份决定，引擎在所有处理器返回后统一执行。
#[derive(Clone)]
pub struct PushQueueEvent {
    method: SilentMethod,
    queue: String,
    queued: Vec<SilentMethod>,
    decision: Arc<Mutex<PushDecision>>,
}

impl PushQueueEvent {
    pub(crate) fn new(method: SilentMethod, queued: Vec<SilentMethod>) -> Self {
        Self {
            queue: method.queue().to_string(),
            method,
            queued,
            decision: Arc::default(),
        }
    }

    /// 即将入队的描述符
    pub fn method(&self) -> &SilentMethod {
        &self.method
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// 目标队列当前内容（按队列顺序）
    pub fn queued(&self) -> &[SilentMethod] {
        &self.queued
    }

    pub fn matching(&self, filter: &MethodFilter) -> Vec<SilentMethod> {
        filter.apply(&self.queued)
    }

    /// 标记剔除一个已排队的描述符
    pub fn evict(&self, id: impl Into<String>) {
        let id = id.into();
        let mut decision = self.decision.lock();
        if !decision.evict.contains(&id) {
            decision.evict.push(id);
        }
    }

    /// 剔除所有匹配项，返回本次标记的数量
    pub fn evict_matching(&self, filter: &MethodFilter) -> usize {
        let found = self.matching(filter);
        let n = found.len();
        for m in found {
            self.evict(m.id());
        }
        n
    }

    /// 放弃本次入队
    pub fn skip(&self) {
        self.decision.lock().skip = true;
    }

    pub fn is_skipped(&self) -> bool {
        self.decision.lock().skip
    }

    pub fn evicted(&self) -> Vec<String> {
        self.decision.lock().evict.clone()
    }
}

impl fmt::Debug for PushQueueEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decision = self.decision.lock();
        f.debug_struct("PushQueueEvent")
            .field("method", &self.method)
            .field("queue", &self.queue)
            .field("queued", &self.queued.len())
            .field("evict", &decision.evict)
            .field("skip", &decision.skip)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PushedQueueEvent {
    pub method: SilentMethod,
    pub queue: String,
}

/// 全局事件总线上流转的事件
#[derive(Debug, Clone)]
pub enum SilentEvent {
    Boot,
    BeforePushQueue(PushQueueEvent),
    PushedQueue(PushedQueueEvent),
    Success(SubmitEvent),
    Error(SubmitEvent),
    Fallback(SubmitEvent),
    Complete(SubmitEvent),
}

impl SilentEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SilentEvent::Boot => EventKind::Boot,
            SilentEvent::BeforePushQueue(_) => EventKind::BeforePushQueue,
            SilentEvent::PushedQueue(_) => EventKind::PushedQueue,
            SilentEvent::Success(_) => EventKind::Success,
            SilentEvent::Error(_) => EventKind::Error,
            SilentEvent::Fallback(_) => EventKind::Fallback,
            SilentEvent::Complete(_) => EventKind::Complete,
        }
    }

    /// 提交类事件的载荷
    pub fn as_submit(&self) -> Option<&SubmitEvent> {
        match self {
            SilentEvent::Success(e)
            | SilentEvent::Error(e)
            | SilentEvent::Fallback(e)
            | SilentEvent::Complete(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::method::{Method, MethodType};
    use crate::options::SubmitOptions;

    fn sm(name: &str) -> SilentMethod {
        let method = Method::builder().name(name).kind(MethodType::Post).url("/x").build();
        SilentMethod::new(method, Behavior::Silent, &SubmitOptions::default())
    }

    #[test]
    fn decision_is_shared_between_clones() {
        let queued = vec![sm("addTodo"), sm("editTodo"), sm("addTodo")];
        let event = PushQueueEvent::new(sm("addTodo"), queued.clone());
        let other = event.clone();

        assert_eq!(other.evict_matching(&MethodFilter::name("addTodo")), 2);
        event.evict(queued[0].id());
        assert_eq!(event.evicted(), vec![queued[0].id().to_string(), queued[2].id().to_string()]);

        assert!(!event.is_skipped());
        other.skip();
        assert!(event.is_skipped());
    }

    #[test]
    fn kind_names() {
        assert_eq!(EventKind::BeforePushQueue.to_string(), "before_push_queue");
        assert_eq!(SilentEvent::Boot.kind(), EventKind::Boot);
        assert!(SilentEvent::Boot.as_submit().is_none());
    }
}
