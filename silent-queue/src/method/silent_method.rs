use super::{Method, MethodHandlers};
use crate::behavior::Behavior;
use crate::options::SubmitOptions;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// 排队中的调用描述符
///
/// 克隆得到的是同一描述符在某一时刻的快照，事件中携带的即为此快照。
#[derive(Clone)]
pub struct SilentMethod {
    pub(super) id: String,
    pub(super) method: Method,
    pub(super) queue: String,
    pub(super) behavior: Behavior,
    pub(super) retry: usize,
    pub(super) timeout: Duration,
    pub(super) next_round: Option<Duration>,
    pub(super) attempts_used: usize,
    pub(super) last_error: Option<String>,
    pub(super) created_at: DateTime<Utc>,
    pub(super) handlers: MethodHandlers,
}

impl SilentMethod {
    pub(crate) fn new(method: Method, behavior: Behavior, options: &SubmitOptions) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            method,
            queue: options.queue().to_string(),
            behavior,
            retry: options.retry(),
            timeout: options.timeout(),
            next_round: options.next_round(),
            attempts_used: 0,
            last_error: None,
            created_at: Utc::now(),
            handlers: options.handlers().clone(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 方法名（过滤匹配使用）
    pub fn name(&self) -> &str {
        self.method.name()
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// 重试预算（最多尝试次数）
    pub fn retry(&self) -> usize {
        self.retry
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn next_round(&self) -> Option<Duration> {
        self.next_round
    }

    pub fn attempts_used(&self) -> usize {
        self.attempts_used
    }

    pub fn remaining_attempts(&self) -> usize {
        self.retry.saturating_sub(self.attempts_used)
    }

    /// 已重试的次数（首次尝试不计入）
    pub fn retried_times(&self) -> usize {
        self.attempts_used.saturating_sub(1)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn handlers(&self) -> &MethodHandlers {
        &self.handlers
    }

    /// 记录一次失败的尝试，返回预算是否已耗尽
    pub(crate) fn record_failure(&mut self, reason: String) -> bool {
        self.attempts_used = (self.attempts_used + 1).min(self.retry);
        self.last_error = Some(reason);
        self.attempts_used >= self.retry
    }

    pub(crate) fn set_handlers(&mut self, handlers: MethodHandlers) {
        self.handlers = handlers;
    }

    pub(crate) fn set_method(&mut self, method: Method) {
        self.method = method;
    }
}

impl fmt::Debug for SilentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SilentMethod")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("queue", &self.queue)
            .field("behavior", &self.behavior)
            .field("retry", &self.retry)
            .field("attempts_used", &self.attempts_used)
            .field("last_error", &self.last_error)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodType;

    #[test]
    fn attempts_never_exceed_budget() {
        let options = SubmitOptions::builder().retry(2).build();
        let mut sm = SilentMethod::new(
            Method::new(MethodType::Post, "/todos"),
            Behavior::Silent,
            &options,
        );
        assert_eq!(sm.remaining_attempts(), 2);

        assert!(!sm.record_failure("offline".into()));
        assert_eq!(sm.retried_times(), 0);
        assert!(sm.record_failure("offline".into()));
        assert!(sm.record_failure("offline".into()));
        assert_eq!(sm.attempts_used(), 2);
        assert_eq!(sm.retried_times(), 1);
        assert_eq!(sm.last_error(), Some("offline"));
    }

    #[test]
    fn ids_are_unique() {
        let options = SubmitOptions::default();
        let a = SilentMethod::new(Method::new(MethodType::Post, "/a"), Behavior::Queue, &options);
        let b = SilentMethod::new(Method::new(MethodType::Post, "/a"), Behavior::Queue, &options);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.queue(), "default");
    }
}
