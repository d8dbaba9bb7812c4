//! 单次提交配置（SubmitOptions）
//!
use crate::behavior::BehaviorConfig;
use crate::method::MethodHandlers;
use bon::Builder;
use std::time::Duration;

/// 未指定队列名时使用的默认队列
pub const DEFAULT_QUEUE: &str = "default";
/// 默认重试预算（总尝试次数）
pub const DEFAULT_RETRY: usize = 3;
/// 默认单次尝试超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Builder)]
pub struct SubmitOptions {
    /// 固定行为或提交时求值的回调，默认 `queue`
    #[builder(default, into)]
    behavior: BehaviorConfig,
    /// 重试预算，即最多尝试的次数（至少为 1）
    #[builder(default = DEFAULT_RETRY)]
    retry: usize,
    /// 单次尝试超时
    #[builder(default = DEFAULT_TIMEOUT)]
    timeout: Duration,
    /// 失败后到下一轮尝试的间隔；未指定时在下一次唤醒时重试
    next_round: Option<Duration>,
    #[builder(default = DEFAULT_QUEUE.to_string(), into)]
    queue: String,
    #[builder(default)]
    handlers: MethodHandlers,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl SubmitOptions {
    pub fn behavior(&self) -> &BehaviorConfig {
        &self.behavior
    }

    pub fn retry(&self) -> usize {
        self.retry.max(1)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn next_round(&self) -> Option<Duration> {
        self.next_round
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn handlers(&self) -> &MethodHandlers {
        &self.handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;

    #[test]
    fn defaults() {
        let options = SubmitOptions::default();
        assert_eq!(options.behavior().resolve(), Behavior::Queue);
        assert_eq!(options.retry(), DEFAULT_RETRY);
        assert_eq!(options.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(options.next_round(), None);
        assert_eq!(options.queue(), DEFAULT_QUEUE);
        assert!(options.handlers().is_empty());
    }

    #[test]
    fn retry_budget_has_a_floor_of_one() {
        let options = SubmitOptions::builder()
            .behavior(Behavior::Silent)
            .retry(0)
            .queue("orders")
            .build();
        assert_eq!(options.retry(), 1);
        assert_eq!(options.queue(), "orders");
    }
}
