//! 请求执行（RequestExecutor）
//!
//! 引擎不关心请求如何发出，只依赖宿主注入的执行器：
//! - `Retriable` 错误在预算内按节奏重试；
//! - `Fatal` 错误立即终止该描述符的重试。
//!
use crate::method::Method;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 执行器返回的错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("retriable transport error: {reason}")]
    Retriable { reason: String },
    #[error("fatal transport error: {reason}")]
    Fatal { reason: String },
}

impl TransportError {
    pub fn retriable(reason: impl Into<String>) -> Self {
        TransportError::Retriable {
            reason: reason.into(),
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        TransportError::Fatal {
            reason: reason.into(),
        }
    }
}

/// 单次尝试的失败原因，随 error/fallback/complete 事件一起下发
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("transport error: {reason}")]
    Transport { reason: String },
    #[error("attempt timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("fatal error: {reason}")]
    Fatal { reason: String },
}

impl SubmitError {
    pub fn timeout(timeout: Duration) -> Self {
        SubmitError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmitError::Fatal { .. })
    }
}

impl From<TransportError> for SubmitError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Retriable { reason } => SubmitError::Transport { reason },
            TransportError::Fatal { reason } => SubmitError::Fatal { reason },
        }
    }
}

/// 请求执行器：真正发出网络请求的宿主实现
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, method: &Method) -> Result<serde_json::Value, TransportError>;
}

#[async_trait]
impl<T> RequestExecutor for Arc<T>
where
    T: RequestExecutor + ?Sized,
{
    async fn execute(&self, method: &Method) -> Result<serde_json::Value, TransportError> {
        (**self).execute(method).await
    }
}

/// 在超时约束下执行一次尝试
pub(crate) async fn attempt(
    executor: &dyn RequestExecutor,
    method: &Method,
    timeout: Duration,
) -> Result<serde_json::Value, SubmitError> {
    match tokio::time::timeout(timeout, executor.execute(method)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(err.into()),
        Err(_) => Err(SubmitError::timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::method::MethodType;

    struct Slow;

    #[async_trait]
    impl RequestExecutor for Slow {
        async fn execute(&self, _method: &Method) -> Result<serde_json::Value, TransportError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(serde_json::Value::Null)
        }
    }

    struct Rejecting;

    #[async_trait]
    impl RequestExecutor for Rejecting {
        async fn execute(&self, _method: &Method) -> Result<serde_json::Value, TransportError> {
            Err(TransportError::fatal("400 bad request"))
        }
    }

    #[tokio::test]
    async fn attempt_times_out() {
        let method = Method::new(MethodType::Get, "/slow");
        let err = attempt(&Slow, &method, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Timeout { timeout_ms: 20 });
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn fatal_transport_error_maps_to_fatal() {
        let method = Method::new(MethodType::Post, "/todos");
        let executor: Arc<dyn RequestExecutor> = Arc::new(Rejecting);
        let err = attempt(&executor, &method, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "fatal error: 400 bad request");
    }
}
