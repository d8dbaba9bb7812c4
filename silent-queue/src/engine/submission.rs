//! 提交循环
//!
//! 每次唤醒并发处理所有队列；同一队列内按先进先出逐个提交，
//! 队首进入重试等待时本队列的后续描述符保持不动。
//! 循环本身从不返回错误，处理器与持久化的失败只记录日志。
//!
use super::SilentQueue;
use crate::eventing::{SilentEvent, SubmitEvent};
use crate::method::SilentMethod;
use crate::transport::{self, SubmitError};
use futures_util::future::join_all;
use tokio::time::Instant;

/// 单个描述符本轮的处理结果
enum Outcome {
    /// 已成功、已终止或已被移除，可继续处理队列中的下一个
    Resolved,
    /// 进入重试等待，本队列本轮到此为止
    Waiting,
}

impl SilentQueue {
    /// 立即执行一轮提交
    pub async fn wake(&self) {
        // 启动时读取存储失败的恢复在此重试
        if self.is_booted() && !self.is_restored() {
            match self.ensure_restored().await {
                Ok(report) => tracing::info!(
                    restored = report.restored,
                    dropped = report.dropped.len(),
                    "deferred silent queue restore completed"
                ),
                Err(err) => tracing::warn!(error = %err, "silent queue restore still failing"),
            }
        }
        let queues = self.store.queue_names();
        join_all(queues.iter().map(|q| self.drain_queue(q))).await;
    }

    async fn drain_queue(&self, queue: &str) {
        let batch = self.store.dequeue_due(queue, Instant::now());
        let mut pending = batch.into_iter();

        while let Some(snapshot) = pending.next() {
            // 取最新状态：等待期间可能被替换或移除
            let Some(method) = self.store.get(snapshot.id()) else {
                continue;
            };
            if let Outcome::Waiting = self.process(method).await {
                let rest: Vec<String> = pending.map(|m| m.id().to_string()).collect();
                self.store.release(queue, &rest);
                break;
            }
        }
    }

    async fn process(&self, method: SilentMethod) -> Outcome {
        tracing::debug!(
            id = method.id(),
            name = method.name(),
            queue = method.queue(),
            attempt = method.attempts_used() + 1,
            retry = method.retry(),
            "submitting silent method"
        );

        match transport::attempt(self.executor.as_ref(), method.method(), method.timeout()).await {
            Ok(_) => {
                self.settle(&method).await;
                let event = SubmitEvent::succeeded(method);
                self.dispatch(SilentEvent::Success(event.clone()));
                self.dispatch(SilentEvent::Complete(event));
                Outcome::Resolved
            }
            Err(error) => self.fail(method, error).await,
        }
    }

    async fn fail(&self, mut method: SilentMethod, error: SubmitError) -> Outcome {
        let exhausted = method.record_failure(error.to_string());

        if !error.is_fatal() && !exhausted {
            let until = method.next_round().map(|d| Instant::now() + d);
            let Some(updated) = self.store.mark_retry(&method, until) else {
                tracing::debug!(id = method.id(), "silent method removed while in flight");
                return Outcome::Resolved;
            };
            tracing::warn!(
                id = updated.id(),
                queue = updated.queue(),
                attempts = updated.attempts_used(),
                retry = updated.retry(),
                error = %error,
                "silent method attempt failed, waiting for next round"
            );
            if updated.behavior().is_persisted() {
                self.persist(&updated).await;
            }
            return Outcome::Waiting;
        }

        tracing::warn!(
            id = method.id(),
            queue = method.queue(),
            attempts = method.attempts_used(),
            error = %error,
            "silent method failed permanently"
        );
        self.settle(&method).await;

        let silent = method.behavior().is_persisted();
        let handlers = method.handlers().clone();
        let event = SubmitEvent::failed(method, error);
        if silent {
            if let Err(err) = handlers.emit_fallback(&event) {
                tracing::warn!(error = %err, "fallback handler failed");
            }
            self.dispatch(SilentEvent::Fallback(event.clone()));
        }
        self.dispatch(SilentEvent::Error(event.clone()));
        self.dispatch(SilentEvent::Complete(event));
        Outcome::Resolved
    }

    /// 从内存队列与存储中移除已终结的描述符
    async fn settle(&self, method: &SilentMethod) {
        self.store.remove(method.queue(), method.id());
        if method.behavior().is_persisted() {
            if let Err(err) = self.persistence.remove(method.id(), &self.store).await {
                tracing::error!(id = method.id(), error = %err, "failed to remove persisted silent method");
            }
        }
    }

    async fn persist(&self, method: &SilentMethod) {
        let saved = self
            .persistence
            .save(method.id(), &self.registry, &self.store)
            .await;
        if let Err(err) = saved {
            tracing::error!(id = method.id(), error = %err, "failed to persist silent method");
        }
    }

    fn dispatch(&self, event: SilentEvent) {
        if let Err(err) = self.bus.emit(&event) {
            tracing::warn!(kind = %event.kind(), error = %err, "event handler failed inside submission loop");
        }
    }
}
