//! 静默队列引擎（SilentQueue）
//!
//! 统一编排“解析行为 → 入队/持久化 → 周期提交 → 事件通知”：
//! - `submit` 按行为直接执行或入队，silent 描述符在返回前完成持久化；
//! - `boot` 从存储恢复队列，触发 `boot` 事件后启动周期提交任务；
//! - 提供按名称/正则/谓词查找、剔除、替换队列中描述符的能力；
//! - 返回用于关闭与等待的 `EngineHandle`。
//!
mod config;
mod handle;
mod submission;

pub use config::{DEFAULT_DELAY_MS, DEFAULT_NAMESPACE, SilentQueueConfig};
pub use handle::{BootReport, EngineHandle};

use crate::error::{SilentError, SilentResult as Result};
use crate::eventing::{
    EventBus, EventHandler, EventKind, PushQueueEvent, PushedQueueEvent, SilentEvent, SubmitEvent,
};
use crate::filter::MethodFilter;
use crate::method::{Method, SerializedSilentMethod, SilentMethod};
use crate::options::SubmitOptions;
use crate::queue::{BootDiagnostic, QueuePersistence, QueueStore, Rehydrator};
use crate::serializer::{DataSerializer, SerializerRegistry};
use crate::storage::StorageAdapter;
use crate::transport::{self, RequestExecutor};
use bon::Builder;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

// 导入由 bon::Builder 生成的 typestate 模块与状态转换别名
use self::silent_queue_builder::{IsUnset, SetRegistry, State as BuilderState};

/// 一次提交的结果
#[derive(Debug, Clone)]
pub enum Submission {
    /// static 行为：直接执行得到的响应
    Completed(serde_json::Value),
    /// 已进入队列
    Queued(SilentMethod),
    /// 被 before_push_queue 处理器放弃
    Skipped,
}

impl Submission {
    pub fn queued(&self) -> Option<&SilentMethod> {
        match self {
            Submission::Queued(m) => Some(m),
            _ => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Submission::Skipped)
    }
}

#[derive(Builder)]
pub struct SilentQueue {
    executor: Arc<dyn RequestExecutor>,
    storage: Arc<dyn StorageAdapter>,
    #[builder(default)]
    config: SilentQueueConfig,
    #[builder(default, setters(vis = "pub(crate)"))]
    registry: SerializerRegistry,
    rehydrator: Option<Rehydrator>,
    #[builder(skip = QueuePersistence::new(storage.clone(), config.namespace.clone()))]
    persistence: QueuePersistence,
    #[builder(skip)]
    store: QueueStore,
    #[builder(skip)]
    bus: EventBus,
    #[builder(skip)]
    restored: OnceCell<BootReport>,
    #[builder(skip)]
    booted: AtomicBool,
}

// 自定义 Builder 方法：在内置的 date/regexp 之上合并自定义序列化器。
// 同名条目覆盖内置实现，仅当 `registry` 尚未设置时可调用。
impl<S: BuilderState> SilentQueueBuilder<S> {
    pub fn serializers(
        self,
        serializers: Vec<(String, Arc<dyn DataSerializer>)>,
    ) -> SilentQueueBuilder<SetRegistry<S>>
    where
        <S as BuilderState>::Registry: IsUnset,
    {
        self.registry(serializers.into_iter().collect())
    }
}

impl SilentQueue {
    pub fn config(&self) -> &SilentQueueConfig {
        &self.config
    }

    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::SeqCst)
    }

    /// 恢复持久化队列、触发 `boot` 事件并启动周期提交任务
    ///
    /// 每个实例只能启动一次。`boot` 处理器返回错误时不会启动提交任务。
    /// 读取存储失败时以诊断信息报告，恢复推迟到下一次唤醒。
    pub async fn boot(self: &Arc<Self>) -> Result<EngineHandle> {
        if self.booted.swap(true, Ordering::SeqCst) {
            return Err(SilentError::AlreadyBooted);
        }

        let report = match self.ensure_restored().await {
            Ok(report) => report.clone(),
            Err(err) => {
                tracing::warn!(error = %err, "silent queue restore deferred to the next wake");
                BootReport {
                    restored: 0,
                    dropped: vec![BootDiagnostic {
                        id: String::new(),
                        queue: String::new(),
                        reason: format!("restore deferred: {err}"),
                    }],
                }
            }
        };
        tracing::info!(
            restored = report.restored,
            dropped = report.dropped.len(),
            queues = ?self.store.queue_names(),
            "silent queue booted"
        );

        self.bus.emit(&SilentEvent::Boot)?;

        let token = CancellationToken::new();
        let this = self.clone();
        let task = Self::spawn_periodic(token.clone(), self.config.delay(), move || {
            let this = this.clone();
            async move { this.wake().await }
        });

        Ok(EngineHandle {
            token,
            tasks: vec![task],
            report,
        })
    }

    /// 首次持久化写入或启动前，从存储恢复上一进程的队列
    ///
    /// 恢复只成功一次；读取存储失败时不写任何内容，下次调用重试。
    async fn ensure_restored(&self) -> Result<&BootReport> {
        self.restored.get_or_try_init(|| self.restore_persisted()).await
    }

    async fn restore_persisted(&self) -> Result<BootReport> {
        let (restored, dropped) = self
            .persistence
            .restore(&self.registry, self.rehydrator.as_ref(), &self.store)
            .await?;
        let report = BootReport {
            restored: restored.len(),
            dropped,
        };
        self.store.restore(restored);
        if let Err(err) = self.persistence.write_index(&self.store).await {
            tracing::error!(error = %err, "failed to rewrite silent queue index");
        }
        tracing::debug!(restored = report.restored, "persisted silent queue restored");
        Ok(report)
    }

    fn is_restored(&self) -> bool {
        self.restored.initialized()
    }

    fn spawn_periodic<F, Fut>(
        token: CancellationToken,
        interval: Duration,
        mut f: F,
    ) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            // 首次唤醒在一个间隔之后
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => f().await,
                }
            }
        })
    }

    /// 提交一次调用
    ///
    /// - static：直接执行，错误原样返回，不进入队列；
    /// - queue：仅进入内存队列；
    /// - silent：编码并持久化后才返回，编码失败时不入队；
    ///   首次持久化前先恢复上一进程的队列，恢复的描述符排在前面。
    pub async fn submit(&self, method: Method, options: SubmitOptions) -> Result<Submission> {
        let behavior = options.behavior().resolve();
        if !behavior.is_queued() {
            tracing::debug!(name = method.name(), "static submission bypasses the queue");
            let response =
                transport::attempt(self.executor.as_ref(), &method, options.timeout()).await?;
            return Ok(Submission::Completed(response));
        }

        let silent_method = SilentMethod::new(method, behavior, &options);
        if behavior.is_persisted() {
            // 编码失败时不入队
            SerializedSilentMethod::encode(&silent_method, &self.registry)?;
            self.ensure_restored().await?;
        }

        let before = PushQueueEvent::new(
            silent_method.clone(),
            self.store.snapshot(silent_method.queue()),
        );
        silent_method.handlers().emit_before_push_queue(&before)?;
        self.bus.emit(&SilentEvent::BeforePushQueue(before.clone()))?;

        for id in before.evicted() {
            if let Some(evicted) = self.store.remove_by_id(&id) {
                tracing::debug!(id = %id, queue = evicted.queue(), "silent method evicted before push");
                if evicted.behavior().is_persisted() {
                    self.persistence.remove(&id, &self.store).await?;
                }
            }
        }
        if before.is_skipped() {
            tracing::debug!(name = silent_method.name(), "submission skipped before push");
            return Ok(Submission::Skipped);
        }

        self.store.push(silent_method.clone());
        if behavior.is_persisted() {
            let saved = self
                .persistence
                .save(silent_method.id(), &self.registry, &self.store)
                .await;
            if let Err(err) = saved {
                self.store.remove(silent_method.queue(), silent_method.id());
                return Err(err);
            }
        }
        tracing::debug!(
            id = silent_method.id(),
            name = silent_method.name(),
            queue = silent_method.queue(),
            %behavior,
            "silent method queued"
        );

        let pushed = PushedQueueEvent {
            method: silent_method.clone(),
            queue: silent_method.queue().to_string(),
        };
        silent_method.handlers().emit_pushed_queue(&pushed)?;
        self.bus.emit(&SilentEvent::PushedQueue(pushed))?;

        Ok(Submission::Queued(silent_method))
    }

    // --- 事件订阅 ---

    pub fn register_handler(&self, handler: Arc<dyn EventHandler>) {
        self.bus.register(handler);
    }

    pub fn on<F>(&self, kind: EventKind, f: F)
    where
        F: Fn(&SilentEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(kind, f);
    }

    pub fn on_boot<F>(&self, f: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(EventKind::Boot, move |_| f());
    }

    pub fn on_success<F>(&self, f: F)
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_submit(EventKind::Success, f);
    }

    pub fn on_error<F>(&self, f: F)
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_submit(EventKind::Error, f);
    }

    pub fn on_fallback<F>(&self, f: F)
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_submit(EventKind::Fallback, f);
    }

    pub fn on_complete<F>(&self, f: F)
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_submit(EventKind::Complete, f);
    }

    fn on_submit<F>(&self, kind: EventKind, f: F)
    where
        F: Fn(&SubmitEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(kind, move |event| match event.as_submit() {
            Some(e) => f(e),
            None => Ok(()),
        });
    }

    pub fn on_before_push_queue<F>(&self, f: F)
    where
        F: Fn(&PushQueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(EventKind::BeforePushQueue, move |event| match event {
            SilentEvent::BeforePushQueue(e) => f(e),
            _ => Ok(()),
        });
    }

    pub fn on_pushed_queue<F>(&self, f: F)
    where
        F: Fn(&PushedQueueEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.bus.on(EventKind::PushedQueue, move |event| match event {
            SilentEvent::PushedQueue(e) => f(e),
            _ => Ok(()),
        });
    }

    // --- 队列查询与维护 ---

    /// 查找匹配的描述符；未指定队列时逐个队列查找，谓词下标按各自队列计算
    pub fn filter_methods(&self, filter: &MethodFilter, queue: Option<&str>) -> Vec<SilentMethod> {
        match queue {
            Some(q) => filter.apply(&self.store.snapshot(q)),
            None => self
                .store
                .queue_names()
                .iter()
                .flat_map(|q| filter.apply(&self.store.snapshot(q)))
                .collect(),
        }
    }

    pub fn find_method(&self, filter: &MethodFilter, queue: Option<&str>) -> Option<SilentMethod> {
        self.filter_methods(filter, queue).into_iter().next()
    }

    pub fn get_method(&self, id: &str) -> Option<SilentMethod> {
        self.store.get(id)
    }

    /// 按 id 移除描述符；正在提交中的描述符不会再被重新排队
    pub async fn remove_method(&self, id: &str) -> Result<Option<SilentMethod>> {
        let Some(removed) = self.store.remove_by_id(id) else {
            return Ok(None);
        };
        if removed.behavior().is_persisted() {
            self.persistence.remove(id, &self.store).await?;
        }
        tracing::debug!(id, queue = removed.queue(), "silent method removed");
        Ok(Some(removed))
    }

    pub async fn remove_matching(
        &self,
        filter: &MethodFilter,
        queue: Option<&str>,
    ) -> Result<Vec<SilentMethod>> {
        let mut removed = Vec::new();
        for m in self.filter_methods(filter, queue) {
            if let Some(m) = self.remove_method(m.id()).await? {
                removed.push(m);
            }
        }
        Ok(removed)
    }

    /// 替换描述符的请求内容，保持队列位置；silent 描述符会重新持久化
    pub async fn replace_method(&self, id: &str, method: Method) -> Result<SilentMethod> {
        let mut candidate = self.store.get(id).ok_or_else(|| SilentError::NotFound {
            reason: format!("silent method {id}"),
        })?;
        candidate.set_method(method.clone());
        if candidate.behavior().is_persisted() {
            SerializedSilentMethod::encode(&candidate, &self.registry)?;
        }

        let replaced = self
            .store
            .replace_method(id, method)
            .ok_or_else(|| SilentError::NotFound {
                reason: format!("silent method {id}"),
            })?;
        if replaced.behavior().is_persisted() {
            self.persistence
                .save(replaced.id(), &self.registry, &self.store)
                .await?;
        }
        Ok(replaced)
    }

    pub fn queue_len(&self, queue: &str) -> usize {
        self.store.len(queue)
    }

    pub fn queue_names(&self) -> Vec<String> {
        self.store.queue_names()
    }
}

impl std::fmt::Debug for SilentQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SilentQueue")
            .field("config", &self.config)
            .field("serializers", &self.registry.names())
            .field("queues", &self.store.queue_names())
            .field("booted", &self.is_booted())
            .finish_non_exhaustive()
    }
}
