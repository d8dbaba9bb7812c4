use async_trait::async_trait;
use silent_queue::{
    Behavior, BehaviorConfig, MemoryStorage, Method, MethodFilter, MethodType, RequestExecutor,
    SilentQueue, SilentQueueConfig, SubmitOptions, TransportError, Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 模拟网络：离线时所有请求都以可重试错误失败
#[derive(Default)]
struct FlakyNetwork {
    online: AtomicBool,
}

#[async_trait]
impl RequestExecutor for FlakyNetwork {
    async fn execute(&self, method: &Method) -> Result<serde_json::Value, TransportError> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(TransportError::retriable("network unreachable"));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(serde_json::json!({ "ok": true, "url": method.url() }))
    }
}

fn engine(network: Arc<FlakyNetwork>, storage: &MemoryStorage) -> Arc<SilentQueue> {
    let queue = Arc::new(
        SilentQueue::builder()
            .executor(network)
            .storage(Arc::new(storage.clone()))
            .config(SilentQueueConfig {
                delay_ms: 200,
                ..Default::default()
            })
            .build(),
    );

    // 同名请求只保留最新的一条
    queue.on_before_push_queue(|event| {
        let evicted = event.evict_matching(&MethodFilter::name(event.method().name()));
        if evicted > 0 {
            println!("dedup: evicted {evicted} pending `{}`", event.method().name());
        }
        Ok(())
    });
    queue.on_success(|e| {
        println!(
            "success: {} {} (retried {} times)",
            e.method.method().kind(),
            e.method.method().url(),
            e.retried_times
        );
        Ok(())
    });
    queue.on_error(|e| {
        println!("error: {} -> {:?}", e.method.name(), e.error);
        Ok(())
    });
    queue
}

fn save_draft(title: &str) -> Method {
    Method::builder()
        .name("saveDraft")
        .kind(MethodType::Put)
        .url("/drafts/1")
        .data(Value::from(title))
        .build()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let storage = MemoryStorage::new();

    // 第一次运行：离线，请求被持久化后排队
    {
        let network = Arc::new(FlakyNetwork::default());
        let queue = engine(network.clone(), &storage);
        let handle = queue.boot().await?;

        let flag = network.clone();
        let behavior = BehaviorConfig::dynamic(move || {
            if flag.online.load(Ordering::SeqCst) {
                Behavior::Static
            } else {
                Behavior::Silent
            }
        });
        let options = SubmitOptions::builder()
            .behavior(behavior)
            .retry(10)
            .build();

        for title in ["first draft", "second draft", "final draft"] {
            let submission = queue.submit(save_draft(title), options.clone()).await?;
            println!("submitted `{title}`: queued={}", submission.queued().is_some());
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        println!(
            "offline: {} pending, storage keys: {:?}",
            queue.queue_len("default"),
            storage.keys().await
        );

        handle.shutdown();
        handle.join().await;
    }

    // 第二次运行：恢复网络，从存储中恢复并提交
    let network = Arc::new(FlakyNetwork::default());
    network.online.store(true, Ordering::SeqCst);
    let queue = engine(network, &storage);
    let handle = queue.boot().await?;
    tracing::info!(
        restored = handle.report().restored,
        dropped = handle.report().dropped.len(),
        "restarted"
    );

    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while !queue.queue_names().is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;

    println!("done: storage keys: {:?}", storage.keys().await);
    handle.shutdown();
    handle.join().await;
    Ok(())
}
