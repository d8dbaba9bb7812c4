//! 静默提交队列（silent-queue）
//!
//! 客户端侧的写操作排队引擎：调用方发起的请求可以直接执行、进入内存队列，
//! 或在持久化后进入队列，由后台循环按节奏提交、重试，并跨进程重启恢复。
//! - 行为解析（`behavior`）：static / queue / silent，支持提交时动态求值
//! - 序列化器（`serializer`）：日期、正则与自定义载荷的持久化编码
//! - 持久化适配器（`storage`）：由宿主注入的键值存储
//! - 队列（`queue`）：具名先进先出队列及其持久化镜像
//! - 提交引擎（`engine`）：重试/超时/回退策略与启动恢复
//! - 事件系统（`eventing`）与过滤器（`filter`）
//!
//! 引擎不关心请求如何发出，网络调用通过 `transport::RequestExecutor` 注入。
//!
//! 典型用法：
//! 1. 实现 `RequestExecutor` 并选择一个 `StorageAdapter`；
//! 2. 通过 `SilentQueue::builder()` 构建引擎，注册事件处理器；
//! 3. 调用 `boot` 恢复队列并启动提交循环；
//! 4. 使用 `submit` 提交请求，必要时在 `before_push_queue` 中去重。
//!
pub mod behavior;
pub mod engine;
pub mod error;
pub mod eventing;
pub mod filter;
pub mod method;
pub mod options;
pub mod queue;
pub mod serializer;
pub mod storage;
pub mod transport;
pub mod value;

pub use behavior::{Behavior, BehaviorConfig};
pub use engine::{BootReport, EngineHandle, SilentQueue, SilentQueueConfig, Submission};
pub use error::{SilentError, SilentResult};
pub use eventing::{EventKind, PushQueueEvent, PushedQueueEvent, SilentEvent, SubmitEvent};
pub use filter::MethodFilter;
pub use method::{Method, MethodHandlers, MethodType, SilentMethod};
pub use options::SubmitOptions;
pub use queue::BootDiagnostic;
pub use serializer::{DataSerializer, SerializerRegistry, serializer};
pub use storage::{MemoryStorage, StorageAdapter};
pub use transport::{RequestExecutor, SubmitError, TransportError};
pub use value::{CustomValue, Value};
