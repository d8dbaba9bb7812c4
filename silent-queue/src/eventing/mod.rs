//! 事件系统
//!
//! - `SilentEvent`：引擎在入队、提交与启动阶段产生的事件；
//! - `EventHandler`：订阅一类/多类/全部事件的处理器；
//! - `EventBus`：进程内同步分发，处理器错误向调用方传播。
//!
mod bus;
mod event;
mod handler;

pub use bus::EventBus;
pub use event::{EventKind, PushQueueEvent, PushedQueueEvent, SilentEvent, SubmitEvent};
pub use handler::{EventHandler, FnHandler, HandledEventKind};
