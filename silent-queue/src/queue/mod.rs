//! 队列存储与持久化
//!
mod persistence;
mod store;

pub use persistence::{BootDiagnostic, Rehydrator};

pub(crate) use persistence::QueuePersistence;
pub(crate) use store::QueueStore;
