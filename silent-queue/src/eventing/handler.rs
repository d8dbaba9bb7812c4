//! 事件处理器（EventHandler）
//!
//! 定义消费某类/多类/全部事件的处理逻辑与元信息（名称、订阅类型）。
//!
use super::{EventKind, SilentEvent};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandledEventKind {
    One(EventKind),
    Many(Vec<EventKind>),
    All,
}

impl HandledEventKind {
    pub fn accepts(&self, kind: EventKind) -> bool {
        match self {
            HandledEventKind::One(k) => *k == kind,
            HandledEventKind::Many(ks) => ks.contains(&kind),
            HandledEventKind::All => true,
        }
    }
}

impl From<EventKind> for HandledEventKind {
    fn from(kind: EventKind) -> Self {
        HandledEventKind::One(kind)
    }
}

/// 事件处理器：同步执行，返回错误时中断当前事件的分发
pub trait EventHandler: Send + Sync {
    /// 处理器名称（用于日志）
    fn handler_name(&self) -> &str;
    /// 返回该处理器订阅的事件类型
    fn handled_event_kind(&self) -> HandledEventKind;
    /// 处理事件
    fn handle(&self, event: &SilentEvent) -> anyhow::Result<()>;
}

/// 闭包处理器
pub struct FnHandler<F> {
    name: String,
    kind: HandledEventKind,
    f: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&SilentEvent) -> anyhow::Result<()> + Send + Sync,
{
    pub fn new(name: impl Into<String>, kind: impl Into<HandledEventKind>, f: F) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            f,
        }
    }
}

impl<F> EventHandler for FnHandler<F>
where
    F: Fn(&SilentEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn handler_name(&self) -> &str {
        &self.name
    }

    fn handled_event_kind(&self) -> HandledEventKind {
        self.kind.clone()
    }

    fn handle(&self, event: &SilentEvent) -> anyhow::Result<()> {
        (self.f)(event)
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
