//! 序列化器（serializer）
//!
//! 将无法直接持久化的载荷值（日期、正则、自定义类型）转换为可存储形态：
//! - `DataSerializer`：命名的 forward/backward 转换对；
//! - `SerializerRegistry`：按注册顺序匹配序列化器，编码/解码整棵值树；
//! - `StoredValue`：值树的持久化形态，已序列化节点携带序列化器名称。
//!
mod builtin;
mod registry;

pub use builtin::{DATE_SERIALIZER, DateSerializer, REGEXP_SERIALIZER, RegExpSerializer};
pub use registry::SerializerRegistry;

use crate::{error::SilentResult as Result, value::Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// 数据序列化器
pub trait DataSerializer: Send + Sync {
    /// 尝试转换一个值；返回 `None` 表示不处理该值
    fn forward(&self, value: &Value) -> Option<serde_json::Value>;

    /// 从 forward 的产物还原原始值
    fn backward(&self, payload: serde_json::Value) -> Result<Value>;
}

impl<T> DataSerializer for Arc<T>
where
    T: DataSerializer + ?Sized,
{
    fn forward(&self, value: &Value) -> Option<serde_json::Value> {
        (**self).forward(value)
    }

    fn backward(&self, payload: serde_json::Value) -> Result<Value> {
        (**self).backward(payload)
    }
}

/// 由一对闭包组成的序列化器
pub struct FnSerializer<F, B> {
    forward: F,
    backward: B,
}

impl<F, B> DataSerializer for FnSerializer<F, B>
where
    F: Fn(&Value) -> Option<serde_json::Value> + Send + Sync,
    B: Fn(serde_json::Value) -> Result<Value> + Send + Sync,
{
    fn forward(&self, value: &Value) -> Option<serde_json::Value> {
        (self.forward)(value)
    }

    fn backward(&self, payload: serde_json::Value) -> Result<Value> {
        (self.backward)(payload)
    }
}

/// 以闭包构造序列化器
pub fn serializer<F, B>(forward: F, backward: B) -> Arc<dyn DataSerializer>
where
    F: Fn(&Value) -> Option<serde_json::Value> + Send + Sync + 'static,
    B: Fn(serde_json::Value) -> Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnSerializer { forward, backward })
}

/// 值树的持久化形态
///
/// 采用相邻标签编码，调用方数据中的任意字段都不会与序列化标记冲突。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StoredValue {
    Raw(serde_json::Value),
    Array(Vec<StoredValue>),
    Object(BTreeMap<String, StoredValue>),
    Serialized {
        name: String,
        payload: serde_json::Value,
    },
}

impl StoredValue {
    /// 该节点（不含子节点）使用的序列化器名称
    pub fn serializer_name(&self) -> Option<&str> {
        match self {
            StoredValue::Serialized { name, .. } => Some(name),
            _ => None,
        }
    }
}
