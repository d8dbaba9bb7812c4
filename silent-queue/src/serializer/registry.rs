//! 序列化器注册表（SerializerRegistry）
//!
//! 按注册顺序保存命名序列化器（内置在前），编码时对值树每个节点依次尝试，
//! 第一个认领的序列化器胜出，其名称随载荷一起保存；解码时按名称查找。
//!
use super::builtin::{DATE_SERIALIZER, DateSerializer, REGEXP_SERIALIZER, RegExpSerializer};
use super::{DataSerializer, StoredValue};
use crate::error::{SilentError, SilentResult as Result};
use crate::value::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct SerializerRegistry {
    entries: Vec<(String, Arc<dyn DataSerializer>)>,
}

impl Default for SerializerRegistry {
    /// 带内置 `date`、`regexp` 序列化器的注册表
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(DATE_SERIALIZER, Arc::new(DateSerializer));
        registry.register(REGEXP_SERIALIZER, Arc::new(RegExpSerializer));
        registry
    }
}

impl SerializerRegistry {
    /// 不含任何内置序列化器的注册表
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 注册序列化器；同名时原位替换（保持原有匹配顺序）
    pub fn register(&mut self, name: impl Into<String>, serializer: Arc<dyn DataSerializer>) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = serializer,
            None => self.entries.push((name, serializer)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn DataSerializer>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, s)| s)
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// 编码整棵值树
    pub fn encode(&self, value: &Value) -> Result<StoredValue> {
        if let Some((name, payload)) = self.forward(value) {
            return Ok(StoredValue::Serialized {
                name: name.to_string(),
                payload,
            });
        }

        match value {
            Value::Null => Ok(StoredValue::Raw(serde_json::Value::Null)),
            Value::Bool(b) => Ok(StoredValue::Raw(serde_json::Value::Bool(*b))),
            Value::Number(n) => Ok(StoredValue::Raw(serde_json::Value::Number(n.clone()))),
            Value::String(s) => Ok(StoredValue::Raw(serde_json::Value::String(s.clone()))),
            Value::Array(items) => items
                .iter()
                .map(|item| self.encode(item))
                .collect::<Result<Vec<_>>>()
                .map(StoredValue::Array),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| -> Result<(String, StoredValue)> { Ok((k.clone(), self.encode(v)?)) })
                .collect::<Result<_>>()
                .map(StoredValue::Object),
            Value::Date(_) | Value::Pattern(_) | Value::Custom(_) => Err(SilentError::serialize(
                format!("no serializer claims value of kind `{}`", value.kind()),
            )),
        }
    }

    /// 解码整棵值树；未知的序列化器名称视为错误
    pub fn decode(&self, stored: StoredValue) -> Result<Value> {
        match stored {
            StoredValue::Raw(json) => Ok(Value::from(json)),
            StoredValue::Array(items) => items
                .into_iter()
                .map(|item| self.decode(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            StoredValue::Object(map) => map
                .into_iter()
                .map(|(k, v)| -> Result<(String, Value)> { Ok((k, self.decode(v)?)) })
                .collect::<Result<_>>()
                .map(Value::Object),
            StoredValue::Serialized { name, payload } => match self.get(&name) {
                Some(serializer) => serializer.backward(payload),
                None => Err(SilentError::UnknownSerializer { name }),
            },
        }
    }

    fn forward(&self, value: &Value) -> Option<(&str, serde_json::Value)> {
        self.entries
            .iter()
            .find_map(|(name, s)| s.forward(value).map(|payload| (name.as_str(), payload)))
    }
}

impl FromIterator<(String, Arc<dyn DataSerializer>)> for SerializerRegistry {
    /// 以内置序列化器为底，合并调用方提供的序列化器
    fn from_iter<I: IntoIterator<Item = (String, Arc<dyn DataSerializer>)>>(iter: I) -> Self {
        let mut registry = Self::default();
        registry.extend(iter);
        registry
    }
}

impl Extend<(String, Arc<dyn DataSerializer>)> for SerializerRegistry {
    fn extend<I: IntoIterator<Item = (String, Arc<dyn DataSerializer>)>>(&mut self, iter: I) {
        for (name, serializer) in iter {
            self.register(name, serializer);
        }
    }
}
