//! 描述符持久化模型（SerializedSilentMethod）
//!
//! 定义 silent 描述符在存储层的标准形态，以及与运行时 `SilentMethod` 之间的转换。
//! 持久化形态只包含数据，回调在恢复后由 rehydrator 重新挂载。
//!
use super::{Method, MethodHandlers, MethodType, SilentMethod};
use crate::behavior::Behavior;
use crate::error::SilentResult as Result;
use crate::serializer::{SerializerRegistry, StoredValue};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedSilentMethod {
    /// 描述符唯一标识
    id: String,
    /// 所属队列
    queue: String,
    /// 解析后的行为
    behavior: Behavior,
    /// 编码后的请求描述
    method: StoredMethod,
    /// 重试预算
    retry: usize,
    /// 单次尝试超时（毫秒）
    timeout_ms: u64,
    /// 下一轮重试间隔（毫秒）
    next_round_ms: Option<u64>,
    /// 已使用的尝试次数
    attempts_used: usize,
    /// 最近一次失败原因
    last_error: Option<String>,
    /// 创建时间
    created_at: DateTime<Utc>,
    /// 入队时是否绑定了 fallback 回调
    #[serde(default)]
    needs_fallback: bool,
}

impl SerializedSilentMethod {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }

    pub fn behavior(&self) -> Behavior {
        self.behavior
    }

    pub fn method(&self) -> &StoredMethod {
        &self.method
    }

    pub fn retry(&self) -> usize {
        self.retry
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    pub fn next_round_ms(&self) -> Option<u64> {
        self.next_round_ms
    }

    pub fn attempts_used(&self) -> usize {
        self.attempts_used
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn needs_fallback(&self) -> bool {
        self.needs_fallback
    }

    /// 从运行时描述符编码
    pub fn encode(method: &SilentMethod, registry: &SerializerRegistry) -> Result<Self> {
        Ok(Self {
            id: method.id.clone(),
            queue: method.queue.clone(),
            behavior: method.behavior,
            method: StoredMethod::encode(&method.method, registry)?,
            retry: method.retry,
            timeout_ms: millis(method.timeout),
            next_round_ms: method.next_round.map(millis),
            attempts_used: method.attempts_used,
            last_error: method.last_error.clone(),
            created_at: method.created_at,
            needs_fallback: method.handlers.has_fallback(),
        })
    }

    /// 还原为不带回调的运行时描述符
    pub fn decode(self, registry: &SerializerRegistry) -> Result<SilentMethod> {
        let retry = self.retry.max(1);
        Ok(SilentMethod {
            id: self.id,
            method: self.method.decode(registry)?,
            queue: self.queue,
            behavior: self.behavior,
            retry,
            timeout: Duration::from_millis(self.timeout_ms),
            next_round: self.next_round_ms.map(Duration::from_millis),
            attempts_used: self.attempts_used.min(retry),
            last_error: self.last_error,
            created_at: self.created_at,
            handlers: MethodHandlers::default(),
        })
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// 请求描述的持久化形态，每个载荷值都经过序列化器编码
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMethod {
    name: Option<String>,
    kind: MethodType,
    url: String,
    #[serde(default)]
    params: BTreeMap<String, StoredValue>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    data: Option<StoredValue>,
    #[serde(default)]
    config: BTreeMap<String, StoredValue>,
}

impl StoredMethod {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn encode(method: &Method, registry: &SerializerRegistry) -> Result<Self> {
        Ok(Self {
            name: method.explicit_name().map(str::to_string),
            kind: method.kind(),
            url: method.url().to_string(),
            params: encode_map(method.params(), registry)?,
            headers: method.headers().clone(),
            data: method.data().map(|v| registry.encode(v)).transpose()?,
            config: encode_map(method.config(), registry)?,
        })
    }

    pub fn decode(self, registry: &SerializerRegistry) -> Result<Method> {
        Ok(Method::from_parts(
            self.name,
            self.kind,
            self.url,
            decode_map(self.params, registry)?,
            self.headers,
            self.data.map(|v| registry.decode(v)).transpose()?,
            decode_map(self.config, registry)?,
        ))
    }
}

fn encode_map(
    map: &BTreeMap<String, Value>,
    registry: &SerializerRegistry,
) -> Result<BTreeMap<String, StoredValue>> {
    map.iter()
        .map(|(k, v)| -> Result<(String, StoredValue)> { Ok((k.clone(), registry.encode(v)?)) })
        .collect()
}

fn decode_map(
    map: BTreeMap<String, StoredValue>,
    registry: &SerializerRegistry,
) -> Result<BTreeMap<String, Value>> {
    map.into_iter()
        .map(|(k, v)| -> Result<(String, Value)> { Ok((k, registry.decode(v)?)) })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SilentError;
    use crate::options::SubmitOptions;
    use chrono::TimeZone;
    use regex::Regex;

    fn sample_method() -> Method {
        let due = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        Method::builder()
            .name("addTodo")
            .kind(MethodType::Post)
            .url("/todos")
            .params(BTreeMap::from([("draft".to_string(), Value::Bool(true))]))
            .headers(BTreeMap::from([("x-client".to_string(), "cli".to_string())]))
            .data(Value::Object(BTreeMap::from([
                ("title".to_string(), Value::from("buy milk")),
                ("due".to_string(), Value::Date(due)),
            ])))
            .config(BTreeMap::from([(
                "cacheKey".to_string(),
                Value::Pattern(Regex::new("^todos").unwrap()),
            )]))
            .build()
    }

    #[test]
    fn encode_decode_roundtrip_through_json() {
        let options = SubmitOptions::builder()
            .retry(4)
            .next_round(Duration::from_millis(1500))
            .queue("todos")
            .handlers(MethodHandlers::new().on_fallback(|_| Ok(())))
            .build();
        let fresh = SilentMethod::new(sample_method(), Behavior::Silent, &options);
        let registry = SerializerRegistry::default();

        let record = SerializedSilentMethod::encode(&fresh, &registry).unwrap();
        assert!(record.needs_fallback());
        assert_eq!(record.next_round_ms(), Some(1500));

        let json = serde_json::to_string(&record).unwrap();
        let record: SerializedSilentMethod = serde_json::from_str(&json).unwrap();
        let restored = record.decode(&registry).unwrap();

        assert_eq!(restored.id(), fresh.id());
        assert_eq!(restored.method(), fresh.method());
        assert_eq!(restored.queue(), "todos");
        assert_eq!(restored.retry(), 4);
        assert_eq!(restored.next_round(), Some(Duration::from_millis(1500)));
        assert_eq!(restored.timeout(), fresh.timeout());
        assert!(restored.handlers().is_empty());
    }

    #[test]
    fn decode_with_unknown_serializer_fails() {
        let options = SubmitOptions::default();
        let fresh = SilentMethod::new(sample_method(), Behavior::Silent, &options);
        let record = SerializedSilentMethod::encode(&fresh, &SerializerRegistry::default()).unwrap();

        let err = record.decode(&SerializerRegistry::empty()).unwrap_err();
        assert!(matches!(err, SilentError::UnknownSerializer { .. }));
    }
}
