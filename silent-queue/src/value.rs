//! 载荷值（Value）
//!
//! 方法参数、请求体与传输配置中的动态值树。除 JSON 原生类型外，还包含
//! 无法直接持久化的日期、正则与调用方自定义类型，这些值需要借助
//! `SerializerRegistry` 才能写入存储。
//!
use chrono::{DateTime, Utc};
use regex::Regex;
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// 动态载荷值
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    /// 时间值，由内置 `date` 序列化器处理
    Date(DateTime<Utc>),
    /// 正则，由内置 `regexp` 序列化器处理
    Pattern(Regex),
    /// 调用方自定义类型，必须注册对应的序列化器才能持久化
    Custom(CustomValue),
}

impl Value {
    pub fn custom<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Value::Custom(CustomValue::new(value))
    }

    /// 值的种类名称，用于诊断信息
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Date(_) => "date",
            Value::Pattern(_) => "pattern",
            Value::Custom(c) => c.type_name(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_pattern(&self) -> Option<&Regex> {
        match self {
            Value::Pattern(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_custom(&self) -> Option<&CustomValue> {
        match self {
            Value::Custom(c) => Some(c),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Pattern(a), Value::Pattern(b)) => a.as_str() == b.as_str(),
            (Value::Custom(a), Value::Custom(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value.into())
    }
}

impl From<f64> for Value {
    /// NaN 与无穷大无法表示为 JSON 数字，转换为 `Null`
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Date(value)
    }
}

impl From<Regex> for Value {
    fn from(value: Regex) -> Self {
        Value::Pattern(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

/// 类型擦除的自定义值
///
/// 相等性按引用判断；需要比较内容时请通过 `downcast_ref` 取回原始类型。
#[derive(Clone)]
pub struct CustomValue {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl CustomValue {
    pub fn new<T>(value: T) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            type_name: type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: Any>(&self) -> bool {
        self.inner.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &CustomValue) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Money {
        cents: i64,
    }

    #[test]
    fn json_values_convert_recursively() {
        let v = Value::from(serde_json::json!({
            "title": "buy milk",
            "tags": ["home", 1, true, null],
        }));
        let Value::Object(map) = v else {
            panic!("expected object");
        };
        assert_eq!(map["title"], Value::from("buy milk"));
        assert_eq!(
            map["tags"],
            Value::Array(vec![
                Value::from("home"),
                Value::from(1_i64),
                Value::Bool(true),
                Value::Null,
            ])
        );
    }

    #[test]
    fn patterns_compare_by_source() {
        let a = Value::from(Regex::new("^todo-[0-9]+$").unwrap());
        let b = Value::from(Regex::new("^todo-[0-9]+$").unwrap());
        let c = Value::from(Regex::new("^done$").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn custom_values_downcast_and_compare_by_identity() {
        let v = Value::custom(Money { cents: 1250 });
        let c = v.as_custom().unwrap();
        assert!(c.is::<Money>());
        assert_eq!(c.downcast_ref::<Money>(), Some(&Money { cents: 1250 }));
        assert!(v.kind().ends_with("Money"));

        assert_eq!(v, v.clone());
        assert_ne!(v, Value::custom(Money { cents: 1250 }));
    }

    #[test]
    fn non_finite_floats_become_null() {
        assert_eq!(Value::from(f64::NAN), Value::Null);
        assert_eq!(Value::from(1.5_f64), Value::Number(serde_json::Number::from_f64(1.5).unwrap()));
    }
}
