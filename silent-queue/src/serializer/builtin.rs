//! 内置序列化器：`date` 与 `regexp`
//!
use super::DataSerializer;
use crate::error::{SilentError, SilentResult as Result};
use crate::value::Value;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

pub const DATE_SERIALIZER: &str = "date";
pub const REGEXP_SERIALIZER: &str = "regexp";

/// 日期 <-> RFC 3339 字符串；还原时也接受毫秒时间戳
#[derive(Debug, Clone, Copy, Default)]
pub struct DateSerializer;

impl DataSerializer for DateSerializer {
    fn forward(&self, value: &Value) -> Option<serde_json::Value> {
        let date = value.as_date()?;
        Some(serde_json::Value::String(
            date.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        ))
    }

    fn backward(&self, payload: serde_json::Value) -> Result<Value> {
        match payload {
            serde_json::Value::String(s) => {
                let date = DateTime::parse_from_rfc3339(&s)?;
                Ok(Value::Date(date.with_timezone(&Utc)))
            }
            serde_json::Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(Value::Date)
                .ok_or_else(|| SilentError::Parse {
                    reason: format!("timestamp out of range: {n}"),
                }),
            other => Err(SilentError::Parse {
                reason: format!("unexpected date payload: {other}"),
            }),
        }
    }
}

/// 正则 <-> 源字符串（标志位以内联语法 `(?i)` 保留在源中）
#[derive(Debug, Clone, Copy, Default)]
pub struct RegExpSerializer;

impl DataSerializer for RegExpSerializer {
    fn forward(&self, value: &Value) -> Option<serde_json::Value> {
        let pattern = value.as_pattern()?;
        Some(serde_json::Value::String(pattern.as_str().to_string()))
    }

    fn backward(&self, payload: serde_json::Value) -> Result<Value> {
        let serde_json::Value::String(source) = payload else {
            return Err(SilentError::Parse {
                reason: format!("unexpected regexp payload: {payload}"),
            });
        };
        Ok(Value::Pattern(Regex::new(&source)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn date_roundtrip_keeps_sub_second_precision() {
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let payload = DateSerializer.forward(&Value::Date(date)).unwrap();
        assert_eq!(DateSerializer.backward(payload).unwrap(), Value::Date(date));
    }

    #[test]
    fn date_accepts_epoch_millis() {
        let v = DateSerializer
            .backward(serde_json::json!(1_700_000_000_000_i64))
            .unwrap();
        assert_eq!(
            v.as_date().map(|d| d.timestamp_millis()),
            Some(1_700_000_000_000)
        );
    }

    #[test]
    fn date_ignores_other_values() {
        assert!(DateSerializer.forward(&Value::from("2024-01-01")).is_none());
    }

    #[test]
    fn regexp_roundtrip_and_invalid_source() {
        let re = Regex::new("(?i)^order-[0-9]+$").unwrap();
        let payload = RegExpSerializer.forward(&Value::Pattern(re.clone())).unwrap();
        let back = RegExpSerializer.backward(payload).unwrap();
        assert!(back.as_pattern().unwrap().is_match("ORDER-42"));

        let err = RegExpSerializer
            .backward(serde_json::json!("(unclosed"))
            .unwrap_err();
        assert!(matches!(err, SilentError::Pattern { .. }));
    }
}
