use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 默认唤醒间隔（毫秒）
pub const DEFAULT_DELAY_MS: u64 = 2000;
/// 默认存储命名空间
pub const DEFAULT_NAMESPACE: &str = "silentq";

/// 静默队列配置
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilentQueueConfig {
    /// 提交循环的唤醒间隔（毫秒）
    pub delay_ms: u64,
    /// 持久化键的前缀
    pub namespace: String,
}

impl SilentQueueConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms.max(1))
    }
}

impl Default for SilentQueueConfig {
    fn default() -> Self {
        Self {
            delay_ms: DEFAULT_DELAY_MS,
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: SilentQueueConfig = serde_json::from_str(r#"{"delay_ms": 500}"#).unwrap();
        assert_eq!(config.delay(), Duration::from_millis(500));
        assert_eq!(config.namespace, DEFAULT_NAMESPACE);

        let zero = SilentQueueConfig {
            delay_ms: 0,
            ..Default::default()
        };
        assert_eq!(zero.delay(), Duration::from_millis(1));
    }
}
