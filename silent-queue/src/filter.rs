//! 描述符过滤（MethodFilter）
//!
//! 按方法名、正则或 `{名称, 谓词}` 组合在队列中定位描述符。
//! 过滤器只负责查找，是否剔除由调用方决定。
//!
use crate::method::SilentMethod;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// 谓词：候选描述符、其在名称匹配结果中的下标、名称匹配结果全集
pub type MethodPredicate = Arc<dyn Fn(&SilentMethod, usize, &[SilentMethod]) -> bool + Send + Sync>;

/// 名称匹配方式
#[derive(Clone, Debug)]
pub enum NameMatcher {
    Exact(String),
    Pattern(Regex),
}

impl NameMatcher {
    pub fn is_match(&self, name: &str) -> bool {
        match self {
            NameMatcher::Exact(n) => n == name,
            NameMatcher::Pattern(re) => re.is_match(name),
        }
    }
}

impl From<&str> for NameMatcher {
    fn from(value: &str) -> Self {
        NameMatcher::Exact(value.to_string())
    }
}

impl From<String> for NameMatcher {
    fn from(value: String) -> Self {
        NameMatcher::Exact(value)
    }
}

impl From<Regex> for NameMatcher {
    fn from(value: Regex) -> Self {
        NameMatcher::Pattern(value)
    }
}

/// 描述符匹配器
#[derive(Clone)]
pub enum MethodFilter {
    /// 方法名完全相等
    Name(String),
    /// 方法名匹配正则
    Pattern(Regex),
    /// 先按名称筛选，再以谓词过滤
    Predicate {
        name: NameMatcher,
        filter: MethodPredicate,
    },
}

impl MethodFilter {
    pub fn name(name: impl Into<String>) -> Self {
        MethodFilter::Name(name.into())
    }

    pub fn pattern(pattern: Regex) -> Self {
        MethodFilter::Pattern(pattern)
    }

    pub fn predicate<F>(name: impl Into<NameMatcher>, filter: F) -> Self
    where
        F: Fn(&SilentMethod, usize, &[SilentMethod]) -> bool + Send + Sync + 'static,
    {
        MethodFilter::Predicate {
            name: name.into(),
            filter: Arc::new(filter),
        }
    }

    fn name_matches(&self, name: &str) -> bool {
        match self {
            MethodFilter::Name(n) => n == name,
            MethodFilter::Pattern(re) => re.is_match(name),
            MethodFilter::Predicate { name: matcher, .. } => matcher.is_match(name),
        }
    }

    /// 在一组按队列顺序排列的描述符中查找匹配项，保持原有顺序
    pub fn apply(&self, methods: &[SilentMethod]) -> Vec<SilentMethod> {
        let named: Vec<SilentMethod> = methods
            .iter()
            .filter(|m| self.name_matches(m.name()))
            .cloned()
            .collect();

        match self {
            MethodFilter::Predicate { filter, .. } => named
                .iter()
                .enumerate()
                .filter(|(i, m)| filter(m, *i, &named))
                .map(|(_, m)| m.clone())
                .collect(),
            _ => named,
        }
    }

    pub fn first(&self, methods: &[SilentMethod]) -> Option<SilentMethod> {
        self.apply(methods).into_iter().next()
    }
}

impl From<&str> for MethodFilter {
    fn from(value: &str) -> Self {
        MethodFilter::name(value)
    }
}

impl From<String> for MethodFilter {
    fn from(value: String) -> Self {
        MethodFilter::Name(value)
    }
}

impl From<Regex> for MethodFilter {
    fn from(value: Regex) -> Self {
        MethodFilter::Pattern(value)
    }
}

impl fmt::Debug for MethodFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodFilter::Name(n) => f.debug_tuple("Name").field(n).finish(),
            MethodFilter::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            MethodFilter::Predicate { name, .. } => f
                .debug_struct("Predicate")
                .field("name", name)
                .finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::Behavior;
    use crate::method::{Method, MethodType};
    use crate::options::SubmitOptions;
    use crate::value::Value;

    fn sm(name: &str, title: &str) -> SilentMethod {
        let method = Method::builder()
            .name(name)
            .kind(MethodType::Post)
            .url("/todos")
            .data(Value::from(title))
            .build();
        SilentMethod::new(method, Behavior::Queue, &SubmitOptions::default())
    }

    fn titles(methods: &[SilentMethod]) -> Vec<&str> {
        methods
            .iter()
            .filter_map(|m| m.method().data().and_then(Value::as_str))
            .collect()
    }

    #[test]
    fn literal_name() {
        let queue = vec![sm("addTodo", "a"), sm("removeTodo", "b"), sm("addTodo", "c")];
        let found = MethodFilter::from("addTodo").apply(&queue);
        assert_eq!(titles(&found), vec!["a", "c"]);
        assert!(MethodFilter::name("editTodo").apply(&queue).is_empty());
    }

    #[test]
    fn pattern_name() {
        let queue = vec![sm("addTodo", "a"), sm("removeTodo", "b"), sm("addNote", "c")];
        let found = MethodFilter::from(Regex::new("Todo$").unwrap()).apply(&queue);
        assert_eq!(titles(&found), vec!["a", "b"]);
    }

    #[test]
    fn predicate_sees_index_within_name_matches() {
        let queue = vec![
            sm("addTodo", "a"),
            sm("removeTodo", "b"),
            sm("addTodo", "c"),
            sm("addTodo", "d"),
        ];
        // 只保留名称匹配结果中的最后一个
        let last = MethodFilter::predicate("addTodo", |_, i, all| i + 1 == all.len());
        assert_eq!(titles(&last.apply(&queue)), vec!["d"]);

        let by_content = MethodFilter::predicate(Regex::new(".*").unwrap(), |m, _, _| {
            m.method().data().and_then(Value::as_str) == Some("b")
        });
        assert_eq!(titles(&by_content.apply(&queue)), vec!["b"]);
        assert_eq!(
            by_content.first(&queue).map(|m| m.name().to_string()),
            Some("removeTodo".to_string())
        );
    }
}
