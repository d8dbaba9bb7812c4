use crate::value::Value;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 请求方法类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MethodType {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MethodType::Get => "GET",
            MethodType::Post => "POST",
            MethodType::Put => "PUT",
            MethodType::Patch => "PATCH",
            MethodType::Delete => "DELETE",
            MethodType::Head => "HEAD",
            MethodType::Options => "OPTIONS",
        };
        f.write_str(s)
    }
}

/// 请求描述：引擎不关心如何发送，只负责保存并交给 `RequestExecutor`
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct Method {
    /// 方法名，过滤匹配时使用；未设置时以 url 代替
    #[builder(into)]
    name: Option<String>,
    #[builder(default)]
    kind: MethodType,
    #[builder(into)]
    url: String,
    #[builder(default)]
    params: BTreeMap<String, Value>,
    #[builder(default)]
    headers: BTreeMap<String, String>,
    #[builder(into)]
    data: Option<Value>,
    /// 传输层专用配置，引擎原样保存
    #[builder(default)]
    config: BTreeMap<String, Value>,
}

impl Method {
    pub fn new(kind: MethodType, url: impl Into<String>) -> Self {
        Self {
            name: None,
            kind,
            url: url.into(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            data: None,
            config: BTreeMap::new(),
        }
    }

    /// 匹配用名称
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    pub fn explicit_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn kind(&self) -> MethodType {
        self.kind
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn params(&self) -> &BTreeMap<String, Value> {
        &self.params
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    pub fn config(&self) -> &BTreeMap<String, Value> {
        &self.config
    }

    pub(crate) fn from_parts(
        name: Option<String>,
        kind: MethodType,
        url: String,
        params: BTreeMap<String, Value>,
        headers: BTreeMap<String, String>,
        data: Option<Value>,
        config: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            name,
            kind,
            url,
            params,
            headers,
            data,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_falls_back_to_url() {
        let m = Method::new(MethodType::Delete, "/todos/1");
        assert_eq!(m.name(), "/todos/1");
        assert_eq!(m.explicit_name(), None);

        let m = Method::builder().name("removeTodo").url("/todos/1").build();
        assert_eq!(m.name(), "removeTodo");
        assert_eq!(m.kind(), MethodType::Post);
        assert_eq!(m.kind().to_string(), "POST");
    }
}
