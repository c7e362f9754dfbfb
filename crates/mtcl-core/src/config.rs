//! 配置解析：符号化组件名到 `(transport, endpoint)` 对的映射（C9，spec.md §6.4）。
//!
//! # 设计背景（Why）
//! - 没有配置文档时,`connect` 只接受裸的 `SCHEME:rest` 地址；配置文档存在时,
//!   符号名可以解析成若干候选 `(protocol, endpoint)` 对,取第一个其协议已注册
//!   的驱动。JSON 加载与 CLI 胶水代码明确排除在 spec.md §1 的范围之外,这里
//!   只实现 TOML 驱动的解析器契约。
use std::collections::HashMap;

use serde::Deserialize;

/// 一个命名组件：host、支持的协议（有序）、监听端点（有序）。
#[derive(Debug, Clone, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub protocols: Vec<String>,
    #[serde(default, rename = "listen-endpoints")]
    pub listen_endpoints: Vec<String>,
}

impl ComponentConfig {
    /// 按协议优先级顺序,返回第一个**调用方已注册了驱动**的协议对应的
    /// `SCHEME:rest` 连接地址。一个组件可能声明了本进程未链接驱动的协议
    /// （例如配置里排在前面的 `UCX`,但进程只注册了 `TCP` 驱动）,此时必须跳过
    /// 它,否则 `resolve` 会把一个没有驱动能处理的地址交给 `Manager::connect`。
    ///
    /// 本仓库把"协议"与"连接目标"等同看待（协议本身就是地址前缀,例如
    /// `TCP`）,因此返回 `protocol:host`,与 `listen-endpoints` 条目格式一致。
    pub fn first_connect_address(&self, registered_schemes: &[&str]) -> Option<String> {
        let host = self.host.as_deref()?;
        self.protocols
            .iter()
            .find(|scheme| registered_schemes.contains(&scheme.as_str()))
            .map(|scheme| format!("{scheme}:{host}"))
    }
}

/// 组件名 → 连接地址的解析器接口,供 `Manager::connect` 消费。
pub trait ConfigurationSource: Send + Sync {
    /// 解析一个符号组件名到一个 `SCHEME:rest` 地址；未知组件名,或组件声明的
    /// 协议里没有一个在 `registered_schemes` 中,都返回 `None`。
    fn resolve(&self, name: &str, registered_schemes: &[&str]) -> Option<String>;

    /// 返回某个组件自身声明的监听端点,供团队根在 `listen` 时使用。
    fn listen_endpoints(&self, name: &str) -> Vec<String>;
}

/// 从解析后的 TOML 文档构造的内存态配置源。
///
/// 对应 spec.md §6.4 "An optional configuration document names components";
/// 文档结构与教师仓库的 TOML 配置风格一致：顶层 `[[component]]` 数组。
pub struct StaticConfiguration {
    components: HashMap<String, ComponentConfig>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, rename = "component")]
    components: Vec<ComponentConfig>,
}

impl StaticConfiguration {
    pub fn from_toml_str(document: &str) -> Result<Self, toml::de::Error> {
        let raw: RawDocument = toml::from_str(document)?;
        let components = raw.components.into_iter().map(|c| (c.name.clone(), c)).collect();
        Ok(Self { components })
    }

    pub fn from_components(components: Vec<ComponentConfig>) -> Self {
        Self {
            components: components.into_iter().map(|c| (c.name.clone(), c)).collect(),
        }
    }

    pub fn component(&self, name: &str) -> Option<&ComponentConfig> {
        self.components.get(name)
    }
}

impl ConfigurationSource for StaticConfiguration {
    fn resolve(&self, name: &str, registered_schemes: &[&str]) -> Option<String> {
        self.components.get(name).and_then(|c| c.first_connect_address(registered_schemes))
    }

    fn listen_endpoints(&self, name: &str) -> Vec<String> {
        self.components.get(name).map(|c| c.listen_endpoints.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_first_protocol_as_connect_address() {
        let doc = r#"
            [[component]]
            name = "App1"
            host = "10.0.0.1:9000"
            protocols = ["TCP", "UCX"]
            listen-endpoints = ["TCP:0.0.0.0:9000"]
        "#;
        let config = StaticConfiguration::from_toml_str(doc).unwrap();
        assert_eq!(config.resolve("App1", &["TCP", "UCX"]).as_deref(), Some("TCP:10.0.0.1:9000"));
        assert_eq!(config.listen_endpoints("App1"), vec!["TCP:0.0.0.0:9000".to_string()]);
        assert!(config.resolve("Unknown", &["TCP"]).is_none());
    }

    #[test]
    fn resolve_skips_protocols_with_no_registered_driver() {
        let doc = r#"
            [[component]]
            name = "App1"
            host = "10.0.0.1:9000"
            protocols = ["UCX", "TCP"]
        "#;
        let config = StaticConfiguration::from_toml_str(doc).unwrap();
        assert_eq!(config.resolve("App1", &["TCP"]).as_deref(), Some("TCP:10.0.0.1:9000"));
        assert!(config.resolve("App1", &["MQTT"]).is_none());
    }
}
