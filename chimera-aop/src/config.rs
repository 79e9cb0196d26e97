//! AOP 配置
//!
//! 支持从 TOML 读取，所有键使用 kebab-case：
//!
//! ```toml
//! [aop.proxy]
//! proxy-target-class = false
//! optimize = false
//! expose-proxy = true
//!
//! [aop.auto-proxy]
//! bean-names = ["orderService", "tx*"]
//! interceptor-names = ["trace", "performance"]
//! apply-common-first = true
//! ```

use crate::error::AopConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 代理配置标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    /// 强制使用子类代理
    pub proxy_target_class: bool,

    /// 允许激进优化（同样选择子类代理）
    pub optimize: bool,

    /// 冻结后不再允许修改通知器和标志
    pub frozen: bool,

    /// 在 MethodInvocation 中暴露当前代理
    pub expose_proxy: bool,
}

impl ProxyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn proxy_target_class(mut self, value: bool) -> Self {
        self.proxy_target_class = value;
        self
    }

    pub fn optimize(mut self, value: bool) -> Self {
        self.optimize = value;
        self
    }

    pub fn frozen(mut self, value: bool) -> Self {
        self.frozen = value;
        self
    }

    pub fn expose_proxy(mut self, value: bool) -> Self {
        self.expose_proxy = value;
        self
    }
}

/// 按 Bean 名称自动代理的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AutoProxyProperties {
    /// Bean 名称或 `prefix*` / `*suffix` 模式
    pub bean_names: Vec<String>,

    /// 公共拦截器名称，按顺序应用到所有被代理的 Bean
    pub interceptor_names: Vec<String>,

    /// 公共拦截器是否排在 Bean 特定通知器之前
    pub apply_common_first: bool,
}

impl Default for AutoProxyProperties {
    fn default() -> Self {
        Self {
            bean_names: Vec::new(),
            interceptor_names: Vec::new(),
            apply_common_first: true,
        }
    }
}

/// `[aop]` 配置段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AopProperties {
    pub proxy: ProxyConfig,
    pub auto_proxy: AutoProxyProperties,
}

#[derive(Deserialize, Default)]
struct ConfigDocument {
    #[serde(default)]
    aop: AopProperties,
}

impl AopProperties {
    /// 从 TOML 文本读取 `[aop]` 配置段，缺失时使用默认值
    pub fn from_toml_str(content: &str) -> Result<Self, AopConfigError> {
        let document: ConfigDocument =
            toml::from_str(content).map_err(|e| AopConfigError::InvalidProperties(e.to_string()))?;
        tracing::debug!("Loaded AOP properties: {:?}", document.aop);
        Ok(document.aop)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AopConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            AopConfigError::InvalidProperties(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let props = AopProperties::from_toml_str("").unwrap();

        assert_eq!(props.proxy, ProxyConfig::default());
        assert!(props.auto_proxy.apply_common_first);
        assert!(props.auto_proxy.bean_names.is_empty());
    }

    #[test]
    fn test_parse_full_document() {
        let props = AopProperties::from_toml_str(
            r#"
            [server]
            port = 8080

            [aop.proxy]
            proxy-target-class = true
            expose-proxy = true

            [aop.auto-proxy]
            bean-names = ["exactName", "tx*"]
            interceptor-names = ["trace"]
            apply-common-first = false
            "#,
        )
        .unwrap();

        assert_eq!(
            props.proxy,
            ProxyConfig::new().proxy_target_class(true).expose_proxy(true)
        );
        assert_eq!(props.auto_proxy.bean_names, vec!["exactName", "tx*"]);
        assert_eq!(props.auto_proxy.interceptor_names, vec!["trace"]);
        assert!(!props.auto_proxy.apply_common_first);
    }

    #[test]
    fn test_invalid_document() {
        let err = AopProperties::from_toml_str("[aop.proxy]\noptimize = \"yes\"").unwrap_err();
        assert!(matches!(err, AopConfigError::InvalidProperties(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = AopProperties::from_file("/nonexistent/aop.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/aop.toml"));
    }
}
