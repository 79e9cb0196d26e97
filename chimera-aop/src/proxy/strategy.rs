//! 代理策略
//!
//! - 接口转发：只暴露目标实现的接口方法
//! - 子类生成：暴露 `#[aop_class]` 声明的类方法以及接口方法，要求目标类型未被 sealed

use super::AdvisedConfig;
use crate::config::ProxyConfig;
use crate::error::AopConfigError;
use crate::joinpoint::Method;
use crate::target::TargetClass;
use std::fmt;
use std::sync::Arc;

/// 代理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyStrategy {
    InterfaceForwarding,
    SubclassGeneration,
}

impl fmt::Display for ProxyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyStrategy::InterfaceForwarding => f.write_str("interface-forwarding"),
            ProxyStrategy::SubclassGeneration => f.write_str("subclass-generation"),
        }
    }
}

/// 已构建的代理
pub trait AopProxy: Send + Sync + fmt::Debug {
    fn strategy(&self) -> ProxyStrategy;

    fn config(&self) -> &Arc<AdvisedConfig>;

    fn exposes(&self, method: &Method) -> bool;
}

/// 接口转发代理
pub struct InterfaceForwardingProxy {
    config: Arc<AdvisedConfig>,
}

impl InterfaceForwardingProxy {
    pub fn new(config: Arc<AdvisedConfig>) -> Self {
        Self { config }
    }
}

impl AopProxy for InterfaceForwardingProxy {
    fn strategy(&self) -> ProxyStrategy {
        ProxyStrategy::InterfaceForwarding
    }

    fn config(&self) -> &Arc<AdvisedConfig> {
        &self.config
    }

    fn exposes(&self, method: &Method) -> bool {
        self.config.target_class().declares_via_interface(method)
    }
}

impl fmt::Debug for InterfaceForwardingProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterfaceForwardingProxy")
            .field("interfaces", &self.config.target_class().interface_names())
            .finish()
    }
}

/// 子类代理
pub struct SubclassProxy {
    config: Arc<AdvisedConfig>,
}

impl SubclassProxy {
    pub fn new(config: Arc<AdvisedConfig>) -> Result<Self, AopConfigError> {
        config.target_class().check_subclassable()?;
        Ok(Self { config })
    }
}

impl AopProxy for SubclassProxy {
    fn strategy(&self) -> ProxyStrategy {
        ProxyStrategy::SubclassGeneration
    }

    fn config(&self) -> &Arc<AdvisedConfig> {
        &self.config
    }

    fn exposes(&self, method: &Method) -> bool {
        let class = self.config.target_class();
        class.declares_via_class(method) || class.declares_via_interface(method)
    }
}

impl fmt::Debug for SubclassProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubclassProxy")
            .field("class", &self.config.target_class().name())
            .finish()
    }
}

/// 代理工厂：根据配置选择策略并构建代理
pub trait AopProxyFactory: Send + Sync {
    fn create_aop_proxy(&self, config: Arc<AdvisedConfig>) -> Result<Arc<dyn AopProxy>, AopConfigError>;
}

/// 默认代理工厂
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAopProxyFactory;

impl DefaultAopProxyFactory {
    /// 策略选择（按顺序，先命中者生效）：
    /// 1. optimize
    /// 2. proxy_target_class
    /// 3. 目标没有声明任何接口
    ///
    /// 以上都不满足时使用接口转发
    pub fn select_strategy(config: &ProxyConfig, class: &TargetClass) -> ProxyStrategy {
        if config.optimize || config.proxy_target_class || !class.has_interfaces() {
            ProxyStrategy::SubclassGeneration
        } else {
            ProxyStrategy::InterfaceForwarding
        }
    }
}

impl AopProxyFactory for DefaultAopProxyFactory {
    fn create_aop_proxy(&self, config: Arc<AdvisedConfig>) -> Result<Arc<dyn AopProxy>, AopConfigError> {
        let strategy = Self::select_strategy(config.proxy_config(), config.target_class());
        tracing::debug!(
            "Creating {} proxy for '{}' with {} advisor(s)",
            strategy,
            config.target_class().name(),
            config.advisors().len()
        );

        let proxy: Arc<dyn AopProxy> = match strategy {
            ProxyStrategy::InterfaceForwarding => Arc::new(InterfaceForwardingProxy::new(config)),
            ProxyStrategy::SubclassGeneration => Arc::new(SubclassProxy::new(config)?),
        };
        Ok(proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pointcut::test_support::*;

    #[test]
    fn test_select_strategy() {
        let with_interfaces = order_service();
        let without_interfaces = user_repository();
        let defaults = ProxyConfig::default();

        assert_eq!(
            DefaultAopProxyFactory::select_strategy(&defaults, &with_interfaces),
            ProxyStrategy::InterfaceForwarding
        );
        assert_eq!(
            DefaultAopProxyFactory::select_strategy(&defaults, &without_interfaces),
            ProxyStrategy::SubclassGeneration
        );
        assert_eq!(
            DefaultAopProxyFactory::select_strategy(&defaults.optimize(true), &with_interfaces),
            ProxyStrategy::SubclassGeneration
        );
        assert_eq!(
            DefaultAopProxyFactory::select_strategy(
                &defaults.proxy_target_class(true),
                &with_interfaces
            ),
            ProxyStrategy::SubclassGeneration
        );
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(ProxyStrategy::InterfaceForwarding.to_string(), "interface-forwarding");
        assert_eq!(ProxyStrategy::SubclassGeneration.to_string(), "subclass-generation");
    }
}
