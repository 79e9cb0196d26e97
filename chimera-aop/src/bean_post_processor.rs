//! 自动代理 BeanPostProcessor
//!
//! 在 Bean 初始化后按名称决定是否包装 AOP 代理：
//!
//! 1. 名称与配置的字面量相等，或匹配 `prefix*` / `*suffix` 模式
//! 2. 从 [`TargetClassRegistry`] 查找 Bean 的类型描述
//! 3. 用公共通知器（以及决策返回的特定通知器）构建 [`ProxyFactory`]
//! 4. 返回 [`Proxy`] 句柄替换原始 Bean
//!
//! ## 使用示例
//!
//! ```ignore
//! use chimera_aop::BeanNameAutoProxyCreator;
//!
//! let creator = BeanNameAutoProxyCreator::new(["accountService", "tx*"])
//!     .with_common_advisors(vec![tracing_advisor]);
//! processors.add(Arc::new(creator));
//! ```

use crate::advisor::Advisor;
use crate::config::{AopProperties, ProxyConfig};
use crate::error::AopConfigError;
use crate::pointcut::matches_name;
use crate::proxy::{Advised, Proxy};
use crate::proxy_factory::ProxyFactory;
use crate::registry::{get_global_registry, TargetClassRegistry};
use crate::target_source::SingletonTargetSource;
use chimera_core::prelude::*;
use std::fmt;
use std::sync::Arc;

/// 是否代理某个 Bean 的决策
#[derive(Clone)]
pub enum ProxyDecision {
    /// 不代理，原样返回
    DoNotProxy,

    /// 只应用公共通知器
    ProxyWithoutAdditionalAdvisors,

    /// 公共通知器之外再应用这些特定通知器
    ProxyWith(Vec<Arc<dyn Advisor>>),
}

impl ProxyDecision {
    pub fn should_proxy(&self) -> bool {
        !matches!(self, ProxyDecision::DoNotProxy)
    }
}

impl fmt::Debug for ProxyDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyDecision::DoNotProxy => f.write_str("DoNotProxy"),
            ProxyDecision::ProxyWithoutAdditionalAdvisors => f.write_str("ProxyWithoutAdditionalAdvisors"),
            ProxyDecision::ProxyWith(advisors) => f
                .debug_list()
                .entries(advisors.iter().map(|a| a.name()))
                .finish(),
        }
    }
}

/// 自动代理的公共部分：公共通知器、代理配置和类型注册表
pub struct AutoProxySupport {
    common_advisors: Vec<Arc<dyn Advisor>>,
    apply_common_first: bool,
    proxy_config: ProxyConfig,
    registry: Arc<TargetClassRegistry>,
}

impl Default for AutoProxySupport {
    fn default() -> Self {
        Self {
            common_advisors: Vec::new(),
            apply_common_first: true,
            proxy_config: ProxyConfig::default(),
            registry: get_global_registry().clone(),
        }
    }
}

impl AutoProxySupport {
    pub fn common_advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.common_advisors
    }

    pub fn proxy_config(&self) -> ProxyConfig {
        self.proxy_config
    }

    /// 按决策包装 Bean
    ///
    /// 已经是代理的 Bean 原样返回，避免重复包装
    pub fn wrap_if_necessary(
        &self,
        bean: BeanObject,
        bean_name: &str,
        decision: ProxyDecision,
    ) -> ContainerResult<BeanObject> {
        if !decision.should_proxy() {
            tracing::trace!("Bean '{}' does not match any auto-proxy rule, skipping", bean_name);
            return Ok(bean);
        }
        if bean.is::<Proxy>() {
            tracing::debug!("Bean '{}' is already an AOP proxy, skipping", bean_name);
            return Ok(bean);
        }

        let class = self.registry.find(bean.as_ref()).ok_or_else(|| {
            anyhow!(
                "Bean '{}' matches an auto-proxy rule but its type has no registered TargetClass",
                bean_name
            )
        })?;

        let specific = match decision {
            ProxyDecision::ProxyWith(advisors) => advisors,
            _ => Vec::new(),
        };
        let advisors: Vec<Arc<dyn Advisor>> = if self.apply_common_first {
            self.common_advisors.iter().cloned().chain(specific).collect()
        } else {
            specific.into_iter().chain(self.common_advisors.iter().cloned()).collect()
        };

        let proxy = self
            .create_proxy(bean, class, advisors)
            .with_context(|| format!("Failed to create AOP proxy for bean '{}'", bean_name))?;

        tracing::info!(
            "🔷 [AOP-AutoProxy] Wrapped bean '{}' with {} proxy ({} advisor(s))",
            bean_name,
            proxy.strategy(),
            proxy.advised().advisors().len()
        );
        Ok(Arc::new(proxy))
    }

    fn create_proxy(
        &self,
        bean: BeanObject,
        class: Arc<crate::target::TargetClass>,
        advisors: Vec<Arc<dyn Advisor>>,
    ) -> Result<Proxy, AopConfigError> {
        let source = SingletonTargetSource::from_erased(bean, class)?;
        let mut factory = ProxyFactory::new(Arc::new(source));
        factory.set_proxy_config(self.proxy_config.frozen(false))?;
        for advisor in advisors {
            factory.add_advisor(advisor)?;
        }
        if self.proxy_config.frozen {
            factory.freeze();
        }
        factory.get_proxy()
    }
}

/// 按 Bean 名称自动创建代理
pub struct BeanNameAutoProxyCreator {
    bean_names: Vec<String>,
    support: AutoProxySupport,
}

impl BeanNameAutoProxyCreator {
    /// `names` 可以是字面量名称，也可以是 `prefix*` / `*suffix` 模式
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bean_names: names.into_iter().map(Into::into).collect(),
            support: AutoProxySupport::default(),
        }
    }

    /// 从配置创建，公共拦截器名称通过 `resolve` 在创建时解析
    pub fn from_properties<F>(properties: &AopProperties, resolve: F) -> Result<Self, AopConfigError>
    where
        F: Fn(&str) -> Option<Arc<dyn Advisor>>,
    {
        let auto_proxy = &properties.auto_proxy;
        let common = auto_proxy
            .interceptor_names
            .iter()
            .map(|name| {
                resolve(name).ok_or_else(|| {
                    AopConfigError::InvalidProperties(format!("unknown interceptor name '{}'", name))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(auto_proxy.bean_names.iter().cloned())
            .with_common_advisors(common)
            .apply_common_first(auto_proxy.apply_common_first)
            .with_proxy_config(properties.proxy))
    }

    pub fn with_common_advisors(mut self, advisors: Vec<Arc<dyn Advisor>>) -> Self {
        self.support.common_advisors = advisors;
        self
    }

    pub fn with_proxy_config(mut self, config: ProxyConfig) -> Self {
        self.support.proxy_config = config;
        self
    }

    /// 使用指定的类型注册表代替全局注册表
    pub fn with_registry(mut self, registry: Arc<TargetClassRegistry>) -> Self {
        self.support.registry = registry;
        self
    }

    pub fn apply_common_first(mut self, value: bool) -> Self {
        self.support.apply_common_first = value;
        self
    }

    pub fn bean_names(&self) -> &[String] {
        &self.bean_names
    }

    pub fn support(&self) -> &AutoProxySupport {
        &self.support
    }

    /// 任意一条规则匹配即代理
    pub fn should_proxy(&self, bean_name: &str) -> bool {
        self.bean_names.iter().any(|mapped| matches_name(bean_name, mapped))
    }

    /// 名称匹配只使用公共通知器
    pub fn advisors_for_bean(&self, bean_name: &str) -> ProxyDecision {
        if self.should_proxy(bean_name) {
            ProxyDecision::ProxyWithoutAdditionalAdvisors
        } else {
            ProxyDecision::DoNotProxy
        }
    }
}

impl BeanPostProcessor for BeanNameAutoProxyCreator {
    fn name(&self) -> &str {
        "BeanNameAutoProxyCreator"
    }

    fn order(&self) -> i32 {
        // 在其他处理器之后执行，包装已完全初始化的 Bean
        2000
    }

    fn post_process_after_initialization(&self, bean: BeanObject, bean_name: &str) -> ContainerResult<BeanObject> {
        let decision = self.advisors_for_bean(bean_name);
        if decision.should_proxy() {
            tracing::info!("🔷 [AOP-AutoProxy] Bean '{}' matches auto-proxy bean names", bean_name);
        }
        self.support.wrap_if_necessary(bean, bean_name, decision)
    }
}

impl fmt::Debug for BeanNameAutoProxyCreator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanNameAutoProxyCreator")
            .field("bean_names", &self.bean_names)
            .field("common_advisors", &self.support.common_advisors.len())
            .field("apply_common_first", &self.support.apply_common_first)
            .field("proxy_config", &self.support.proxy_config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::advisor::DefaultPointcutAdvisor;
    use crate::pointcut::test_support::*;
    use crate::proxy::ProxyStrategy;

    fn registry() -> Arc<TargetClassRegistry> {
        let registry = TargetClassRegistry::new();
        registry.register(order_service());
        Arc::new(registry)
    }

    fn advisor(name: &str) -> Arc<dyn Advisor> {
        DefaultPointcutAdvisor::global(Advice::before(|_| Ok(())))
            .with_name(name)
            .into_advisor()
    }

    fn bean() -> BeanObject {
        Arc::new(OrderService)
    }

    #[test]
    fn test_should_proxy() {
        let creator = BeanNameAutoProxyCreator::new(["exactName", "tx*", "*Service"]);

        assert!(creator.should_proxy("exactName"));
        assert!(creator.should_proxy("txManager"));
        assert!(creator.should_proxy("orderService"));
        assert!(!creator.should_proxy("exactNameX"));
        assert!(!creator.should_proxy("TxManager"));
        assert!(!creator.should_proxy("orderRepository"));
    }

    #[test]
    fn test_wraps_matching_bean() {
        let creator = BeanNameAutoProxyCreator::new(["order*"])
            .with_registry(registry())
            .with_common_advisors(vec![advisor("audit")]);

        let wrapped = creator.post_process_after_initialization(bean(), "orderService").unwrap();
        let proxy = wrapped.downcast_ref::<Proxy>().unwrap();

        assert_eq!(proxy.strategy(), ProxyStrategy::InterfaceForwarding);
        assert_eq!(proxy.advised().advisors()[0].name(), "audit");

        let result = proxy.invoke(&PLACE_ORDER, crate::joinpoint::Arguments::new()).unwrap();
        assert_eq!(*result.downcast::<&str>().unwrap(), "place_order");
    }

    #[test]
    fn test_non_matching_and_proxied_beans_pass_through() {
        let creator = BeanNameAutoProxyCreator::new(["order*"]).with_registry(registry());

        let original = bean();
        let result = creator.post_process_after_initialization(original.clone(), "paymentService").unwrap();
        assert!(Arc::ptr_eq(&original, &result));

        let wrapped = creator.post_process_after_initialization(bean(), "orderService").unwrap();
        let again = creator.post_process_after_initialization(wrapped.clone(), "orderService").unwrap();
        assert!(Arc::ptr_eq(&wrapped, &again));
    }

    #[test]
    fn test_unregistered_type_fails() {
        let creator = BeanNameAutoProxyCreator::new(["*"]).with_registry(registry());
        let unknown: BeanObject = Arc::new(UserRepository);

        let error = creator.post_process_after_initialization(unknown, "userRepository").unwrap_err();
        assert!(error.to_string().contains("no registered TargetClass"));
    }

    #[test]
    fn test_advisor_ordering() {
        let support = AutoProxySupport {
            common_advisors: vec![advisor("common")],
            apply_common_first: false,
            proxy_config: ProxyConfig::default().frozen(true),
            registry: registry(),
        };

        let wrapped = support
            .wrap_if_necessary(bean(), "orderService", ProxyDecision::ProxyWith(vec![advisor("specific")]))
            .unwrap();
        let proxy = wrapped.downcast_ref::<Proxy>().unwrap();
        let names: Vec<_> = proxy.advised().advisors().iter().map(|a| a.name().to_string()).collect();

        assert_eq!(names, vec!["specific", "common"]);
        assert!(proxy.advised().is_frozen());
    }

    #[test]
    fn test_from_properties() {
        let properties = AopProperties::from_toml_str(
            r#"
            [aop.proxy]
            expose-proxy = true

            [aop.auto-proxy]
            bean-names = ["tx*"]
            interceptor-names = ["audit"]
            "#,
        )
        .unwrap();

        let creator = BeanNameAutoProxyCreator::from_properties(&properties, |name| {
            (name == "audit").then(|| advisor("audit"))
        })
        .unwrap();
        assert!(creator.should_proxy("txService"));
        assert_eq!(creator.support().common_advisors().len(), 1);
        assert!(creator.support().proxy_config().expose_proxy);

        let missing = BeanNameAutoProxyCreator::from_properties(&properties, |_| None);
        assert!(matches!(missing, Err(AopConfigError::InvalidProperties(_))));
        assert_eq!(creator.order(), 2000);
        assert!(!creator.advisors_for_bean("other").should_proxy());
    }
}
