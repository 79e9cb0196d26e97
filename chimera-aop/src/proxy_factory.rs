//! 代理工厂（ProxyFactory）
//!
//! 可变的代理配置构建器：持有目标源、有序的通知器列表和代理标志。
//! 每次 `get_proxy()` 都会生成一份不可变快照，之后对工厂的修改不会影响已创建的代理
//!
//! # 示例
//!
//! ```ignore
//! let mut factory = ProxyFactory::for_target(Arc::new(ConsoleGreeter), greeter_class())?;
//! factory.add_advice(Advice::before(|jp| {
//!     tracing::info!("→ {}", jp.signature());
//!     Ok(())
//! }))?;
//!
//! let greeter: Arc<dyn Greeter> = factory.get_interface_proxy::<dyn Greeter>()?;
//! ```

use crate::advisor::Advisor;
use crate::config::ProxyConfig;
use crate::error::AopConfigError;
use crate::proxy::{Advised, AdvisedConfig, AopProxyFactory, DefaultAopProxyFactory, Proxy};
use crate::target::{ProxyClass, ProxyInterface, TargetClass};
use crate::target_source::{SingletonTargetSource, TargetSource};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

pub struct ProxyFactory {
    target_source: Arc<dyn TargetSource>,
    advisors: Vec<Arc<dyn Advisor>>,
    config: ProxyConfig,
    aop_proxy_factory: Arc<dyn AopProxyFactory>,
}

impl ProxyFactory {
    pub fn new(target_source: Arc<dyn TargetSource>) -> Self {
        Self {
            target_source,
            advisors: Vec::new(),
            config: ProxyConfig::default(),
            aop_proxy_factory: Arc::new(DefaultAopProxyFactory),
        }
    }

    /// 为单例目标创建工厂
    pub fn for_target<T: Any + Send + Sync>(
        target: Arc<T>,
        class: impl Into<Arc<TargetClass>>,
    ) -> Result<Self, AopConfigError> {
        let source = SingletonTargetSource::new(target, class)?;
        Ok(Self::new(Arc::new(source)))
    }

    fn check_not_frozen(&self, operation: &'static str) -> Result<(), AopConfigError> {
        if self.config.frozen {
            Err(AopConfigError::Frozen { operation })
        } else {
            Ok(())
        }
    }

    pub fn target_source(&self) -> &Arc<dyn TargetSource> {
        &self.target_source
    }

    pub fn set_target_source(&mut self, target_source: Arc<dyn TargetSource>) -> Result<(), AopConfigError> {
        self.check_not_frozen("change target source")?;
        self.target_source = target_source;
        Ok(())
    }

    /// 整体替换代理标志（冻结后不可用）
    pub fn set_proxy_config(&mut self, config: ProxyConfig) -> Result<(), AopConfigError> {
        self.check_not_frozen("change proxy flags")?;
        self.config = config;
        Ok(())
    }

    pub fn set_proxy_target_class(&mut self, value: bool) -> Result<(), AopConfigError> {
        self.check_not_frozen("change proxy flags")?;
        self.config.proxy_target_class = value;
        Ok(())
    }

    pub fn set_optimize(&mut self, value: bool) -> Result<(), AopConfigError> {
        self.check_not_frozen("change proxy flags")?;
        self.config.optimize = value;
        Ok(())
    }

    pub fn set_expose_proxy(&mut self, value: bool) -> Result<(), AopConfigError> {
        self.check_not_frozen("change proxy flags")?;
        self.config.expose_proxy = value;
        Ok(())
    }

    /// 冻结配置
    pub fn freeze(&mut self) {
        self.config.frozen = true;
    }

    /// 替换代理工厂（策略选择可插拔）
    pub fn set_aop_proxy_factory(&mut self, factory: Arc<dyn AopProxyFactory>) {
        self.aop_proxy_factory = factory;
    }

    /// 当前配置的快照
    pub fn snapshot(&self) -> Arc<AdvisedConfig> {
        Arc::new(AdvisedConfig::new(
            self.target_source.clone(),
            self.advisors.clone(),
            self.config,
        ))
    }

    pub fn get_proxy(&self) -> Result<Proxy, AopConfigError> {
        let aop_proxy = self.aop_proxy_factory.create_aop_proxy(self.snapshot())?;
        Ok(Proxy::new(aop_proxy))
    }

    /// 构建代理并以接口视图返回
    pub fn get_interface_proxy<I: ProxyInterface + ?Sized>(&self) -> Result<Arc<I>, AopConfigError> {
        self.get_proxy()?.as_interface::<I>()
    }

    /// 构建子类代理并以类视图返回
    pub fn get_class_proxy<C: ProxyClass>(&self) -> Result<C::Proxy, AopConfigError> {
        self.get_proxy()?.as_class::<C>()
    }
}

impl Advised for ProxyFactory {
    fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    fn proxy_config(&self) -> &ProxyConfig {
        &self.config
    }

    fn target_class(&self) -> &TargetClass {
        self.target_source.target_class()
    }

    fn add_advisor(&mut self, advisor: Arc<dyn Advisor>) -> Result<(), AopConfigError> {
        self.check_not_frozen("add advisor")?;
        tracing::debug!("Adding advisor '{}' at position {}", advisor.name(), self.advisors.len());
        self.advisors.push(advisor);
        Ok(())
    }

    fn insert_advisor(&mut self, index: usize, advisor: Arc<dyn Advisor>) -> Result<(), AopConfigError> {
        self.check_not_frozen("add advisor")?;
        if index > self.advisors.len() {
            return Err(AopConfigError::AdvisorIndexOutOfBounds {
                index,
                len: self.advisors.len(),
            });
        }
        tracing::debug!("Inserting advisor '{}' at position {}", advisor.name(), index);
        self.advisors.insert(index, advisor);
        Ok(())
    }

    fn remove_advisor(&mut self, index: usize) -> Result<Arc<dyn Advisor>, AopConfigError> {
        self.check_not_frozen("remove advisor")?;
        if index >= self.advisors.len() {
            return Err(AopConfigError::AdvisorIndexOutOfBounds {
                index,
                len: self.advisors.len(),
            });
        }
        Ok(self.advisors.remove(index))
    }

    fn replace_advisor(
        &mut self,
        index: usize,
        advisor: Arc<dyn Advisor>,
    ) -> Result<Arc<dyn Advisor>, AopConfigError> {
        self.check_not_frozen("replace advisor")?;
        let len = self.advisors.len();
        let slot = self
            .advisors
            .get_mut(index)
            .ok_or(AopConfigError::AdvisorIndexOutOfBounds { index, len })?;
        Ok(std::mem::replace(slot, advisor))
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("target_class", &self.target_source.target_class().name())
            .field(
                "advisors",
                &self.advisors.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}
