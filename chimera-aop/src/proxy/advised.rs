//! 代理配置快照与管理接口

use crate::advice::Advice;
use crate::advisor::{Advisor, DefaultPointcutAdvisor};
use crate::chain::{AdvisorChainFactory, ChainEntry};
use crate::config::ProxyConfig;
use crate::error::AopConfigError;
use crate::joinpoint::Method;
use crate::target::TargetClass;
use crate::target_source::TargetSource;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 代理持有的不可变配置快照
///
/// 拦截链按方法缓存：首次调用时解析，之后直接复用。
/// 并发的首次解析可能重复计算，但写入是整体替换，不会出现半成品
pub struct AdvisedConfig {
    target_source: Arc<dyn TargetSource>,
    advisors: Vec<Arc<dyn Advisor>>,
    config: ProxyConfig,
    chain_cache: RwLock<HashMap<Method, Arc<[ChainEntry]>>>,
}

impl AdvisedConfig {
    pub fn new(
        target_source: Arc<dyn TargetSource>,
        advisors: Vec<Arc<dyn Advisor>>,
        config: ProxyConfig,
    ) -> Self {
        Self {
            target_source,
            advisors,
            config,
            chain_cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn target_source(&self) -> &Arc<dyn TargetSource> {
        &self.target_source
    }

    pub fn target_class(&self) -> &TargetClass {
        self.target_source.target_class()
    }

    pub fn advisors(&self) -> &[Arc<dyn Advisor>] {
        &self.advisors
    }

    pub fn proxy_config(&self) -> &ProxyConfig {
        &self.config
    }

    pub fn is_frozen(&self) -> bool {
        self.config.frozen
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.advisors.iter().position(|a| a.name() == name)
    }

    /// 获取方法的拦截链
    pub fn chain_for(&self, method: &Method) -> Arc<[ChainEntry]> {
        if let Some(chain) = self.chain_cache.read().get(method) {
            return chain.clone();
        }

        let resolved: Arc<[ChainEntry]> =
            AdvisorChainFactory::resolve(&self.advisors, method, self.target_class()).into();

        self.chain_cache
            .write()
            .entry(*method)
            .or_insert(resolved)
            .clone()
    }

    /// 已缓存拦截链的方法数
    pub fn cached_chain_count(&self) -> usize {
        self.chain_cache.read().len()
    }
}

impl fmt::Debug for AdvisedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisedConfig")
            .field("target_class", &self.target_class().name())
            .field(
                "advisors",
                &self.advisors.iter().map(|a| a.name()).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish()
    }
}

/// 可变的代理配置管理接口
///
/// 冻结后所有修改都返回 [`AopConfigError::Frozen`]
pub trait Advised {
    fn advisors(&self) -> &[Arc<dyn Advisor>];

    fn proxy_config(&self) -> &ProxyConfig;

    fn target_class(&self) -> &TargetClass;

    fn is_frozen(&self) -> bool {
        self.proxy_config().frozen
    }

    /// 追加到末尾
    fn add_advisor(&mut self, advisor: Arc<dyn Advisor>) -> Result<(), AopConfigError>;

    fn insert_advisor(&mut self, index: usize, advisor: Arc<dyn Advisor>) -> Result<(), AopConfigError>;

    fn remove_advisor(&mut self, index: usize) -> Result<Arc<dyn Advisor>, AopConfigError>;

    /// 替换指定位置的通知器，返回被替换的通知器
    fn replace_advisor(
        &mut self,
        index: usize,
        advisor: Arc<dyn Advisor>,
    ) -> Result<Arc<dyn Advisor>, AopConfigError>;

    fn index_of(&self, name: &str) -> Option<usize> {
        self.advisors().iter().position(|a| a.name() == name)
    }

    /// 按名称移除，返回是否存在
    fn remove_advisor_named(&mut self, name: &str) -> Result<bool, AopConfigError> {
        match self.index_of(name) {
            Some(index) => self.remove_advisor(index).map(|_| true),
            None if self.is_frozen() => Err(AopConfigError::Frozen {
                operation: "remove advisor",
            }),
            None => Ok(false),
        }
    }

    /// 直接添加通知，匹配所有方法
    fn add_advice(&mut self, advice: Advice) -> Result<(), AopConfigError> {
        self.add_advisor(Arc::new(DefaultPointcutAdvisor::global(advice)))
    }
}
