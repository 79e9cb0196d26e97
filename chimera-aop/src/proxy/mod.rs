//! 代理
//!
//! [`Proxy`] 是调用者拿到的句柄：它持有不可变的 [`AdvisedConfig`] 快照，
//! 每次调用都会取得目标对象、解析（或复用缓存的）拦截链并执行。
//!
//! 生成的转发结构体（`TraitProxy` / `TypeProxy`）只是 `Proxy` 的类型化外观

mod advised;
mod strategy;

pub use advised::{Advised, AdvisedConfig};
pub use strategy::{
    AopProxy, AopProxyFactory, DefaultAopProxyFactory, InterfaceForwardingProxy, ProxyStrategy,
    SubclassProxy,
};

use crate::error::{AopConfigError, InvocationError, InvocationResult};
use crate::invocation::MethodInvocation;
use crate::joinpoint::{Arguments, Method};
use crate::target::{ProxyClass, ProxyInterface, TargetClass};
use crate::target_source::TargetRelease;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 代理句柄
///
/// 克隆开销很小，可以在线程间共享并发调用
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<dyn AopProxy>,
}

impl Proxy {
    pub fn new(inner: Arc<dyn AopProxy>) -> Self {
        Self { inner }
    }

    pub fn strategy(&self) -> ProxyStrategy {
        self.inner.strategy()
    }

    /// 只读的配置快照
    pub fn advised(&self) -> &Arc<AdvisedConfig> {
        self.inner.config()
    }

    pub fn target_class(&self) -> &TargetClass {
        self.inner.config().target_class()
    }

    /// 代理是否暴露该方法
    pub fn exposes(&self, method: &Method) -> bool {
        self.inner.exposes(method)
    }

    /// 通过拦截链调用方法
    pub fn invoke(&self, method: &Method, args: Arguments) -> InvocationResult {
        if !self.inner.exposes(method) {
            return Err(InvocationError::MethodNotProxied {
                method: method.signature(),
                strategy: self.strategy(),
            }
            .into());
        }

        let config = self.inner.config();
        let source = config.target_source();
        let class = source.target_class();

        let target = source.get_target()?;
        let _release = (!source.is_static()).then(|| TargetRelease::new(source.as_ref(), target.clone()));

        let chain = config.chain_for(method);
        if chain.is_empty() {
            tracing::trace!("No advisors apply to {}, invoking target directly", method);
            return class.dispatch(&*target, method, &args);
        }

        let proxy = config.proxy_config().expose_proxy.then_some(self);
        let mut invocation = MethodInvocation::new(method, args, target, class, &chain, proxy);
        invocation.proceed()
    }

    /// 以接口视图访问代理
    pub fn as_interface<I: ProxyInterface + ?Sized>(&self) -> Result<Arc<I>, AopConfigError> {
        let class = self.target_class();
        if !class.implements_interface::<I>() {
            return Err(AopConfigError::InterfaceNotImplemented {
                type_name: class.name(),
                interface: I::descriptor().name(),
            });
        }
        Ok(I::wrap(self.clone()))
    }

    /// 以类视图访问代理，只适用于目标类型为 `C` 的子类代理
    pub fn as_class<C: ProxyClass>(&self) -> Result<C::Proxy, AopConfigError> {
        let class = self.target_class();
        if self.strategy() != ProxyStrategy::SubclassGeneration {
            return Err(AopConfigError::NotAClassProxy {
                type_name: class.name(),
                strategy: self.strategy(),
            });
        }
        if class.type_id() != TypeId::of::<C>() {
            return Err(AopConfigError::TargetTypeMismatch {
                expected: C::descriptor().name(),
            });
        }
        Ok(C::wrap(self.clone()))
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("strategy", &self.strategy())
            .field("target_class", &self.target_class().name())
            .field("advisors", &self.advised().advisors().len())
            .finish()
    }
}

/// 把拦截链的结果还原为调用者声明的类型（供生成代码使用）
///
/// 错误如果原本就是 `E` 会被原样取回，否则通过 `From<anyhow::Error>` 转换
#[doc(hidden)]
pub fn complete<T, E>(method: &Method, result: InvocationResult) -> Result<T, E>
where
    T: Any,
    E: From<anyhow::Error> + fmt::Display + fmt::Debug + Send + Sync + 'static,
{
    match result {
        Ok(value) => match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => Err(E::from(anyhow::Error::new(InvocationError::ReturnTypeMismatch {
                method: method.signature(),
                expected: type_name::<T>(),
            }))),
        },
        Err(error) => match error.downcast::<E>() {
            Ok(error) => Err(error),
            Err(error) => Err(E::from(error)),
        },
    }
}

/// 把目标方法的返回值擦除为拦截链结果（供生成代码使用）
#[doc(hidden)]
pub fn into_invocation_result<T, E>(result: Result<T, E>) -> InvocationResult
where
    T: Any + Send,
    E: Into<anyhow::Error>,
{
    match result {
        Ok(value) => Ok(Box::new(value)),
        Err(error) => Err(error.into()),
    }
}

/// 分派表中没有对应条目（供生成代码使用）
#[doc(hidden)]
pub fn unknown_method(method: &Method, type_name: &'static str) -> anyhow::Error {
    InvocationError::UnknownMethod {
        method: method.signature(),
        type_name,
    }
    .into()
}
