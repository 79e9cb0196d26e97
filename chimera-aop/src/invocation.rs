//! 方法调用（MethodInvocation）
//!
//! 拦截链的执行状态：已解析的条目、当前位置、参数和目标对象。
//! 每个拦截器通过 `proceed()` 把控制权交给下一个条目，最后一个条目之后调用目标方法

use crate::chain::ChainEntry;
use crate::error::InvocationResult;
use crate::joinpoint::{Arguments, JoinPoint, Method};
use crate::proxy::Proxy;
use crate::target::{Target, TargetClass};
use std::any::Any;
use std::fmt;
use std::time::Instant;

pub struct MethodInvocation<'a> {
    method: &'a Method,
    arguments: Arguments,
    target: Target,
    target_class: &'a TargetClass,
    chain: &'a [ChainEntry],
    position: usize,
    proxy: Option<&'a Proxy>,
    started_at: Instant,
}

impl<'a> MethodInvocation<'a> {
    pub fn new(
        method: &'a Method,
        arguments: Arguments,
        target: Target,
        target_class: &'a TargetClass,
        chain: &'a [ChainEntry],
        proxy: Option<&'a Proxy>,
    ) -> Self {
        Self {
            method,
            arguments,
            target,
            target_class,
            chain,
            position: 0,
            proxy,
            started_at: Instant::now(),
        }
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// 修改后续拦截器和目标方法看到的参数
    pub fn arguments_mut(&mut self) -> &mut Arguments {
        &mut self.arguments
    }

    pub fn target(&self) -> &(dyn Any + Send + Sync) {
        &*self.target
    }

    pub fn target_class(&self) -> &TargetClass {
        self.target_class
    }

    /// 当前代理（仅在开启 expose_proxy 时可用）
    pub fn proxy(&self) -> Option<&Proxy> {
        self.proxy
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn join_point(&self) -> JoinPoint<'_> {
        JoinPoint::new(
            self.method,
            &self.arguments,
            &*self.target,
            self.target_class,
            self.started_at,
        )
    }

    /// 执行拦截链的剩余部分
    ///
    /// 返回后位置会恢复，因此可以多次调用（每次都会重新执行后续拦截器和目标方法）
    pub fn proceed(&mut self) -> InvocationResult {
        let saved = self.position;
        let chain = self.chain;

        let result = loop {
            let Some(entry) = chain.get(self.position) else {
                tracing::trace!("Invoking target method {}", self.method);
                break self
                    .target_class
                    .dispatch(&*self.target, self.method, &self.arguments);
            };
            self.position += 1;

            match entry {
                ChainEntry::Static(interceptor) => break interceptor.invoke(self),
                ChainEntry::Dynamic {
                    interceptor,
                    advisor,
                } => {
                    let matcher = advisor.pointcut().method_matcher();
                    if matcher.matches_with_args(self.method, self.target_class, &self.arguments) {
                        break interceptor.invoke(self);
                    }
                    tracing::trace!(
                        "Skipping advisor '{}' for {}: runtime match failed",
                        advisor.name(),
                        self.method
                    );
                }
            }
        };

        self.position = saved;
        result
    }
}

impl fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("method", &self.method.signature())
            .field("target_class", &self.target_class.name())
            .field("position", &self.position)
            .field("chain_len", &self.chain.len())
            .finish()
    }
}
