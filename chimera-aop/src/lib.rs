//! Chimera AOP - 方法拦截引擎
//!
//! 在不修改业务代码的前提下，为对象的方法调用织入横切逻辑：
//! - 切点：类过滤器 + 方法匹配器，支持并集、交集、取反和表达式
//! - 通知：Around、Before、After、AfterReturning、AfterThrowing
//! - 通知器：切点与通知的组合
//! - 代理工厂：接口转发或子类生成两种策略，支持冻结、优化、暴露代理等配置
//! - 拦截链：按方法缓存，运行时匹配器在调用时结合参数重新判断
//! - 通过 BeanPostProcessor 按 Bean 名称自动创建代理
//!
//! Rust 没有运行时动态代理，代理结构体由 `#[proxy_interface]` 和 `#[aop_class]`
//! 在编译时生成，方法调用经由类型擦除的 [`Proxy`] 句柄进入拦截链。
//!
//! # 示例
//!
//! ```ignore
//! use chimera_aop::prelude::*;
//!
//! #[proxy_interface]
//! pub trait Greeter: Send + Sync {
//!     fn greet(&self, name: String) -> Result<String, GreetError>;
//! }
//!
//! let class = TargetClass::of::<ConsoleGreeter>()
//!     .implements(GreeterProxy::binding::<ConsoleGreeter>())
//!     .build();
//! let mut factory = ProxyFactory::for_target(Arc::new(ConsoleGreeter), class)?;
//! factory.add_advice(Advice::interceptor(TraceInterceptor::new()))?;
//!
//! let greeter = factory.get_interface_proxy::<dyn Greeter>()?;
//! greeter.greet("chimera".to_string())?;
//! ```

// 让生成的 `::chimera_aop::` 路径在本 crate 内同样可用
extern crate self as chimera_aop;

pub mod advice;
pub mod advisor;
pub mod bean_post_processor;
pub mod chain;
pub mod config;
pub mod error;
pub mod error_info;
pub mod interceptors;
pub mod invocation;
pub mod joinpoint;
pub mod pointcut;
pub mod proxy;
pub mod proxy_factory;
pub mod registry;
pub mod target;
pub mod target_source;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceType, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice, BeforeAdvice,
    MethodInterceptor,
};
pub use advisor::{Advisor, DefaultPointcutAdvisor};
pub use bean_post_processor::{AutoProxySupport, BeanNameAutoProxyCreator, ProxyDecision};
pub use chain::{AdvisorChainFactory, ChainEntry};
pub use config::{AopProperties, AutoProxyProperties, ProxyConfig};
pub use error::{AopConfigError, InvocationError, InvocationResult, ReturnValue};
pub use error_info::ErrorInfo;
pub use interceptors::{
    ExceptionLoggingAdvice, PerformanceMonitorInterceptor, RetryInterceptor, TraceInterceptor,
};
pub use invocation::MethodInvocation;
pub use joinpoint::{Arguments, JoinPoint, Method};
pub use pointcut::{
    ClassFilter, ComposablePointcut, MethodMatcher, Pointcut, PointcutExpression, Pointcuts,
};
pub use proxy::{Advised, AdvisedConfig, AopProxy, AopProxyFactory, DefaultAopProxyFactory, Proxy, ProxyStrategy};
pub use proxy_factory::ProxyFactory;
pub use registry::{get_global_registry, TargetClassRegistration, TargetClassRegistry};
pub use target::{
    ClassDescriptor, InterfaceBinding, InterfaceDescriptor, ProxyClass, ProxyInterface, Target,
    TargetClass,
};
pub use target_source::{
    HotSwappableTargetSource, PooledTargetSource, PrototypeTargetSource, SingletonTargetSource,
    TargetSource,
};

// 导出过程宏
pub use chimera_aop_macros::{aop_class, proxy_interface};

// 生成的代码和注册宏需要
pub use anyhow;
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::advisor::{Advisor, DefaultPointcutAdvisor};
    pub use crate::bean_post_processor::BeanNameAutoProxyCreator;
    pub use crate::config::{AopProperties, ProxyConfig};
    pub use crate::error::{AopConfigError, InvocationError, InvocationResult};
    pub use crate::interceptors::*;
    pub use crate::invocation::MethodInvocation;
    pub use crate::joinpoint::{Arguments, JoinPoint, Method};
    pub use crate::pointcut::{Pointcut, PointcutExpression, Pointcuts};
    pub use crate::proxy::{Advised, Proxy, ProxyStrategy};
    pub use crate::proxy_factory::ProxyFactory;
    pub use crate::registry::{get_global_registry, TargetClassRegistration};
    pub use crate::target::{InterfaceBinding, ProxyClass, ProxyInterface, TargetClass};
    pub use crate::target_source::*;
    pub use crate::{aop_class, arguments, proxy_interface};
}

/// 构建调用参数
///
/// ```ignore
/// let args = chimera_aop::arguments![42_u64, "alice".to_string()];
/// proxy.invoke(&UserServiceProxy::FIND_USER, args)?;
/// ```
#[macro_export]
macro_rules! arguments {
    () => {
        $crate::Arguments::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Arguments::new()$(.with($value))+
    };
}
