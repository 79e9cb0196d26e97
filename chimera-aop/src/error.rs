//! 错误类型
//!
//! - `AopConfigError`：构建代理或修改配置时立即返回的配置错误
//! - `InvocationError`：拦截链自身在调用过程中产生的错误，以 `anyhow::Error` 形式传播
//!
//! 目标对象和通知抛出的错误同样以 `anyhow::Error` 传播，引擎不会吞掉或改写它们

use crate::proxy::ProxyStrategy;
use std::any::Any;
use thiserror::Error;

/// 方法返回值（类型擦除）
pub type ReturnValue = Box<dyn Any + Send>;

/// 拦截链的执行结果
pub type InvocationResult<T = ReturnValue> = anyhow::Result<T>;

/// AOP 配置错误
#[derive(Debug, Error)]
pub enum AopConfigError {
    /// 需要子类代理，但目标类型不允许被"继承"
    #[error("Cannot create subclass proxy for type '{type_name}': {reason}")]
    NotSubclassable {
        type_name: &'static str,
        reason: &'static str,
    },

    /// 配置已冻结
    #[error("Cannot {operation}: proxy configuration is frozen")]
    Frozen { operation: &'static str },

    /// 切点定义不合法（表达式格式错误、正则无法编译等）
    #[error("Invalid pointcut: {0}")]
    InvalidPointcut(String),

    #[error("Advisor index {index} out of bounds (advisor count: {len})")]
    AdvisorIndexOutOfBounds { index: usize, len: usize },

    #[error("Type '{type_name}' does not implement proxied interface '{interface}'")]
    InterfaceNotImplemented {
        type_name: &'static str,
        interface: &'static str,
    },

    #[error("Proxy for '{type_name}' uses {strategy} and cannot be viewed as a class proxy")]
    NotAClassProxy {
        type_name: &'static str,
        strategy: ProxyStrategy,
    },

    /// 目标对象与类型描述不一致
    #[error("Target object is not an instance of '{expected}'")]
    TargetTypeMismatch { expected: &'static str },

    /// 配置文件内容不合法
    #[error("Invalid AOP properties: {0}")]
    InvalidProperties(String),
}

/// 调用期错误
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Method {method} is not exposed by this {strategy} proxy")]
    MethodNotProxied {
        method: String,
        strategy: ProxyStrategy,
    },

    #[error("Type '{type_name}' has no dispatch entry for method {method}")]
    UnknownMethod {
        method: String,
        type_name: &'static str,
    },

    #[error("Argument {index} of {method} is missing or not of type {expected}")]
    ArgumentMismatch {
        method: String,
        index: usize,
        expected: &'static str,
    },

    #[error("Return value of {method} is not of type {expected}")]
    ReturnTypeMismatch {
        method: String,
        expected: &'static str,
    },

    #[error("Target object is not an instance of '{expected}'")]
    TargetTypeMismatch { expected: &'static str },

    #[error("Target pool exhausted (max size: {max_size})")]
    PoolExhausted { max_size: usize },
}
