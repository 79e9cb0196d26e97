//! 连接点（JoinPoint）定义
//!
//! Rust 没有运行时反射，方法由编译期声明的 [`Method`] 描述；
//! 参数以类型擦除的 [`Arguments`] 在拦截链中传递，由生成的转发代码还原为具体类型

use crate::error::InvocationError;
use crate::target::TargetClass;
use std::any::{type_name, Any};
use std::fmt;
use std::time::{Duration, Instant};

/// 方法描述
///
/// 通常由 `#[proxy_interface]` / `#[aop_class]` 生成为常量，也可以手写：
///
/// ```ignore
/// const GREET: Method = Method::new("Greeter", "greet", &["String"], "Result<String>");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Method {
    /// 声明类型所在的模块路径，手写描述时为空
    module: &'static str,

    /// 声明该方法的接口或类型名称
    declaring_type: &'static str,

    /// 方法名称
    name: &'static str,

    /// 参数类型名称
    parameter_types: &'static [&'static str],

    /// 返回类型名称
    return_type: &'static str,
}

impl Method {
    pub const fn new(
        declaring_type: &'static str,
        name: &'static str,
        parameter_types: &'static [&'static str],
        return_type: &'static str,
    ) -> Self {
        Self {
            module: "",
            declaring_type,
            name,
            parameter_types,
            return_type,
        }
    }

    /// 指定声明类型所在的模块，同名接口由模块路径区分
    pub const fn declared_in(self, module: &'static str) -> Self {
        Self { module, ..self }
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    pub fn declaring_type(&self) -> &'static str {
        self.declaring_type
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn parameter_types(&self) -> &'static [&'static str] {
        self.parameter_types
    }

    pub fn return_type(&self) -> &'static str {
        self.return_type
    }

    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }

    /// 完整的方法签名，例如 `Greeter::greet(String)`
    pub fn signature(&self) -> String {
        format!(
            "{}::{}({})",
            self.declaring_type,
            self.name,
            self.parameter_types.join(", ")
        )
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 方法参数列表（类型擦除）
///
/// 通知可以读取或替换参数，目标方法执行时再按声明的类型取出
#[derive(Default)]
pub struct Arguments {
    values: Vec<Box<dyn Any + Send + Sync>>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加参数（构建器风格）
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.push(value);
        self
    }

    pub fn push<T: Any + Send + Sync>(&mut self, value: T) {
        self.values.push(Box::new(value));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按下标获取参数
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.values.get(index)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, index: usize) -> Option<&mut T> {
        self.values.get_mut(index)?.downcast_mut::<T>()
    }

    /// 替换参数，下标越界时返回 false
    pub fn set<T: Any + Send + Sync>(&mut self, index: usize, value: T) -> bool {
        match self.values.get_mut(index) {
            Some(slot) => {
                *slot = Box::new(value);
                true
            }
            None => false,
        }
    }

    /// 复制出参数值，供目标方法调用使用
    ///
    /// 参数保留在列表中，因此通知可以多次调用 `proceed()`
    pub fn cloned<T: Any + Clone>(&self, method: &Method, index: usize) -> Result<T, InvocationError> {
        self.get::<T>(index)
            .cloned()
            .ok_or_else(|| InvocationError::ArgumentMismatch {
                method: method.signature(),
                index,
                expected: type_name::<T>(),
            })
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

/// 连接点信息
///
/// 传给 before / after 类通知的只读视图
pub struct JoinPoint<'a> {
    method: &'a Method,
    arguments: &'a Arguments,
    target: &'a (dyn Any + Send + Sync),
    target_class: &'a TargetClass,
    started_at: Instant,
}

impl<'a> JoinPoint<'a> {
    pub(crate) fn new(
        method: &'a Method,
        arguments: &'a Arguments,
        target: &'a (dyn Any + Send + Sync),
        target_class: &'a TargetClass,
        started_at: Instant,
    ) -> Self {
        Self {
            method,
            arguments,
            target,
            target_class,
            started_at,
        }
    }

    pub fn method(&self) -> &Method {
        self.method
    }

    pub fn arguments(&self) -> &Arguments {
        self.arguments
    }

    /// 目标对象
    pub fn target(&self) -> &(dyn Any + Send + Sync) {
        self.target
    }

    /// 尝试以具体类型访问目标对象
    pub fn target_as<T: Any>(&self) -> Option<&T> {
        self.target.downcast_ref::<T>()
    }

    pub fn target_class(&self) -> &TargetClass {
        self.target_class
    }

    /// 调用进入拦截链的时间
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn signature(&self) -> String {
        self.method.signature()
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("target_class", &self.target_class.name())
            .field("method", &self.method.signature())
            .field("arguments", &self.arguments.len())
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.method.signature())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER: Method = Method::new("Bank", "transfer", &["String", "u64"], "Result<(), Error>");

    #[test]
    fn test_signature() {
        assert_eq!(TRANSFER.signature(), "Bank::transfer(String, u64)");
        assert_eq!(TRANSFER.to_string(), "Bank::transfer(String, u64)");
        assert_eq!(TRANSFER.arity(), 2);
    }

    #[test]
    fn test_arguments_access() {
        let mut args = Arguments::new().with(String::from("alice")).with(10_u64);

        assert_eq!(args.len(), 2);
        assert_eq!(args.get::<String>(0).map(String::as_str), Some("alice"));
        assert!(args.get::<u32>(1).is_none());

        *args.get_mut::<u64>(1).unwrap() += 5;
        assert_eq!(args.cloned::<u64>(&TRANSFER, 1).unwrap(), 15);

        assert!(args.set(0, String::from("bob")));
        assert!(!args.set(9, 1_u8));
        assert_eq!(args.get::<String>(0).unwrap(), "bob");
    }

    #[test]
    fn test_cloned_reports_mismatch() {
        let args = Arguments::new().with(1_i32);
        let err = args.cloned::<String>(&TRANSFER, 0).unwrap_err();

        assert!(matches!(err, InvocationError::ArgumentMismatch { index: 0, .. }));
        assert!(err.to_string().contains("Bank::transfer"));
    }
}
