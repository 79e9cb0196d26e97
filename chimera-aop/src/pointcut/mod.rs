//! 切点（Pointcut）
//!
//! 切点由类过滤器（ClassFilter）和方法匹配器（MethodMatcher）组成：
//! 先用类过滤器判断目标类型，通过后再判断方法。
//! 方法匹配器可以是"运行时"的，此时每次调用都会结合实际参数重新判断。
//!
//! - `matchers`：名称、正则、类型等常用匹配器
//! - `composite`：并集、交集、取反以及链式组合
//! - `expression`：声明式切点表达式（`execution(* UserService.get_*(..))`）

mod composite;
mod expression;
mod matchers;

pub use composite::{ClassFilters, ComposablePointcut, ComposedPointcut, MethodMatchers};
pub use expression::PointcutExpression;
pub use matchers::{
    is_match, matches_name, DynamicMethodMatcher, FnClassFilter, FnMethodMatcher,
    NameMatchMethodMatcher, RegexMethodMatcher, RootClassFilter, TypeNameClassFilter,
};

use crate::error::AopConfigError;
use crate::joinpoint::{Arguments, Method};
use crate::target::TargetClass;
use once_cell::sync::Lazy;
use std::sync::Arc;

/// 类过滤器
///
/// 必须是纯函数：结果只取决于类型，可重复调用，线程安全
pub trait ClassFilter: Send + Sync {
    fn matches(&self, class: &TargetClass) -> bool;
}

/// 方法匹配器
pub trait MethodMatcher: Send + Sync {
    /// 静态匹配，结果会按方法缓存
    fn matches(&self, method: &Method, class: &TargetClass) -> bool;

    /// 是否需要在每次调用时结合参数再次判断
    fn is_runtime(&self) -> bool {
        false
    }

    /// 运行时匹配，只在静态匹配通过后调用
    fn matches_with_args(&self, method: &Method, class: &TargetClass, _args: &Arguments) -> bool {
        self.matches(method, class)
    }
}

/// 切点 Trait
pub trait Pointcut: Send + Sync {
    fn class_filter(&self) -> &dyn ClassFilter;

    fn method_matcher(&self) -> &dyn MethodMatcher;
}

/// 匹配一切的切点，也可以单独作为类过滤器或方法匹配器使用
#[derive(Debug, Clone, Copy, Default)]
pub struct TruePointcut;

impl ClassFilter for TruePointcut {
    fn matches(&self, _class: &TargetClass) -> bool {
        true
    }
}

impl MethodMatcher for TruePointcut {
    fn matches(&self, _method: &Method, _class: &TargetClass) -> bool {
        true
    }
}

impl Pointcut for TruePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

/// 不匹配任何连接点的切点
#[derive(Debug, Clone, Copy, Default)]
pub struct FalsePointcut;

impl ClassFilter for FalsePointcut {
    fn matches(&self, _class: &TargetClass) -> bool {
        false
    }
}

impl MethodMatcher for FalsePointcut {
    fn matches(&self, _method: &Method, _class: &TargetClass) -> bool {
        false
    }
}

impl Pointcut for FalsePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

/// 由独立的类过滤器和方法匹配器组成的切点
pub struct SimplePointcut {
    class_filter: Arc<dyn ClassFilter>,
    method_matcher: Arc<dyn MethodMatcher>,
}

impl SimplePointcut {
    pub fn new(class_filter: Arc<dyn ClassFilter>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self {
            class_filter,
            method_matcher,
        }
    }
}

impl Pointcut for SimplePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self.class_filter.as_ref()
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self.method_matcher.as_ref()
    }
}

static ALWAYS: Lazy<Arc<dyn Pointcut>> = Lazy::new(|| Arc::new(TruePointcut));
static NEVER: Lazy<Arc<dyn Pointcut>> = Lazy::new(|| Arc::new(FalsePointcut));

/// 切点工具函数
pub struct Pointcuts;

impl Pointcuts {
    /// 共享的 TRUE 切点
    pub fn always() -> Arc<dyn Pointcut> {
        ALWAYS.clone()
    }

    /// 共享的 FALSE 切点
    pub fn never() -> Arc<dyn Pointcut> {
        NEVER.clone()
    }

    /// 并集：任意一个切点匹配即匹配
    pub fn union(a: Arc<dyn Pointcut>, b: Arc<dyn Pointcut>) -> Arc<dyn Pointcut> {
        Arc::new(ComposedPointcut::union(a, b))
    }

    /// 交集：两个切点都匹配才匹配
    pub fn intersection(a: Arc<dyn Pointcut>, b: Arc<dyn Pointcut>) -> Arc<dyn Pointcut> {
        Arc::new(ComposedPointcut::intersection(a, b))
    }

    /// 取反
    pub fn negation(pointcut: Arc<dyn Pointcut>) -> Arc<dyn Pointcut> {
        Arc::new(ComposedPointcut::negation(pointcut))
    }

    pub fn from_parts(
        class_filter: Arc<dyn ClassFilter>,
        method_matcher: Arc<dyn MethodMatcher>,
    ) -> Arc<dyn Pointcut> {
        Arc::new(SimplePointcut::new(class_filter, method_matcher))
    }

    /// 按方法名匹配（支持 `prefix*` / `*suffix`）
    pub fn method_names<I, S>(names: I) -> Arc<dyn Pointcut>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_parts(
            Arc::new(TruePointcut),
            Arc::new(NameMatchMethodMatcher::new(names)),
        )
    }

    /// 按 `Type::method` 正则匹配
    pub fn regex<I, S>(patterns: I) -> Result<Arc<dyn Pointcut>, AopConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let matcher = RegexMethodMatcher::new(patterns)?;
        Ok(Self::from_parts(Arc::new(TruePointcut), Arc::new(matcher)))
    }

    /// 静态匹配：类过滤器 + 静态方法匹配
    pub fn matches(pointcut: &dyn Pointcut, method: &Method, class: &TargetClass) -> bool {
        pointcut.class_filter().matches(class) && pointcut.method_matcher().matches(method, class)
    }

    /// 完整匹配：静态匹配通过后，运行时匹配器再结合参数判断
    pub fn matches_with_args(
        pointcut: &dyn Pointcut,
        method: &Method,
        class: &TargetClass,
        args: &Arguments,
    ) -> bool {
        if !Self::matches(pointcut, method, class) {
            return false;
        }
        let matcher = pointcut.method_matcher();
        !matcher.is_runtime() || matcher.matches_with_args(method, class, args)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::target::{InterfaceBinding, InterfaceDescriptor};

    pub struct OrderService;
    pub struct UserRepository;

    pub const PLACE_ORDER: Method = Method::new("OrderApi", "place_order", &["String"], "Result<u64>");
    pub const CANCEL_ORDER: Method = Method::new("OrderApi", "cancel_order", &["u64"], "Result<()>");
    pub const FIND_USER: Method = Method::new("UserRepository", "find_user", &["u64"], "Result<String>");

    pub static ORDER_API: InterfaceDescriptor =
        InterfaceDescriptor::new("OrderApi", &[PLACE_ORDER, CANCEL_ORDER]);

    fn dispatch_order(
        _target: &OrderService,
        method: &Method,
        _args: &Arguments,
    ) -> crate::error::InvocationResult {
        Ok(Box::new(method.name()))
    }

    pub fn order_service() -> TargetClass {
        TargetClass::of::<OrderService>()
            .implements(InterfaceBinding::new(&ORDER_API, dispatch_order))
            .build()
    }

    pub fn user_repository() -> TargetClass {
        TargetClass::of::<UserRepository>().build()
    }
}
