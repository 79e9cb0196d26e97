//! 常用的类过滤器与方法匹配器

use super::{ClassFilter, MethodMatcher};
use crate::error::AopConfigError;
use crate::joinpoint::{Arguments, Method};
use crate::target::TargetClass;
use regex::Regex;
use std::any::{Any, TypeId};

/// 简单名称模式匹配
///
/// - `prefix*`：以 prefix 开头
/// - `*suffix`：以 suffix 结尾
///
/// 区分大小写，只支持开头或结尾的单个 `*`
pub fn is_match(name: &str, mapped_name: &str) -> bool {
    let prefix_match = mapped_name
        .strip_suffix('*')
        .map(|prefix| name.starts_with(prefix))
        .unwrap_or(false);
    let suffix_match = mapped_name
        .strip_prefix('*')
        .map(|suffix| name.ends_with(suffix))
        .unwrap_or(false);
    prefix_match || suffix_match
}

/// 字面量相等或 [`is_match`]
pub fn matches_name(name: &str, mapped_name: &str) -> bool {
    name == mapped_name || is_match(name, mapped_name)
}

/// 按方法名匹配
#[derive(Debug, Clone, Default)]
pub struct NameMatchMethodMatcher {
    names: Vec<String>,
}

impl NameMatchMethodMatcher {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn add_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.names.push(name.into());
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl MethodMatcher for NameMatchMethodMatcher {
    fn matches(&self, method: &Method, _class: &TargetClass) -> bool {
        self.names
            .iter()
            .any(|mapped| matches_name(method.name(), mapped))
    }
}

/// 正则方法匹配器
///
/// 匹配对象为 `声明类型::方法名`，同时也会尝试 `目标类型::方法名`。
/// 模式需要完整匹配；命中排除模式的方法不会匹配
#[derive(Debug, Clone)]
pub struct RegexMethodMatcher {
    patterns: Vec<Regex>,
    excluded: Vec<Regex>,
}

fn compile_all<I, S>(patterns: I) -> Result<Vec<Regex>, AopConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    patterns
        .into_iter()
        .map(|p| {
            let p = p.as_ref();
            Regex::new(&format!("^(?:{})$", p)).map_err(|e| {
                AopConfigError::InvalidPointcut(format!("invalid regex '{}': {}", p, e))
            })
        })
        .collect()
}

impl RegexMethodMatcher {
    pub fn new<I, S>(patterns: I) -> Result<Self, AopConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self {
            patterns: compile_all(patterns)?,
            excluded: Vec::new(),
        })
    }

    pub fn with_exclusions<I, S>(mut self, patterns: I) -> Result<Self, AopConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded = compile_all(patterns)?;
        Ok(self)
    }

    fn matches_candidate(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|r| r.is_match(candidate))
            && !self.excluded.iter().any(|r| r.is_match(candidate))
    }
}

impl MethodMatcher for RegexMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        let declared = format!("{}::{}", method.declaring_type(), method.name());
        if self.matches_candidate(&declared) {
            return true;
        }
        class.name() != method.declaring_type()
            && self.matches_candidate(&format!("{}::{}", class.name(), method.name()))
    }
}

/// 按类型名称匹配（规则同 [`matches_name`]）
#[derive(Debug, Clone, Default)]
pub struct TypeNameClassFilter {
    patterns: Vec<String>,
}

impl TypeNameClassFilter {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

impl ClassFilter for TypeNameClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        self.patterns
            .iter()
            .any(|pattern| matches_name(class.name(), pattern))
    }
}

/// 只匹配某个具体类型
#[derive(Debug, Clone, Copy)]
pub struct RootClassFilter {
    type_id: TypeId,
}

impl RootClassFilter {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
        }
    }
}

impl ClassFilter for RootClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        class.type_id() == self.type_id
    }
}

type StaticCheck = Box<dyn Fn(&Method, &TargetClass) -> bool + Send + Sync>;
type DynamicCheck = Box<dyn Fn(&Method, &TargetClass, &Arguments) -> bool + Send + Sync>;

/// 运行时方法匹配器
///
/// 每次调用都会结合实际参数判断；可以附加一个静态预检查，
/// 静态检查不通过的方法不会进入拦截链
pub struct DynamicMethodMatcher {
    static_check: Option<StaticCheck>,
    dynamic_check: DynamicCheck,
}

impl DynamicMethodMatcher {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Method, &TargetClass, &Arguments) -> bool + Send + Sync + 'static,
    {
        Self {
            static_check: None,
            dynamic_check: Box::new(check),
        }
    }

    pub fn with_static_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&Method, &TargetClass) -> bool + Send + Sync + 'static,
    {
        self.static_check = Some(Box::new(check));
        self
    }
}

impl MethodMatcher for DynamicMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        self.static_check
            .as_ref()
            .map(|check| check(method, class))
            .unwrap_or(true)
    }

    fn is_runtime(&self) -> bool {
        true
    }

    fn matches_with_args(&self, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
        (self.dynamic_check)(method, class, args)
    }
}

/// 闭包方法匹配器（静态）
pub struct FnMethodMatcher(StaticCheck);

impl FnMethodMatcher {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&Method, &TargetClass) -> bool + Send + Sync + 'static,
    {
        Self(Box::new(check))
    }
}

impl MethodMatcher for FnMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        (self.0)(method, class)
    }
}

/// 闭包类过滤器
pub struct FnClassFilter(Box<dyn Fn(&TargetClass) -> bool + Send + Sync>);

impl FnClassFilter {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&TargetClass) -> bool + Send + Sync + 'static,
    {
        Self(Box::new(check))
    }
}

impl ClassFilter for FnClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        (self.0)(class)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn test_is_match() {
        assert!(is_match("txFoo", "tx*"));
        assert!(is_match("FooTx", "*Tx"));
        assert!(!is_match("bar", "tx*"));
        assert!(!is_match("txfoo", "Tx*"));
        // 字面量只在 matches_name 中按相等匹配
        assert!(!is_match("exactName", "exactName"));
        assert!(matches_name("exactName", "exactName"));
        assert!(!matches_name("exactNames", "exactName"));
    }

    #[test]
    fn test_name_match_method_matcher() {
        let class = order_service();
        let mut matcher = NameMatchMethodMatcher::new(["place_order"]);

        assert!(matcher.matches(&PLACE_ORDER, &class));
        assert!(!matcher.matches(&CANCEL_ORDER, &class));

        matcher.add_name("*_order");
        assert!(matcher.matches(&CANCEL_ORDER, &class));
    }

    #[test]
    fn test_regex_method_matcher() {
        let class = order_service();
        let matcher = RegexMethodMatcher::new([r"OrderApi::.*_order"])
            .unwrap()
            .with_exclusions(["OrderApi::cancel.*"])
            .unwrap();

        assert!(matcher.matches(&PLACE_ORDER, &class));
        assert!(!matcher.matches(&CANCEL_ORDER, &class));
    }

    #[test]
    fn test_regex_matches_target_type_name() {
        let class = order_service();
        let matcher = RegexMethodMatcher::new([r"OrderService::place_.*"]).unwrap();

        assert!(matcher.matches(&PLACE_ORDER, &class));
        assert!(!matcher.matches(&CANCEL_ORDER, &class));
    }

    #[test]
    fn test_invalid_regex() {
        let err = RegexMethodMatcher::new(["("]).unwrap_err();
        assert!(matches!(err, AopConfigError::InvalidPointcut(_)));
    }

    #[test]
    fn test_class_filters() {
        assert!(TypeNameClassFilter::new(["Order*"]).matches(&order_service()));
        assert!(!TypeNameClassFilter::new(["Order*"]).matches(&user_repository()));

        let root = RootClassFilter::of::<UserRepository>();
        assert!(root.matches(&user_repository()));
        assert!(!root.matches(&order_service()));

        let by_interface = FnClassFilter::new(|class| class.implements("OrderApi"));
        assert!(by_interface.matches(&order_service()));
    }

    #[test]
    fn test_dynamic_static_check() {
        let class = order_service();
        let matcher = DynamicMethodMatcher::new(|_, _, _| true)
            .with_static_check(|method, _| method.name().starts_with("cancel"));

        assert!(matcher.is_runtime());
        assert!(!matcher.matches(&PLACE_ORDER, &class));
        assert!(matcher.matches(&CANCEL_ORDER, &class));
    }
}
