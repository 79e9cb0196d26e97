//! 切点表达式
//!
//! 声明式的匹配规则树，本身就是一个完整的 [`Pointcut`]

use super::{ClassFilter, MethodMatcher, Pointcut};
use crate::error::AopConfigError;
use crate::joinpoint::Method;
use crate::target::TargetClass;
use regex::Regex;
use std::sync::Arc;

type CustomMatch = Arc<dyn Fn(&Method, &TargetClass) -> bool + Send + Sync>;

/// 切点表达式
#[derive(Clone)]
pub enum PointcutExpression {
    /// 匹配所有方法
    All,

    /// 匹配特定类型的所有方法（类型名或其实现的接口名）
    /// 例如：TypePattern("UserService")
    TypePattern(String),

    /// 匹配特定方法名
    /// 例如：MethodPattern("get_user")
    MethodPattern(String),

    /// 匹配特定类型的特定方法
    /// 例如：execution(* UserService.get_user(..))
    Execution {
        type_pattern: String,
        method_pattern: String,
    },

    /// 使用正则表达式匹配类型
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法
    MethodRegex(Regex),

    /// 自定义匹配函数
    Custom(CustomMatch),

    And(Box<PointcutExpression>, Box<PointcutExpression>),

    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    pub fn type_pattern(pattern: impl Into<String>) -> Self {
        PointcutExpression::TypePattern(pattern.into())
    }

    pub fn method_pattern(pattern: impl Into<String>) -> Self {
        PointcutExpression::MethodPattern(pattern.into())
    }

    pub fn type_regex(pattern: &str) -> Result<Self, AopConfigError> {
        Ok(PointcutExpression::TypeRegex(Self::compile(pattern)?))
    }

    pub fn method_regex(pattern: &str) -> Result<Self, AopConfigError> {
        Ok(PointcutExpression::MethodRegex(Self::compile(pattern)?))
    }

    pub fn custom<F>(matcher: F) -> Self
    where
        F: Fn(&Method, &TargetClass) -> bool + Send + Sync + 'static,
    {
        PointcutExpression::Custom(Arc::new(matcher))
    }

    fn compile(pattern: &str) -> Result<Regex, AopConfigError> {
        Regex::new(pattern)
            .map_err(|e| AopConfigError::InvalidPointcut(format!("invalid regex '{}': {}", pattern, e)))
    }

    /// 解析 execution 表达式
    ///
    /// 支持的格式：
    /// - `execution(* UserService.get_user(..))`
    /// - `* UserService.get_*(..)`
    /// - `UserService::get_user`
    /// - `get_*`（只匹配方法名）
    ///
    /// 返回类型部分会被忽略
    pub fn execution(expression: &str) -> Result<Self, AopConfigError> {
        let invalid = |reason: &str| {
            AopConfigError::InvalidPointcut(format!("'{}': {}", expression, reason))
        };

        let mut body = expression.trim();
        if let Some(inner) = body.strip_prefix("execution(") {
            body = inner
                .strip_suffix(')')
                .ok_or_else(|| invalid("missing closing ')'"))?
                .trim();
        }

        let signature = body
            .split_whitespace()
            .last()
            .ok_or_else(|| invalid("empty expression"))?;

        // 移除参数部分 "(..)"
        let name_part = match signature.find('(') {
            Some(open) if signature.ends_with(')') => &signature[..open],
            Some(_) => return Err(invalid("unbalanced parameter list")),
            None => signature,
        };

        let split = name_part
            .rsplit_once("::")
            .or_else(|| name_part.rsplit_once('.'));

        match split {
            Some((type_pattern, method_pattern)) => {
                if type_pattern.is_empty() || method_pattern.is_empty() {
                    return Err(invalid("missing type or method name"));
                }
                Ok(PointcutExpression::Execution {
                    type_pattern: type_pattern.to_string(),
                    method_pattern: method_pattern.to_string(),
                })
            }
            None if name_part.is_empty() => Err(invalid("missing method name")),
            None => Ok(PointcutExpression::MethodPattern(name_part.to_string())),
        }
    }

    /// 与运算
    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }

    pub fn into_pointcut(self) -> Arc<dyn Pointcut> {
        Arc::new(self)
    }

    /// 简单的模式匹配（支持 * 通配符）
    ///
    /// 支持的模式：
    /// - `*` - 匹配任意字符串
    /// - `User*` - 以 User 开头
    /// - `*Service` - 以 Service 结尾
    /// - `*Service*` - 包含 Service
    fn pattern_matches(pattern: &str, target: &str) -> bool {
        if !pattern.contains('*') {
            return pattern == target;
        }

        let parts: Vec<&str> = pattern.split('*').collect();
        let first = parts[0];
        let last = parts[parts.len() - 1];

        let Some(mut remaining) = target.strip_prefix(first) else {
            return false;
        };
        for part in &parts[1..parts.len() - 1] {
            match remaining.find(part) {
                Some(index) => remaining = &remaining[index + part.len()..],
                None => return false,
            }
        }
        remaining.len() >= last.len() && remaining.ends_with(last)
    }

    /// 类型名或任一接口名匹配
    fn type_matches(class: &TargetClass, check: impl Fn(&str) -> bool) -> bool {
        check(class.name()) || class.interfaces().any(|i| check(i.name()))
    }

    /// 方法所属类型匹配：目标类型名或方法的声明类型
    fn owner_matches(method: &Method, class: &TargetClass, check: impl Fn(&str) -> bool) -> bool {
        check(class.name()) || check(method.declaring_type())
    }

    fn matches_class(&self, class: &TargetClass) -> bool {
        match self {
            PointcutExpression::TypePattern(pattern)
            | PointcutExpression::Execution {
                type_pattern: pattern,
                ..
            } => Self::type_matches(class, |name| Self::pattern_matches(pattern, name)),

            PointcutExpression::TypeRegex(regex) => Self::type_matches(class, |name| regex.is_match(name)),

            PointcutExpression::And(left, right) => left.matches_class(class) && right.matches_class(class),

            PointcutExpression::Or(left, right) => left.matches_class(class) || right.matches_class(class),

            // 取反和方法级规则在类型层面无法排除任何类型
            PointcutExpression::All
            | PointcutExpression::MethodPattern(_)
            | PointcutExpression::MethodRegex(_)
            | PointcutExpression::Custom(_)
            | PointcutExpression::Not(_) => true,
        }
    }

    fn matches_method(&self, method: &Method, class: &TargetClass) -> bool {
        match self {
            PointcutExpression::All => true,

            PointcutExpression::TypePattern(pattern) => {
                Self::owner_matches(method, class, |name| Self::pattern_matches(pattern, name))
            }

            PointcutExpression::MethodPattern(pattern) => Self::pattern_matches(pattern, method.name()),

            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => {
                Self::owner_matches(method, class, |name| Self::pattern_matches(type_pattern, name))
                    && Self::pattern_matches(method_pattern, method.name())
            }

            PointcutExpression::TypeRegex(regex) => {
                Self::owner_matches(method, class, |name| regex.is_match(name))
            }

            PointcutExpression::MethodRegex(regex) => regex.is_match(method.name()),

            PointcutExpression::Custom(func) => func(method, class),

            PointcutExpression::And(left, right) => {
                left.matches_method(method, class) && right.matches_method(method, class)
            }

            PointcutExpression::Or(left, right) => {
                left.matches_method(method, class) || right.matches_method(method, class)
            }

            PointcutExpression::Not(expr) => !expr.matches_method(method, class),
        }
    }
}

impl ClassFilter for PointcutExpression {
    fn matches(&self, class: &TargetClass) -> bool {
        self.matches_class(class)
    }
}

impl MethodMatcher for PointcutExpression {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        self.matches_method(method, class)
    }
}

impl Pointcut for PointcutExpression {
    fn class_filter(&self) -> &dyn ClassFilter {
        self
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self
    }
}

impl std::fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "All"),
            PointcutExpression::TypePattern(p) => write!(f, "TypePattern({})", p),
            PointcutExpression::MethodPattern(p) => write!(f, "MethodPattern({})", p),
            PointcutExpression::Execution {
                type_pattern,
                method_pattern,
            } => write!(f, "Execution({}.{})", type_pattern, method_pattern),
            PointcutExpression::TypeRegex(r) => write!(f, "TypeRegex({})", r.as_str()),
            PointcutExpression::MethodRegex(r) => write!(f, "MethodRegex({})", r.as_str()),
            PointcutExpression::Custom(_) => write!(f, "Custom(...)"),
            PointcutExpression::And(l, r) => write!(f, "And({:?}, {:?})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "Or({:?}, {:?})", l, r),
            PointcutExpression::Not(e) => write!(f, "Not({:?})", e),
        }
    }
}
