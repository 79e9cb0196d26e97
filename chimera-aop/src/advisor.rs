//! 通知器（Advisor）：一个切点 + 一个通知

use crate::advice::Advice;
use crate::error::AopConfigError;
use crate::pointcut::{Pointcut, PointcutExpression, Pointcuts};
use std::fmt;
use std::sync::Arc;

/// 通知器 Trait
pub trait Advisor: Send + Sync {
    /// 名称（用于管理和日志）
    fn name(&self) -> &str;

    fn pointcut(&self) -> &dyn Pointcut;

    fn advice(&self) -> &Advice;
}

/// 默认的通知器实现
#[derive(Clone)]
pub struct DefaultPointcutAdvisor {
    name: String,
    pointcut: Arc<dyn Pointcut>,
    advice: Advice,
}

impl DefaultPointcutAdvisor {
    pub fn new(pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        Self {
            name: format!("{}-advisor", advice.advice_type()),
            pointcut,
            advice,
        }
    }

    /// 匹配所有方法的通知器
    pub fn global(advice: Advice) -> Self {
        Self::new(Pointcuts::always(), advice)
    }

    /// 按方法名匹配（支持 `prefix*` / `*suffix`）
    pub fn name_match<I, S>(names: I, advice: Advice) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Pointcuts::method_names(names), advice)
    }

    /// 按 `Type::method` 正则匹配
    pub fn regex<I, S>(patterns: I, advice: Advice) -> Result<Self, AopConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(Self::new(Pointcuts::regex(patterns)?, advice))
    }

    /// 按 execution 表达式匹配，例如 `execution(* UserService.get_*(..))`
    pub fn expression(expression: &str, advice: Advice) -> Result<Self, AopConfigError> {
        let pointcut = PointcutExpression::execution(expression)?;
        Ok(Self::new(pointcut.into_pointcut(), advice))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn into_advisor(self) -> Arc<dyn Advisor> {
        Arc::new(self)
    }
}

impl Advisor for DefaultPointcutAdvisor {
    fn name(&self) -> &str {
        &self.name
    }

    fn pointcut(&self) -> &dyn Pointcut {
        self.pointcut.as_ref()
    }

    fn advice(&self) -> &Advice {
        &self.advice
    }
}

impl fmt::Debug for DefaultPointcutAdvisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultPointcutAdvisor")
            .field("name", &self.name)
            .field("advice", &self.advice)
            .finish()
    }
}
