//! 通知（Advice）定义
//!
//! 定义了在连接点执行的各种动作。所有通知最终都会被适配为 [`MethodInterceptor`]，
//! 按顺序组成拦截链

use crate::error::InvocationResult;
use crate::invocation::MethodInvocation;
use crate::joinpoint::JoinPoint;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceType {
    /// 前置通知
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdviceType::Before => "before",
            AdviceType::After => "after",
            AdviceType::AfterReturning => "after-returning",
            AdviceType::AfterThrowing => "after-throwing",
            AdviceType::Around => "around",
        };
        f.write_str(name)
    }
}

/// 环绕通知 / 方法拦截器
///
/// 可以完全控制目标方法的执行：调用 `invocation.proceed()` 零次（短路）、一次或多次（重试）
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult;
}

/// 前置通知
///
/// 返回错误时目标方法不会执行，错误直接传播给调用者
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 后置通知（无论成功还是失败都执行）
pub trait AfterAdvice: Send + Sync {
    fn after(&self, join_point: &JoinPoint<'_>);
}

/// 返回后通知
///
/// 只在成功返回时执行，可以检查返回值，返回错误会替换调用结果
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, join_point: &JoinPoint<'_>, value: &(dyn Any + Send)) -> anyhow::Result<()>;
}

/// 异常通知
///
/// 返回 `Ok(())` 时原错误继续传播；返回 `Err(e)` 时调用者收到 `e`（错误转换）
pub trait AfterThrowingAdvice: Send + Sync {
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: &anyhow::Error) -> anyhow::Result<()>;
}

/// 通知
#[derive(Clone)]
pub enum Advice {
    Around(Arc<dyn MethodInterceptor>),
    Before(Arc<dyn BeforeAdvice>),
    After(Arc<dyn AfterAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
}

impl Advice {
    /// 用闭包创建环绕通知
    pub fn around<F>(f: F) -> Self
    where
        F: Fn(&mut MethodInvocation<'_>) -> InvocationResult + Send + Sync + 'static,
    {
        Advice::Around(Arc::new(FnAdvice(f)))
    }

    pub fn before<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::Before(Arc::new(FnAdvice(f)))
    }

    pub fn after<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) + Send + Sync + 'static,
    {
        Advice::After(Arc::new(FnAfter(f)))
    }

    pub fn after_returning<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &(dyn Any + Send)) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::AfterReturning(Arc::new(FnAdvice(f)))
    }

    pub fn after_throwing<F>(f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &anyhow::Error) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Advice::AfterThrowing(Arc::new(FnAdvice(f)))
    }

    pub fn interceptor(interceptor: impl MethodInterceptor + 'static) -> Self {
        Advice::Around(Arc::new(interceptor))
    }

    pub fn advice_type(&self) -> AdviceType {
        match self {
            Advice::Around(_) => AdviceType::Around,
            Advice::Before(_) => AdviceType::Before,
            Advice::After(_) => AdviceType::After,
            Advice::AfterReturning(_) => AdviceType::AfterReturning,
            Advice::AfterThrowing(_) => AdviceType::AfterThrowing,
        }
    }

    /// 适配为拦截器
    pub fn to_interceptor(&self) -> Arc<dyn MethodInterceptor> {
        match self {
            Advice::Around(interceptor) => interceptor.clone(),
            Advice::Before(advice) => Arc::new(BeforeAdviceInterceptor(advice.clone())),
            Advice::After(advice) => Arc::new(AfterAdviceInterceptor(advice.clone())),
            Advice::AfterReturning(advice) => Arc::new(AfterReturningAdviceInterceptor(advice.clone())),
            Advice::AfterThrowing(advice) => Arc::new(AfterThrowingAdviceInterceptor(advice.clone())),
        }
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Advice({})", self.advice_type())
    }
}

/// 闭包通知
struct FnAdvice<F>(F);

impl<F> MethodInterceptor for FnAdvice<F>
where
    F: Fn(&mut MethodInvocation<'_>) -> InvocationResult + Send + Sync,
{
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        (self.0)(invocation)
    }
}

impl<F> BeforeAdvice for FnAdvice<F>
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        (self.0)(join_point)
    }
}

impl<F> AfterReturningAdvice for FnAdvice<F>
where
    F: Fn(&JoinPoint<'_>, &(dyn Any + Send)) -> anyhow::Result<()> + Send + Sync,
{
    fn after_returning(&self, join_point: &JoinPoint<'_>, value: &(dyn Any + Send)) -> anyhow::Result<()> {
        (self.0)(join_point, value)
    }
}

impl<F> AfterThrowingAdvice for FnAdvice<F>
where
    F: Fn(&JoinPoint<'_>, &anyhow::Error) -> anyhow::Result<()> + Send + Sync,
{
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: &anyhow::Error) -> anyhow::Result<()> {
        (self.0)(join_point, error)
    }
}

struct FnAfter<F>(F);

impl<F> AfterAdvice for FnAfter<F>
where
    F: Fn(&JoinPoint<'_>) + Send + Sync,
{
    fn after(&self, join_point: &JoinPoint<'_>) {
        (self.0)(join_point)
    }
}

struct BeforeAdviceInterceptor(Arc<dyn BeforeAdvice>);

impl MethodInterceptor for BeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        self.0.before(&invocation.join_point())?;
        invocation.proceed()
    }
}

struct AfterAdviceInterceptor(Arc<dyn AfterAdvice>);

impl MethodInterceptor for AfterAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let result = invocation.proceed();
        self.0.after(&invocation.join_point());
        result
    }
}

struct AfterReturningAdviceInterceptor(Arc<dyn AfterReturningAdvice>);

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let value = invocation.proceed()?;
        self.0.after_returning(&invocation.join_point(), &*value)?;
        Ok(value)
    }
}

struct AfterThrowingAdviceInterceptor(Arc<dyn AfterThrowingAdvice>);

impl MethodInterceptor for AfterThrowingAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        match invocation.proceed() {
            Ok(value) => Ok(value),
            Err(error) => {
                self.0.after_throwing(&invocation.join_point(), &error)?;
                Err(error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advice_type() {
        let around = Advice::around(|invocation| invocation.proceed());
        let before = Advice::before(|_| Ok(()));
        let after = Advice::after(|_| {});
        let returning = Advice::after_returning(|_, _| Ok(()));
        let throwing = Advice::after_throwing(|_, _| Ok(()));

        assert_eq!(around.advice_type(), AdviceType::Around);
        assert_eq!(before.advice_type(), AdviceType::Before);
        assert_eq!(after.advice_type(), AdviceType::After);
        assert_eq!(returning.advice_type(), AdviceType::AfterReturning);
        assert_eq!(throwing.advice_type(), AdviceType::AfterThrowing);
        assert_eq!(format!("{:?}", throwing), "Advice(after-throwing)");
    }

    #[test]
    fn test_around_passes_through_interceptor() {
        let around = Advice::around(|invocation| invocation.proceed());
        let Advice::Around(original) = &around else {
            panic!("expected around advice");
        };

        assert!(Arc::ptr_eq(original, &around.to_interceptor()));
    }
}
