//! 预定义的常用通知
//!
//! - `TraceInterceptor`：记录方法进入和退出（含耗时）
//! - `PerformanceMonitorInterceptor`：超过阈值时告警
//! - `ExceptionLoggingAdvice`：记录方法抛出的错误
//! - `RetryInterceptor`：失败时重新执行后续拦截链

use crate::advice::{AfterThrowingAdvice, MethodInterceptor};
use crate::error::InvocationResult;
use crate::error_info::ErrorInfo;
use crate::invocation::MethodInvocation;
use crate::joinpoint::JoinPoint;
use std::time::{Duration, Instant};

/// 日志拦截器 - 记录方法调用
#[derive(Debug, Clone, Default)]
pub struct TraceInterceptor {
    log_args: bool,
}

impl TraceInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 同时记录参数个数
    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }
}

impl MethodInterceptor for TraceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let signature = invocation.method().signature();
        if self.log_args {
            tracing::info!(
                "→ Entering: {} ({} argument(s))",
                signature,
                invocation.arguments().len()
            );
        } else {
            tracing::info!("→ Entering: {}", signature);
        }

        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed = started.elapsed();
        match &result {
            Ok(_) => tracing::info!("← Exiting: {} (took {:?})", signature, elapsed),
            Err(e) => tracing::info!("← Exiting: {} with error '{}' (took {:?})", signature, e, elapsed),
        }
        result
    }
}

/// 性能监控拦截器
#[derive(Debug, Clone)]
pub struct PerformanceMonitorInterceptor {
    threshold: Duration,
}

impl PerformanceMonitorInterceptor {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }
}

impl MethodInterceptor for PerformanceMonitorInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let started = Instant::now();
        let result = invocation.proceed();
        let elapsed = started.elapsed();

        if elapsed > self.threshold {
            tracing::warn!(
                "⚠️ Slow method detected: {} took {}ms (threshold: {}ms)",
                invocation.method(),
                elapsed.as_millis(),
                self.threshold.as_millis()
            );
        } else {
            tracing::debug!("{} took {:?}", invocation.method(), elapsed);
        }
        result
    }
}

/// 异常日志通知
///
/// 只记录，不改变错误
#[derive(Debug, Clone, Copy, Default)]
pub struct ExceptionLoggingAdvice;

impl AfterThrowingAdvice for ExceptionLoggingAdvice {
    fn after_throwing(&self, join_point: &JoinPoint<'_>, error: &anyhow::Error) -> anyhow::Result<()> {
        let info = ErrorInfo::from_anyhow(error);
        tracing::error!(
            "❌ Exception in {} [{}]: {}",
            join_point.signature(),
            info.error_type,
            info.full_description()
        );
        Ok(())
    }
}

type RetryPredicate = Box<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// 重试拦截器
///
/// 失败时重新调用 `proceed()`，后续拦截器和目标方法都会再次执行
pub struct RetryInterceptor {
    max_attempts: usize,
    retry_if: Option<RetryPredicate>,
}

impl RetryInterceptor {
    /// `max_attempts` 包含首次调用，至少为 1
    pub fn new(max_attempts: usize) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_if: None,
        }
    }

    /// 只在满足条件时重试
    pub fn retry_if<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.retry_if = Some(Box::new(predicate));
        self
    }

    fn should_retry(&self, error: &anyhow::Error) -> bool {
        self.retry_if.as_ref().map(|p| p(error)).unwrap_or(true)
    }
}

impl MethodInterceptor for RetryInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> InvocationResult {
        let mut attempt = 1;
        loop {
            match invocation.proceed() {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && self.should_retry(&e) => {
                    tracing::warn!(
                        "🔁 Retrying {} after attempt {}/{} failed: {}",
                        invocation.method(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl std::fmt::Debug for RetryInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryInterceptor")
            .field("max_attempts", &self.max_attempts)
            .field("conditional", &self.retry_if.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::advisor::{Advisor, DefaultPointcutAdvisor};
    use crate::chain::AdvisorChainFactory;
    use crate::joinpoint::{Arguments, Method};
    use crate::target::{InterfaceBinding, InterfaceDescriptor, TargetClass};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Flaky {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    const FETCH: Method = Method::new("Fetcher", "fetch", &[], "Result<u8>");
    static FETCHER: InterfaceDescriptor = InterfaceDescriptor::new("Fetcher", &[FETCH]);

    fn dispatch_fetch(target: &Flaky, _method: &Method, _args: &Arguments) -> InvocationResult {
        target.calls.fetch_add(1, Ordering::SeqCst);
        let left = target.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            target.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("transient failure");
        }
        Ok(Box::new(42_u8))
    }

    fn call(advice: Advice, failures: usize) -> (InvocationResult, usize) {
        let target = Arc::new(Flaky {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        });
        let class = TargetClass::of::<Flaky>()
            .implements(InterfaceBinding::new(&FETCHER, dispatch_fetch))
            .build();
        let advisors: Vec<Arc<dyn Advisor>> = vec![DefaultPointcutAdvisor::global(advice).into_advisor()];
        let chain = AdvisorChainFactory::resolve(&advisors, &FETCH, &class);

        let result = MethodInvocation::new(&FETCH, Arguments::new(), target.clone(), &class, &chain, None)
            .proceed();
        (result, target.calls.load(Ordering::SeqCst))
    }

    #[test]
    fn test_retry_until_success() {
        let (result, calls) = call(Advice::interceptor(RetryInterceptor::new(3)), 2);

        assert_eq!(*result.unwrap().downcast::<u8>().unwrap(), 42);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_retry_gives_up() {
        let (result, calls) = call(Advice::interceptor(RetryInterceptor::new(2)), 5);

        assert_eq!(result.unwrap_err().to_string(), "transient failure");
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_retry_predicate() {
        let retry = RetryInterceptor::new(5).retry_if(|e| e.to_string().contains("fatal"));
        let (result, calls) = call(Advice::interceptor(retry), 1);

        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_logging_advice_keeps_error() {
        let (result, _) = call(Advice::AfterThrowing(Arc::new(ExceptionLoggingAdvice)), 1);
        assert_eq!(result.unwrap_err().to_string(), "transient failure");

        let (result, _) = call(Advice::interceptor(TraceInterceptor::new().with_args()), 0);
        assert!(result.is_ok());

        let (result, _) = call(
            Advice::interceptor(PerformanceMonitorInterceptor::new(Duration::ZERO)),
            0,
        );
        assert!(result.is_ok());
    }
}
