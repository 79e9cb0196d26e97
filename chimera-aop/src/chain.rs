//! 拦截链解析
//!
//! 对一次调用（方法 + 目标类型），按配置顺序筛选出匹配的通知器：
//! 类过滤器先判断，然后是静态方法匹配。运行时匹配器会生成动态条目，
//! 在每次调用时结合实际参数再判断一次

use crate::advice::MethodInterceptor;
use crate::advisor::Advisor;
use crate::joinpoint::Method;
use crate::target::TargetClass;
use std::fmt;
use std::sync::Arc;

/// 拦截链条目
#[derive(Clone)]
pub enum ChainEntry {
    /// 静态匹配已确定
    Static(Arc<dyn MethodInterceptor>),

    /// 需要在调用时结合参数匹配
    Dynamic {
        interceptor: Arc<dyn MethodInterceptor>,
        advisor: Arc<dyn Advisor>,
    },
}

impl ChainEntry {
    pub fn interceptor(&self) -> &Arc<dyn MethodInterceptor> {
        match self {
            ChainEntry::Static(interceptor) => interceptor,
            ChainEntry::Dynamic { interceptor, .. } => interceptor,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, ChainEntry::Dynamic { .. })
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainEntry::Static(_) => write!(f, "Static"),
            ChainEntry::Dynamic { advisor, .. } => write!(f, "Dynamic({})", advisor.name()),
        }
    }
}

/// 拦截链工厂
pub struct AdvisorChainFactory;

impl AdvisorChainFactory {
    pub fn resolve(advisors: &[Arc<dyn Advisor>], method: &Method, class: &TargetClass) -> Vec<ChainEntry> {
        let mut chain = Vec::new();

        for advisor in advisors {
            let pointcut = advisor.pointcut();
            if !pointcut.class_filter().matches(class) {
                continue;
            }
            let matcher = pointcut.method_matcher();
            if !matcher.matches(method, class) {
                continue;
            }

            let interceptor = advisor.advice().to_interceptor();
            if matcher.is_runtime() {
                chain.push(ChainEntry::Dynamic {
                    interceptor,
                    advisor: advisor.clone(),
                });
            } else {
                chain.push(ChainEntry::Static(interceptor));
            }
        }

        tracing::trace!(
            "Resolved {} interceptor(s) for {} on '{}'",
            chain.len(),
            method,
            class.name()
        );
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::advisor::DefaultPointcutAdvisor;
    use crate::pointcut::test_support::*;
    use crate::pointcut::{DynamicMethodMatcher, Pointcuts, TruePointcut, TypeNameClassFilter};

    fn noop() -> Advice {
        Advice::around(|invocation| invocation.proceed())
    }

    #[test]
    fn test_resolve_filters_and_keeps_order() {
        let advisors: Vec<Arc<dyn Advisor>> = vec![
            DefaultPointcutAdvisor::name_match(["place*"], noop()).into_advisor(),
            DefaultPointcutAdvisor::global(noop()).into_advisor(),
            DefaultPointcutAdvisor::new(
                Pointcuts::from_parts(
                    Arc::new(TypeNameClassFilter::new(["*Repository"])),
                    Arc::new(TruePointcut),
                ),
                noop(),
            )
            .into_advisor(),
        ];
        let class = order_service();

        let place = AdvisorChainFactory::resolve(&advisors, &PLACE_ORDER, &class);
        let cancel = AdvisorChainFactory::resolve(&advisors, &CANCEL_ORDER, &class);

        assert_eq!(place.len(), 2);
        assert!(Arc::ptr_eq(
            place[0].interceptor(),
            &advisors[0].advice().to_interceptor()
        ));
        assert_eq!(cancel.len(), 1);
    }

    #[test]
    fn test_runtime_matcher_yields_dynamic_entry() {
        let advisors: Vec<Arc<dyn Advisor>> = vec![DefaultPointcutAdvisor::new(
            Pointcuts::from_parts(
                Arc::new(TruePointcut),
                Arc::new(DynamicMethodMatcher::new(|_, _, _| true)),
            ),
            noop(),
        )
        .with_name("dynamic")
        .into_advisor()];

        let chain = AdvisorChainFactory::resolve(&advisors, &PLACE_ORDER, &order_service());

        assert_eq!(chain.len(), 1);
        assert!(chain[0].is_dynamic());
        assert_eq!(format!("{:?}", chain[0]), "Dynamic(dynamic)");
    }
}
