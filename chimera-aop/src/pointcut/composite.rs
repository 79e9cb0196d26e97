//! 切点组合：并集、交集、取反

use super::{ClassFilter, MethodMatcher, Pointcut, TruePointcut};
use crate::joinpoint::{Arguments, Method};
use crate::target::TargetClass;
use std::sync::Arc;

#[derive(Clone)]
enum Composition {
    Union(Arc<dyn Pointcut>, Arc<dyn Pointcut>),
    Intersection(Arc<dyn Pointcut>, Arc<dyn Pointcut>),
    Negation(Arc<dyn Pointcut>),
}

/// 单个切点的完整匹配
fn full_match(pointcut: &dyn Pointcut, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
    let matcher = pointcut.method_matcher();
    pointcut.class_filter().matches(class)
        && matcher.matches(method, class)
        && (!matcher.is_runtime() || matcher.matches_with_args(method, class, args))
}

fn static_match(pointcut: &dyn Pointcut, method: &Method, class: &TargetClass) -> bool {
    pointcut.class_filter().matches(class) && pointcut.method_matcher().matches(method, class)
}

struct ComposedClassFilter(Composition);

impl ClassFilter for ComposedClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        match &self.0 {
            Composition::Union(a, b) => {
                a.class_filter().matches(class) || b.class_filter().matches(class)
            }
            Composition::Intersection(a, b) => {
                a.class_filter().matches(class) && b.class_filter().matches(class)
            }
            Composition::Negation(_) => true,
        }
    }
}

struct ComposedMethodMatcher(Composition);

impl MethodMatcher for ComposedMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        match &self.0 {
            // 只有自身类过滤器接受该类型的一方才参与方法匹配
            Composition::Union(a, b) => {
                static_match(a.as_ref(), method, class) || static_match(b.as_ref(), method, class)
            }
            Composition::Intersection(a, b) => {
                a.method_matcher().matches(method, class) && b.method_matcher().matches(method, class)
            }
            Composition::Negation(inner) => {
                // 运行时匹配器的结果要等到调用时才能确定
                inner.method_matcher().is_runtime() || !static_match(inner.as_ref(), method, class)
            }
        }
    }

    fn is_runtime(&self) -> bool {
        match &self.0 {
            Composition::Union(a, b) | Composition::Intersection(a, b) => {
                a.method_matcher().is_runtime() || b.method_matcher().is_runtime()
            }
            Composition::Negation(inner) => inner.method_matcher().is_runtime(),
        }
    }

    fn matches_with_args(&self, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
        match &self.0 {
            Composition::Union(a, b) => {
                full_match(a.as_ref(), method, class, args) || full_match(b.as_ref(), method, class, args)
            }
            Composition::Intersection(a, b) => {
                a.method_matcher().matches_with_args(method, class, args)
                    && b.method_matcher().matches_with_args(method, class, args)
            }
            Composition::Negation(inner) => !full_match(inner.as_ref(), method, class, args),
        }
    }
}

/// 组合切点
pub struct ComposedPointcut {
    class_filter: ComposedClassFilter,
    method_matcher: ComposedMethodMatcher,
}

impl ComposedPointcut {
    fn new(composition: Composition) -> Self {
        Self {
            class_filter: ComposedClassFilter(composition.clone()),
            method_matcher: ComposedMethodMatcher(composition),
        }
    }

    pub fn union(a: Arc<dyn Pointcut>, b: Arc<dyn Pointcut>) -> Self {
        Self::new(Composition::Union(a, b))
    }

    pub fn intersection(a: Arc<dyn Pointcut>, b: Arc<dyn Pointcut>) -> Self {
        Self::new(Composition::Intersection(a, b))
    }

    /// 取反切点的类过滤器恒为 TRUE
    pub fn negation(pointcut: Arc<dyn Pointcut>) -> Self {
        Self::new(Composition::Negation(pointcut))
    }
}

impl Pointcut for ComposedPointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        &self.class_filter
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        &self.method_matcher
    }
}

struct AnyClassFilter(Vec<Arc<dyn ClassFilter>>);

impl ClassFilter for AnyClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        self.0.iter().any(|f| f.matches(class))
    }
}

struct AllClassFilter(Vec<Arc<dyn ClassFilter>>);

impl ClassFilter for AllClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        self.0.iter().all(|f| f.matches(class))
    }
}

/// 类过滤器组合
pub struct ClassFilters;

impl ClassFilters {
    pub fn union(a: Arc<dyn ClassFilter>, b: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
        Arc::new(AnyClassFilter(vec![a, b]))
    }

    pub fn intersection(a: Arc<dyn ClassFilter>, b: Arc<dyn ClassFilter>) -> Arc<dyn ClassFilter> {
        Arc::new(AllClassFilter(vec![a, b]))
    }
}

struct UnionMethodMatcher(Arc<dyn MethodMatcher>, Arc<dyn MethodMatcher>);

impl MethodMatcher for UnionMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        self.0.matches(method, class) || self.1.matches(method, class)
    }

    fn is_runtime(&self) -> bool {
        self.0.is_runtime() || self.1.is_runtime()
    }

    fn matches_with_args(&self, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
        let check = |m: &Arc<dyn MethodMatcher>| {
            m.matches(method, class) && (!m.is_runtime() || m.matches_with_args(method, class, args))
        };
        check(&self.0) || check(&self.1)
    }
}

struct IntersectionMethodMatcher(Arc<dyn MethodMatcher>, Arc<dyn MethodMatcher>);

impl MethodMatcher for IntersectionMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        self.0.matches(method, class) && self.1.matches(method, class)
    }

    fn is_runtime(&self) -> bool {
        self.0.is_runtime() || self.1.is_runtime()
    }

    fn matches_with_args(&self, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
        self.0.matches_with_args(method, class, args) && self.1.matches_with_args(method, class, args)
    }
}

/// 方法匹配器组合（不感知类过滤器）
pub struct MethodMatchers;

impl MethodMatchers {
    pub fn union(a: Arc<dyn MethodMatcher>, b: Arc<dyn MethodMatcher>) -> Arc<dyn MethodMatcher> {
        Arc::new(UnionMethodMatcher(a, b))
    }

    pub fn intersection(
        a: Arc<dyn MethodMatcher>,
        b: Arc<dyn MethodMatcher>,
    ) -> Arc<dyn MethodMatcher> {
        Arc::new(IntersectionMethodMatcher(a, b))
    }
}

/// 链式组合切点
///
/// ```ignore
/// let pointcut = ComposablePointcut::new()
///     .intersection_class_filter(Arc::new(TypeNameClassFilter::new(["*Service"])))
///     .intersection_method_matcher(Arc::new(NameMatchMethodMatcher::new(["save*"])))
///     .union(Pointcuts::method_names(["delete*"]));
/// ```
#[derive(Clone)]
pub struct ComposablePointcut {
    class_filter: Arc<dyn ClassFilter>,
    method_matcher: Arc<dyn MethodMatcher>,
}

impl Default for ComposablePointcut {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposablePointcut {
    /// 从 TRUE 切点开始
    pub fn new() -> Self {
        Self {
            class_filter: Arc::new(TruePointcut),
            method_matcher: Arc::new(TruePointcut),
        }
    }

    pub fn from_parts(class_filter: Arc<dyn ClassFilter>, method_matcher: Arc<dyn MethodMatcher>) -> Self {
        Self {
            class_filter,
            method_matcher,
        }
    }

    pub fn from_pointcut(pointcut: Arc<dyn Pointcut>) -> Self {
        Self {
            class_filter: Arc::new(PointcutClassFilter(pointcut.clone())),
            method_matcher: Arc::new(PointcutMethodMatcher(pointcut)),
        }
    }

    pub fn union_class_filter(mut self, filter: Arc<dyn ClassFilter>) -> Self {
        self.class_filter = ClassFilters::union(self.class_filter, filter);
        self
    }

    pub fn intersection_class_filter(mut self, filter: Arc<dyn ClassFilter>) -> Self {
        self.class_filter = ClassFilters::intersection(self.class_filter, filter);
        self
    }

    pub fn union_method_matcher(mut self, matcher: Arc<dyn MethodMatcher>) -> Self {
        self.method_matcher = MethodMatchers::union(self.method_matcher, matcher);
        self
    }

    pub fn intersection_method_matcher(mut self, matcher: Arc<dyn MethodMatcher>) -> Self {
        self.method_matcher = MethodMatchers::intersection(self.method_matcher, matcher);
        self
    }

    pub fn union(self, other: Arc<dyn Pointcut>) -> Self {
        Self::from_pointcut(Arc::new(ComposedPointcut::union(Arc::new(self), other)))
    }

    pub fn intersection(self, other: Arc<dyn Pointcut>) -> Self {
        Self::from_pointcut(Arc::new(ComposedPointcut::intersection(Arc::new(self), other)))
    }

    pub fn negate(self) -> Self {
        Self::from_pointcut(Arc::new(ComposedPointcut::negation(Arc::new(self))))
    }

    pub fn build(self) -> Arc<dyn Pointcut> {
        Arc::new(self)
    }
}

impl Pointcut for ComposablePointcut {
    fn class_filter(&self) -> &dyn ClassFilter {
        self.class_filter.as_ref()
    }

    fn method_matcher(&self) -> &dyn MethodMatcher {
        self.method_matcher.as_ref()
    }
}

struct PointcutClassFilter(Arc<dyn Pointcut>);

impl ClassFilter for PointcutClassFilter {
    fn matches(&self, class: &TargetClass) -> bool {
        self.0.class_filter().matches(class)
    }
}

struct PointcutMethodMatcher(Arc<dyn Pointcut>);

impl MethodMatcher for PointcutMethodMatcher {
    fn matches(&self, method: &Method, class: &TargetClass) -> bool {
        self.0.method_matcher().matches(method, class)
    }

    fn is_runtime(&self) -> bool {
        self.0.method_matcher().is_runtime()
    }

    fn matches_with_args(&self, method: &Method, class: &TargetClass, args: &Arguments) -> bool {
        self.0.method_matcher().matches_with_args(method, class, args)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{DynamicMethodMatcher, NameMatchMethodMatcher, Pointcuts, TypeNameClassFilter};
    use super::*;

    fn methods_named(pattern: &str) -> Arc<dyn Pointcut> {
        Pointcuts::method_names([pattern])
    }

    fn types_named(pattern: &str) -> Arc<dyn Pointcut> {
        Pointcuts::from_parts(
            Arc::new(TypeNameClassFilter::new([pattern])),
            Arc::new(TruePointcut),
        )
    }

    fn check(pointcut: &Arc<dyn Pointcut>, method: &Method, class: &TargetClass) -> bool {
        Pointcuts::matches(pointcut.as_ref(), method, class)
    }

    #[test]
    fn test_identity_laws() {
        let class = order_service();
        let x = methods_named("place*");

        let with_true = Pointcuts::intersection(Pointcuts::always(), x.clone());
        let with_false = Pointcuts::union(Pointcuts::never(), x.clone());
        let empty = Pointcuts::intersection(Pointcuts::never(), x.clone());

        for method in [PLACE_ORDER, CANCEL_ORDER] {
            let expected = check(&x, &method, &class);
            assert_eq!(check(&with_true, &method, &class), expected);
            assert_eq!(check(&with_false, &method, &class), expected);
            assert!(!check(&empty, &method, &class));
        }
    }

    #[test]
    fn test_double_negation() {
        let class = order_service();
        let other = user_repository();
        let x = Pointcuts::intersection(types_named("*Service"), methods_named("cancel*"));
        let double = Pointcuts::negation(Pointcuts::negation(x.clone()));

        for (method, class) in [
            (PLACE_ORDER, &class),
            (CANCEL_ORDER, &class),
            (CANCEL_ORDER, &other),
        ] {
            assert_eq!(check(&double, &method, class), check(&x, &method, class));
        }
    }

    #[test]
    fn test_negation_class_filter_is_true() {
        let negated = Pointcuts::negation(types_named("*Service"));

        assert!(negated.class_filter().matches(&order_service()));
        assert!(!check(&negated, &PLACE_ORDER, &order_service()));
        assert!(check(&negated, &FIND_USER, &user_repository()));
    }

    #[test]
    fn test_union_is_class_aware() {
        // 只接受 Repository 的方法匹配器不能让 Service 的方法通过
        let repo_places = Pointcuts::from_parts(
            Arc::new(TypeNameClassFilter::new(["*Repository"])),
            Arc::new(NameMatchMethodMatcher::new(["place*"])),
        );
        let service_cancels = Pointcuts::intersection(types_named("*Service"), methods_named("cancel*"));
        let union = Pointcuts::union(repo_places, service_cancels);
        let class = order_service();

        assert!(union.class_filter().matches(&class));
        assert!(!check(&union, &PLACE_ORDER, &class));
        assert!(check(&union, &CANCEL_ORDER, &class));
    }

    #[test]
    fn test_runtime_propagates() {
        let dynamic = Pointcuts::from_parts(
            Arc::new(TruePointcut),
            Arc::new(DynamicMethodMatcher::new(|_, _, args| args.get::<u64>(0) == Some(&1))),
        );
        let union = Pointcuts::union(methods_named("place*"), dynamic.clone());
        let negated = Pointcuts::negation(dynamic);
        let class = order_service();
        let one = Arguments::new().with(1_u64);
        let two = Arguments::new().with(2_u64);

        assert!(union.method_matcher().is_runtime());
        assert!(Pointcuts::matches_with_args(union.as_ref(), &CANCEL_ORDER, &class, &one));
        assert!(!Pointcuts::matches_with_args(union.as_ref(), &CANCEL_ORDER, &class, &two));

        assert!(negated.method_matcher().is_runtime());
        assert!(!Pointcuts::matches_with_args(negated.as_ref(), &CANCEL_ORDER, &class, &one));
        assert!(Pointcuts::matches_with_args(negated.as_ref(), &CANCEL_ORDER, &class, &two));
    }

    #[test]
    fn test_composable_pointcut() {
        let pointcut = ComposablePointcut::new()
            .intersection_class_filter(Arc::new(TypeNameClassFilter::new(["Order*"])))
            .intersection_method_matcher(Arc::new(NameMatchMethodMatcher::new(["place*"])))
            .union(methods_named("find*"))
            .build();

        assert!(check(&pointcut, &PLACE_ORDER, &order_service()));
        assert!(!check(&pointcut, &CANCEL_ORDER, &order_service()));
        assert!(check(&pointcut, &FIND_USER, &user_repository()));

        let negated = ComposablePointcut::from_pointcut(pointcut).negate().build();
        assert!(check(&negated, &CANCEL_ORDER, &order_service()));
        assert!(!check(&negated, &PLACE_ORDER, &order_service()));
    }
}
