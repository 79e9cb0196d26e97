//! 目标源（TargetSource）
//!
//! 代理并不直接持有目标对象，而是在每次调用时向目标源获取：
//!
//! - `SingletonTargetSource`：始终返回同一个实例（静态）
//! - `PrototypeTargetSource`：每次调用创建新实例
//! - `PooledTargetSource`：从有界对象池借出，调用结束后归还
//! - `HotSwappableTargetSource`：运行时可以原子替换目标
//!
//! 非静态目标源在调用结束时（正常返回、短路、失败甚至 panic）都会被通知释放目标

use crate::error::{AopConfigError, InvocationError};
use crate::target::{Target, TargetClass};
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type TargetFactory = Box<dyn Fn() -> anyhow::Result<Target> + Send + Sync>;

/// 目标源 Trait
pub trait TargetSource: Send + Sync {
    fn target_class(&self) -> &TargetClass;

    /// 是否每次都返回同一个目标
    ///
    /// 静态目标源不需要释放
    fn is_static(&self) -> bool;

    fn get_target(&self) -> anyhow::Result<Target>;

    /// 归还目标
    fn release_target(&self, _target: Target) -> anyhow::Result<()> {
        Ok(())
    }
}

fn check_type(class: &TargetClass, actual: TypeId) -> Result<(), AopConfigError> {
    if class.type_id() == actual {
        Ok(())
    } else {
        Err(AopConfigError::TargetTypeMismatch {
            expected: class.name(),
        })
    }
}

fn typed_factory<T, F>(factory: F) -> TargetFactory
where
    T: Any + Send + Sync,
    F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
{
    Box::new(move || {
        let target: Target = Arc::new(factory()?);
        Ok(target)
    })
}

/// 单例目标源
pub struct SingletonTargetSource {
    target: Target,
    class: Arc<TargetClass>,
}

impl SingletonTargetSource {
    pub fn new<T: Any + Send + Sync>(
        target: Arc<T>,
        class: impl Into<Arc<TargetClass>>,
    ) -> Result<Self, AopConfigError> {
        Self::from_erased(target, class)
    }

    /// 从类型擦除的对象创建（容器中的 Bean）
    pub fn from_erased(
        target: Target,
        class: impl Into<Arc<TargetClass>>,
    ) -> Result<Self, AopConfigError> {
        let class = class.into();
        check_type(&class, (*target).type_id())?;
        Ok(Self { target, class })
    }
}

impl TargetSource for SingletonTargetSource {
    fn target_class(&self) -> &TargetClass {
        &self.class
    }

    fn is_static(&self) -> bool {
        true
    }

    fn get_target(&self) -> anyhow::Result<Target> {
        Ok(self.target.clone())
    }
}

/// 原型目标源：每次调用都创建新的目标实例
pub struct PrototypeTargetSource {
    class: Arc<TargetClass>,
    factory: TargetFactory,
    created: AtomicUsize,
}

impl PrototypeTargetSource {
    pub fn new<T, F>(class: impl Into<Arc<TargetClass>>, factory: F) -> Result<Self, AopConfigError>
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let class = class.into();
        check_type(&class, TypeId::of::<T>())?;
        Ok(Self {
            class,
            factory: typed_factory(factory),
            created: AtomicUsize::new(0),
        })
    }

    /// 已创建的实例数
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl TargetSource for PrototypeTargetSource {
    fn target_class(&self) -> &TargetClass {
        &self.class
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> anyhow::Result<Target> {
        let target = (self.factory)()?;
        self.created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Created prototype target of '{}'", self.class.name());
        Ok(target)
    }
}

#[derive(Default)]
struct PoolState {
    idle: Vec<Target>,
    active: usize,
}

/// 对象池目标源
///
/// 借出的目标在调用结束后归还；所有实例都被借出且达到上限时调用失败
pub struct PooledTargetSource {
    class: Arc<TargetClass>,
    factory: TargetFactory,
    max_size: usize,
    state: Mutex<PoolState>,
}

impl PooledTargetSource {
    pub fn new<T, F>(
        class: impl Into<Arc<TargetClass>>,
        max_size: usize,
        factory: F,
    ) -> Result<Self, AopConfigError>
    where
        T: Any + Send + Sync,
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let class = class.into();
        check_type(&class, TypeId::of::<T>())?;
        Ok(Self {
            class,
            factory: typed_factory(factory),
            max_size,
            state: Mutex::new(PoolState::default()),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active
    }

    pub fn idle_count(&self) -> usize {
        self.state.lock().idle.len()
    }
}

impl TargetSource for PooledTargetSource {
    fn target_class(&self) -> &TargetClass {
        &self.class
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> anyhow::Result<Target> {
        {
            let mut state = self.state.lock();
            if let Some(target) = state.idle.pop() {
                state.active += 1;
                return Ok(target);
            }
            if state.active >= self.max_size {
                return Err(InvocationError::PoolExhausted {
                    max_size: self.max_size,
                }
                .into());
            }
            // 先占位，创建过程不持有锁
            state.active += 1;
        }

        match (self.factory)() {
            Ok(target) => {
                tracing::debug!("Pool for '{}' created a new target", self.class.name());
                Ok(target)
            }
            Err(e) => {
                self.state.lock().active -= 1;
                Err(e)
            }
        }
    }

    fn release_target(&self, target: Target) -> anyhow::Result<()> {
        let mut state = self.state.lock();
        state.active = state.active.saturating_sub(1);
        state.idle.push(target);
        Ok(())
    }
}

/// 可热替换的目标源
///
/// 每次调用读取当前目标，因此不是静态目标源
pub struct HotSwappableTargetSource {
    class: Arc<TargetClass>,
    target: RwLock<Target>,
}

impl HotSwappableTargetSource {
    pub fn new<T: Any + Send + Sync>(
        target: Arc<T>,
        class: impl Into<Arc<TargetClass>>,
    ) -> Result<Self, AopConfigError> {
        let class = class.into();
        check_type(&class, TypeId::of::<T>())?;
        Ok(Self {
            class,
            target: RwLock::new(target),
        })
    }

    /// 替换目标，返回旧目标
    ///
    /// 新目标必须与原目标类型相同
    pub fn swap(&self, new_target: Target) -> Result<Target, AopConfigError> {
        check_type(&self.class, (*new_target).type_id())?;
        let old = std::mem::replace(&mut *self.target.write(), new_target);
        tracing::debug!("Swapped target of '{}'", self.class.name());
        Ok(old)
    }

    pub fn current(&self) -> Target {
        self.target.read().clone()
    }
}

impl TargetSource for HotSwappableTargetSource {
    fn target_class(&self) -> &TargetClass {
        &self.class
    }

    fn is_static(&self) -> bool {
        false
    }

    fn get_target(&self) -> anyhow::Result<Target> {
        Ok(self.current())
    }
}

/// 调用结束时释放非静态目标
///
/// 释放失败只记录日志，不覆盖调用结果
pub(crate) struct TargetRelease<'a> {
    source: &'a dyn TargetSource,
    target: Option<Target>,
}

impl<'a> TargetRelease<'a> {
    pub(crate) fn new(source: &'a dyn TargetSource, target: Target) -> Self {
        Self {
            source,
            target: Some(target),
        }
    }
}

impl Drop for TargetRelease<'_> {
    fn drop(&mut self) {
        if let Some(target) = self.target.take() {
            if let Err(e) = self.source.release_target(target) {
                tracing::warn!(
                    "⚠️ Failed to release target of '{}': {:#}",
                    self.source.target_class().name(),
                    e
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Worker(u32);

    fn worker_class() -> TargetClass {
        TargetClass::of::<Worker>().build()
    }

    #[test]
    fn test_singleton_rejects_wrong_type() {
        let result = SingletonTargetSource::new(Arc::new(String::from("x")), worker_class());
        assert!(matches!(
            result,
            Err(AopConfigError::TargetTypeMismatch { expected: "Worker" })
        ));

        let source = SingletonTargetSource::new(Arc::new(Worker(1)), worker_class()).unwrap();
        let a = source.get_target().unwrap();
        let b = source.get_target().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(source.is_static());
    }

    #[test]
    fn test_prototype_creates_fresh_instances() {
        let next = Arc::new(AtomicUsize::new(0));
        let counter = next.clone();
        let source = PrototypeTargetSource::new(worker_class(), move || {
            Ok(Worker(counter.fetch_add(1, Ordering::SeqCst) as u32))
        })
        .unwrap();

        let a = source.get_target().unwrap();
        let b = source.get_target().unwrap();

        assert_eq!(a.downcast_ref::<Worker>().unwrap().0, 0);
        assert_eq!(b.downcast_ref::<Worker>().unwrap().0, 1);
        assert_eq!(source.created_count(), 2);
        assert!(!source.is_static());
    }

    #[test]
    fn test_pool_borrow_and_return() {
        let source = PooledTargetSource::new(worker_class(), 1, || Ok(Worker(7))).unwrap();

        let borrowed = source.get_target().unwrap();
        assert_eq!(source.active_count(), 1);

        let err = source.get_target().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InvocationError>(),
            Some(InvocationError::PoolExhausted { max_size: 1 })
        ));

        source.release_target(borrowed).unwrap();
        assert_eq!(source.active_count(), 0);
        assert_eq!(source.idle_count(), 1);

        assert!(source.get_target().is_ok());
        assert_eq!(source.idle_count(), 0);
    }

    #[test]
    fn test_pool_factory_failure_frees_slot() {
        let source =
            PooledTargetSource::new(worker_class(), 1, || -> anyhow::Result<Worker> {
                Err(anyhow::anyhow!("cannot build worker"))
            })
            .unwrap();

        assert!(source.get_target().is_err());
        assert_eq!(source.active_count(), 0);
    }

    #[test]
    fn test_hot_swap() {
        let source = HotSwappableTargetSource::new(Arc::new(Worker(1)), worker_class()).unwrap();

        let old = source.swap(Arc::new(Worker(2))).unwrap();
        assert_eq!(old.downcast_ref::<Worker>().unwrap().0, 1);

        let current = source.get_target().unwrap();
        assert_eq!(current.downcast_ref::<Worker>().unwrap().0, 2);

        assert!(source.swap(Arc::new(3_u64)).is_err());
    }

    #[test]
    fn test_release_guard_returns_target() {
        let source = PooledTargetSource::new(worker_class(), 2, || Ok(Worker(0))).unwrap();
        {
            let target = source.get_target().unwrap();
            let _guard = TargetRelease::new(&source, target);
            assert_eq!(source.active_count(), 1);
        }
        assert_eq!(source.active_count(), 0);
        assert_eq!(source.idle_count(), 1);
    }
}
