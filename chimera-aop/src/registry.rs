//! 目标类型注册表
//!
//! 容器中的 Bean 是类型擦除的对象，自动代理需要通过 `TypeId` 找到它的 [`TargetClass`]。
//! 类型描述可以显式注册，也可以通过 inventory 在编译期提交：
//!
//! ```ignore
//! chimera_aop::inventory::submit! {
//!     TargetClassRegistration::new("TxService", || {
//!         TargetClass::of::<TxService>()
//!             .implements(TransferProxy::binding::<TxService>())
//!             .build()
//!     })
//! }
//! ```

use crate::target::TargetClass;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

/// 编译期提交的类型描述
pub struct TargetClassRegistration {
    /// 类型名称
    pub name: &'static str,

    /// 创建类型描述的函数
    pub creator: fn() -> TargetClass,
}

impl TargetClassRegistration {
    pub const fn new(name: &'static str, creator: fn() -> TargetClass) -> Self {
        Self { name, creator }
    }

    pub fn create(&self) -> TargetClass {
        (self.creator)()
    }
}

// 使用 inventory 收集所有类型注册
inventory::collect!(TargetClassRegistration);

/// 获取所有编译期提交的类型注册
pub fn get_all_target_class_registrations() -> impl Iterator<Item = &'static TargetClassRegistration> {
    inventory::iter::<TargetClassRegistration>()
}

/// 全局注册表
///
/// 首次访问时自动加载所有通过 inventory 提交的类型描述
static GLOBAL_TARGET_CLASS_REGISTRY: Lazy<Arc<TargetClassRegistry>> = Lazy::new(|| {
    let registry = TargetClassRegistry::new();
    registry.auto_load();
    Arc::new(registry)
});

/// 获取全局类型注册表
pub fn get_global_registry() -> &'static Arc<TargetClassRegistry> {
    &GLOBAL_TARGET_CLASS_REGISTRY
}

/// 类型注册表
#[derive(Default)]
pub struct TargetClassRegistry {
    classes: RwLock<HashMap<TypeId, Arc<TargetClass>>>,
}

impl TargetClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册类型描述，同一类型重复注册时后者覆盖前者
    pub fn register(&self, class: impl Into<Arc<TargetClass>>) -> Arc<TargetClass> {
        let class = class.into();
        tracing::debug!("Registering target class: {}", class.name());
        // `class.type_id()` 会解析为 `<Arc<_> as Any>::type_id`
        let key = TargetClass::type_id(&class);
        if let Some(previous) = self.classes.write().insert(key, class.clone()) {
            tracing::warn!("Target class '{}' was registered twice, replacing", previous.name());
        }
        class
    }

    pub fn get(&self, type_id: TypeId) -> Option<Arc<TargetClass>> {
        self.classes.read().get(&type_id).cloned()
    }

    pub fn get_for<T: Any>(&self) -> Option<Arc<TargetClass>> {
        self.get(TypeId::of::<T>())
    }

    /// 查找对象的类型描述
    pub fn find(&self, object: &(dyn Any + Send + Sync)) -> Option<Arc<TargetClass>> {
        self.get((*object).type_id())
    }

    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }

    /// 从 inventory 加载所有提交的类型描述
    pub fn auto_load(&self) {
        let registrations: Vec<_> = get_all_target_class_registrations().collect();
        tracing::info!("Auto-loading {} target class(es) from registry", registrations.len());

        for registration in registrations {
            tracing::debug!("  ├─ Loading target class: {}", registration.name);
            self.register(registration.create());
        }
    }
}
