//! 目标类型描述
//!
//! Rust 没有运行时反射，也不能在运行时生成子类，因此目标对象能被代理的"表面"
//! 必须在编译期声明：
//!
//! - 接口：由 `#[proxy_interface]` 标注的 trait，生成 [`InterfaceDescriptor`] 和分派函数
//! - 类：由 `#[aop_class]` 标注的 inherent impl，生成 [`ClassDescriptor`] 和分派函数
//!
//! [`TargetClass`] 把这些描述和类型擦除后的分派函数组合在一起，
//! 作为切点匹配和拦截链终点调用的依据

use crate::error::{AopConfigError, InvocationError, InvocationResult};
use crate::joinpoint::{Arguments, Method};
use crate::proxy::Proxy;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 被代理的目标对象（类型擦除）
pub type Target = Arc<dyn Any + Send + Sync>;

type ErasedDispatch =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Method, &Arguments) -> InvocationResult + Send + Sync>;

/// 接口描述：接口名称及其声明的方法
///
/// 接口由模块路径和名称共同标识
#[derive(Debug, Clone, Copy)]
pub struct InterfaceDescriptor {
    module: &'static str,
    name: &'static str,
    methods: &'static [Method],
}

impl InterfaceDescriptor {
    pub const fn new(name: &'static str, methods: &'static [Method]) -> Self {
        Self {
            module: "",
            name,
            methods,
        }
    }

    pub const fn declared_in(self, module: &'static str) -> Self {
        Self { module, ..self }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn module(&self) -> &'static str {
        self.module
    }

    /// 带模块路径的名称，例如 `billing::Greeter`
    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.name.to_string()
        } else {
            format!("{}::{}", self.module, self.name)
        }
    }

    pub fn is_same(&self, other: &InterfaceDescriptor) -> bool {
        self.module == other.module && self.name == other.name
    }

    pub fn methods(&self) -> &'static [Method] {
        self.methods
    }

    pub fn declares(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// 类描述：可以被"子类代理"覆盖的方法集合
#[derive(Debug, Clone, Copy)]
pub struct ClassDescriptor {
    name: &'static str,
    methods: &'static [Method],
    sealed: bool,
}

impl ClassDescriptor {
    pub const fn new(name: &'static str, methods: &'static [Method], sealed: bool) -> Self {
        Self {
            name,
            methods,
            sealed,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn methods(&self) -> &'static [Method] {
        self.methods
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn declares(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method)
    }
}

/// 可代理的接口
///
/// 由 `#[proxy_interface]` 为 `dyn Trait` 实现
pub trait ProxyInterface: 'static {
    fn descriptor() -> &'static InterfaceDescriptor;

    /// 把代理句柄包装为实现该接口的转发对象
    fn wrap(proxy: Proxy) -> Arc<Self>;
}

/// 可以生成"子类代理"的类型
///
/// 由 `#[aop_class]` 实现；`Proxy` 关联类型是生成的转发结构体，
/// 它拥有与原类型相同的公开方法
pub trait ProxyClass: Any + Send + Sync + Sized {
    type Proxy;

    fn descriptor() -> &'static ClassDescriptor;

    /// 按方法描述调用真实方法
    fn dispatch(&self, method: &Method, args: &Arguments) -> InvocationResult;

    fn wrap(proxy: Proxy) -> Self::Proxy;
}

/// 某个具体类型对接口的实现绑定
///
/// 通常通过生成的 `TraitProxy::binding::<T>()` 获得
pub struct InterfaceBinding<T> {
    descriptor: InterfaceDescriptor,
    dispatch: fn(&T, &Method, &Arguments) -> InvocationResult,
}

impl<T> InterfaceBinding<T> {
    pub fn new(
        descriptor: &'static InterfaceDescriptor,
        dispatch: fn(&T, &Method, &Arguments) -> InvocationResult,
    ) -> Self {
        Self {
            descriptor: *descriptor,
            dispatch,
        }
    }

    pub fn descriptor(&self) -> &InterfaceDescriptor {
        &self.descriptor
    }
}

#[derive(Clone)]
struct BoundInterface {
    descriptor: InterfaceDescriptor,
    dispatch: ErasedDispatch,
}

#[derive(Clone)]
struct BoundClass {
    descriptor: ClassDescriptor,
    dispatch: ErasedDispatch,
}

fn erase<T: Any + Send + Sync>(
    expected: &'static str,
    dispatch: fn(&T, &Method, &Arguments) -> InvocationResult,
) -> ErasedDispatch {
    Arc::new(move |target: &(dyn Any + Send + Sync), method: &Method, args: &Arguments| -> InvocationResult {
        let target = target
            .downcast_ref::<T>()
            .ok_or(InvocationError::TargetTypeMismatch { expected })?;
        dispatch(target, method, args)
    })
}

/// 去掉模块路径和泛型参数后的类型名
fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// 目标对象的运行时类型描述
#[derive(Clone)]
pub struct TargetClass {
    name: &'static str,
    type_id: TypeId,
    sealed: bool,
    class_binding: Option<BoundClass>,
    interfaces: Vec<BoundInterface>,
}

impl TargetClass {
    /// 只通过接口暴露方法的类型
    pub fn of<T: Any + Send + Sync>() -> TargetClassBuilder<T> {
        TargetClassBuilder {
            name: short_type_name::<T>(),
            sealed: false,
            class_binding: None,
            interfaces: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// 带有类绑定（可以生成子类代理）的类型
    pub fn of_class<T: ProxyClass>() -> TargetClassBuilder<T> {
        let descriptor = *T::descriptor();
        TargetClassBuilder {
            name: descriptor.name(),
            sealed: descriptor.is_sealed(),
            class_binding: Some(BoundClass {
                descriptor,
                dispatch: erase::<T>(descriptor.name(), T::dispatch),
            }),
            interfaces: Vec::new(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn has_interfaces(&self) -> bool {
        !self.interfaces.is_empty()
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &InterfaceDescriptor> {
        self.interfaces.iter().map(|i| &i.descriptor)
    }

    pub fn interface_names(&self) -> Vec<&'static str> {
        self.interfaces.iter().map(|i| i.descriptor.name()).collect()
    }

    /// 按名称判断，`interface` 可以是短名称或带模块路径的名称
    pub fn implements(&self, interface: &str) -> bool {
        self.interfaces
            .iter()
            .any(|i| i.descriptor.name() == interface || i.descriptor.qualified_name() == interface)
    }

    pub fn implements_interface<I: ProxyInterface + ?Sized>(&self) -> bool {
        let wanted = I::descriptor();
        self.interfaces.iter().any(|i| i.descriptor.is_same(wanted))
    }

    pub fn class_descriptor(&self) -> Option<&ClassDescriptor> {
        self.class_binding.as_ref().map(|c| &c.descriptor)
    }

    /// 对象是否为该类型的实例
    pub fn is_instance(&self, target: &(dyn Any + Send + Sync)) -> bool {
        (*target).type_id() == self.type_id
    }

    /// 方法是否由某个接口声明
    pub fn declares_via_interface(&self, method: &Method) -> bool {
        self.interfaces.iter().any(|i| i.descriptor.declares(method))
    }

    /// 方法是否由类绑定声明
    pub fn declares_via_class(&self, method: &Method) -> bool {
        self.class_descriptor()
            .map(|c| c.declares(method))
            .unwrap_or(false)
    }

    /// 类型声明的全部方法（接口方法在前）
    pub fn methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self
            .interfaces
            .iter()
            .flat_map(|i| i.descriptor.methods().iter().copied())
            .collect();
        if let Some(class) = self.class_descriptor() {
            methods.extend(class.methods().iter().copied());
        }
        methods
    }

    /// 检查能否为该类型生成子类代理
    pub fn check_subclassable(&self) -> Result<(), AopConfigError> {
        if self.sealed {
            return Err(AopConfigError::NotSubclassable {
                type_name: self.name,
                reason: "type is sealed",
            });
        }
        if self.class_binding.is_none() {
            return Err(AopConfigError::NotSubclassable {
                type_name: self.name,
                reason: "no class binding declared (annotate the impl block with #[aop_class])",
            });
        }
        Ok(())
    }

    /// 调用目标对象的真实方法
    ///
    /// 选择声明了该方法的类绑定或接口绑定
    pub fn dispatch(
        &self,
        target: &(dyn Any + Send + Sync),
        method: &Method,
        args: &Arguments,
    ) -> InvocationResult {
        if let Some(class) = &self.class_binding {
            if class.descriptor.declares(method) {
                return (class.dispatch)(target, method, args);
            }
        }

        match self.interfaces.iter().find(|i| i.descriptor.declares(method)) {
            Some(interface) => (interface.dispatch)(target, method, args),
            None => Err(InvocationError::UnknownMethod {
                method: method.signature(),
                type_name: self.name,
            }
            .into()),
        }
    }
}

impl fmt::Debug for TargetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetClass")
            .field("name", &self.name)
            .field("interfaces", &self.interface_names())
            .field("class", &self.class_descriptor().map(|c| c.name()))
            .field("sealed", &self.sealed)
            .finish()
    }
}

/// TargetClass 构建器
pub struct TargetClassBuilder<T> {
    name: &'static str,
    sealed: bool,
    class_binding: Option<BoundClass>,
    interfaces: Vec<BoundInterface>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> TargetClassBuilder<T> {
    /// 覆盖默认的类型名称
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    /// 声明类型实现的接口
    pub fn implements(mut self, binding: InterfaceBinding<T>) -> Self {
        let name = self.name;
        self.interfaces.push(BoundInterface {
            descriptor: binding.descriptor,
            dispatch: erase::<T>(name, binding.dispatch),
        });
        self
    }

    pub fn build(self) -> TargetClass {
        TargetClass {
            name: self.name,
            type_id: TypeId::of::<T>(),
            sealed: self.sealed,
            class_binding: self.class_binding,
            interfaces: self.interfaces,
        }
    }
}

impl<T: Any + Send + Sync> From<TargetClassBuilder<T>> for TargetClass {
    fn from(builder: TargetClassBuilder<T>) -> Self {
        builder.build()
    }
}

impl<T: Any + Send + Sync> From<TargetClassBuilder<T>> for Arc<TargetClass> {
    fn from(builder: TargetClassBuilder<T>) -> Self {
        Arc::new(builder.build())
    }
}
