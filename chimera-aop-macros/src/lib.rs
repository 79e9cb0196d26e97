//! Chimera AOP 过程宏
//!
//! Rust 没有运行时动态代理，这里在编译时生成代理转发代码：
//! - `#[proxy_interface]` - 为 trait 生成 `TraitProxy`（接口转发代理）
//! - `#[aop_class]` - 为固有 impl 块生成 `TypeProxy`（子类代理）
//!
//! 两者都会生成方法描述常量（`TraitProxy::METHOD_NAME`）和类型擦除的分派表，
//! 代理方法的调用经由 `chimera_aop::Proxy` 进入拦截链。

extern crate proc_macro;

use proc_macro::TokenStream;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Error, Ident, ItemImpl, ItemTrait, Token};

mod class;
mod interface;
mod utils;

/// `#[proxy_interface]` 宏
///
/// 将 trait 标记为可代理接口。trait 的所有方法都必须满足：
/// - 接收者为 `&self`，非 async、非泛型
/// - 参数为 `Clone + Send + Sync + 'static` 的拥有所有权的类型
/// - 返回 `Result<T, E>`，`E` 可以从 `anyhow::Error` 转换
///
/// 使用示例：
/// ```ignore
/// use chimera_aop::proxy_interface;
///
/// #[proxy_interface]
/// pub trait Greeter: Send + Sync {
///     fn greet(&self, name: String) -> Result<String, GreetError>;
/// }
///
/// // 生成：GreeterProxy、GreeterProxy::GREET、GreeterProxy::binding::<T>()
/// let class = TargetClass::of::<ConsoleGreeter>()
///     .implements(GreeterProxy::binding::<ConsoleGreeter>())
///     .build();
/// ```
#[proc_macro_attribute]
pub fn proxy_interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return Error::new(proc_macro2::Span::call_site(), "#[proxy_interface] takes no arguments")
            .to_compile_error()
            .into();
    }

    let item = parse_macro_input!(item as ItemTrait);
    interface::impl_proxy_interface(&item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// `#[aop_class]` 宏
///
/// 为类型生成子类代理。`#[aop_class(sealed)]` 声明类型不可被子类代理，
/// 此时只能使用接口转发代理
///
/// 使用示例：
/// ```ignore
/// #[aop_class]
/// impl AccountService {
///     pub fn transfer(&self, from: String, to: String, amount: u64) -> Result<Receipt, BankError> {
///         // 业务逻辑
///     }
/// }
///
/// let mut factory = ProxyFactory::for_target(Arc::new(service), TargetClass::of_class::<AccountService>())?;
/// let proxy: AccountServiceProxy = factory.get_class_proxy::<AccountService>()?;
/// ```
#[proc_macro_attribute]
pub fn aop_class(attr: TokenStream, item: TokenStream) -> TokenStream {
    let options = match parse_class_options(attr) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let item = parse_macro_input!(item as ItemImpl);
    class::impl_aop_class(options, &item)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn parse_class_options(attr: TokenStream) -> syn::Result<class::ClassOptions> {
    let mut options = class::ClassOptions::default();
    let flags = Punctuated::<Ident, Token![,]>::parse_terminated.parse(attr)?;
    for flag in flags {
        if flag == "sealed" {
            options.sealed = true;
        } else {
            return Err(Error::new_spanned(flag, "unknown #[aop_class] option, expected `sealed`"));
        }
    }
    Ok(options)
}
