//! `#[aop_class]` 宏实现
//!
//! 作用于固有 impl 块。符合条件的公开方法（见 [`ProxiedMethod`]）会出现在生成的
//! `TypeProxy` 上，其余方法（构造函数、async、引用参数等）保持原样、不被代理。

use crate::utils::ProxiedMethod;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Error, ImplItem, ItemImpl, Result, Type, Visibility};

/// `#[aop_class(...)]` 参数
#[derive(Default)]
pub struct ClassOptions {
    /// 禁止子类代理
    pub sealed: bool,
}

pub fn impl_aop_class(options: ClassOptions, item: &ItemImpl) -> Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(Error::new_spanned(path, "#[aop_class] must be placed on an inherent impl block"));
    }
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(&item.generics, "generic types cannot be proxied"));
    }

    let self_ty = &item.self_ty;
    let class_ident = match &**self_ty {
        Type::Path(path) if path.qself.is_none() => match path.path.segments.last() {
            Some(segment) if segment.arguments.is_empty() => segment.ident.clone(),
            _ => return Err(Error::new_spanned(self_ty, "generic types cannot be proxied")),
        },
        _ => return Err(Error::new_spanned(self_ty, "#[aop_class] requires a named type")),
    };
    let class_name = class_ident.to_string();
    let proxy_ident = format_ident!("{}Proxy", class_ident);
    let sealed = options.sealed;

    let methods: Vec<_> = item
        .items
        .iter()
        .filter_map(|impl_item| match impl_item {
            ImplItem::Fn(method) if matches!(method.vis, Visibility::Public(_)) => {
                ProxiedMethod::analyze(&method.sig, &method.attrs).ok()
            }
            _ => None,
        })
        .collect();

    let consts = methods.iter().map(|m| m.method_const(&class_name));
    let const_idents = methods.iter().map(|m| &m.const_ident);
    let dispatch_arms = methods
        .iter()
        .map(|m| m.dispatch_arm(&proxy_ident, quote!(#self_ty), quote!(self)));
    let forwarders = methods.iter().map(|m| m.forwarder(quote!(pub)));
    let doc = format!("`{}` 的子类代理，公开方法经由拦截链转发给目标", class_name);

    Ok(quote! {
        #item

        #[doc = #doc]
        #[derive(Clone, Debug)]
        pub struct #proxy_ident {
            proxy: ::chimera_aop::Proxy,
        }

        impl #proxy_ident {
            #(#consts)*

            pub const METHODS: &'static [::chimera_aop::Method] = &[#(Self::#const_idents),*];

            #(#forwarders)*

            pub fn aop_proxy(&self) -> &::chimera_aop::Proxy {
                &self.proxy
            }
        }

        impl ::chimera_aop::ProxyClass for #self_ty {
            type Proxy = #proxy_ident;

            fn descriptor() -> &'static ::chimera_aop::ClassDescriptor {
                static DESCRIPTOR: ::chimera_aop::ClassDescriptor =
                    ::chimera_aop::ClassDescriptor::new(#class_name, #proxy_ident::METHODS, #sealed);
                &DESCRIPTOR
            }

            fn dispatch(
                &self,
                method: &::chimera_aop::Method,
                args: &::chimera_aop::Arguments,
            ) -> ::chimera_aop::InvocationResult {
                #(#dispatch_arms)*
                ::std::result::Result::Err(::chimera_aop::proxy::unknown_method(method, #class_name))
            }

            fn wrap(proxy: ::chimera_aop::Proxy) -> Self::Proxy {
                #proxy_ident { proxy }
            }
        }
    })
}
