//! `#[proxy_interface]` 宏实现

use crate::utils::ProxiedMethod;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Error, ItemTrait, Result, TraitItem};

pub fn impl_proxy_interface(item: &ItemTrait) -> Result<TokenStream> {
    if !item.generics.params.is_empty() {
        return Err(Error::new_spanned(&item.generics, "generic traits cannot be proxied"));
    }

    let trait_ident = &item.ident;
    let trait_name = trait_ident.to_string();
    let vis = &item.vis;
    let proxy_ident = format_ident!("{}Proxy", trait_ident);

    let mut methods = Vec::new();
    for trait_item in &item.items {
        match trait_item {
            TraitItem::Fn(method) => methods.push(ProxiedMethod::analyze(&method.sig, &method.attrs)?),
            other => {
                return Err(Error::new_spanned(
                    other,
                    "#[proxy_interface] traits may only contain methods",
                ))
            }
        }
    }

    let consts = methods.iter().map(|m| m.method_const(&trait_name));
    let const_idents = methods.iter().map(|m| &m.const_ident);
    let dispatch_arms = methods
        .iter()
        .map(|m| m.dispatch_arm(&proxy_ident, quote!(<__T as #trait_ident>), quote!(target)));
    let forwarders = methods.iter().map(|m| m.forwarder(TokenStream::new()));
    let doc = format!("`{}` 的代理转发对象，方法调用经由拦截链转发给目标", trait_name);

    Ok(quote! {
        #item

        #[doc = #doc]
        #[derive(Clone, Debug)]
        #vis struct #proxy_ident {
            proxy: ::chimera_aop::Proxy,
        }

        impl #proxy_ident {
            #(#consts)*

            pub const METHODS: &'static [::chimera_aop::Method] = &[#(Self::#const_idents),*];

            /// 实现类型 `T` 对该接口的分派绑定
            pub fn binding<__T>() -> ::chimera_aop::InterfaceBinding<__T>
            where
                __T: #trait_ident + ::std::any::Any + ::std::marker::Send + ::std::marker::Sync,
            {
                ::chimera_aop::InterfaceBinding::new(
                    <dyn #trait_ident as ::chimera_aop::ProxyInterface>::descriptor(),
                    Self::dispatch::<__T>,
                )
            }

            fn dispatch<__T: #trait_ident>(
                target: &__T,
                method: &::chimera_aop::Method,
                args: &::chimera_aop::Arguments,
            ) -> ::chimera_aop::InvocationResult {
                #(#dispatch_arms)*
                ::std::result::Result::Err(::chimera_aop::proxy::unknown_method(
                    method,
                    ::std::any::type_name::<__T>(),
                ))
            }

            pub fn aop_proxy(&self) -> &::chimera_aop::Proxy {
                &self.proxy
            }
        }

        impl ::chimera_aop::ProxyInterface for dyn #trait_ident {
            fn descriptor() -> &'static ::chimera_aop::InterfaceDescriptor {
                static DESCRIPTOR: ::chimera_aop::InterfaceDescriptor =
                    ::chimera_aop::InterfaceDescriptor::new(#trait_name, #proxy_ident::METHODS)
                        .declared_in(::core::module_path!());
                &DESCRIPTOR
            }

            fn wrap(proxy: ::chimera_aop::Proxy) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#proxy_ident { proxy })
            }
        }

        impl #trait_ident for #proxy_ident {
            #(#forwarders)*
        }
    })
}
