//! 工具函数：方法签名分析与代码片段生成

use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote, ToTokens};
use syn::{Attribute, Error, FnArg, Ident, Pat, Result, ReturnType, Signature, Type};

/// 可以被代理的方法
///
/// 要求：非 async、非泛型、接收者为 `&self`、参数为拥有所有权的 `'static` 类型、返回 `Result`
pub struct ProxiedMethod {
    pub ident: Ident,
    pub const_ident: Ident,
    pub params: Vec<(Ident, Type)>,
    pub output: ReturnType,
    pub docs: Vec<Attribute>,
}

impl ProxiedMethod {
    pub fn analyze(sig: &Signature, attrs: &[Attribute]) -> Result<Self> {
        if let Some(asyncness) = &sig.asyncness {
            return Err(Error::new_spanned(asyncness, "async methods cannot be proxied"));
        }
        if !sig.generics.params.is_empty() || sig.generics.where_clause.is_some() {
            return Err(Error::new_spanned(&sig.generics, "generic methods cannot be proxied"));
        }
        if let Some(variadic) = &sig.variadic {
            return Err(Error::new_spanned(variadic, "variadic methods cannot be proxied"));
        }

        let mut inputs = sig.inputs.iter();
        match inputs.next() {
            Some(FnArg::Receiver(receiver))
                if receiver.reference.is_some() && receiver.mutability.is_none() => {}
            _ => {
                return Err(Error::new_spanned(
                    sig,
                    "proxied methods must take `&self` as receiver",
                ))
            }
        }

        let mut params = Vec::new();
        for (index, input) in inputs.enumerate() {
            let FnArg::Typed(arg) = input else {
                return Err(Error::new_spanned(input, "unexpected receiver"));
            };
            check_owned(&arg.ty)?;
            let ident = match &*arg.pat {
                Pat::Ident(pat) => pat.ident.clone(),
                _ => format_ident!("__arg{}", index),
            };
            params.push((ident, (*arg.ty).clone()));
        }

        if !returns_result(&sig.output) {
            return Err(Error::new_spanned(
                &sig.output,
                "proxied methods must return `Result<T, E>`",
            ));
        }

        let name = sig.ident.to_string();
        let const_ident = Ident::new(
            &name.trim_start_matches("r#").to_uppercase(),
            Span::call_site(),
        );

        Ok(Self {
            ident: sig.ident.clone(),
            const_ident,
            params,
            output: sig.output.clone(),
            docs: attrs.iter().filter(|a| a.path().is_ident("doc")).cloned().collect(),
        })
    }

    /// `pub const NAME: Method = Method::new(...)`
    pub fn method_const(&self, declaring_type: &str) -> TokenStream {
        let const_ident = &self.const_ident;
        let name = self.ident.to_string();
        let name = name.trim_start_matches("r#");
        let param_types = self.params.iter().map(|(_, ty)| type_name(ty));
        let return_type = match &self.output {
            ReturnType::Type(_, ty) => type_name(ty),
            ReturnType::Default => "()".to_string(),
        };

        quote! {
            pub const #const_ident: ::chimera_aop::Method = ::chimera_aop::Method::new(
                #declaring_type,
                #name,
                &[#(#param_types),*],
                #return_type,
            )
            .declared_in(::core::module_path!());
        }
    }

    /// 转发方法：打包参数，进入代理拦截链，再取回类型化的结果
    pub fn forwarder(&self, vis: TokenStream) -> TokenStream {
        let ident = &self.ident;
        let const_ident = &self.const_ident;
        let output = &self.output;
        let docs = &self.docs;
        let names: Vec<_> = self.params.iter().map(|(name, _)| name).collect();
        let types: Vec<_> = self.params.iter().map(|(_, ty)| ty).collect();

        quote! {
            #(#docs)*
            #vis fn #ident(&self, #(#names: #types),*) #output {
                let __arguments = ::chimera_aop::Arguments::new()#(.with(#names))*;
                ::chimera_aop::proxy::complete(
                    &Self::#const_ident,
                    self.proxy.invoke(&Self::#const_ident, __arguments),
                )
            }
        }
    }

    /// 分派表中的一项：`method` 命中时取出参数并调用真实方法
    pub fn dispatch_arm(&self, owner: &Ident, call: TokenStream, target: TokenStream) -> TokenStream {
        let const_ident = &self.const_ident;
        let ident = &self.ident;
        let locals: Vec<_> = (0..self.params.len()).map(|i| format_ident!("__arg{}", i)).collect();
        let types = self.params.iter().map(|(_, ty)| ty);
        let indices = 0..self.params.len();

        quote! {
            if *method == #owner::#const_ident {
                #(let #locals: #types = args.cloned(method, #indices)?;)*
                return ::chimera_aop::proxy::into_invocation_result(#call::#ident(#target, #(#locals),*));
            }
        }
    }
}

/// 参数必须能放进类型擦除的参数列表
fn check_owned(ty: &Type) -> Result<()> {
    match ty {
        Type::Reference(_) => Err(Error::new_spanned(
            ty,
            "proxied methods must take owned arguments (use `String` instead of `&str`)",
        )),
        Type::ImplTrait(_) => Err(Error::new_spanned(ty, "`impl Trait` arguments cannot be proxied")),
        _ => Ok(()),
    }
}

/// 返回类型的最后一段以 `Result` 结尾（`Result`、`anyhow::Result`、`ServiceResult` 等）
fn returns_result(output: &ReturnType) -> bool {
    match output {
        ReturnType::Type(_, ty) => match &**ty {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .map(|segment| segment.ident.to_string().ends_with("Result"))
                .unwrap_or(false),
            _ => false,
        },
        ReturnType::Default => false,
    }
}

/// 把类型渲染为紧凑的字符串，例如 `Result<Vec<u8>, Error>`
pub fn type_name(ty: impl ToTokens) -> String {
    ty.to_token_stream()
        .to_string()
        .replace(" :: ", "::")
        .replace(":: ", "::")
        .replace(" < ", "<")
        .replace("< ", "<")
        .replace(" <", "<")
        .replace(" >", ">")
        .replace(" ,", ",")
        .replace("& ", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_type_name() {
        let ty: Type = parse_quote!(Result<Vec<u8>, std::io::Error>);
        assert_eq!(type_name(&ty), "Result<Vec<u8>, std::io::Error>");

        let ty: Type = parse_quote!(Option<Vec<String>>);
        assert_eq!(type_name(&ty), "Option<Vec<String>>");
    }

    #[test]
    fn test_analyze_accepts_proxiable_method() {
        let sig: Signature = parse_quote!(fn r#transfer(&self, from: String, amount: u64) -> Result<u64, BankError>);
        let method = ProxiedMethod::analyze(&sig, &[]).unwrap();

        assert_eq!(method.const_ident.to_string(), "TRANSFER");
        assert_eq!(method.params.len(), 2);
        assert_eq!(method.params[0].0.to_string(), "from");
    }

    #[test]
    fn test_analyze_rejects_unsupported_methods() {
        let cases: Vec<Signature> = vec![
            parse_quote!(async fn load(&self) -> Result<u8, E>),
            parse_quote!(fn load<T>(&self) -> Result<T, E>),
            parse_quote!(fn load(&mut self) -> Result<u8, E>),
            parse_quote!(fn load(self) -> Result<u8, E>),
            parse_quote!(fn load() -> Result<u8, E>),
            parse_quote!(fn load(&self, key: &str) -> Result<u8, E>),
            parse_quote!(fn load(&self) -> u8),
        ];

        for sig in cases {
            assert!(ProxiedMethod::analyze(&sig, &[]).is_err(), "{}", type_name(&sig.ident));
        }
    }

    #[test]
    fn test_result_aliases_are_accepted() {
        let sig: Signature = parse_quote!(fn load(&self) -> anyhow::Result<u8>);
        assert!(ProxiedMethod::analyze(&sig, &[]).is_ok());

        let sig: Signature = parse_quote!(fn load(&self) -> ServiceResult<u8>);
        assert!(ProxiedMethod::analyze(&sig, &[]).is_ok());
    }
}
