//! `#[derive(Injectable)]` 实现

use crate::utils::{arc_inner_type, is_resolvable_type};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse::Parse, parse::ParseStream, punctuated::Punctuated, Data, DeriveInput, Expr, Fields,
    Ident, Lit, LitStr, Meta, Result, Token, Type,
};

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq)]
enum ComponentLifetime {
    SingleInstance,
    PerLifetimeScope,
    PerDependency,
}

impl ComponentLifetime {
    fn from_ident(ident: &Ident) -> Option<Self> {
        match ident.to_string().as_str() {
            "single_instance" | "singleton" => Some(Self::SingleInstance),
            "per_lifetime_scope" | "scoped" => Some(Self::PerLifetimeScope),
            "per_dependency" | "transient" => Some(Self::PerDependency),
            _ => None,
        }
    }

    fn to_tokens(self) -> TokenStream2 {
        match self {
            Self::SingleInstance => quote! { ::infrastructure_common::Lifetime::SingleInstance },
            Self::PerLifetimeScope => quote! { ::infrastructure_common::Lifetime::PerLifetimeScope },
            Self::PerDependency => quote! { ::infrastructure_common::Lifetime::PerDependency },
        }
    }
}

/// `#[injectable(...)]` 参数
#[derive(Debug, Default)]
struct InjectableArgs {
    lifetime: Option<ComponentLifetime>,
}

impl Parse for InjectableArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = InjectableArgs::default();
        let parsed = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;

        for meta in parsed {
            match &meta {
                Meta::Path(path) => {
                    let lifetime = path.get_ident().and_then(ComponentLifetime::from_ident);
                    match lifetime {
                        Some(lifetime) => args.lifetime = Some(lifetime),
                        None => return Err(syn::Error::new_spanned(path, "未知的生命周期")),
                    }
                }
                other => return Err(syn::Error::new_spanned(other, "不支持的 injectable 参数")),
            }
        }

        Ok(args)
    }
}

/// 字段上的 `#[inject(...)]` 参数
#[derive(Default)]
struct InjectArgs {
    /// 指向命名服务
    named: Option<LitStr>,
    /// 默认值表达式，存在时参数可选
    default: Option<Expr>,
}

impl Parse for InjectArgs {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut args = InjectArgs::default();
        let parsed = Punctuated::<Meta, Token![,]>::parse_terminated(input)?;

        for meta in parsed {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "inject 参数必须是 key = value 形式",
                    ))
                }
            };
            if nv.path.is_ident("named") {
                match nv.value {
                    Expr::Lit(syn::ExprLit {
                        lit: Lit::Str(name), ..
                    }) => args.named = Some(name),
                    other => return Err(syn::Error::new_spanned(other, "named 必须是字符串")),
                }
            } else if nv.path.is_ident("default") {
                args.default = Some(nv.value);
            } else {
                return Err(syn::Error::new_spanned(nv.path, "未知的 inject 参数"));
            }
        }

        Ok(args)
    }
}

/// 一个构造函数参数的生成结果
struct GeneratedParameter {
    /// 追加到描述上的参数声明
    declaration: TokenStream2,
    /// 激活函数中的取值表达式
    extraction: TokenStream2,
}

fn generate_parameter(name: &str, ty: &Type, inject: InjectArgs) -> Result<GeneratedParameter> {
    let resolvable = is_resolvable_type(ty);
    let (parameter_type, extraction) = if resolvable {
        (quote! { #ty }, quote! { __arguments.next::<#ty>()? })
    } else {
        (
            quote! { ::std::sync::Arc<#ty> },
            quote! { __arguments.value::<#ty>()? },
        )
    };

    let declaration = match (inject.named, inject.default) {
        (Some(_), Some(default)) => {
            return Err(syn::Error::new_spanned(
                default,
                "named 与 default 不能同时使用",
            ))
        }
        (Some(service_name), None) => {
            let Some(service) = arc_inner_type(ty) else {
                return Err(syn::Error::new_spanned(ty, "命名服务参数必须是 Arc<S>"));
            };
            quote! { .named_service::<#service>(#name, #service_name) }
        }
        (None, Some(default)) if resolvable => {
            quote! { .optional::<#parameter_type, _>(#name, || #default) }
        }
        (None, Some(default)) => {
            quote! { .optional::<#parameter_type, _>(#name, || ::std::sync::Arc::new(#default)) }
        }
        (None, None) => quote! { .parameter::<#parameter_type>(#name) },
    };

    Ok(GeneratedParameter {
        declaration,
        extraction,
    })
}

/// 实现 #[derive(Injectable)]
pub fn derive_injectable_impl(input: DeriveInput) -> TokenStream {
    match expand(input) {
        Ok(tokens) => tokens.into(),
        Err(error) => error.to_compile_error().into(),
    }
}

fn expand(input: DeriveInput) -> Result<TokenStream2> {
    let mut args = InjectableArgs::default();
    for attr in &input.attrs {
        if attr.path().is_ident("injectable") {
            args = attr.parse_args::<InjectableArgs>()?;
        }
    }

    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Injectable 只能用于结构体",
        ));
    };

    let mut declarations = Vec::new();
    let body = match &data.fields {
        Fields::Named(fields) => {
            let mut initializers = Vec::new();
            for field in &fields.named {
                let Some(ident) = &field.ident else {
                    continue;
                };
                let mut inject = InjectArgs::default();
                for attr in &field.attrs {
                    if attr.path().is_ident("inject") {
                        inject = attr.parse_args::<InjectArgs>()?;
                    }
                }
                let name = ident.to_string();
                let name = name.trim_start_matches("r#");
                let generated = generate_parameter(name, &field.ty, inject)?;
                declarations.push(generated.declaration);
                let extraction = generated.extraction;
                initializers.push(quote! { #ident: #extraction });
            }
            quote! { Self { #(#initializers),* } }
        }
        Fields::Unit => quote! { Self },
        Fields::Unnamed(fields) => {
            return Err(syn::Error::new_spanned(
                fields,
                "Injectable 需要具名字段作为参数名称",
            ))
        }
    };

    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let lifetime = args
        .lifetime
        .map(|lifetime| {
            let lifetime = lifetime.to_tokens();
            quote! {
                fn default_lifetime() -> ::infrastructure_common::Lifetime {
                    #lifetime
                }
            }
        })
        .unwrap_or_default();

    Ok(quote! {
        impl #impl_generics ::di_abstractions::RegisterableComponent for #struct_name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::di_abstractions::ConstructorDescriptor<Self>> {
                ::std::vec![
                    ::di_abstractions::ConstructorDescriptor::new(
                        |__arguments: &mut ::di_abstractions::Arguments| {
                            ::std::result::Result::Ok(#body)
                        },
                    )
                    #(#declarations)*
                ]
            }

            #lifetime
        }
    })
}
