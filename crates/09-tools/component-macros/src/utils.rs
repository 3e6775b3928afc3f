//! 宏工具函数

use syn::{GenericArgument, PathArguments, Type};

/// 可由容器直接解析的包装类型
const RESOLVABLE_WRAPPERS: &[&str] = &["Arc", "Lazy", "Vec", "Factory"];

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(type_path) if type_path.qself.is_none() => type_path.path.segments.last(),
        Type::Group(group) => last_segment(&group.elem),
        Type::Paren(paren) => last_segment(&paren.elem),
        _ => None,
    }
}

/// 字段类型是否为 `Arc<S>`、`Lazy<S>`、`Vec<Arc<S>>` 或 `Factory<A, S>`
///
/// 其他类型按普通值处理，从容器中以 `Arc<T>` 解析后克隆。
pub fn is_resolvable_type(ty: &Type) -> bool {
    let Some(segment) = last_segment(ty) else {
        return false;
    };
    let name = segment.ident.to_string();
    if !RESOLVABLE_WRAPPERS.contains(&name.as_str()) {
        return false;
    }
    if name == "Vec" {
        return first_type_argument(segment).is_some_and(|inner| {
            last_segment(inner).is_some_and(|inner| inner.ident == "Arc")
        });
    }
    true
}

fn first_type_argument(segment: &syn::PathSegment) -> Option<&Type> {
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    arguments.args.iter().find_map(|argument| match argument {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}

/// 取出 `Arc<S>` 中的 `S`
pub fn arc_inner_type(ty: &Type) -> Option<&Type> {
    let segment = last_segment(ty)?;
    if segment.ident != "Arc" {
        return None;
    }
    first_type_argument(segment)
}
