//! 构造函数选择
//!
//! 在全部参数都可满足的构造函数中选择参数最多的一个。可选参数计入参数总数。
//! 参数最多的构造函数不唯一时报告歧义，不再做其他裁决。选择结果不缓存，
//! 每次激活都重新计算，因此作用域内新增的注册会影响后续选择。

use di_abstractions::{ErasedConstructor, Parameter};
use infrastructure_common::{DependencyError, DependencyResult};
use tracing::trace;

/// 选择构造函数
pub(crate) fn select_constructor<'c, F>(
    type_name: &str,
    constructors: &'c [ErasedConstructor],
    is_satisfiable: F,
) -> DependencyResult<&'c ErasedConstructor>
where
    F: Fn(&Parameter) -> bool,
{
    let viable: Vec<&ErasedConstructor> = constructors
        .iter()
        .filter(|constructor| {
            constructor
                .parameters
                .iter()
                .all(|parameter| parameter.is_optional() || is_satisfiable(parameter))
        })
        .collect();

    let Some(max_arity) = viable.iter().map(|constructor| constructor.arity()).max() else {
        return Err(DependencyError::NoViableConstructor {
            type_name: type_name.to_string(),
        });
    };

    let mut best = viable
        .into_iter()
        .filter(|constructor| constructor.arity() == max_arity);
    match (best.next(), best.next()) {
        (Some(chosen), None) => {
            trace!("选择构造函数: {}{}", type_name, chosen.signature());
            Ok(chosen)
        }
        (Some(first), Some(second)) => {
            let candidates = [first, second]
                .into_iter()
                .chain(best)
                .map(ErasedConstructor::signature)
                .collect();
            Err(DependencyError::AmbiguousConstructor {
                type_name: type_name.to_string(),
                candidates,
            })
        }
        (None, _) => Err(DependencyError::NoViableConstructor {
            type_name: type_name.to_string(),
        }),
    }
}
