//! # Component Macros
//!
//! 这个 crate 提供了从结构体字段生成构造函数描述的派生宏。
//!
//! ## 核心宏
//!
//! - [`Injectable`](derive@Injectable) - 为结构体实现 `RegisterableComponent`
//!
//! ## 使用示例
//!
//! ```ignore
//! use component_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(single_instance)]
//! pub struct OrderService {
//!     logger: Arc<dyn Logger>,
//!     #[inject(named = "audit")]
//!     audit: Arc<dyn Logger>,
//!     #[inject(default = 30)]
//!     timeout_secs: u64,
//! }
//! ```
//!
//! 字段按声明顺序成为构造函数参数，字段名即参数名。`Arc<S>`、`Lazy<S>`、
//! `Vec<Arc<S>>` 和 `Factory<A, S>` 字段按对应形态解析，其他类型的字段以
//! `Arc<T>` 解析后克隆，也可以通过注册时的命名参数或配置提供。

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod injectable;
mod utils;

/// 可注入组件派生宏
///
/// # 属性
///
/// - `#[injectable(single_instance | per_lifetime_scope | per_dependency)]` - 默认生命周期，
///   也接受 `singleton`、`scoped`、`transient`
/// - `#[inject(named = "name")]` - 字段解析为命名服务
/// - `#[inject(default = expr)]` - 字段为可选参数，无法满足时使用默认值
#[proc_macro_derive(Injectable, attributes(injectable, inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input)
}
