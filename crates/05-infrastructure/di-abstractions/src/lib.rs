//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义构造函数描述、依赖形态和解析上下文。
//!
//! ## 核心接口
//!
//! - [`RegisterableComponent`] - 可按构造函数激活的组件
//! - [`ConstructorDescriptor`] - 构造函数描述（参数列表 + 激活函数）
//! - [`Resolvable`] - 可被解析的依赖形态（`Arc<S>`、[`Lazy`]、`Vec<Arc<S>>`、[`Factory`]）
//! - [`ResolveContext`] - 单次解析调用的解析链，用于检测循环依赖
//! - [`Disposable`] - 由作用域负责释放的组件
//! - [`TenantIdentificationStrategy`] - 租户识别策略

pub mod disposal;
pub mod factory;
pub mod lazy;
pub mod registry;
pub mod resolver;
pub mod tenant;

pub use disposal::*;
pub use factory::*;
pub use lazy::*;
pub use registry::*;
pub use resolver::*;
pub use tenant::*;
