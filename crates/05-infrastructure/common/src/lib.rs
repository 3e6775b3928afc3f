//! # Infrastructure Common
//!
//! 这个 crate 提供了 Lorn ADSP 依赖注入容器各层共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`DependencyError`] / [`LifecycleError`] / [`ConfigError`] - 错误分类
//! - [`Lifetime`] - 实例共享策略
//! - [`ScopeInfo`] - 生命周期作用域标识
//! - [`ServiceKey`] / [`TypeInfo`] - 服务标识
//! - [`AmbientContext`] - 跨线程/异步边界传递的环境上下文快照
//!
//! ## 设计原则
//!
//! - 基于 Rust 类型系统的编译时安全
//! - 显式传递上下文，不依赖线程本地存储
//! - 错误从不被吞掉，全部返回给直接调用方

pub mod context;
pub mod errors;
pub mod lifecycle;
pub mod metadata;

pub use context::*;
pub use errors::*;
pub use lifecycle::*;
pub use metadata::*;
