//! 注册模块

use crate::builder::ContainerBuilder;
use infrastructure_common::DependencyResult;

/// 注册模块
///
/// 把一组相关注册打包，通过 [`ContainerBuilder::register_module`] 一次加载。
pub trait Module {
    /// 向构建器添加注册
    fn load(&self, builder: &mut ContainerBuilder) -> DependencyResult<()>;

    /// 模块名称，用于日志
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
