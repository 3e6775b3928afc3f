//! 租户识别

use infrastructure_common::{AmbientContext, BoxError};
use std::fmt;

/// 租户标识
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TenantId(String);

impl TenantId {
    /// 创建租户标识
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// 租户识别策略
///
/// 从环境上下文中识别当前租户。返回 `Ok(None)` 表示未识别出租户，调用方回退到默认容器。
pub trait TenantIdentificationStrategy: Send + Sync {
    /// 尝试识别租户
    fn try_identify_tenant(&self, context: &AmbientContext) -> Result<Option<TenantId>, BoxError>;
}

/// 以闭包实现的识别策略
pub struct FnTenantIdentificationStrategy<F>(F);

/// 以闭包创建识别策略
pub fn identify_tenant_with<F>(identify: F) -> FnTenantIdentificationStrategy<F>
where
    F: Fn(&AmbientContext) -> Result<Option<TenantId>, BoxError> + Send + Sync,
{
    FnTenantIdentificationStrategy(identify)
}

impl<F> TenantIdentificationStrategy for FnTenantIdentificationStrategy<F>
where
    F: Fn(&AmbientContext) -> Result<Option<TenantId>, BoxError> + Send + Sync,
{
    fn try_identify_tenant(&self, context: &AmbientContext) -> Result<Option<TenantId>, BoxError> {
        (self.0)(context)
    }
}

/// 从环境上下文的指定键读取租户标识
#[derive(Debug, Clone)]
pub struct AmbientTenantIdentificationStrategy {
    key: String,
}

impl AmbientTenantIdentificationStrategy {
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }

    /// 读取的上下文键
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl TenantIdentificationStrategy for AmbientTenantIdentificationStrategy {
    fn try_identify_tenant(&self, context: &AmbientContext) -> Result<Option<TenantId>, BoxError> {
        Ok(context.get(&self.key).map(TenantId::from))
    }
}
