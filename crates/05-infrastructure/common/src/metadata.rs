//! 元数据定义
//!
//! 提供类型与服务的标识信息

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 类型信息
#[derive(Debug, Clone)]
pub struct TypeInfo {
    /// 类型名称（完整路径）
    pub name: &'static str,
    /// 类型ID
    pub id: TypeId,
}

impl TypeInfo {
    /// 从类型获取类型信息
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            name: std::any::type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> String {
        short_type_name(self.name)
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl Hash for TypeInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// 去掉类型名中每一段的模块路径，`alloc::sync::Arc<dyn app::Logger>` -> `Arc<dyn Logger>`
fn short_type_name(full: &str) -> String {
    let mut result = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            result.push_str(segment.rsplit("::").next().unwrap_or(&segment));
            segment.clear();
            result.push(ch);
        }
    }
    result.push_str(segment.rsplit("::").next().unwrap_or(&segment));
    result
}

/// 服务标识
///
/// 由服务类型和可选的名称组成，是解析请求的目标。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    pub type_info: TypeInfo,
    pub name: Option<String>,
}

impl ServiceKey {
    /// 未命名服务
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<S>(),
            name: None,
        }
    }

    /// 命名服务
    pub fn named<S: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            type_info: TypeInfo::of::<S>(),
            name: Some(name.into()),
        }
    }

    /// 服务类型ID
    pub fn type_id(&self) -> TypeId {
        self.type_info.id
    }

    /// 是否为指定类型的服务（忽略名称）
    pub fn is_type<S: ?Sized + 'static>(&self) -> bool {
        self.type_info.id == TypeId::of::<S>()
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.type_info.short_name(), name),
            None => write!(f, "{}", self.type_info.short_name()),
        }
    }
}
