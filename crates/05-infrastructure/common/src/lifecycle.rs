//! 组件生命周期管理

use std::fmt;

/// 组件生命周期类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// 单例模式 - 由拥有注册的作用域缓存一次，所有后代作用域共享
    SingleInstance,
    /// 作用域模式 - 每个发起解析的作用域各自缓存一个实例
    PerLifetimeScope,
    /// 瞬时模式 - 每次解析都创建新实例
    #[default]
    PerDependency,
}

impl Lifetime {
    /// 是否缓存实例
    pub fn is_cached(&self) -> bool {
        matches!(self, Self::SingleInstance | Self::PerLifetimeScope)
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleInstance => write!(f, "single-instance"),
            Self::PerLifetimeScope => write!(f, "per-lifetime-scope"),
            Self::PerDependency => write!(f, "per-dependency"),
        }
    }
}

impl std::str::FromStr for Lifetime {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().replace('_', "-").as_str() {
            "single-instance" | "singleton" => Ok(Self::SingleInstance),
            "per-lifetime-scope" | "scoped" => Ok(Self::PerLifetimeScope),
            "per-dependency" | "transient" => Ok(Self::PerDependency),
            other => Err(format!("未知的生命周期: {other}")),
        }
    }
}

/// 生命周期作用域标识
#[derive(Debug, Clone)]
pub struct ScopeInfo {
    pub id: uuid::Uuid,
    pub tag: String,
    pub depth: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl ScopeInfo {
    /// 创建新作用域标识
    pub fn new(tag: impl Into<String>, depth: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            tag: tag.into(),
            depth,
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域标识
    pub fn root() -> Self {
        Self::new("root", 0)
    }

    /// 创建子作用域标识
    pub fn child(&self, tag: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.tag, tag.into()), self.depth + 1)
    }

    /// 是否为根作用域
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }
}

impl fmt::Display for ScopeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tag, self.id)
    }
}
