//! 错误类型定义

use thiserror::Error;

/// 装箱的通用错误类型
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置文件读取失败: {source}")]
    FileReadError {
        #[from]
        source: std::io::Error,
    },

    #[error("配置解析失败: {source}")]
    ParseError { source: BoxError },

    #[error("配置序列化失败: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("配置键不存在: {key}")]
    KeyNotFound { key: String },

    #[error("配置类型转换失败: {message}")]
    TypeConversionError { message: String },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },

    #[error("未知的{kind}类型: {name}")]
    UnknownType { kind: String, name: String },
}

/// 依赖注入错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("服务未注册: {service}")]
    UnregisteredService { service: String },

    #[error("构造函数选择存在歧义: {type_name}, 候选: {candidates:?}")]
    AmbiguousConstructor {
        type_name: String,
        candidates: Vec<String>,
    },

    #[error("没有可用的构造函数: {type_name}")]
    NoViableConstructor { type_name: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("生命周期作用域已释放: {scope_id}")]
    ScopeDisposed { scope_id: String },

    #[error("租户识别失败: {source}")]
    TenantIdentification { source: BoxError },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed { type_name: String, source: BoxError },

    #[error("依赖解析失败: {type_name}, 原因: {message}")]
    DependencyResolutionFailed { type_name: String, message: String },

    #[error("组件注册失败: {type_name}, 原因: {message}")]
    RegistrationError { type_name: String, message: String },
}

impl DependencyError {
    /// 创建组件创建失败错误
    pub fn creation_failed(
        type_name: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ComponentCreationFailed {
            type_name: type_name.into(),
            source: source.into(),
        }
    }

    /// 创建依赖解析失败错误
    pub fn resolution_failed(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DependencyResolutionFailed {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// 生命周期管理错误类型
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("作用域释放失败: {scope_id}, 原因: {failures:?}")]
    DisposalFailed {
        scope_id: String,
        failures: Vec<String>,
    },

    #[error("作用域已释放: {scope_id}")]
    ScopeDisposed { scope_id: String },
}

/// 基础设施错误类型
#[derive(Error, Debug)]
pub enum InfrastructureError {
    #[error("配置错误: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("依赖注入错误: {source}")]
    DependencyError {
        #[from]
        source: DependencyError,
    },

    #[error("生命周期错误: {source}")]
    LifecycleError {
        #[from]
        source: LifecycleError,
    },

    #[error("基础设施启动失败: {message}")]
    BootstrapFailed { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type LifecycleResult<T> = Result<T, LifecycleError>;
pub type InfrastructureResult<T> = Result<T, InfrastructureError>;
