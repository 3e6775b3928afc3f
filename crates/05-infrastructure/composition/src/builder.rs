//! 基础设施构建器

use crate::configuration::{parse_error, ConfigurationModule};
use crate::type_catalog::ComponentTypeCatalog;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use di_impl::{Container, ContainerBuilder};
use infrastructure_common::{ConfigError, InfrastructureError, InfrastructureResult};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

type Configurator = Box<dyn FnOnce(&mut ContainerBuilder)>;

/// 基础设施构建器
///
/// 汇集配置源、组件类型目录和代码注册，构建根容器。
/// 代码注册先于配置注册加载，因此配置中的组件会成为新的默认实现。
pub struct InfrastructureBuilder {
    /// 配置源
    config: ConfigBuilder<DefaultState>,
    /// 配置中可引用的类型
    types: ComponentTypeCatalog,
    /// 代码注册
    configurators: Vec<Configurator>,
    /// 容器配置所在的配置节
    section: Option<String>,
    /// 是否启用日志初始化
    logging_enabled: bool,
    /// 日志配置
    logging_config: LoggingConfig,
}

impl InfrastructureBuilder {
    /// 创建新的基础设施构建器
    pub fn new() -> Self {
        Self {
            config: config::Config::builder(),
            types: ComponentTypeCatalog::new(),
            configurators: Vec::new(),
            section: None,
            logging_enabled: false,
            logging_config: LoggingConfig::default(),
        }
    }

    fn add_config_file(self, path: &Path, format: FileFormat) -> InfrastructureResult<Self> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        info!("添加 {:?} 配置文件: {}", format, path.display());
        let source = File::from(path.to_path_buf()).format(format);
        Ok(Self {
            config: self.config.add_source(source),
            ..self
        })
    }

    /// 添加 JSON 配置文件
    pub fn add_config_json<P: AsRef<Path>>(self, path: P) -> InfrastructureResult<Self> {
        self.add_config_file(path.as_ref(), FileFormat::Json)
    }

    /// 添加 TOML 配置文件
    pub fn add_config_toml<P: AsRef<Path>>(self, path: P) -> InfrastructureResult<Self> {
        self.add_config_file(path.as_ref(), FileFormat::Toml)
    }

    /// 添加 YAML 配置文件
    pub fn add_config_yaml<P: AsRef<Path>>(self, path: P) -> InfrastructureResult<Self> {
        self.add_config_file(path.as_ref(), FileFormat::Yaml)
    }

    /// 添加环境变量配置源，层级以 `__` 分隔
    pub fn add_config_env_vars<S: Into<String>>(self, prefix: S) -> Self {
        let prefix = prefix.into();
        info!("添加环境变量配置源，前缀: {}", prefix);
        let source = Environment::with_prefix(&prefix).separator("__");
        Self {
            config: self.config.add_source(source),
            ..self
        }
    }

    /// 从指定配置节读取容器配置
    pub fn with_config_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// 设置配置中可引用的类型
    pub fn with_component_types(mut self, types: ComponentTypeCatalog) -> Self {
        self.types = types;
        self
    }

    /// 添加代码注册
    pub fn configure<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ContainerBuilder) + 'static,
    {
        debug!("添加代码注册");
        self.configurators.push(Box::new(configure));
        self
    }

    /// 配置日志
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging_config = config;
        self.logging_enabled = true;
        self
    }

    /// 构建根容器
    pub fn build(self) -> InfrastructureResult<Container> {
        // 只有在明确配置了日志时才初始化，避免测试中重复初始化
        if self.logging_enabled {
            init_logging(&self.logging_config)?;
        }
        info!("开始构建容器");

        let config = self.config.build().map_err(parse_error)?;
        let types = Arc::new(self.types);
        let module = match &self.section {
            Some(section) => ConfigurationModule::from_section(&config, section, types)?,
            None => ConfigurationModule::new(&config, types)?,
        };

        let mut builder = ContainerBuilder::new();
        for configure in self.configurators {
            configure(&mut builder);
        }
        builder.register_module(module);
        let container = builder.build()?;

        info!("容器构建完成");
        Ok(container)
    }
}

impl Default for InfrastructureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 日志配置
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// 日志级别，`RUST_LOG` 存在时以其为准
    pub level: tracing::Level,
    /// 是否显示目标
    pub show_target: bool,
    /// 是否显示线程ID
    pub show_thread_ids: bool,
    /// 是否显示文件名
    pub show_file: bool,
    /// 是否显示行号
    pub show_line_number: bool,
    /// 是否使用 JSON 格式
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// 创建开发环境日志配置
    pub fn development() -> Self {
        Self {
            level: tracing::Level::DEBUG,
            show_target: true,
            show_thread_ids: true,
            show_file: true,
            show_line_number: true,
            json_format: false,
        }
    }

    /// 创建生产环境日志配置
    pub fn production() -> Self {
        Self {
            level: tracing::Level::INFO,
            show_target: false,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
            json_format: true,
        }
    }

    pub fn with_level(mut self, level: tracing::Level) -> Self {
        self.level = level;
        self
    }
}

/// 初始化全局日志订阅者
pub fn init_logging(config: &LoggingConfig) -> InfrastructureResult<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.level).into())
        .from_env_lossy();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_thread_ids(config.show_thread_ids)
        .with_file(config.show_file)
        .with_line_number(config.show_line_number);

    if config.json_format {
        subscriber.json().try_init()
    } else {
        subscriber.try_init()
    }
    .map_err(|e| InfrastructureError::BootstrapFailed {
        message: format!("日志初始化失败: {}", e),
    })?;

    info!("日志系统初始化完成");
    Ok(())
}
