//! 多租户容器
//!
//! 根据环境上下文识别租户，把作用域请求路由到该租户的覆盖作用域之下。
//! 每个租户的覆盖作用域在第一次使用时创建，作为根作用域的子作用域被同一租户的所有请求共享；
//! 未识别出租户或租户未配置时，返回根作用域的普通子作用域。

use crate::builder::ContainerBuilder;
use crate::scope::LifetimeScope;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use di_abstractions::{TenantId, TenantIdentificationStrategy};
use infrastructure_common::{
    AmbientContext, DependencyError, DependencyResult, LifecycleResult,
};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Configurator = Box<dyn FnOnce(&mut ContainerBuilder) + Send>;

struct TenantState {
    configurator: Option<Configurator>,
    materialized: bool,
    /// 最近一次创建租户作用域失败的原因
    failure: Option<String>,
}

struct TenantRecord {
    state: Mutex<TenantState>,
    scope: OnceCell<LifetimeScope>,
}

impl TenantRecord {
    fn new(configurator: Configurator) -> Self {
        Self {
            state: Mutex::new(TenantState {
                configurator: Some(configurator),
                materialized: false,
                failure: None,
            }),
            scope: OnceCell::new(),
        }
    }
}

fn tenant_failure(tenant: &TenantId, failure: &str) -> DependencyError {
    DependencyError::RegistrationError {
        type_name: format!("tenant {tenant}"),
        message: format!("租户作用域创建失败: {failure}"),
    }
}

/// 多租户容器
pub struct MultitenantContainer {
    strategy: Arc<dyn TenantIdentificationStrategy>,
    root: LifetimeScope,
    tenants: DashMap<TenantId, Arc<TenantRecord>>,
}

impl MultitenantContainer {
    /// 以识别策略和根容器创建
    pub fn new(strategy: impl TenantIdentificationStrategy + 'static, root: LifetimeScope) -> Self {
        Self {
            strategy: Arc::new(strategy),
            root,
            tenants: DashMap::new(),
        }
    }

    /// 配置租户
    ///
    /// 同一租户重复配置时以最后一次为准；租户作用域创建之后不能再修改配置。
    /// 创建失败的租户可以重新配置。
    pub fn configure_tenant<F>(&self, tenant: impl Into<TenantId>, configure: F) -> DependencyResult<()>
    where
        F: FnOnce(&mut ContainerBuilder) + Send + 'static,
    {
        let tenant = tenant.into();
        match self.tenants.entry(tenant.clone()) {
            Entry::Occupied(entry) => {
                let mut state = entry.get().state.lock();
                if state.materialized {
                    return Err(DependencyError::RegistrationError {
                        type_name: format!("tenant {tenant}"),
                        message: "租户作用域已创建, 不能再修改配置".to_string(),
                    });
                }
                state.configurator = Some(Box::new(configure));
                state.failure = None;
                debug!("替换租户配置: {}", tenant);
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(TenantRecord::new(Box::new(configure))));
                info!("配置租户: {}", tenant);
            }
        }
        Ok(())
    }

    /// 租户是否已配置
    pub fn tenant_is_configured(&self, tenant: &TenantId) -> bool {
        self.tenants.contains_key(tenant)
    }

    /// 已配置的租户
    pub fn tenants(&self) -> Vec<TenantId> {
        let mut tenants: Vec<TenantId> = self.tenants.iter().map(|entry| entry.key().clone()).collect();
        tenants.sort();
        tenants
    }

    /// 根作用域
    pub fn root(&self) -> &LifetimeScope {
        &self.root
    }

    /// 租户的覆盖作用域，首次调用时创建；租户未配置时返回 `None`
    ///
    /// 创建失败时配置被消耗，之后的调用返回同样的失败，直到租户被重新配置。
    pub fn tenant_scope(&self, tenant: &TenantId) -> DependencyResult<Option<LifetimeScope>> {
        let Some(record) = self.tenants.get(tenant).map(|entry| Arc::clone(entry.value())) else {
            return Ok(None);
        };
        let scope = record
            .scope
            .get_or_try_init(|| self.materialize(tenant, &record))?;
        Ok(Some(scope.clone()))
    }

    fn materialize(&self, tenant: &TenantId, record: &TenantRecord) -> DependencyResult<LifetimeScope> {
        let configurator = {
            let mut state = record.state.lock();
            if state.configurator.is_none() {
                if let Some(failure) = &state.failure {
                    return Err(tenant_failure(tenant, failure));
                }
            }
            state.materialized = true;
            state.configurator.take()
        };

        let mut builder = ContainerBuilder::new();
        if let Some(configure) = configurator {
            configure(&mut builder);
        }
        let scope = builder.into_catalog().and_then(|overlay| {
            info!("创建租户作用域: {}, 覆盖注册数量: {}", tenant, overlay.len());
            self.root.begin_tagged(&format!("tenant-{tenant}"), overlay)
        });
        if let Err(error) = &scope {
            warn!("创建租户作用域失败: {}, {}", tenant, error);
            let mut state = record.state.lock();
            state.materialized = false;
            state.failure = Some(error.to_string());
        }
        scope
    }

    /// 为当前环境上下文创建生命周期作用域
    ///
    /// 识别策略失败时错误原样返回，不回退到默认作用域。
    pub fn begin_lifetime_scope(&self, context: &AmbientContext) -> DependencyResult<LifetimeScope> {
        let tenant = self
            .strategy
            .try_identify_tenant(context)
            .map_err(|source| DependencyError::TenantIdentification { source })?;

        let parent = match &tenant {
            Some(tenant) => self.tenant_scope(tenant)?,
            None => None,
        };
        match parent {
            Some(parent) => {
                debug!("路由到租户作用域: {}", parent.info());
                parent.begin_lifetime_scope()
            }
            None => {
                debug!("未识别到已配置的租户, 使用默认作用域: {:?}", tenant);
                self.root.begin_lifetime_scope()
            }
        }
    }

    /// 释放根作用域及全部租户作用域
    pub fn dispose(&self) -> LifecycleResult<()> {
        self.root.dispose()
    }
}
