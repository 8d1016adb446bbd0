//! Multi-tenant configuration and request context.
//!
//! # Architecture
//!
//! * **Settings**: [`TenantSettings`] as loaded from configuration
//! * **Resolution**: [`TenantResolver`] maps the path's tenant id to a context
//! * **Context**: [`TenantContext`] carries the resolved auth config, flags and
//!   directory handle for one request

pub mod config;
pub mod context;
pub mod resolver;

pub use config::{
    AuthMode, DEFAULT_MANAGED_ROLE, ExternalAuthConfig, TenantAuth, TenantAuthSettings,
    TenantSettings,
};
pub use context::TenantContext;
pub use resolver::{StaticTenantResolver, TenantResolver};
