//! Multi-tenant SCIM 2.0 provisioning server.
//!
//! Fronts a user directory with tenant-scoped SCIM endpoints, gated by
//! per-tenant bearer tokens verified against each tenant's JWKS.
//!
//! # Core Components
//!
//! - [`SchemaRegistry`] - static resource-type and schema metadata
//! - [`SearchEngine`] - filter, sort and paginate over resource snapshots
//! - [`UserResourceHandler`] - User CRUD with IdP linking
//! - [`Authenticator`] / [`ValidatorRegistry`] - bearer token verification
//! - [`TokenIssuer`] - companion issuer for provisioning clients and tests
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scim_provisioner::auth::ValidatorRegistry;
//! use scim_provisioner::directory::InMemoryDirectory;
//! use scim_provisioner::multi_tenant::{StaticTenantResolver, TenantSettings};
//! use scim_provisioner::schema::SchemaRegistry;
//! use scim_provisioner::server::{AppState, router};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tenants = vec![TenantSettings::external(
//!     "acme",
//!     "https://login.example.com",
//!     "https://login.example.com/discovery/v2.0/keys",
//!     "scim",
//! )];
//! let resolver = Arc::new(StaticTenantResolver::new(tenants, Arc::new(InMemoryDirectory::new()))?);
//! let state = AppState::new(
//!     resolver,
//!     Arc::new(SchemaRegistry::with_embedded_schemas()?),
//!     Arc::new(ValidatorRegistry::default()),
//!     "https://scim.example.com",
//! );
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router(state)).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod issuer;
pub mod multi_tenant;
pub mod resource;
pub mod resource_handlers;
pub mod schema;
pub mod schema_discovery;
pub mod search;
pub mod server;

// Re-export commonly used types for convenience
pub use auth::{Authenticator, JwtValidator, ValidatorRegistry};
pub use config::ServerConfig;
pub use directory::{DirectoryUser, InMemoryDirectory, UserDirectory};
pub use error::{ConfigurationError, ScimError, ScimResult, ValidationError};
pub use issuer::TokenIssuer;
pub use multi_tenant::{StaticTenantResolver, TenantContext, TenantResolver, TenantSettings};
pub use resource::{ResourceTranslator, ScimUserDocument};
pub use resource_handlers::UserResourceHandler;
pub use schema::{Schema, SchemaRegistry};
pub use schema_discovery::{AuthenticationScheme, SchemaDiscovery, ServiceProviderConfig};
pub use search::{SearchEngine, SearchRequest, SearchResult};
