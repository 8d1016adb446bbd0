//! Request handlers for the tenant-scoped User resource.
//!
//! # Module Organization
//!
//! * [`user`] - [`UserResourceHandler`], SCIM CRUD over the tenant's managed users
//! * [`idp_link`] - federated identity linking by email domain
//! * [`provision`] - batch create-or-update for provisioning clients
//!
//! # Usage
//!
//! ```rust
//! use scim_provisioner::directory::InMemoryDirectory;
//! use scim_provisioner::multi_tenant::{TenantContext, TenantSettings};
//! use scim_provisioner::resource_handlers::UserResourceHandler;
//! use scim_provisioner::schema::SchemaRegistry;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handler = UserResourceHandler::new(
//!     Arc::new(SchemaRegistry::with_embedded_schemas()?),
//!     "https://scim.example.com",
//! );
//! let settings = TenantSettings::external("acme", "https://idp", "https://idp/keys", "scim");
//! let context = TenantContext::from_settings(&settings, Arc::new(InMemoryDirectory::new()), "req-1")?;
//!
//! let user = handler
//!     .create(&context, &json!({
//!         "schemas": ["urn:ietf:params:scim:schemas:core:2.0:User"],
//!         "userName": "alice"
//!     }))
//!     .await?;
//! assert_eq!(user["userName"], "alice");
//! # Ok(())
//! # }
//! ```

pub mod idp_link;
pub mod provision;
pub mod user;

pub use idp_link::{email_domain, link_identity_providers};
pub use provision::{ProvisionDetail, ProvisionReport, ProvisionStatus};
pub use user::UserResourceHandler;
