//! SCIM User documents and their mapping onto directory records.
//!
//! - [`ScimUserDocument`] is the typed User resource
//! - [`ResourceTranslator`] maps it to and from [`DirectoryUser`](crate::directory::DirectoryUser)
//! - [`patch`] holds the PATCH request model and the untyped tree mutation

pub mod patch;
pub mod translator;
pub mod user;

pub use patch::{PatchOp, PatchOperation, PatchPath, PatchRequest, PreparedOperation, apply_operations};
pub use translator::{
    EXTERNAL_ID_ATTRIBUTE, ROLES_ATTRIBUTE, ROLES_RAW_ATTRIBUTE, ResourceTranslator,
};
pub use user::{Email, Meta, Name, Role, ScimUserDocument};
