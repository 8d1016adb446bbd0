//! Error types for SCIM provisioning operations.
//!
//! Every failure a client can observe is a [`ScimError`]. Each variant knows its
//! HTTP status and, where RFC 7644 defines one, its `scimType`, so the HTTP layer
//! renders all of them through a single SCIM-shaped error body.

/// Main error type for SCIM provisioning operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Resource data doesn't conform to the resource type's schema
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Filter or sort expression could not be parsed or applied
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// PATCH path is malformed or targets an unknown attribute
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Query parameter or attribute value is out of range
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// PATCH value filter selected nothing
    #[error("No target: {0}")]
    NoTarget(String),

    /// Request body or parameters are malformed
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Missing, malformed, expired, or otherwise invalid bearer token.
    ///
    /// Carries no detail on purpose; reasons are logged server-side.
    #[error("Unauthorized")]
    Unauthorized,

    /// Caller is authenticated but the operation is not allowed
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Resource lookup failed
    #[error("Resource not found: {resource_type} with ID {id}")]
    ResourceNotFound { resource_type: String, id: String },

    /// Lookup failed with a message that is not a plain id miss
    #[error("{message}")]
    NotFound { message: String },

    /// Uniqueness violation
    #[error("{attribute} '{value}' already exists")]
    Conflict { attribute: String, value: String },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Tenant or resource-type configuration is unusable
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Validation errors for schema compliance checking.
///
/// The display text is passed to clients verbatim as the error `detail`.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Required attribute is missing
    #[error("Required attribute '{attribute}' is missing")]
    MissingRequiredAttribute { attribute: String },

    /// Attribute value doesn't match expected type
    #[error("Attribute '{attribute}' has invalid type, expected {expected}, got {actual}")]
    InvalidAttributeType {
        attribute: String,
        expected: String,
        actual: String,
    },

    /// Multi-valued attribute provided as single value
    #[error("Attribute '{attribute}' must be multi-valued (array)")]
    ExpectedMultiValue { attribute: String },

    /// Single-valued attribute provided as array
    #[error("Attribute '{attribute}' must be single-valued (not array)")]
    ExpectedSingleValue { attribute: String },

    /// Unknown attribute in resource
    #[error("Unknown attribute '{attribute}' in schema '{schema_id}'")]
    UnknownAttribute {
        attribute: String,
        schema_id: String,
    },

    /// Unknown sub-attribute in complex attribute
    #[error("Complex attribute '{attribute}' contains unknown sub-attribute '{sub_attribute}'")]
    UnknownSubAttribute {
        attribute: String,
        sub_attribute: String,
    },

    /// Read-only mutability violation
    #[error("Attribute '{attribute}' is read-only and cannot be modified")]
    ReadOnlyMutabilityViolation { attribute: String },

    /// Immutable mutability violation
    #[error("Attribute '{attribute}' is immutable and cannot be modified after creation")]
    ImmutableMutabilityViolation { attribute: String },

    /// Missing schemas attribute
    #[error("Missing required 'schemas' attribute")]
    MissingSchemas,

    /// Core schema URN not listed in 'schemas'
    #[error("'schemas' must include '{uri}'")]
    MissingBaseSchema { uri: String },

    /// Unknown schema URI
    #[error("Unknown schema URI: {uri}")]
    UnknownSchemaUri { uri: String },

    /// General validation error with custom message
    #[error("Validation failed: {message}")]
    Custom { message: String },
}

/// Errors raised while building tenant contexts or the schema registry.
///
/// These are raised eagerly and never defaulted away.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// External-issuer tenant without one of issuer / jwksUri / audience
    #[error("Tenant '{tenant_id}' uses external-issuer authentication but '{field}' is not configured")]
    MissingTenantField {
        tenant_id: String,
        field: &'static str,
    },

    /// Authentication mode the server refuses to run
    #[error("Tenant '{tenant_id}' uses unsupported authentication mode '{mode}'")]
    UnsupportedAuthMode { tenant_id: String, mode: String },

    /// Tenant declared twice
    #[error("Tenant '{tenant_id}' is declared more than once")]
    DuplicateTenant { tenant_id: String },

    /// No declaration for a resource kind
    #[error("No resource type declared for '{kind}'")]
    MissingResourceType { kind: String },

    /// Declaration lacks a mandatory field
    #[error("Resource type '{name}' is declared without '{field}'")]
    IncompleteResourceType { name: String, field: &'static str },

    /// Declaration references an unregistered schema
    #[error("Resource type '{resource_type}' references unknown schema '{schema_id}'")]
    UnknownSchema {
        resource_type: String,
        schema_id: String,
    },

    /// Embedded schema document is not valid
    #[error("Schema could not be loaded: {message}")]
    InvalidSchema { message: String },

    /// Tenant field is present but unusable
    #[error("Tenant '{tenant_id}' has an invalid '{field}': {message}")]
    InvalidTenantField {
        tenant_id: String,
        field: &'static str,
        message: String,
    },

    /// Server-wide setting is out of range
    #[error("Invalid setting '{field}': {message}")]
    InvalidSetting {
        field: &'static str,
        message: String,
    },

    /// Configuration file could not be read or parsed
    #[error("Failed to load configuration from '{path}': {message}")]
    Load { path: String, message: String },
}

impl ScimError {
    /// Create a resource not found error
    pub fn resource_not_found(resource_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self::ResourceNotFound {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }

    /// Create a not found error with a specific message
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a uniqueness conflict error
    pub fn conflict(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Conflict {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// Create an internal server error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_)
            | Self::InvalidFilter(_)
            | Self::InvalidPath(_)
            | Self::InvalidValue(_)
            | Self::NoTarget(_)
            | Self::InvalidRequest { .. } => 400,
            Self::Unauthorized => 401,
            Self::Forbidden { .. } => 403,
            Self::ResourceNotFound { .. } | Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::Internal { .. } | Self::Configuration(_) => 500,
        }
    }

    /// RFC 7644 `scimType` keyword, for the 400 and 409 families.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::Validation(err) => Some(err.scim_type()),
            Self::InvalidFilter(_) => Some("invalidFilter"),
            Self::InvalidPath(_) => Some("invalidPath"),
            Self::InvalidValue(_) => Some("invalidValue"),
            Self::NoTarget(_) => Some("noTarget"),
            Self::InvalidRequest { .. } => Some("invalidSyntax"),
            Self::Conflict { .. } => Some("uniqueness"),
            _ => None,
        }
    }

    /// Client-facing `detail` text.
    ///
    /// Validation diagnostics pass through verbatim; authentication,
    /// configuration and internal failures never expose internals. Their
    /// cause is only logged.
    pub fn detail(&self) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Unauthorized => "Unauthorized".to_string(),
            Self::Configuration(_) => "Server configuration error".to_string(),
            Self::Internal { .. } => "Internal server error".to_string(),
            Self::Forbidden { message } | Self::NotFound { message } => message.clone(),
            Self::ResourceNotFound { resource_type, id } => {
                format!("{} {} not found", resource_type, id)
            }
            other => other.to_string(),
        }
    }
}

impl ValidationError {
    /// Create a missing required attribute error
    pub fn missing_required(attribute: impl Into<String>) -> Self {
        Self::MissingRequiredAttribute {
            attribute: attribute.into(),
        }
    }

    /// Create an invalid type error
    pub fn invalid_type(
        attribute: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidAttributeType {
            attribute: attribute.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a custom validation error
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom {
            message: message.into(),
        }
    }

    fn scim_type(&self) -> &'static str {
        match self {
            Self::ReadOnlyMutabilityViolation { .. } | Self::ImmutableMutabilityViolation { .. } => {
                "mutability"
            }
            Self::MissingSchemas | Self::MissingBaseSchema { .. } | Self::UnknownSchemaUri { .. } => {
                "invalidSyntax"
            }
            _ => "invalidValue",
        }
    }
}

// Result type aliases for convenience
pub type ScimResult<T> = Result<T, ScimError>;
pub type ValidationResult<T> = Result<T, ValidationError>;
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = ScimError::resource_not_found("User", "123");
        assert!(error.to_string().contains("User"));
        assert!(error.to_string().contains("123"));
        assert_eq!(error.status_code(), 404);
    }

    #[test]
    fn test_validation_error_is_bad_request_with_verbatim_detail() {
        let error = ScimError::from(ValidationError::missing_required("userName"));
        assert_eq!(error.status_code(), 400);
        assert_eq!(error.scim_type(), Some("invalidValue"));
        assert_eq!(error.detail(), "Required attribute 'userName' is missing");
    }

    #[test]
    fn test_mutability_scim_type() {
        let error = ScimError::from(ValidationError::ReadOnlyMutabilityViolation {
            attribute: "id".to_string(),
        });
        assert_eq!(error.scim_type(), Some("mutability"));
    }

    #[test]
    fn test_configuration_error_hides_detail() {
        let error = ScimError::from(ConfigurationError::MissingTenantField {
            tenant_id: "acme".to_string(),
            field: "audience",
        });
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.detail(), "Server configuration error");
        assert!(error.to_string().contains("audience"));
    }

    #[test]
    fn test_internal_error_hides_cause() {
        let error = ScimError::internal(
            "Failed to read identity providers for tenant 'acme': backend at 10.0.0.7 refused",
        );
        assert_eq!(error.status_code(), 500);
        assert_eq!(error.detail(), "Internal server error");
        assert!(error.to_string().contains("10.0.0.7"));
    }

    #[test]
    fn test_unauthorized_is_generic() {
        assert_eq!(ScimError::Unauthorized.status_code(), 401);
        assert_eq!(ScimError::Unauthorized.detail(), "Unauthorized");
        assert_eq!(ScimError::Unauthorized.scim_type(), None);
    }

    #[test]
    fn test_conflict_uses_uniqueness() {
        let error = ScimError::conflict("userName", "alice");
        assert_eq!(error.status_code(), 409);
        assert_eq!(error.scim_type(), Some("uniqueness"));
        assert_eq!(error.detail(), "userName 'alice' already exists");
    }
}
