//! Per-tenant configuration.

use crate::error::{ConfigurationError, ConfigurationResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MANAGED_ROLE: &str = "scim-managed";

/// Tenant configuration as it appears in the server configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantSettings {
    pub id: String,
    #[serde(default)]
    pub auth: TenantAuthSettings,
    /// Link users to the tenant's identity providers by email domain
    #[serde(default = "default_link_idp")]
    pub link_idp: bool,
    #[serde(default)]
    pub email_as_username: bool,
    /// Directory role marking users owned by this provisioning surface
    #[serde(default = "default_managed_role")]
    pub managed_role: String,
}

fn default_link_idp() -> bool {
    true
}

fn default_managed_role() -> String {
    DEFAULT_MANAGED_ROLE.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantAuthSettings {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub audience: Option<String>,
}

/// How bearer tokens for a tenant are verified.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Tokens from an external issuer, verified against its JWKS
    #[default]
    ExternalIssuer,
    /// Tokens minted by the hosting directory itself; not supported
    DirectoryNative,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ExternalIssuer => "external-issuer",
            AuthMode::DirectoryNative => "directory-native",
        }
    }
}

/// Resolved external-issuer settings. `"*"` in `issuer` or `audience`
/// disables that check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalAuthConfig {
    pub issuer: String,
    pub jwks_uri: String,
    pub audience: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantAuth {
    ExternalIssuer(ExternalAuthConfig),
    DirectoryNative,
}

impl TenantSettings {
    /// Settings for an external-issuer tenant with default flags.
    pub fn external(
        id: impl Into<String>,
        issuer: impl Into<String>,
        jwks_uri: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            auth: TenantAuthSettings {
                mode: AuthMode::ExternalIssuer,
                issuer: Some(issuer.into()),
                jwks_uri: Some(jwks_uri.into()),
                audience: Some(audience.into()),
            },
            link_idp: default_link_idp(),
            email_as_username: false,
            managed_role: default_managed_role(),
        }
    }

    /// Validate and resolve the authentication settings.
    ///
    /// Missing external-issuer fields fail here, naming the field, before any
    /// token is looked at.
    pub fn resolve_auth(&self) -> ConfigurationResult<TenantAuth> {
        if self.id.trim().is_empty() {
            return Err(ConfigurationError::MissingTenantField {
                tenant_id: self.id.clone(),
                field: "id",
            });
        }
        if self.managed_role.trim().is_empty() {
            return Err(ConfigurationError::InvalidTenantField {
                tenant_id: self.id.clone(),
                field: "managedRole",
                message: "must not be empty".to_string(),
            });
        }

        match self.auth.mode {
            AuthMode::DirectoryNative => Ok(TenantAuth::DirectoryNative),
            AuthMode::ExternalIssuer => {
                let issuer = self.required("issuer", &self.auth.issuer)?;
                let jwks_uri = self.required("jwksUri", &self.auth.jwks_uri)?;
                let audience = self.required("audience", &self.auth.audience)?;

                if !(jwks_uri.starts_with("https://") || jwks_uri.starts_with("http://")) {
                    return Err(ConfigurationError::InvalidTenantField {
                        tenant_id: self.id.clone(),
                        field: "jwksUri",
                        message: format!("'{}' is not an http(s) URL", jwks_uri),
                    });
                }

                Ok(TenantAuth::ExternalIssuer(ExternalAuthConfig {
                    issuer,
                    jwks_uri,
                    audience,
                }))
            }
        }
    }

    fn required(&self, field: &'static str, value: &Option<String>) -> ConfigurationResult<String> {
        value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ConfigurationError::MissingTenantField {
                tenant_id: self.id.clone(),
                field,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_from_json() {
        let settings: TenantSettings = serde_json::from_value(json!({
            "id": "acme",
            "auth": {
                "issuer": "https://idp.example.com",
                "jwksUri": "https://idp.example.com/keys",
                "audience": "scim"
            }
        }))
        .unwrap();

        assert_eq!(settings.auth.mode, AuthMode::ExternalIssuer);
        assert!(settings.link_idp);
        assert!(!settings.email_as_username);
        assert_eq!(settings.managed_role, DEFAULT_MANAGED_ROLE);
        assert!(matches!(
            settings.resolve_auth().unwrap(),
            TenantAuth::ExternalIssuer(_)
        ));
    }

    #[test]
    fn test_missing_fields_are_named() {
        for (field, name) in [("issuer", "issuer"), ("jwksUri", "jwksUri"), ("audience", "audience")] {
            let mut auth = json!({
                "issuer": "https://idp.example.com",
                "jwksUri": "https://idp.example.com/keys",
                "audience": "scim"
            });
            auth.as_object_mut().unwrap().remove(field);
            let settings: TenantSettings =
                serde_json::from_value(json!({"id": "acme", "auth": auth})).unwrap();

            match settings.resolve_auth() {
                Err(ConfigurationError::MissingTenantField { tenant_id, field }) => {
                    assert_eq!(tenant_id, "acme");
                    assert_eq!(field, name);
                }
                other => panic!("expected missing field, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_blank_field_counts_as_missing() {
        let settings = TenantSettings::external("acme", "  ", "https://k", "aud");
        assert!(matches!(
            settings.resolve_auth(),
            Err(ConfigurationError::MissingTenantField { field: "issuer", .. })
        ));
    }

    #[test]
    fn test_jwks_uri_must_be_http() {
        let settings = TenantSettings::external("acme", "iss", "file:///keys", "aud");
        assert!(matches!(
            settings.resolve_auth(),
            Err(ConfigurationError::InvalidTenantField { field: "jwksUri", .. })
        ));
    }

    #[test]
    fn test_directory_native_mode_parses() {
        let settings: TenantSettings = serde_json::from_value(json!({
            "id": "native",
            "auth": {"mode": "directory-native"}
        }))
        .unwrap();
        assert_eq!(settings.resolve_auth().unwrap(), TenantAuth::DirectoryNative);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result: Result<TenantSettings, _> = serde_json::from_value(json!({
            "id": "x",
            "auth": {"mode": "magic"}
        }));
        assert!(result.is_err());
    }
}
