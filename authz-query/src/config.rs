use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use error_common::{Error, Result};

/// Authorization wrapper configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AuthzConfig {
    /// Roles that may cancel workspace-build jobs on templates that disallow
    /// user cancellation (default: `["owner"]`)
    #[serde(default = "default_cancel_override_roles")]
    pub cancel_override_roles: Vec<String>,

    /// Log every denial at debug level (default: true)
    #[serde(default = "default_log_denials")]
    pub log_denials: bool,
}

fn default_cancel_override_roles() -> Vec<String> {
    vec![auth_rbac::roles::ROLE_OWNER.to_string()]
}

fn default_log_denials() -> bool {
    true
}

impl Default for AuthzConfig {
    fn default() -> Self {
        Self {
            cancel_override_roles: default_cancel_override_roles(),
            log_denials: default_log_denials(),
        }
    }
}

impl AuthzConfig {
    /// Load from an optional file, overridden by `AUTHZ_*` environment
    /// variables (`AUTHZ_CANCEL_OVERRIDE_ROLES=owner,template-admin`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        builder
            .add_source(
                Environment::with_prefix("AUTHZ")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cancel_override_roles"),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| Error::InvalidInput(format!("authz config: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_serde_defaults() {
        let parsed: AuthzConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AuthzConfig::default());
        assert_eq!(parsed.cancel_override_roles, vec!["owner".to_string()]);
        assert!(parsed.log_denials);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = AuthzConfig::load(Some(Path::new("/nonexistent/authz.toml"))).unwrap();
        assert_eq!(cfg.log_denials, AuthzConfig::default().log_denials);
    }
}
