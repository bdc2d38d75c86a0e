// Stable error codes for the control plane
use serde::Serialize;

use crate::types::Error;

pub mod authentication {
    pub const NO_ACTOR: &str = "AUTH_2001";
}

pub mod authorization {
    pub const ACCESS_DENIED: &str = "AUTHZ_3001";
}

pub mod data {
    pub const NOT_FOUND: &str = "DATA_4001";
    pub const UNKNOWN_DISCRIMINANT: &str = "DATA_4002";
    pub const CONFLICT: &str = "DATA_4003";
    pub const INVALID_INPUT: &str = "DATA_4004";
}

pub mod system {
    pub const DEPENDENCY_FAILURE: &str = "SYS_5001";
    pub const INTERNAL: &str = "SYS_5002";
    pub const CANCELED: &str = "SYS_5003";
    pub const DEADLINE_EXCEEDED: &str = "SYS_5004";
}

/// Map an error to its stable code
pub fn code_for(error: &Error) -> &'static str {
    match error {
        Error::NoActor => authentication::NO_ACTOR,
        Error::Forbidden { .. } => authorization::ACCESS_DENIED,
        Error::NotFound { .. } => data::NOT_FOUND,
        Error::UnknownDiscriminant { .. } => data::UNKNOWN_DISCRIMINANT,
        Error::Conflict(_) => data::CONFLICT,
        Error::InvalidInput(_) => data::INVALID_INPUT,
        Error::Dependency(_) => system::DEPENDENCY_FAILURE,
        Error::Internal(_) => system::INTERNAL,
        Error::Canceled => system::CANCELED,
        Error::DeadlineExceeded => system::DEADLINE_EXCEEDED,
    }
}

/// Caller-facing view of an error: a code plus the public message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub code: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(error: &Error) -> Self {
        Self {
            code: code_for(error),
            message: error.to_string(),
        }
    }
}
