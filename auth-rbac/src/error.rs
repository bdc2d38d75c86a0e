use thiserror::Error;
use uuid::Uuid;

use crate::models::{Action, ResourceType};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RbacError {
    #[error("unauthorized: actor {actor} cannot {action} {object}")]
    Unauthorized {
        actor: Uuid,
        action: Action,
        object: String,
    },

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("invalid role scope in {0:?}")]
    InvalidRoleScope(String),

    #[error("filter prepared for {expected} cannot evaluate a {actual} object")]
    ResourceTypeMismatch {
        expected: ResourceType,
        actual: ResourceType,
    },

    #[error("evaluation failed: {0}")]
    Evaluation(String),
}

impl RbacError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, RbacError::Unauthorized { .. })
    }
}

pub type Result<T> = std::result::Result<T, RbacError>;
