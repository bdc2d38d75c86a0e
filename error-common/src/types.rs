use thiserror::Error;

/// Error shared by the persistence interface, the policy glue and the
/// authorization wrapper.
///
/// Every variant carries only owned strings so that errors can be compared
/// and cloned. In particular, an authorization denial that must look like a
/// missing row is built as the exact same `NotFound` value a store returns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The call context carries no actor
    #[error("no authorization actor in context")]
    NoActor,

    /// The policy denied the action
    ///
    /// The internal message is only for logs; it never appears in `Display`.
    #[error("forbidden")]
    Forbidden { internal_message: String },

    /// The requested row does not exist (or is not visible to the actor)
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Dispatch on a persisted discriminant hit a value we do not know
    #[error("unknown {field}: {value:?}")]
    UnknownDiscriminant { field: String, value: String },

    /// A collaborator (store, evaluator, related lookup) failed
    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// Corrupt persisted data or a broken internal assumption
    #[error("internal error: {0}")]
    Internal(String),

    #[error("operation canceled")]
    Canceled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Error {
    pub fn not_found(resource: impl Into<String>) -> Self {
        Error::NotFound {
            resource: resource.into(),
        }
    }

    pub fn forbidden(internal_message: impl Into<String>) -> Self {
        Error::Forbidden {
            internal_message: internal_message.into(),
        }
    }

    pub fn unknown_discriminant(field: impl Into<String>, value: impl Into<String>) -> Self {
        Error::UnknownDiscriminant {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn dependency(message: impl Into<String>) -> Self {
        Error::Dependency(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(message.into())
    }

    /// Replace a denial with the `NotFound` a store would report for
    /// `resource`. Any other error is returned unchanged.
    pub fn conceal_as_not_found(self, resource: &str) -> Self {
        match self {
            Error::Forbidden { .. } => Error::not_found(resource),
            other => other,
        }
    }

    /// Prefix a dependency-style message with what we were doing.
    ///
    /// `NotFound` of a related row becomes a `Dependency` error so it cannot be
    /// mistaken for the primary row being absent.
    pub fn in_relation(self, relation: &str) -> Self {
        match self {
            Error::NotFound { resource } => {
                Error::Dependency(format!("{relation}: related {resource} not found"))
            }
            Error::Dependency(msg) => Error::Dependency(format!("{relation}: {msg}")),
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Errors that indicate a programming or data bug rather than a
    /// transient condition. These must never be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::NoActor | Error::UnknownDiscriminant { .. } | Error::Internal(_)
        )
    }
}

/// Result type alias used across the control plane crates
pub type Result<T> = std::result::Result<T, Error>;

/// Log an error with its stable code attached
pub fn log_error(context: &str, error: &Error) {
    let report = crate::codes::ErrorReport::from(error);
    if error.is_fatal() {
        tracing::error!(context = context, code = report.code, error = %report.message, "control plane error");
    } else {
        tracing::debug!(context = context, code = report.code, error = %report.message, "control plane error");
    }
}
