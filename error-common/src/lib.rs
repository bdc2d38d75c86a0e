//! Common error handling for the workspace control plane
//!
//! Every layer (persistence, policy glue, authorization wrapper) returns the
//! same [`Error`] type. This is what lets the authorization wrapper hand back
//! a denial that is byte-for-byte the `NotFound` a store would have produced,
//! so callers cannot probe for the existence of rows they may not read.
//!
//! # Error Categories
//!
//! - **NoActor**: the call context carries no identity (fatal)
//! - **Forbidden**: policy denial; the display form never includes details
//! - **NotFound**: row absent, or concealed denial
//! - **UnknownDiscriminant**: polymorphic dispatch hit an unknown kind (fatal)
//! - **Dependency**: a store, evaluator or related lookup failed
//!
//! # Example
//!
//! ```rust
//! use error_common::{Error, ErrorReport};
//!
//! let err = Error::forbidden("actor cannot read").conceal_as_not_found("template");
//! assert_eq!(err, Error::not_found("template"));
//! assert_eq!(ErrorReport::from(&err).code, "DATA_4001");
//! ```

pub mod codes;
pub mod types;

pub use codes::*;
pub use types::*;
