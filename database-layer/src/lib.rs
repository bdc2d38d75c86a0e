//! Persistence layer of the workspace control plane
//!
//! This crate defines the record types the control plane stores, the
//! [`Store`] trait every persistence backend implements, and the
//! call-scoped [`Context`] that carries the caller's identity, cancellation
//! and deadline through every call.
//!
//! # Key Features
//!
//! - **Records**: templates, versions, provisioner jobs, workspaces, builds,
//!   groups and files, each naming itself for `NotFound` errors
//! - **Authorization objects**: every record that carries permissions
//!   implements `auth_rbac::Objecter`
//! - **Authorized listing**: `get_authorized_*` operations take a compiled
//!   policy predicate and apply it at the source, either in memory or as a
//!   SQL `WHERE` clause (see [`sql`])
//! - **In-memory backend**: [`InMemoryStore`] for tests and local runs
//!
//! # Example Usage
//!
//! ```rust
//! use database_layer::{Context, InMemoryStore, Store};
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = InMemoryStore::new();
//! let err = store
//!     .get_workspace_by_id(&Context::background(), Uuid::new_v4())
//!     .await
//!     .unwrap_err();
//! assert!(err.is_not_found());
//! # }
//! ```

pub mod context;
pub mod memory;
pub mod models;
pub mod objects;
pub mod params;
pub mod sql;
pub mod store;

pub use context::Context;
pub use memory::{InMemoryStore, Seed};
pub use models::*;
pub use params::*;
pub use store::Store;
