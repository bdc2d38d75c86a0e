//! Authorization wrapper for the workspace control plane store
//!
//! [`AuthzQuerier`] sits between request handlers and the persistence layer.
//! It exposes the same [`database_layer::Store`] surface, but no row leaves
//! it and no mutation reaches the store until the caller's actor has been
//! checked against the right authorization object.
//!
//! # Key Features
//!
//! - **Actor context**: every call needs an actor attached with
//!   [`as_actor`]; without one it fails with `NoActor` before touching the
//!   store
//! - **Concealed denials**: a denied read returns the exact `NotFound` the
//!   store would return for a missing row
//! - **Related objects**: template versions, jobs, builds and logs are
//!   authorized through the template, workspace or group they belong to
//! - **Filtered listing**: list queries take a compiled predicate instead
//!   of checking rows one by one
//!
//! # Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use auth_rbac::{roles::ROLE_OWNER, Actor, RbacAuthorizer};
//! use authz_query::{as_actor, AuthzQuerier};
//! use database_layer::{Context, InMemoryStore, Store, Workspace};
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let querier = AuthzQuerier::new(InMemoryStore::new(), Arc::new(RbacAuthorizer::new()));
//! let ws = querier.store().seed(Workspace { id: Uuid::new_v4(), ..Default::default() });
//!
//! let stranger = as_actor(&Context::background(), Actor::new(Uuid::new_v4()));
//! let err = querier.get_workspace_by_id(&stranger, ws.id).await.unwrap_err();
//! assert!(err.is_not_found());
//!
//! let owner = as_actor(
//!     &Context::background(),
//!     Actor::new(Uuid::new_v4()).with_roles([ROLE_OWNER]),
//! );
//! assert_eq!(querier.get_workspace_by_id(&owner, ws.id).await.unwrap(), ws);
//! # }
//! ```

pub mod actor;
pub mod config;
pub mod payload;
pub mod querier;
pub mod resolver;
pub mod strategies;

pub use actor::{actor_from_context, as_actor};
pub use config::AuthzConfig;
pub use querier::AuthzQuerier;
pub use resolver::{Related, Resolver};
