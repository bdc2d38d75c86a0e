//! Reusable authorization strategies
//!
//! Each strategy is a generic async function taking the store call(s) as
//! closures. They all follow the same shape: require an actor, resolve the
//! authorization object, check it, and only then let data out or issue the
//! mutation.

use auth_rbac::{Action, Authorizer, Object, Objecter, PreparedAuthorized, RbacError, ResourceType};
use database_layer::{Context, Record};
use error_common::{Error, Result};
use std::future::Future;
use tracing::debug;

use crate::actor::require_actor;

/// Evaluator handle plus logging switches, shared by every strategy
#[derive(Clone, Copy)]
pub struct Guard<'a> {
    pub authorizer: &'a dyn Authorizer,
    pub log_denials: bool,
}

impl<'a> Guard<'a> {
    pub fn new(authorizer: &'a dyn Authorizer, log_denials: bool) -> Self {
        Self {
            authorizer,
            log_denials,
        }
    }

    /// Check one action on one object. A denial is `Forbidden`; any other
    /// evaluator failure is a `Dependency` error.
    pub async fn authorize<O: Objecter + ?Sized>(
        &self,
        ctx: &Context,
        action: Action,
        object: &O,
    ) -> Result<()> {
        let actor = require_actor(ctx)?;
        let object = object.rbac_object();
        let decision = ctx
            .run(async {
                self.authorizer
                    .authorize(actor, action, &object)
                    .await
                    .map_err(|e| self.evaluator_error(e))
            })
            .await;
        if let Err(Error::Forbidden { ref internal_message }) = decision {
            if self.log_denials {
                debug!(actor = %actor.id, %action, %object, reason = %internal_message, "authorization denied");
            }
        }
        decision
    }

    /// Compile the policy for `resource_type` into a store-side predicate
    pub async fn prepare(
        &self,
        ctx: &Context,
        action: Action,
        resource_type: ResourceType,
    ) -> Result<Box<dyn PreparedAuthorized>> {
        let actor = require_actor(ctx)?;
        ctx.run(async {
            self.authorizer
                .prepare(actor, action, resource_type)
                .await
                .map_err(|e| {
                    let err = Error::dependency(format!("prepare sql filter: {e}"));
                    error_common::log_error("policy compilation", &err);
                    err
                })
        })
        .await
    }

    fn evaluator_error(&self, err: RbacError) -> Error {
        if err.is_unauthorized() {
            Error::forbidden(err.to_string())
        } else {
            let err = Error::dependency(format!("authorize: {err}"));
            error_common::log_error("policy evaluation", &err);
            err
        }
    }
}

/// Fetch a row that is its own authorization object and check `Read` on it
///
/// A denial is indistinguishable from the row not existing.
pub async fn authorized_fetch<T, F, Fut>(guard: Guard<'_>, ctx: &Context, fetch: F) -> Result<T>
where
    T: Objecter + Record,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    require_actor(ctx)?;
    let row = ctx.run(fetch()).await?;
    guard
        .authorize(ctx, Action::Read, &row)
        .await
        .map_err(|e| e.conceal_as_not_found(T::RESOURCE))?;
    Ok(row)
}

/// Fetch, then resolve a related object from the result and check it
///
/// `related` gets the fetched value; failures there name the relation
/// instead of looking like the primary row is missing.
pub async fn authorized_query_with_related<T, R, F, Fut, G, GFut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    fetch: F,
    related: G,
) -> Result<T>
where
    T: Record,
    R: Objecter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    G: FnOnce(&T) -> GFut,
    GFut: Future<Output = Result<R>>,
{
    require_actor(ctx)?;
    let value = ctx.run(fetch()).await?;
    let object = related(&value)
        .await
        .map_err(|e| e.in_relation(&format!("resolve {}", T::RESOURCE)))?;
    guard
        .authorize(ctx, action, &object)
        .await
        .map_err(|e| e.conceal_as_not_found(T::RESOURCE))?;
    Ok(value)
}

/// Check an object built from the insert arguments, then insert
pub async fn authorized_insert<T, F, Fut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    object: &Object,
    insert: F,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    require_actor(ctx)?;
    guard.authorize(ctx, action, object).await?;
    ctx.run(insert()).await
}

/// Fetch the current row, check `action` on it, then run `query`
///
/// Fetch errors propagate unchanged. A denial looks like the row is missing.
pub async fn authorized_fetch_and_query<T, U, F, Fut, Q, QFut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    fetch: F,
    query: Q,
) -> Result<U>
where
    T: Objecter + Record,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    Q: FnOnce() -> QFut,
    QFut: Future<Output = Result<U>>,
{
    require_actor(ctx)?;
    let row = ctx.run(fetch()).await?;
    guard
        .authorize(ctx, action, &row)
        .await
        .map_err(|e| e.conceal_as_not_found(T::RESOURCE))?;
    ctx.run(query()).await
}

pub async fn authorized_update<T, U, F, Fut, Q, QFut>(
    guard: Guard<'_>,
    ctx: &Context,
    fetch: F,
    update: Q,
) -> Result<U>
where
    T: Objecter + Record,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    Q: FnOnce() -> QFut,
    QFut: Future<Output = Result<U>>,
{
    authorized_fetch_and_query(guard, ctx, Action::Update, fetch, update).await
}

/// Soft or hard delete is the store's business; this only guards it
pub async fn authorized_delete<T, F, Fut, Q, QFut>(
    guard: Guard<'_>,
    ctx: &Context,
    fetch: F,
    delete: Q,
) -> Result<()>
where
    T: Objecter + Record,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    Q: FnOnce() -> QFut,
    QFut: Future<Output = Result<()>>,
{
    authorized_fetch_and_query(guard, ctx, Action::Delete, fetch, delete).await
}

/// Mutate a row whose authorization object is a related record
///
/// Like [`authorized_fetch_and_query`], except the checked object comes from
/// `related` rather than the fetched row itself.
pub async fn authorized_mutation_with_related<T, R, U, F, Fut, G, GFut, Q, QFut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    fetch: F,
    related: G,
    query: Q,
) -> Result<U>
where
    T: Record,
    R: Objecter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    G: FnOnce(&T) -> GFut,
    GFut: Future<Output = Result<R>>,
    Q: FnOnce() -> QFut,
    QFut: Future<Output = Result<U>>,
{
    require_actor(ctx)?;
    let row = ctx.run(fetch()).await?;
    let object = related(&row)
        .await
        .map_err(|e| e.in_relation(&format!("resolve {}", T::RESOURCE)))?;
    guard
        .authorize(ctx, action, &object)
        .await
        .map_err(|e| e.conceal_as_not_found(T::RESOURCE))?;
    ctx.run(query()).await
}

/// Compile a predicate for the caller and pass it to an authorized-list query
pub async fn prepare_sql_filter<T, Q, QFut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    resource_type: ResourceType,
    query: Q,
) -> Result<Vec<T>>
where
    Q: FnOnce(Box<dyn PreparedAuthorized>) -> QFut,
    QFut: Future<Output = Result<Vec<T>>>,
{
    let prepared = guard.prepare(ctx, action, resource_type).await?;
    ctx.run(query(prepared)).await
}

/// Fetch a bounded list and drop the rows the compiled predicate rejects
///
/// Only for queries whose result set is bounded by their arguments.
pub async fn fetch_with_post_filter<T, F, Fut>(
    guard: Guard<'_>,
    ctx: &Context,
    action: Action,
    resource_type: ResourceType,
    fetch: F,
) -> Result<Vec<T>>
where
    T: Objecter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let prepared = guard.prepare(ctx, action, resource_type).await?;
    let rows = ctx.run(fetch()).await?;
    let mut admitted = Vec::with_capacity(rows.len());
    for row in rows {
        match prepared.authorize(&row.rbac_object()) {
            Ok(()) => admitted.push(row),
            Err(e) if e.is_unauthorized() => {}
            Err(e) => return Err(Error::dependency(format!("post filter: {e}"))),
        }
    }
    Ok(admitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth_rbac::{Actor, RecordingAuthorizer};
    use database_layer::{Group, Workspace};
    use uuid::Uuid;

    fn ctx() -> Context {
        Context::background().with_actor(Actor::new(Uuid::new_v4()))
    }

    #[tokio::test]
    async fn fetch_denial_is_not_found() {
        let authz = RecordingAuthorizer::deny_all();
        let guard = Guard::new(&authz, true);
        let err = authorized_fetch(guard, &ctx(), || async { Ok(Workspace::default()) })
            .await
            .unwrap_err();
        assert_eq!(err, Error::not_found("workspace"));
    }

    #[tokio::test]
    async fn fetch_error_skips_the_check() {
        let authz = RecordingAuthorizer::allow_all();
        let guard = Guard::new(&authz, true);
        let err = authorized_fetch(guard, &ctx(), || async {
            Err::<Group, _>(Error::dependency("connection reset"))
        })
        .await
        .unwrap_err();
        assert_eq!(err, Error::dependency("connection reset"));
        assert!(authz.calls().is_empty());
    }

    #[tokio::test]
    async fn insert_denial_stays_forbidden() {
        let authz = RecordingAuthorizer::deny_all();
        let guard = Guard::new(&authz, false);
        let mut inserted = false;
        let err = authorized_insert(
            guard,
            &ctx(),
            Action::Create,
            &ResourceType::Group.in_org(Uuid::new_v4()),
            || {
                inserted = true;
                async { Ok(()) }
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Forbidden { .. }));
        assert!(!inserted);
    }

    #[tokio::test]
    async fn related_lookup_failure_names_the_relation() {
        let authz = RecordingAuthorizer::allow_all();
        let guard = Guard::new(&authz, true);
        let err = authorized_query_with_related(
            guard,
            &ctx(),
            Action::Read,
            || async { Ok(Vec::<Workspace>::new()) },
            |_| async { Err::<Group, _>(Error::not_found("group")) },
        )
        .await
        .unwrap_err();
        assert_eq!(
            err,
            Error::Dependency("resolve workspace: related group not found".into())
        );
    }

    #[tokio::test]
    async fn evaluator_failure_is_not_a_denial() {
        let mut mock = auth_rbac::MockAuthorizer::new();
        mock.expect_authorize()
            .times(1)
            .returning(|_, _, _| Err(RbacError::Evaluation("role store unreachable".into())));
        let guard = Guard::new(&mock, true);

        let err = authorized_fetch(guard, &ctx(), || async { Ok(Group::default()) })
            .await
            .unwrap_err();
        assert_eq!(
            err,
            Error::dependency("authorize: evaluation failed: role store unreachable")
        );
    }

    #[tokio::test]
    async fn no_actor_short_circuits_before_fetch() {
        let authz = RecordingAuthorizer::allow_all();
        let guard = Guard::new(&authz, true);
        let mut fetched = false;
        let err = authorized_fetch(guard, &Context::background(), || {
            fetched = true;
            async { Ok(Workspace::default()) }
        })
        .await
        .unwrap_err();
        assert_eq!(err, Error::NoActor);
        assert!(!fetched);
    }
}
