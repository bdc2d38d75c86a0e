use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{
    check::RbacAuthorizer,
    engine::Authorizer,
    error::{RbacError, Result},
    models::{Action, Actor, Object, ResourceType},
    prepared::PreparedAuthorized,
};

/// One recorded `authorize` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub action: Action,
    pub object: Object,
}

/// Wraps another authorizer and records every `authorize` call
///
/// Used by test suites that assert which checks an operation performs.
/// `prepare` calls are recorded separately.
pub struct RecordingAuthorizer {
    inner: Arc<dyn Authorizer>,
    calls: Mutex<Vec<RecordedCall>>,
    prepared: Mutex<Vec<(Action, ResourceType)>>,
}

impl RecordingAuthorizer {
    pub fn new(inner: Arc<dyn Authorizer>) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            prepared: Mutex::new(Vec::new()),
        }
    }

    /// Records calls and allows every one of them
    pub fn allow_all() -> Self {
        Self::new(Arc::new(FixedAuthorizer { allow: true }))
    }

    /// Records calls and denies every one of them
    pub fn deny_all() -> Self {
        Self::new(Arc::new(FixedAuthorizer { allow: false }))
    }

    pub fn rbac() -> Self {
        Self::new(Arc::new(RbacAuthorizer::new()))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn prepared(&self) -> Vec<(Action, ResourceType)> {
        self.prepared.lock().clone()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
        self.prepared.lock().clear();
    }

    /// The exact sequence of (action, object) pairs checked since the last reset
    pub fn checked(&self) -> Vec<(Action, Object)> {
        self.calls
            .lock()
            .iter()
            .map(|c| (c.action, c.object.clone()))
            .collect()
    }
}

#[async_trait]
impl Authorizer for RecordingAuthorizer {
    async fn authorize(&self, actor: &Actor, action: Action, object: &Object) -> Result<()> {
        self.calls.lock().push(RecordedCall {
            action,
            object: object.clone(),
        });
        self.inner.authorize(actor, action, object).await
    }

    async fn prepare(
        &self,
        actor: &Actor,
        action: Action,
        resource_type: ResourceType,
    ) -> Result<Box<dyn PreparedAuthorized>> {
        self.prepared.lock().push((action, resource_type));
        self.inner.prepare(actor, action, resource_type).await
    }
}

struct FixedAuthorizer {
    allow: bool,
}

#[derive(Debug)]
struct FixedFilter {
    allow: bool,
    actor: uuid::Uuid,
    action: Action,
}

impl PreparedAuthorized for FixedFilter {
    fn authorize(&self, object: &Object) -> Result<()> {
        if self.allow {
            Ok(())
        } else {
            Err(RbacError::Unauthorized {
                actor: self.actor,
                action: self.action,
                object: object.to_string(),
            })
        }
    }

    fn push_sql<'a>(
        &self,
        builder: &mut sqlx::QueryBuilder<'a, sqlx::Postgres>,
        _columns: &crate::prepared::SqlColumns,
    ) {
        builder.push(if self.allow { "TRUE" } else { "FALSE" });
    }
}

#[async_trait]
impl Authorizer for FixedAuthorizer {
    async fn authorize(&self, actor: &Actor, action: Action, object: &Object) -> Result<()> {
        if self.allow {
            Ok(())
        } else {
            Err(RbacError::Unauthorized {
                actor: actor.id,
                action,
                object: object.to_string(),
            })
        }
    }

    async fn prepare(
        &self,
        actor: &Actor,
        action: Action,
        _resource_type: ResourceType,
    ) -> Result<Box<dyn PreparedAuthorized>> {
        Ok(Box::new(FixedFilter {
            allow: self.allow,
            actor: actor.id,
            action,
        }))
    }
}
