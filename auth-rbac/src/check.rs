use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

use crate::{
    error::{RbacError, Result},
    models::{Action, Actor, Object},
    prepared::RbacFilter,
    roles::{role_by_name, Role},
    ResourceType,
};

/// Reference policy evaluator over the built-in roles
///
/// An action on an object is allowed when any of these hold:
/// 1. one of the actor's roles grants it site-wide
/// 2. one of the actor's roles grants it in the object's organization
/// 3. the actor owns the object, is a member of the object's organization
///    (or the object has none), and a role grants it at user level
/// 4. the object's user ACL lists the actor with the action
/// 5. the object's group ACL lists one of the actor's groups with the action
#[derive(Debug, Default)]
pub struct RbacAuthorizer {
    custom_roles: RwLock<HashMap<String, Role>>,
}

impl RbacAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role that shadows any built-in role of the same name
    pub fn with_role(self, role: Role) -> Self {
        self.add_role(role);
        self
    }

    pub fn add_role(&self, role: Role) {
        self.custom_roles.write().insert(role.name.clone(), role);
    }

    pub(crate) fn roles_for(&self, actor: &Actor) -> Result<Vec<Role>> {
        let custom = self.custom_roles.read();
        actor
            .roles
            .iter()
            .map(|name| match custom.get(name) {
                Some(role) => Ok(role.clone()),
                None => role_by_name(name),
            })
            .collect()
    }

    /// Synchronous decision used by the async `Authorizer` impl
    pub fn check(&self, actor: &Actor, action: Action, object: &Object) -> Result<()> {
        let roles = self.roles_for(actor)?;
        if allowed(&roles, actor, action, object) {
            debug!(actor = %actor.id, %action, %object, "rbac allow");
            Ok(())
        } else {
            Err(RbacError::Unauthorized {
                actor: actor.id,
                action,
                object: object.to_string(),
            })
        }
    }

    /// Compile the decision for every object of one resource type
    pub fn compile(
        &self,
        actor: &Actor,
        action: Action,
        resource_type: ResourceType,
    ) -> Result<RbacFilter> {
        let roles = self.roles_for(actor)?;
        Ok(RbacFilter::compile(&roles, actor, action, resource_type))
    }
}

pub(crate) fn allowed(roles: &[Role], actor: &Actor, action: Action, object: &Object) -> bool {
    let rt = object.resource_type;

    if roles.iter().any(|r| r.site_grants(rt, action)) {
        return true;
    }

    if let Some(org) = object.org_id {
        if roles.iter().any(|r| r.org_grants(org, rt, action)) {
            return true;
        }
    }

    if object.owner == Some(actor.id) {
        let member = match object.org_id {
            None => true,
            Some(org) => roles.iter().any(|r| r.org.contains_key(&org)),
        };
        if member && roles.iter().any(|r| r.user_grants(rt, action)) {
            return true;
        }
    }

    object.acl_grants(actor, action)
}
