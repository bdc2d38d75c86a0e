use sqlx::{Postgres, QueryBuilder};
use std::collections::BTreeSet;
use std::fmt::Debug;
use uuid::Uuid;

use crate::{
    error::{RbacError, Result},
    models::{Action, Actor, Object, ResourceType},
    roles::Role,
};

/// Column names a SQL store exposes for filter compilation
///
/// `None` means the table has no such column and the matching rule can never
/// admit a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlColumns {
    pub owner: Option<&'static str>,
    pub org: Option<&'static str>,
    pub user_acl: Option<&'static str>,
    pub group_acl: Option<&'static str>,
}

impl SqlColumns {
    pub const TEMPLATES: SqlColumns = SqlColumns {
        owner: None,
        org: Some("organization_id"),
        user_acl: Some("user_acl"),
        group_acl: Some("group_acl"),
    };

    pub const WORKSPACES: SqlColumns = SqlColumns {
        owner: Some("owner_id"),
        org: Some("organization_id"),
        user_acl: None,
        group_acl: None,
    };
}

/// A policy decision compiled for one (actor, action, resource type)
///
/// Stores either evaluate it row by row or splice it into a `WHERE` clause.
/// Both forms must admit exactly the same rows.
pub trait PreparedAuthorized: Send + Sync + Debug {
    fn authorize(&self, object: &Object) -> Result<()>;

    fn push_sql<'a>(&self, builder: &mut QueryBuilder<'a, Postgres>, columns: &SqlColumns);
}

/// Compiled form of the `RbacAuthorizer` rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RbacFilter {
    resource_type: ResourceType,
    action: Action,
    actor_id: Uuid,
    groups: Vec<Uuid>,
    site_allowed: bool,
    /// Organizations where a role grants the action outright
    orgs: BTreeSet<Uuid>,
    /// A role grants the action on objects the actor owns
    user_allowed: bool,
    member_orgs: BTreeSet<Uuid>,
}

impl RbacFilter {
    pub(crate) fn compile(
        roles: &[Role],
        actor: &Actor,
        action: Action,
        resource_type: ResourceType,
    ) -> Self {
        let member_orgs: BTreeSet<Uuid> = roles.iter().flat_map(Role::orgs).collect();
        let orgs = member_orgs
            .iter()
            .copied()
            .filter(|org| roles.iter().any(|r| r.org_grants(*org, resource_type, action)))
            .collect();

        Self {
            resource_type,
            action,
            actor_id: actor.id,
            groups: actor.groups.clone(),
            site_allowed: roles.iter().any(|r| r.site_grants(resource_type, action)),
            orgs,
            user_allowed: roles.iter().any(|r| r.user_grants(resource_type, action)),
            member_orgs,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    fn admits(&self, object: &Object) -> bool {
        if self.site_allowed {
            return true;
        }
        if object.org_id.is_some_and(|org| self.orgs.contains(&org)) {
            return true;
        }
        if self.user_allowed && object.owner == Some(self.actor_id) {
            let member = object
                .org_id
                .map_or(true, |org| self.member_orgs.contains(&org));
            if member {
                return true;
            }
        }
        if object
            .acl_user_list
            .get(&self.actor_id)
            .is_some_and(|actions| actions.contains(&self.action))
        {
            return true;
        }
        self.groups.iter().any(|g| {
            object
                .acl_group_list
                .get(g)
                .is_some_and(|actions| actions.contains(&self.action))
        })
    }
}

impl PreparedAuthorized for RbacFilter {
    fn authorize(&self, object: &Object) -> Result<()> {
        if object.resource_type != self.resource_type {
            return Err(RbacError::ResourceTypeMismatch {
                expected: self.resource_type,
                actual: object.resource_type,
            });
        }
        if self.admits(object) {
            Ok(())
        } else {
            Err(RbacError::Unauthorized {
                actor: self.actor_id,
                action: self.action,
                object: object.to_string(),
            })
        }
    }

    fn push_sql<'a>(&self, builder: &mut QueryBuilder<'a, Postgres>, columns: &SqlColumns) {
        if self.site_allowed {
            builder.push("TRUE");
            return;
        }

        let mut any = false;
        builder.push("(");

        if let Some(org_col) = columns.org.filter(|_| !self.orgs.is_empty()) {
            separate(builder, &mut any);
            builder.push(org_col).push(" = ANY(");
            builder.push_bind(self.orgs.iter().copied().collect::<Vec<Uuid>>());
            builder.push(")");
        }

        if let Some(owner_col) = columns.owner.filter(|_| self.user_allowed) {
            separate(builder, &mut any);
            builder.push("(").push(owner_col).push(" = ");
            builder.push_bind(self.actor_id);
            if let Some(org_col) = columns.org {
                builder
                    .push(" AND (")
                    .push(org_col)
                    .push(" IS NULL OR ")
                    .push(org_col)
                    .push(" = ANY(");
                builder.push_bind(self.member_orgs.iter().copied().collect::<Vec<Uuid>>());
                builder.push("))");
            }
            builder.push(")");
        }

        if let Some(acl_col) = columns.user_acl {
            separate(builder, &mut any);
            builder.push("(").push(acl_col).push(" -> ");
            builder.push_bind(self.actor_id.to_string());
            builder.push(") ? ");
            builder.push_bind(self.action.as_str());
        }

        if let Some(acl_col) = columns.group_acl.filter(|_| !self.groups.is_empty()) {
            separate(builder, &mut any);
            builder
                .push("EXISTS(SELECT 1 FROM jsonb_each(")
                .push(acl_col)
                .push(") AS g(key, value) WHERE g.key = ANY(");
            builder.push_bind(self.groups.iter().map(Uuid::to_string).collect::<Vec<_>>());
            builder.push(") AND g.value ? ");
            builder.push_bind(self.action.as_str());
            builder.push(")");
        }

        if !any {
            builder.push("FALSE");
        }
        builder.push(")");
    }
}

fn separate(builder: &mut QueryBuilder<'_, Postgres>, any: &mut bool) {
    if *any {
        builder.push(" OR ");
    }
    *any = true;
}
