//! SQL for the authorized list queries of a Postgres-backed store
//!
//! A `Store` implementation over Postgres builds its `get_authorized_*`
//! statements here. [`crate::InMemoryStore`] evaluates the same
//! [`PreparedAuthorized`] predicate against rows directly instead.

use auth_rbac::{PreparedAuthorized, SqlColumns};
use sqlx::{Postgres, QueryBuilder};

use crate::params::{GetTemplatesWithFilterParams, GetWorkspacesParams};

/// `SELECT` for `get_authorized_templates`: the caller's filters plus the
/// compiled policy predicate
pub fn authorized_templates_query(
    params: &GetTemplatesWithFilterParams,
    prepared: &dyn PreparedAuthorized,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM templates WHERE deleted = ");
    query.push_bind(params.deleted);

    if let Some(org) = params.organization_id {
        query.push(" AND organization_id = ");
        query.push_bind(org);
    }
    if let Some(ref name) = params.exact_name {
        query.push(" AND LOWER(name) = LOWER(");
        query.push_bind(name.clone());
        query.push(")");
    }
    if !params.ids.is_empty() {
        query.push(" AND id = ANY(");
        query.push_bind(params.ids.clone());
        query.push(")");
    }

    query.push(" AND ");
    prepared.push_sql(&mut query, &SqlColumns::TEMPLATES);
    query.push(" ORDER BY (name, id) ASC");
    query
}

/// `SELECT` for `get_authorized_workspaces`
pub fn authorized_workspaces_query(
    params: &GetWorkspacesParams,
    prepared: &dyn PreparedAuthorized,
) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM workspaces WHERE deleted = ");
    query.push_bind(params.deleted);

    if let Some(owner) = params.owner_id {
        query.push(" AND owner_id = ");
        query.push_bind(owner);
    }
    if let Some(org) = params.organization_id {
        query.push(" AND organization_id = ");
        query.push_bind(org);
    }
    if !params.template_ids.is_empty() {
        query.push(" AND template_id = ANY(");
        query.push_bind(params.template_ids.clone());
        query.push(")");
    }
    if let Some(ref name) = params.name {
        query.push(" AND name ILIKE ");
        query.push_bind(format!("%{name}%"));
    }

    query.push(" AND ");
    prepared.push_sql(&mut query, &SqlColumns::WORKSPACES);
    query.push(" ORDER BY (name, id) ASC");
    query
}
