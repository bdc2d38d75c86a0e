//! Shared fixtures for the authorization wrapper tests
//!
//! Rows are seeded straight into the in-memory store so that setting up a
//! scenario never goes through (or is counted as) an authorized call.
#![allow(dead_code)]

use auth_rbac::{roles, Actor, RecordingAuthorizer};
use authz_query::{as_actor, AuthzConfig, AuthzQuerier};
use chrono::{Duration, Utc};
use database_layer::*;
use serde_json::json;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

pub struct Harness {
    pub querier: AuthzQuerier<InMemoryStore>,
    pub authz: Arc<RecordingAuthorizer>,
}

impl Harness {
    pub fn new(authz: RecordingAuthorizer) -> Self {
        Self::with_config(authz, AuthzConfig::default())
    }

    pub fn with_config(authz: RecordingAuthorizer, config: AuthzConfig) -> Self {
        init_tracing();
        let authz = Arc::new(authz);
        let querier = AuthzQuerier::with_config(InMemoryStore::new(), authz.clone(), config);
        Self { querier, authz }
    }

    pub fn allow_all() -> Self {
        Self::new(RecordingAuthorizer::allow_all())
    }

    pub fn deny_all() -> Self {
        Self::new(RecordingAuthorizer::deny_all())
    }

    /// Real role evaluation, still recording every check
    pub fn rbac() -> Self {
        Self::new(RecordingAuthorizer::rbac())
    }

    pub fn store(&self) -> &InMemoryStore {
        self.querier.store()
    }
}

pub fn ctx_for(actor: Actor) -> Context {
    as_actor(&Context::background(), actor)
}

/// Any actor; only meaningful with the fixed allow/deny authorizers
pub fn anyone() -> Context {
    ctx_for(Actor::new(Uuid::new_v4()))
}

pub fn site_owner() -> Actor {
    Actor::new(Uuid::new_v4()).with_roles([roles::ROLE_OWNER])
}

/// A plain member of `org`
pub fn org_member(org: Uuid) -> Actor {
    Actor::new(Uuid::new_v4()).with_roles([
        roles::ROLE_MEMBER.to_string(),
        roles::org_member_role_name(org),
    ])
}

pub fn org_admin(org: Uuid) -> Actor {
    Actor::new(Uuid::new_v4()).with_roles([
        roles::ROLE_MEMBER.to_string(),
        roles::org_admin_role_name(org),
    ])
}

// =============================================================================
// Record generators
// =============================================================================

pub fn template(store: &InMemoryStore, org: Uuid) -> Template {
    let id = Uuid::new_v4();
    store.seed(Template {
        id,
        organization_id: org,
        name: format!("tpl-{}", &id.simple().to_string()[..8]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        provisioner: "terraform".into(),
        allow_user_cancel_workspace_jobs: true,
        ..Default::default()
    })
}

pub fn template_version(store: &InMemoryStore, org: Uuid, template: Option<&Template>) -> TemplateVersion {
    let job = import_job(store, org);
    let id = Uuid::new_v4();
    store.seed(TemplateVersion {
        id,
        template_id: template.map(|t| t.id),
        organization_id: org,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        name: format!("v-{}", &id.simple().to_string()[..8]),
        job_id: job.id,
        ..Default::default()
    })
}

pub fn job(store: &InMemoryStore, org: Uuid, job_type: &str, input: serde_json::Value) -> ProvisionerJob {
    store.seed(ProvisionerJob {
        id: Uuid::new_v4(),
        organization_id: org,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        provisioner: "terraform".into(),
        job_type: job_type.into(),
        input,
        ..Default::default()
    })
}

pub fn import_job(store: &InMemoryStore, org: Uuid) -> ProvisionerJob {
    job(store, org, "template_version_import", json!({}))
}

pub fn dry_run_job(store: &InMemoryStore, version: &TemplateVersion) -> ProvisionerJob {
    job(
        store,
        version.organization_id,
        "template_version_dry_run",
        json!({ "template_version_id": version.id, "workspace_name": "dev" }),
    )
}

pub fn workspace(store: &InMemoryStore, owner: Uuid, template: &Template) -> Workspace {
    let id = Uuid::new_v4();
    store.seed(Workspace {
        id,
        owner_id: owner,
        organization_id: template.organization_id,
        template_id: template.id,
        name: format!("ws-{}", &id.simple().to_string()[..8]),
        created_at: Utc::now(),
        updated_at: Utc::now(),
        last_used_at: Utc::now(),
        ..Default::default()
    })
}

/// A build of `workspace` together with its provisioner job
pub fn build(
    store: &InMemoryStore,
    workspace: &Workspace,
    transition: WorkspaceTransition,
) -> (WorkspaceBuild, ProvisionerJob) {
    let job = job(
        store,
        workspace.organization_id,
        "workspace_build",
        json!({ "workspace_build_id": Uuid::new_v4() }),
    );
    let build = store.seed(WorkspaceBuild {
        id: Uuid::new_v4(),
        workspace_id: workspace.id,
        created_at: Utc::now() - Duration::minutes(1),
        updated_at: Utc::now(),
        build_number: 1,
        transition,
        initiator_id: workspace.owner_id,
        job_id: job.id,
        ..Default::default()
    });
    (build, job)
}

pub fn group(store: &InMemoryStore, org: Uuid, name: &str) -> Group {
    store.seed(Group {
        id: Uuid::new_v4(),
        name: name.into(),
        organization_id: org,
        ..Default::default()
    })
}

pub fn file(store: &InMemoryStore, creator: Uuid) -> File {
    store.seed(File {
        id: Uuid::new_v4(),
        hash: format!("{:x}", Uuid::new_v4().as_u128()),
        created_at: Utc::now(),
        created_by: creator,
        mimetype: "application/x-tar".into(),
        data: b"terraform".to_vec(),
    })
}
