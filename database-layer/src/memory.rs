use async_trait::async_trait;
use auth_rbac::{Object, Objecter, PreparedAuthorized};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use error_common::{Error, Result};
use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use tracing::debug;
use uuid::Uuid;

use crate::context::Context;
use crate::models::*;
use crate::params::*;
use crate::store::Store;

/// `Store` backed by concurrent hash maps
///
/// Used by tests and local development. Every call is counted so tests can
/// assert that a denied or actor-less call never reached persistence.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    templates: DashMap<Uuid, Template>,
    template_versions: DashMap<Uuid, TemplateVersion>,
    template_version_parameters: DashMap<(Uuid, String), TemplateVersionParameter>,
    provisioner_jobs: DashMap<Uuid, ProvisionerJob>,
    provisioner_job_logs: DashMap<i64, ProvisionerJobLog>,
    workspaces: DashMap<Uuid, Workspace>,
    workspace_builds: DashMap<Uuid, WorkspaceBuild>,
    groups: DashMap<Uuid, Group>,
    group_members: DashMap<(Uuid, Uuid), GroupMember>,
    files: DashMap<Uuid, File>,
    next_log_id: AtomicI64,
    calls: AtomicUsize,
}

/// Rows that can be written straight into an [`InMemoryStore`], bypassing
/// the insert operations and their validation
pub trait Seed: Clone {
    fn seed_into(self, store: &InMemoryStore);
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `Store` calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn reset_call_count(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    /// Write a row as-is and hand it back
    pub fn seed<T: Seed>(&self, row: T) -> T {
        row.clone().seed_into(self);
        row
    }

    fn enter(&self, ctx: &Context, op: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        debug!(op, "memory store call");
        ctx.check()
    }
}

impl Seed for Template {
    fn seed_into(self, store: &InMemoryStore) {
        store.templates.insert(self.id, self);
    }
}

impl Seed for TemplateVersion {
    fn seed_into(self, store: &InMemoryStore) {
        store.template_versions.insert(self.id, self);
    }
}

impl Seed for TemplateVersionParameter {
    fn seed_into(self, store: &InMemoryStore) {
        store
            .template_version_parameters
            .insert((self.template_version_id, self.name.clone()), self);
    }
}

impl Seed for ProvisionerJob {
    fn seed_into(self, store: &InMemoryStore) {
        store.provisioner_jobs.insert(self.id, self);
    }
}

impl Seed for ProvisionerJobLog {
    fn seed_into(self, store: &InMemoryStore) {
        store.next_log_id.fetch_max(self.id, Ordering::SeqCst);
        store.provisioner_job_logs.insert(self.id, self);
    }
}

impl Seed for Workspace {
    fn seed_into(self, store: &InMemoryStore) {
        store.workspaces.insert(self.id, self);
    }
}

impl Seed for WorkspaceBuild {
    fn seed_into(self, store: &InMemoryStore) {
        store.workspace_builds.insert(self.id, self);
    }
}

impl Seed for Group {
    fn seed_into(self, store: &InMemoryStore) {
        store.groups.insert(self.id, self);
    }
}

impl Seed for GroupMember {
    fn seed_into(self, store: &InMemoryStore) {
        store
            .group_members
            .insert((self.group_id, self.user_id), self);
    }
}

impl Seed for File {
    fn seed_into(self, store: &InMemoryStore) {
        store.files.insert(self.id, self);
    }
}

// =============================================================================
// Table helpers
// =============================================================================

fn get<K, T>(table: &DashMap<K, T>, key: &K) -> Result<T>
where
    K: Eq + Hash,
    T: Clone + Record,
{
    table
        .get(key)
        .map(|row| row.value().clone())
        .ok_or_else(|| Error::not_found(T::RESOURCE))
}

fn find<K, T, F>(table: &DashMap<K, T>, pred: F) -> Result<T>
where
    K: Eq + Hash,
    T: Clone + Record,
    F: Fn(&T) -> bool,
{
    table
        .iter()
        .find(|row| pred(row.value()))
        .map(|row| row.value().clone())
        .ok_or_else(|| Error::not_found(T::RESOURCE))
}

fn filter<K, T, F>(table: &DashMap<K, T>, pred: F) -> Vec<T>
where
    K: Eq + Hash,
    T: Clone,
    F: Fn(&T) -> bool,
{
    table
        .iter()
        .filter(|row| pred(row.value()))
        .map(|row| row.value().clone())
        .collect()
}

fn insert<K, T>(table: &DashMap<K, T>, key: K, row: T) -> Result<T>
where
    K: Eq + Hash,
    T: Clone + Record,
{
    match table.entry(key) {
        Entry::Occupied(_) => Err(Error::Conflict(format!("{} already exists", T::RESOURCE))),
        Entry::Vacant(slot) => {
            slot.insert(row.clone());
            Ok(row)
        }
    }
}

fn update<K, T, F>(table: &DashMap<K, T>, key: &K, apply: F) -> Result<T>
where
    K: Eq + Hash,
    T: Clone + Record,
    F: FnOnce(&mut T),
{
    let mut row = table
        .get_mut(key)
        .ok_or_else(|| Error::not_found(T::RESOURCE))?;
    apply(row.value_mut());
    Ok(row.value().clone())
}

/// Keep the rows a compiled filter admits
fn admitted<T: Objecter>(rows: Vec<T>, prepared: &dyn PreparedAuthorized) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if admits(prepared, &row.rbac_object())? {
            out.push(row);
        }
    }
    Ok(out)
}

fn admits(prepared: &dyn PreparedAuthorized, object: &Object) -> Result<bool> {
    match prepared.authorize(object) {
        Ok(()) => Ok(true),
        Err(e) if e.is_unauthorized() => Ok(false),
        Err(e) => Err(Error::dependency(format!("evaluate prepared filter: {e}"))),
    }
}

fn median_ms(mut samples: Vec<i64>) -> f64 {
    if samples.is_empty() {
        return -1.0;
    }
    samples.sort_unstable();
    let mid = samples.len() / 2;
    let upper = samples.get(mid).copied().unwrap_or_default() as f64;
    if samples.len() % 2 == 1 {
        upper
    } else {
        let lower = samples.get(mid - 1).copied().unwrap_or_default() as f64;
        (lower + upper) / 2.0
    }
}

impl InMemoryStore {
    fn templates_matching(&self, params: &GetTemplatesWithFilterParams) -> Vec<Template> {
        let mut rows = filter(&self.templates, |t| {
            t.deleted == params.deleted
                && params.organization_id.map_or(true, |org| t.organization_id == org)
                && params
                    .exact_name
                    .as_ref()
                    .map_or(true, |name| t.name.eq_ignore_ascii_case(name))
                && (params.ids.is_empty() || params.ids.contains(&t.id))
        });
        rows.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        rows
    }

    fn workspaces_matching(&self, params: &GetWorkspacesParams) -> Vec<Workspace> {
        let needle = params.name.as_ref().map(|n| n.to_lowercase());
        let mut rows = filter(&self.workspaces, |w| {
            w.deleted == params.deleted
                && params.owner_id.map_or(true, |owner| w.owner_id == owner)
                && params
                    .organization_id
                    .map_or(true, |org| w.organization_id == org)
                && (params.template_ids.is_empty() || params.template_ids.contains(&w.template_id))
                && needle
                    .as_ref()
                    .map_or(true, |n| w.name.to_lowercase().contains(n.as_str()))
        });
        rows.sort_by(|a, b| (&a.name, a.id).cmp(&(&b.name, b.id)));
        rows
    }

    fn build_durations_ms(
        &self,
        template_id: Option<Uuid>,
        since: DateTime<Utc>,
        transition: WorkspaceTransition,
    ) -> Vec<i64> {
        filter(&self.workspace_builds, |b| {
            b.transition == transition && b.created_at >= since
        })
        .into_iter()
        .filter(|b| match template_id {
            None => true,
            Some(id) => self
                .template_versions
                .get(&b.template_version_id)
                .is_some_and(|tv| tv.template_id == Some(id)),
        })
        .filter_map(|b| {
            let job = self.provisioner_jobs.get(&b.job_id)?;
            let started = job.started_at?;
            let completed = job.completed_at?;
            if job.canceled_at.is_some() || job.error.is_some() {
                return None;
            }
            Some((completed - started).num_milliseconds())
        })
        .collect()
    }
}

// =============================================================================
// Store implementation
// =============================================================================

#[async_trait]
impl Store for InMemoryStore {
    async fn get_template_by_id(&self, ctx: &Context, id: Uuid) -> Result<Template> {
        self.enter(ctx, "get_template_by_id")?;
        get(&self.templates, &id)
    }

    async fn get_template_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateByOrganizationAndNameParams,
    ) -> Result<Template> {
        self.enter(ctx, "get_template_by_organization_and_name")?;
        find(&self.templates, |t| {
            t.organization_id == params.organization_id
                && t.deleted == params.deleted
                && t.name.eq_ignore_ascii_case(&params.name)
        })
    }

    async fn get_templates(&self, ctx: &Context) -> Result<Vec<Template>> {
        self.enter(ctx, "get_templates")?;
        let mut rows = filter(&self.templates, |_| true);
        rows.sort_by_key(|t| t.id);
        Ok(rows)
    }

    async fn get_templates_with_filter(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
    ) -> Result<Vec<Template>> {
        self.enter(ctx, "get_templates_with_filter")?;
        Ok(self.templates_matching(&params))
    }

    async fn get_authorized_templates(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
        prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Template>> {
        self.enter(ctx, "get_authorized_templates")?;
        admitted(self.templates_matching(&params), prepared)
    }

    async fn insert_template(
        &self,
        ctx: &Context,
        params: InsertTemplateParams,
    ) -> Result<Template> {
        self.enter(ctx, "insert_template")?;
        let row = Template {
            id: params.id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            organization_id: params.organization_id,
            deleted: false,
            name: params.name,
            display_name: params.display_name,
            provisioner: params.provisioner,
            active_version_id: params.active_version_id,
            description: params.description,
            icon: params.icon,
            default_ttl: params.default_ttl,
            created_by: params.created_by,
            user_acl: params.user_acl,
            group_acl: params.group_acl,
            allow_user_cancel_workspace_jobs: params.allow_user_cancel_workspace_jobs,
        };
        insert(&self.templates, row.id, row)
    }

    async fn update_template_acl_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateAclByIdParams,
    ) -> Result<Template> {
        self.enter(ctx, "update_template_acl_by_id")?;
        update(&self.templates, &params.id, |t| {
            t.user_acl = params.user_acl;
            t.group_acl = params.group_acl;
        })
    }

    async fn update_template_active_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateActiveVersionByIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_template_active_version_by_id")?;
        update(&self.templates, &params.id, |t| {
            t.active_version_id = params.active_version_id;
            t.updated_at = params.updated_at;
        })
        .map(|_| ())
    }

    async fn update_template_meta_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateMetaByIdParams,
    ) -> Result<Template> {
        self.enter(ctx, "update_template_meta_by_id")?;
        update(&self.templates, &params.id, |t| {
            t.updated_at = params.updated_at;
            t.name = params.name;
            t.display_name = params.display_name;
            t.description = params.description;
            t.icon = params.icon;
            t.default_ttl = params.default_ttl;
            t.allow_user_cancel_workspace_jobs = params.allow_user_cancel_workspace_jobs;
        })
    }

    async fn update_template_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateDeletedByIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_template_deleted_by_id")?;
        update(&self.templates, &params.id, |t| {
            t.deleted = params.deleted;
            t.updated_at = params.updated_at;
        })
        .map(|_| ())
    }

    async fn get_template_group_roles(
        &self,
        ctx: &Context,
        id: Uuid,
    ) -> Result<Vec<TemplateGroup>> {
        self.enter(ctx, "get_template_group_roles")?;
        let template = get(&self.templates, &id)?;
        Ok(template
            .group_acl
            .into_iter()
            .filter_map(|(group_id, actions)| {
                let group = self.groups.get(&group_id)?.value().clone();
                Some(TemplateGroup { group, actions })
            })
            .collect())
    }

    async fn get_template_user_roles(&self, ctx: &Context, id: Uuid) -> Result<Vec<TemplateUser>> {
        self.enter(ctx, "get_template_user_roles")?;
        let template = get(&self.templates, &id)?;
        Ok(template
            .user_acl
            .into_iter()
            .map(|(user_id, actions)| TemplateUser { user_id, actions })
            .collect())
    }

    async fn get_template_daus(
        &self,
        ctx: &Context,
        template_id: Uuid,
    ) -> Result<Vec<TemplateDauRow>> {
        self.enter(ctx, "get_template_daus")?;
        let workspaces: BTreeSet<Uuid> =
            filter(&self.workspaces, |w| w.template_id == template_id)
                .into_iter()
                .map(|w| w.id)
                .collect();
        let active: BTreeSet<_> = filter(&self.workspace_builds, |b| {
            workspaces.contains(&b.workspace_id)
        })
        .into_iter()
        .map(|b| (b.created_at.date_naive(), b.initiator_id))
        .collect();
        Ok(active
            .into_iter()
            .map(|(date, user_id)| TemplateDauRow { date, user_id })
            .collect())
    }

    async fn get_template_average_build_time(
        &self,
        ctx: &Context,
        params: GetTemplateAverageBuildTimeParams,
    ) -> Result<TemplateAverageBuildTimeRow> {
        self.enter(ctx, "get_template_average_build_time")?;
        let median = |transition| {
            median_ms(self.build_durations_ms(params.template_id, params.start_time, transition))
        };
        Ok(TemplateAverageBuildTimeRow {
            start_median_ms: median(WorkspaceTransition::Start),
            stop_median_ms: median(WorkspaceTransition::Stop),
            delete_median_ms: median(WorkspaceTransition::Delete),
        })
    }

    async fn get_template_version_by_id(
        &self,
        ctx: &Context,
        id: Uuid,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "get_template_version_by_id")?;
        get(&self.template_versions, &id)
    }

    async fn get_template_version_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "get_template_version_by_job_id")?;
        find(&self.template_versions, |tv| tv.job_id == job_id)
    }

    async fn get_template_version_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByOrganizationAndNameParams,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "get_template_version_by_organization_and_name")?;
        find(&self.template_versions, |tv| {
            tv.organization_id == params.organization_id && tv.name == params.name
        })
    }

    async fn get_template_version_by_template_id_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByTemplateIdAndNameParams,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "get_template_version_by_template_id_and_name")?;
        find(&self.template_versions, |tv| {
            tv.template_id == Some(params.template_id) && tv.name == params.name
        })
    }

    async fn get_template_versions_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<TemplateVersion>> {
        self.enter(ctx, "get_template_versions_by_ids")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.template_versions.get(id).map(|r| r.value().clone()))
            .collect())
    }

    async fn get_template_versions_by_template_id(
        &self,
        ctx: &Context,
        params: GetTemplateVersionsByTemplateIdParams,
    ) -> Result<Vec<TemplateVersion>> {
        self.enter(ctx, "get_template_versions_by_template_id")?;
        let mut rows = filter(&self.template_versions, |tv| {
            tv.template_id == Some(params.template_id)
        });
        rows.sort_by_key(|tv| (tv.created_at, tv.id));
        if let Some(after) = params.after_id {
            let start = rows
                .iter()
                .position(|tv| tv.id == after)
                .map_or(0, |pos| pos + 1);
            rows.drain(..start);
        }
        if let Some(limit) = params.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn get_template_versions_created_after(
        &self,
        ctx: &Context,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<TemplateVersion>> {
        self.enter(ctx, "get_template_versions_created_after")?;
        let mut rows = filter(&self.template_versions, |tv| tv.created_at > created_at);
        rows.sort_by_key(|tv| (tv.created_at, tv.id));
        Ok(rows)
    }

    async fn get_previous_template_version(
        &self,
        ctx: &Context,
        params: GetPreviousTemplateVersionParams,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "get_previous_template_version")?;
        let current = find(&self.template_versions, |tv| {
            tv.organization_id == params.organization_id
                && tv.name == params.name
                && tv.template_id == params.template_id
        })?;
        filter(&self.template_versions, |tv| {
            tv.organization_id == current.organization_id
                && tv.template_id == current.template_id
                && tv.created_at < current.created_at
        })
        .into_iter()
        .max_by_key(|tv| tv.created_at)
        .ok_or_else(|| Error::not_found(TemplateVersion::RESOURCE))
    }

    async fn get_template_version_parameters(
        &self,
        ctx: &Context,
        template_version_id: Uuid,
    ) -> Result<Vec<TemplateVersionParameter>> {
        self.enter(ctx, "get_template_version_parameters")?;
        let mut rows = filter(&self.template_version_parameters, |p| {
            p.template_version_id == template_version_id
        });
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_template_version(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParams,
    ) -> Result<TemplateVersion> {
        self.enter(ctx, "insert_template_version")?;
        let row = TemplateVersion {
            id: params.id,
            template_id: params.template_id,
            organization_id: params.organization_id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            name: params.name,
            readme: params.readme,
            job_id: params.job_id,
            created_by: params.created_by,
        };
        insert(&self.template_versions, row.id, row)
    }

    async fn insert_template_version_parameter(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParameterParams,
    ) -> Result<TemplateVersionParameter> {
        self.enter(ctx, "insert_template_version_parameter")?;
        let row = TemplateVersionParameter {
            template_version_id: params.template_version_id,
            name: params.name,
            description: params.description,
            parameter_type: params.parameter_type,
            mutable: params.mutable,
            default_value: params.default_value,
        };
        insert(
            &self.template_version_parameters,
            (row.template_version_id, row.name.clone()),
            row,
        )
    }

    async fn update_template_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionByIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_template_version_by_id")?;
        update(&self.template_versions, &params.id, |tv| {
            tv.template_id = params.template_id;
            tv.updated_at = params.updated_at;
            tv.name = params.name;
        })
        .map(|_| ())
    }

    async fn update_template_version_description_by_job_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionDescriptionByJobIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_template_version_description_by_job_id")?;
        let version = find(&self.template_versions, |tv| tv.job_id == params.job_id)?;
        update(&self.template_versions, &version.id, |tv| {
            tv.readme = params.readme;
            tv.updated_at = params.updated_at;
        })
        .map(|_| ())
    }

    async fn get_provisioner_job_by_id(&self, ctx: &Context, id: Uuid) -> Result<ProvisionerJob> {
        self.enter(ctx, "get_provisioner_job_by_id")?;
        get(&self.provisioner_jobs, &id)
    }

    async fn get_provisioner_jobs_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<ProvisionerJob>> {
        self.enter(ctx, "get_provisioner_jobs_by_ids")?;
        Ok(ids
            .iter()
            .filter_map(|id| self.provisioner_jobs.get(id).map(|r| r.value().clone()))
            .collect())
    }

    async fn get_provisioner_logs_by_id_between(
        &self,
        ctx: &Context,
        params: GetProvisionerLogsByIdBetweenParams,
    ) -> Result<Vec<ProvisionerJobLog>> {
        self.enter(ctx, "get_provisioner_logs_by_id_between")?;
        let mut rows = filter(&self.provisioner_job_logs, |log| {
            log.job_id == params.job_id
                && params.created_after.map_or(true, |after| log.id > after)
                && params.created_before.map_or(true, |before| log.id < before)
        });
        rows.sort_by_key(|log| log.id);
        Ok(rows)
    }

    async fn insert_provisioner_job(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob> {
        self.enter(ctx, "insert_provisioner_job")?;
        let row = ProvisionerJob {
            id: params.id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            started_at: None,
            canceled_at: None,
            completed_at: None,
            error: None,
            organization_id: params.organization_id,
            initiator_id: params.initiator_id,
            provisioner: params.provisioner,
            storage_method: params.storage_method,
            file_id: params.file_id,
            job_type: params.job_type.to_string(),
            input: params.input,
            worker_id: None,
        };
        insert(&self.provisioner_jobs, row.id, row)
    }

    async fn insert_provisioner_job_logs(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobLogsParams,
    ) -> Result<Vec<ProvisionerJobLog>> {
        self.enter(ctx, "insert_provisioner_job_logs")?;
        let mut rows = Vec::with_capacity(params.logs.len());
        for log in params.logs {
            let id = self.next_log_id.fetch_add(1, Ordering::SeqCst) + 1;
            let row = ProvisionerJobLog {
                id,
                job_id: params.job_id,
                created_at: log.created_at,
                source: log.source,
                level: log.level,
                stage: log.stage,
                output: log.output,
            };
            rows.push(insert(&self.provisioner_job_logs, id, row)?);
        }
        Ok(rows)
    }

    async fn update_provisioner_job_with_cancel_by_id(
        &self,
        ctx: &Context,
        params: UpdateProvisionerJobWithCancelByIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_provisioner_job_with_cancel_by_id")?;
        update(&self.provisioner_jobs, &params.id, |job| {
            job.canceled_at = Some(params.canceled_at);
            job.updated_at = params.canceled_at;
        })
        .map(|_| ())
    }

    async fn get_workspace_by_id(&self, ctx: &Context, id: Uuid) -> Result<Workspace> {
        self.enter(ctx, "get_workspace_by_id")?;
        get(&self.workspaces, &id)
    }

    async fn get_workspace_by_owner_id_and_name(
        &self,
        ctx: &Context,
        params: GetWorkspaceByOwnerIdAndNameParams,
    ) -> Result<Workspace> {
        self.enter(ctx, "get_workspace_by_owner_id_and_name")?;
        find(&self.workspaces, |w| {
            w.owner_id == params.owner_id
                && w.deleted == params.deleted
                && w.name.eq_ignore_ascii_case(&params.name)
        })
    }

    async fn get_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
    ) -> Result<Vec<Workspace>> {
        self.enter(ctx, "get_workspaces")?;
        Ok(self.workspaces_matching(&params))
    }

    async fn get_authorized_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
        prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Workspace>> {
        self.enter(ctx, "get_authorized_workspaces")?;
        admitted(self.workspaces_matching(&params), prepared)
    }

    async fn insert_workspace(
        &self,
        ctx: &Context,
        params: InsertWorkspaceParams,
    ) -> Result<Workspace> {
        self.enter(ctx, "insert_workspace")?;
        let row = Workspace {
            id: params.id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            owner_id: params.owner_id,
            organization_id: params.organization_id,
            template_id: params.template_id,
            deleted: false,
            name: params.name,
            autostart_schedule: params.autostart_schedule,
            ttl: params.ttl,
            last_used_at: params.created_at,
        };
        insert(&self.workspaces, row.id, row)
    }

    async fn update_workspace(
        &self,
        ctx: &Context,
        params: UpdateWorkspaceParams,
    ) -> Result<Workspace> {
        self.enter(ctx, "update_workspace")?;
        let current = get(&self.workspaces, &params.id)?;
        let taken = self.workspaces.iter().any(|w| {
            w.id != current.id
                && w.owner_id == current.owner_id
                && !w.deleted
                && w.name.eq_ignore_ascii_case(&params.name)
        });
        if taken {
            return Err(Error::Conflict(format!(
                "workspace name {:?} already in use",
                params.name
            )));
        }
        update(&self.workspaces, &params.id, |w| w.name = params.name)
    }

    async fn update_workspace_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateWorkspaceDeletedByIdParams,
    ) -> Result<()> {
        self.enter(ctx, "update_workspace_deleted_by_id")?;
        update(&self.workspaces, &params.id, |w| w.deleted = params.deleted).map(|_| ())
    }

    async fn get_workspace_build_by_id(&self, ctx: &Context, id: Uuid) -> Result<WorkspaceBuild> {
        self.enter(ctx, "get_workspace_build_by_id")?;
        get(&self.workspace_builds, &id)
    }

    async fn get_workspace_build_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<WorkspaceBuild> {
        self.enter(ctx, "get_workspace_build_by_job_id")?;
        find(&self.workspace_builds, |b| b.job_id == job_id)
    }

    async fn get_workspace_builds_by_workspace_id(
        &self,
        ctx: &Context,
        params: GetWorkspaceBuildsByWorkspaceIdParams,
    ) -> Result<Vec<WorkspaceBuild>> {
        self.enter(ctx, "get_workspace_builds_by_workspace_id")?;
        let mut rows = filter(&self.workspace_builds, |b| {
            b.workspace_id == params.workspace_id
                && params.since.map_or(true, |since| b.created_at >= since)
        });
        rows.sort_by_key(|b| b.build_number);
        if let Some(limit) = params.limit {
            rows.truncate(limit);
        }
        Ok(rows)
    }

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        ctx: &Context,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild> {
        self.enter(ctx, "get_latest_workspace_build_by_workspace_id")?;
        filter(&self.workspace_builds, |b| b.workspace_id == workspace_id)
            .into_iter()
            .max_by_key(|b| b.build_number)
            .ok_or_else(|| Error::not_found(WorkspaceBuild::RESOURCE))
    }

    async fn insert_workspace_build(
        &self,
        ctx: &Context,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild> {
        self.enter(ctx, "insert_workspace_build")?;
        let duplicate = self.workspace_builds.iter().any(|b| {
            b.workspace_id == params.workspace_id && b.build_number == params.build_number
        });
        if duplicate {
            return Err(Error::Conflict(format!(
                "build number {} already exists",
                params.build_number
            )));
        }
        let row = WorkspaceBuild {
            id: params.id,
            created_at: params.created_at,
            updated_at: params.updated_at,
            workspace_id: params.workspace_id,
            template_version_id: params.template_version_id,
            build_number: params.build_number,
            transition: params.transition,
            initiator_id: params.initiator_id,
            job_id: params.job_id,
            deadline: params.deadline,
            reason: params.reason,
        };
        insert(&self.workspace_builds, row.id, row)
    }

    async fn get_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<Group> {
        self.enter(ctx, "get_group_by_id")?;
        get(&self.groups, &id)
    }

    async fn get_group_by_org_and_name(
        &self,
        ctx: &Context,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group> {
        self.enter(ctx, "get_group_by_org_and_name")?;
        find(&self.groups, |g| {
            g.organization_id == params.organization_id && g.name == params.name
        })
    }

    async fn get_group_members(&self, ctx: &Context, group_id: Uuid) -> Result<Vec<GroupMember>> {
        self.enter(ctx, "get_group_members")?;
        let mut rows = filter(&self.group_members, |m| m.group_id == group_id);
        rows.sort_by_key(|m| m.user_id);
        Ok(rows)
    }

    async fn get_groups_by_organization_id(
        &self,
        ctx: &Context,
        organization_id: Uuid,
    ) -> Result<Vec<Group>> {
        self.enter(ctx, "get_groups_by_organization_id")?;
        let mut rows = filter(&self.groups, |g| g.organization_id == organization_id);
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn insert_group(&self, ctx: &Context, params: InsertGroupParams) -> Result<Group> {
        self.enter(ctx, "insert_group")?;
        let taken = self
            .groups
            .iter()
            .any(|g| g.organization_id == params.organization_id && g.name == params.name);
        if taken {
            return Err(Error::Conflict(format!(
                "group {:?} already exists",
                params.name
            )));
        }
        let row = Group {
            id: params.id,
            name: params.name,
            organization_id: params.organization_id,
            avatar_url: params.avatar_url,
            quota_allowance: params.quota_allowance,
        };
        insert(&self.groups, row.id, row)
    }

    async fn insert_all_users_group(&self, ctx: &Context, organization_id: Uuid) -> Result<Group> {
        self.enter(ctx, "insert_all_users_group")?;
        let row = Group {
            id: organization_id,
            name: "Everyone".to_string(),
            organization_id,
            avatar_url: String::new(),
            quota_allowance: 0,
        };
        insert(&self.groups, row.id, row)
    }

    async fn insert_group_member(
        &self,
        ctx: &Context,
        params: InsertGroupMemberParams,
    ) -> Result<()> {
        self.enter(ctx, "insert_group_member")?;
        get(&self.groups, &params.group_id)?;
        let row = GroupMember {
            user_id: params.user_id,
            group_id: params.group_id,
        };
        insert(&self.group_members, (row.group_id, row.user_id), row).map(|_| ())
    }

    async fn delete_group_member_from_group(
        &self,
        ctx: &Context,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<()> {
        self.enter(ctx, "delete_group_member_from_group")?;
        self.group_members
            .remove(&(params.group_id, params.user_id));
        Ok(())
    }

    async fn update_group_by_id(
        &self,
        ctx: &Context,
        params: UpdateGroupByIdParams,
    ) -> Result<Group> {
        self.enter(ctx, "update_group_by_id")?;
        update(&self.groups, &params.id, |g| {
            g.name = params.name;
            g.avatar_url = params.avatar_url;
            g.quota_allowance = params.quota_allowance;
        })
    }

    async fn delete_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<()> {
        self.enter(ctx, "delete_group_by_id")?;
        self.groups
            .remove(&id)
            .ok_or_else(|| Error::not_found(Group::RESOURCE))?;
        self.group_members.retain(|(group_id, _), _| *group_id != id);
        Ok(())
    }

    async fn get_file_by_id(&self, ctx: &Context, id: Uuid) -> Result<File> {
        self.enter(ctx, "get_file_by_id")?;
        get(&self.files, &id)
    }

    async fn get_file_by_hash_and_creator(
        &self,
        ctx: &Context,
        params: GetFileByHashAndCreatorParams,
    ) -> Result<File> {
        self.enter(ctx, "get_file_by_hash_and_creator")?;
        find(&self.files, |f| {
            f.hash == params.hash && f.created_by == params.created_by
        })
    }

    async fn insert_file(&self, ctx: &Context, params: InsertFileParams) -> Result<File> {
        self.enter(ctx, "insert_file")?;
        let duplicate = self
            .files
            .iter()
            .any(|f| f.hash == params.hash && f.created_by == params.created_by);
        if duplicate {
            return Err(Error::Conflict("file already exists".to_string()));
        }
        let row = File {
            id: params.id,
            hash: params.hash,
            created_at: params.created_at,
            created_by: params.created_by,
            mimetype: params.mimetype,
            data: params.data,
        };
        insert(&self.files, row.id, row)
    }
}
