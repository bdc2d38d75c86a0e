//! The authorization-enforcing store wrapper
//!
//! [`AuthzQuerier`] implements [`Store`] by delegating to an inner store.
//! Every operation requires an actor, resolves its authorization object,
//! asks the evaluator, and only then returns data or performs the
//! mutation. Most operations are one call to a strategy in
//! [`crate::strategies`]; the rest are written out where the check needs
//! more than one object.

use async_trait::async_trait;
use auth_rbac::{Action, Authorizer, Objecter, PreparedAuthorized, ResourceType};
use chrono::{DateTime, Utc};
use database_layer::*;
use error_common::{Error, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::actor::require_actor;
use crate::config::AuthzConfig;
use crate::resolver::{job_kind, Related, Resolver};
use crate::strategies::*;

/// Wraps a [`Store`] and checks every call against an [`Authorizer`]
pub struct AuthzQuerier<S> {
    store: S,
    authorizer: Arc<dyn Authorizer>,
    config: AuthzConfig,
}

impl<S: Store> AuthzQuerier<S> {
    pub fn new(store: S, authorizer: Arc<dyn Authorizer>) -> Self {
        Self::with_config(store, authorizer, AuthzConfig::default())
    }

    pub fn with_config(store: S, authorizer: Arc<dyn Authorizer>, config: AuthzConfig) -> Self {
        Self {
            store,
            authorizer,
            config,
        }
    }

    /// The unwrapped store. Calls made through it are not authorized.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AuthzConfig {
        &self.config
    }

    fn guard(&self) -> Guard<'_> {
        Guard::new(&*self.authorizer, self.config.log_denials)
    }

    fn resolver<'a>(&'a self, ctx: &'a Context) -> Resolver<'a, S> {
        Resolver::new(&self.store, ctx)
    }

    /// Wrapper-only: mark a template deleted after a `Delete` check
    pub async fn soft_delete_template_by_id(&self, ctx: &Context, id: Uuid) -> Result<()> {
        authorized_delete(
            self.guard(),
            ctx,
            || self.store.get_template_by_id(ctx, id),
            || {
                self.store.update_template_deleted_by_id(
                    ctx,
                    UpdateTemplateDeletedByIdParams {
                        id,
                        deleted: true,
                        updated_at: Utc::now(),
                    },
                )
            },
        )
        .await
    }

    /// Wrapper-only: mark a workspace deleted after a `Delete` check
    pub async fn soft_delete_workspace_by_id(&self, ctx: &Context, id: Uuid) -> Result<()> {
        authorized_delete(
            self.guard(),
            ctx,
            || self.store.get_workspace_by_id(ctx, id),
            || {
                self.store.update_workspace_deleted_by_id(
                    ctx,
                    UpdateWorkspaceDeletedByIdParams { id, deleted: true },
                )
            },
        )
        .await
    }

    /// Resolve the job's object and check `Read` on it, concealing a denial
    async fn authorize_job(&self, ctx: &Context, job: &ProvisionerJob) -> Result<()> {
        let related = self
            .resolver(ctx)
            .job(job)
            .await
            .map_err(|e| e.in_relation("resolve provisioner job"))?;
        self.guard()
            .authorize(ctx, Action::Read, &related)
            .await
            .map_err(|e| e.conceal_as_not_found(ProvisionerJob::RESOURCE))
    }

    /// Cancelling a build job needs the template's cancel flag (or an
    /// override role) and `Update` on the workspace.
    async fn authorize_build_cancel(&self, ctx: &Context, job: &ProvisionerJob) -> Result<()> {
        let actor = require_actor(ctx)?;
        let relation = |e: Error| e.in_relation("resolve provisioner job");
        let build = ctx
            .run(self.store.get_workspace_build_by_job_id(ctx, job.id))
            .await
            .map_err(relation)?;
        let workspace = ctx
            .run(self.store.get_workspace_by_id(ctx, build.workspace_id))
            .await
            .map_err(relation)?;
        let template = ctx
            .run(self.store.get_template_by_id(ctx, workspace.template_id))
            .await
            .map_err(relation)?;

        if !template.allow_user_cancel_workspace_jobs {
            let overridden = self
                .config
                .cancel_override_roles
                .iter()
                .any(|role| actor.has_role(role));
            if !overridden {
                debug!(actor = %actor.id, job_id = %job.id, template_id = %template.id,
                    "workspace build cancel disabled by template");
                return Err(Error::forbidden("only owners can cancel workspace builds"));
            }
        }

        self.guard()
            .authorize(ctx, Action::Update, &workspace)
            .await
            .map_err(|e| e.conceal_as_not_found(ProvisionerJob::RESOURCE))
    }

    /// Cancelling a template version job needs `Read` and `Update` on the
    /// version's template
    async fn authorize_version_cancel(
        &self,
        ctx: &Context,
        job: &ProvisionerJob,
        kind: ProvisionerJobType,
    ) -> Result<()> {
        let resolver = self.resolver(ctx);
        let related = async {
            let version = resolver.job_template_version(job, kind).await?;
            resolver.template_version(&version).await
        }
        .await
        .map_err(|e| e.in_relation("resolve provisioner job"))?;

        for action in [Action::Read, Action::Update] {
            self.guard()
                .authorize(ctx, action, &related)
                .await
                .map_err(|e| e.conceal_as_not_found(ProvisionerJob::RESOURCE))?;
        }
        Ok(())
    }
}

/// Relation key of a template version: its template, or its org when unlinked
fn version_relation_key(version: &TemplateVersion) -> (Option<Uuid>, Uuid) {
    match version.template_id {
        Some(template_id) => (Some(template_id), Uuid::nil()),
        None => (None, version.organization_id),
    }
}

#[async_trait]
impl<S: Store> Store for AuthzQuerier<S> {
    // =========================================================================
    // Templates
    // =========================================================================

    async fn get_template_by_id(&self, ctx: &Context, id: Uuid) -> Result<Template> {
        authorized_fetch(self.guard(), ctx, || self.store.get_template_by_id(ctx, id)).await
    }

    async fn get_template_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateByOrganizationAndNameParams,
    ) -> Result<Template> {
        authorized_fetch(self.guard(), ctx, move || {
            self.store.get_template_by_organization_and_name(ctx, params)
        })
        .await
    }

    async fn get_templates(&self, ctx: &Context) -> Result<Vec<Template>> {
        self.get_templates_with_filter(ctx, GetTemplatesWithFilterParams::default())
            .await
    }

    async fn get_templates_with_filter(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
    ) -> Result<Vec<Template>> {
        prepare_sql_filter(
            self.guard(),
            ctx,
            Action::Read,
            ResourceType::Template,
            move |prepared| async move {
                self.store
                    .get_authorized_templates(ctx, params, &*prepared)
                    .await
            },
        )
        .await
    }

    /// The caller's predicate is replaced by one compiled for the actor
    async fn get_authorized_templates(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
        _prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Template>> {
        self.get_templates_with_filter(ctx, params).await
    }

    async fn insert_template(
        &self,
        ctx: &Context,
        params: InsertTemplateParams,
    ) -> Result<Template> {
        let object = ResourceType::Template.in_org(params.organization_id);
        authorized_insert(self.guard(), ctx, Action::Create, &object, move || {
            self.store.insert_template(ctx, params)
        })
        .await
    }

    /// Changing who can use a template is gated on `Create`, not `Update`
    async fn update_template_acl_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateAclByIdParams,
    ) -> Result<Template> {
        let id = params.id;
        authorized_fetch_and_query(
            self.guard(),
            ctx,
            Action::Create,
            || self.store.get_template_by_id(ctx, id),
            move || self.store.update_template_acl_by_id(ctx, params),
        )
        .await
    }

    async fn update_template_active_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateActiveVersionByIdParams,
    ) -> Result<()> {
        let id = params.id;
        authorized_update(
            self.guard(),
            ctx,
            || self.store.get_template_by_id(ctx, id),
            move || self.store.update_template_active_version_by_id(ctx, params),
        )
        .await
    }

    async fn update_template_meta_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateMetaByIdParams,
    ) -> Result<Template> {
        let id = params.id;
        authorized_update(
            self.guard(),
            ctx,
            || self.store.get_template_by_id(ctx, id),
            move || self.store.update_template_meta_by_id(ctx, params),
        )
        .await
    }

    async fn update_template_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateDeletedByIdParams,
    ) -> Result<()> {
        let id = params.id;
        authorized_delete(
            self.guard(),
            ctx,
            || self.store.get_template_by_id(ctx, id),
            move || self.store.update_template_deleted_by_id(ctx, params),
        )
        .await
    }

    async fn get_template_group_roles(
        &self,
        ctx: &Context,
        id: Uuid,
    ) -> Result<Vec<TemplateGroup>> {
        authorized_fetch_and_query(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_by_id(ctx, id),
            || self.store.get_template_group_roles(ctx, id),
        )
        .await
    }

    async fn get_template_user_roles(&self, ctx: &Context, id: Uuid) -> Result<Vec<TemplateUser>> {
        authorized_fetch_and_query(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_by_id(ctx, id),
            || self.store.get_template_user_roles(ctx, id),
        )
        .await
    }

    async fn get_template_daus(
        &self,
        ctx: &Context,
        template_id: Uuid,
    ) -> Result<Vec<TemplateDauRow>> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_daus(ctx, template_id),
            |_: &Vec<TemplateDauRow>| resolver.template(template_id),
        )
        .await
    }

    async fn get_template_average_build_time(
        &self,
        ctx: &Context,
        params: GetTemplateAverageBuildTimeParams,
    ) -> Result<TemplateAverageBuildTimeRow> {
        let resolver = self.resolver(ctx);
        let template_id = params.template_id;
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || self.store.get_template_average_build_time(ctx, params),
            |_: &TemplateAverageBuildTimeRow| resolver.template_or_any(template_id),
        )
        .await
    }

    // =========================================================================
    // Template versions
    // =========================================================================

    async fn get_template_version_by_id(
        &self,
        ctx: &Context,
        id: Uuid,
    ) -> Result<TemplateVersion> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_version_by_id(ctx, id),
            |tv: &TemplateVersion| resolver.template_or_org(tv.template_id, tv.organization_id),
        )
        .await
    }

    async fn get_template_version_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<TemplateVersion> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_version_by_job_id(ctx, job_id),
            |tv: &TemplateVersion| resolver.template_or_org(tv.template_id, tv.organization_id),
        )
        .await
    }

    async fn get_template_version_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByOrganizationAndNameParams,
    ) -> Result<TemplateVersion> {
        let resolver = self.resolver(ctx);
        let org = params.organization_id;
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || {
                self.store
                    .get_template_version_by_organization_and_name(ctx, params)
            },
            |tv: &TemplateVersion| resolver.template_or_org(tv.template_id, org),
        )
        .await
    }

    async fn get_template_version_by_template_id_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByTemplateIdAndNameParams,
    ) -> Result<TemplateVersion> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || {
                self.store
                    .get_template_version_by_template_id_and_name(ctx, params)
            },
            |tv: &TemplateVersion| resolver.template_or_any(tv.template_id),
        )
        .await
    }

    /// Every distinct template (or org placeholder) behind the result must
    /// allow `Read`; one denial fails the whole call.
    async fn get_template_versions_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<TemplateVersion>> {
        require_actor(ctx)?;
        let versions = ctx
            .run(self.store.get_template_versions_by_ids(ctx, ids))
            .await?;

        let resolver = self.resolver(ctx);
        let mut seen = BTreeSet::new();
        for version in &versions {
            if !seen.insert(version_relation_key(version)) {
                continue;
            }
            let related = resolver
                .template_version(version)
                .await
                .map_err(|e| e.in_relation("resolve template version"))?;
            self.guard()
                .authorize(ctx, Action::Read, &related)
                .await
                .map_err(|e| e.conceal_as_not_found(TemplateVersion::RESOURCE))?;
        }
        Ok(versions)
    }

    async fn get_template_versions_by_template_id(
        &self,
        ctx: &Context,
        params: GetTemplateVersionsByTemplateIdParams,
    ) -> Result<Vec<TemplateVersion>> {
        let resolver = self.resolver(ctx);
        let template_id = params.template_id;
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || self.store.get_template_versions_by_template_id(ctx, params),
            |_: &Vec<TemplateVersion>| resolver.template(template_id),
        )
        .await
    }

    /// Spans every template, so only a site-wide template read passes
    async fn get_template_versions_created_after(
        &self,
        ctx: &Context,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<TemplateVersion>> {
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_template_versions_created_after(ctx, created_at),
            |_: &Vec<TemplateVersion>| async { Ok::<_, Error>(Related::AnyTemplate) },
        )
        .await
    }

    async fn get_previous_template_version(
        &self,
        ctx: &Context,
        params: GetPreviousTemplateVersionParams,
    ) -> Result<TemplateVersion> {
        let resolver = self.resolver(ctx);
        let (template_id, org) = (params.template_id, params.organization_id);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || self.store.get_previous_template_version(ctx, params),
            |_: &TemplateVersion| resolver.template_or_org(template_id, org),
        )
        .await
    }

    async fn get_template_version_parameters(
        &self,
        ctx: &Context,
        template_version_id: Uuid,
    ) -> Result<Vec<TemplateVersionParameter>> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || {
                self.store
                    .get_template_version_parameters(ctx, template_version_id)
            },
            |rows: &Vec<TemplateVersionParameter>| {
                let empty = rows.is_empty();
                async move {
                    if empty {
                        return Ok(Related::AnyTemplate);
                    }
                    match resolver.template_version_by_id(template_version_id).await {
                        Err(Error::NotFound { .. }) => Ok(Related::AnyTemplate),
                        other => other,
                    }
                }
            },
        )
        .await
    }

    /// Linking a version edits its template; an unlinked version creates a
    /// template-to-be in the organization
    async fn insert_template_version(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParams,
    ) -> Result<TemplateVersion> {
        require_actor(ctx)?;
        let (action, related) = match params.template_id {
            Some(template_id) => {
                let related = self
                    .resolver(ctx)
                    .template(template_id)
                    .await
                    .map_err(|e| e.in_relation("resolve template version"))?;
                (Action::Update, related)
            }
            None => (
                Action::Create,
                Related::AnyTemplateInOrg(params.organization_id),
            ),
        };
        authorized_insert(
            self.guard(),
            ctx,
            action,
            &related.rbac_object(),
            move || self.store.insert_template_version(ctx, params),
        )
        .await
    }

    async fn insert_template_version_parameter(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParameterParams,
    ) -> Result<TemplateVersionParameter> {
        require_actor(ctx)?;
        let related = self
            .resolver(ctx)
            .template_version_by_id(params.template_version_id)
            .await
            .map_err(|e| e.in_relation("resolve template version parameter"))?;
        authorized_insert(
            self.guard(),
            ctx,
            Action::Update,
            &related.rbac_object(),
            move || self.store.insert_template_version_parameter(ctx, params),
        )
        .await
    }

    /// Moving a version into another template also edits that template, so
    /// the target needs `Update` as well as the current relation
    async fn update_template_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionByIdParams,
    ) -> Result<()> {
        require_actor(ctx)?;
        let guard = self.guard();
        let resolver = self.resolver(ctx);
        let version = ctx
            .run(self.store.get_template_version_by_id(ctx, params.id))
            .await?;
        let current = resolver
            .template_version(&version)
            .await
            .map_err(|e| e.in_relation("resolve template version"))?;
        guard
            .authorize(ctx, Action::Update, &current)
            .await
            .map_err(|e| e.conceal_as_not_found(TemplateVersion::RESOURCE))?;

        if let Some(target_id) = params
            .template_id
            .filter(|id| version.template_id != Some(*id))
        {
            let target = resolver
                .template(target_id)
                .await
                .map_err(|e| e.in_relation("resolve template version"))?;
            guard.authorize(ctx, Action::Update, &target).await?;
        }
        ctx.run(self.store.update_template_version_by_id(ctx, params))
            .await
    }

    async fn update_template_version_description_by_job_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionDescriptionByJobIdParams,
    ) -> Result<()> {
        let resolver = self.resolver(ctx);
        let job_id = params.job_id;
        authorized_mutation_with_related(
            self.guard(),
            ctx,
            Action::Update,
            || self.store.get_template_version_by_job_id(ctx, job_id),
            |tv: &TemplateVersion| resolver.template_or_org(tv.template_id, tv.organization_id),
            move || {
                self.store
                    .update_template_version_description_by_job_id(ctx, params)
            },
        )
        .await
    }

    // =========================================================================
    // Provisioner jobs
    // =========================================================================

    async fn get_provisioner_job_by_id(&self, ctx: &Context, id: Uuid) -> Result<ProvisionerJob> {
        require_actor(ctx)?;
        let job = ctx.run(self.store.get_provisioner_job_by_id(ctx, id)).await?;
        self.authorize_job(ctx, &job).await?;
        Ok(job)
    }

    /// Jobs the actor may not read are left out. An unknown job kind still
    /// fails the whole call.
    async fn get_provisioner_jobs_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<ProvisionerJob>> {
        require_actor(ctx)?;
        let jobs = ctx.run(self.store.get_provisioner_jobs_by_ids(ctx, ids)).await?;
        let mut admitted = Vec::with_capacity(jobs.len());
        for job in jobs {
            match self.authorize_job(ctx, &job).await {
                Ok(()) => admitted.push(job),
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(admitted)
    }

    async fn get_provisioner_logs_by_id_between(
        &self,
        ctx: &Context,
        params: GetProvisionerLogsByIdBetweenParams,
    ) -> Result<Vec<ProvisionerJobLog>> {
        let resolver = self.resolver(ctx);
        let job_id = params.job_id;
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || self.store.get_provisioner_logs_by_id_between(ctx, params),
            |_: &Vec<ProvisionerJobLog>| resolver.job_by_id(job_id),
        )
        .await
    }

    async fn insert_provisioner_job(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob> {
        authorized_insert(
            self.guard(),
            ctx,
            Action::Create,
            &ResourceType::System.object(),
            move || self.store.insert_provisioner_job(ctx, params),
        )
        .await
    }

    async fn insert_provisioner_job_logs(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobLogsParams,
    ) -> Result<Vec<ProvisionerJobLog>> {
        authorized_insert(
            self.guard(),
            ctx,
            Action::Create,
            &ResourceType::System.object(),
            move || self.store.insert_provisioner_job_logs(ctx, params),
        )
        .await
    }

    async fn update_provisioner_job_with_cancel_by_id(
        &self,
        ctx: &Context,
        params: UpdateProvisionerJobWithCancelByIdParams,
    ) -> Result<()> {
        require_actor(ctx)?;
        let job = ctx
            .run(self.store.get_provisioner_job_by_id(ctx, params.id))
            .await?;
        match job_kind(&job)? {
            ProvisionerJobType::WorkspaceBuild => self.authorize_build_cancel(ctx, &job).await?,
            kind @ (ProvisionerJobType::TemplateVersionImport
            | ProvisionerJobType::TemplateVersionDryRun) => {
                self.authorize_version_cancel(ctx, &job, kind).await?
            }
        }
        ctx.run(self.store.update_provisioner_job_with_cancel_by_id(ctx, params))
            .await
    }

    // =========================================================================
    // Workspaces
    // =========================================================================

    async fn get_workspace_by_id(&self, ctx: &Context, id: Uuid) -> Result<Workspace> {
        authorized_fetch(self.guard(), ctx, || self.store.get_workspace_by_id(ctx, id)).await
    }

    async fn get_workspace_by_owner_id_and_name(
        &self,
        ctx: &Context,
        params: GetWorkspaceByOwnerIdAndNameParams,
    ) -> Result<Workspace> {
        authorized_fetch(self.guard(), ctx, move || {
            self.store.get_workspace_by_owner_id_and_name(ctx, params)
        })
        .await
    }

    async fn get_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
    ) -> Result<Vec<Workspace>> {
        prepare_sql_filter(
            self.guard(),
            ctx,
            Action::Read,
            ResourceType::Workspace,
            move |prepared| async move {
                self.store
                    .get_authorized_workspaces(ctx, params, &*prepared)
                    .await
            },
        )
        .await
    }

    async fn get_authorized_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
        _prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Workspace>> {
        self.get_workspaces(ctx, params).await
    }

    async fn insert_workspace(
        &self,
        ctx: &Context,
        params: InsertWorkspaceParams,
    ) -> Result<Workspace> {
        let object = ResourceType::Workspace
            .with_owner(params.owner_id)
            .in_org(params.organization_id);
        authorized_insert(self.guard(), ctx, Action::Create, &object, move || {
            self.store.insert_workspace(ctx, params)
        })
        .await
    }

    async fn update_workspace(
        &self,
        ctx: &Context,
        params: UpdateWorkspaceParams,
    ) -> Result<Workspace> {
        let id = params.id;
        authorized_update(
            self.guard(),
            ctx,
            || self.store.get_workspace_by_id(ctx, id),
            move || self.store.update_workspace(ctx, params),
        )
        .await
    }

    async fn update_workspace_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateWorkspaceDeletedByIdParams,
    ) -> Result<()> {
        let id = params.id;
        authorized_delete(
            self.guard(),
            ctx,
            || self.store.get_workspace_by_id(ctx, id),
            move || self.store.update_workspace_deleted_by_id(ctx, params),
        )
        .await
    }

    // =========================================================================
    // Workspace builds
    // =========================================================================

    async fn get_workspace_build_by_id(&self, ctx: &Context, id: Uuid) -> Result<WorkspaceBuild> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_workspace_build_by_id(ctx, id),
            |build: &WorkspaceBuild| resolver.workspace(build.workspace_id),
        )
        .await
    }

    async fn get_workspace_build_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<WorkspaceBuild> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_workspace_build_by_job_id(ctx, job_id),
            |build: &WorkspaceBuild| resolver.workspace(build.workspace_id),
        )
        .await
    }

    async fn get_workspace_builds_by_workspace_id(
        &self,
        ctx: &Context,
        params: GetWorkspaceBuildsByWorkspaceIdParams,
    ) -> Result<Vec<WorkspaceBuild>> {
        let resolver = self.resolver(ctx);
        let workspace_id = params.workspace_id;
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            move || self.store.get_workspace_builds_by_workspace_id(ctx, params),
            |_: &Vec<WorkspaceBuild>| resolver.workspace(workspace_id),
        )
        .await
    }

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        ctx: &Context,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || {
                self.store
                    .get_latest_workspace_build_by_workspace_id(ctx, workspace_id)
            },
            |_: &WorkspaceBuild| resolver.workspace(workspace_id),
        )
        .await
    }

    /// Starting or stopping is an edit of the workspace; destroying it needs
    /// `Delete`
    async fn insert_workspace_build(
        &self,
        ctx: &Context,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild> {
        require_actor(ctx)?;
        let related = self
            .resolver(ctx)
            .workspace(params.workspace_id)
            .await
            .map_err(|e| e.in_relation("resolve workspace build"))?;
        let action = match params.transition {
            WorkspaceTransition::Delete => Action::Delete,
            WorkspaceTransition::Start | WorkspaceTransition::Stop => Action::Update,
        };
        authorized_insert(
            self.guard(),
            ctx,
            action,
            &related.rbac_object(),
            move || self.store.insert_workspace_build(ctx, params),
        )
        .await
    }

    // =========================================================================
    // Groups
    // =========================================================================

    async fn get_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<Group> {
        authorized_fetch(self.guard(), ctx, || self.store.get_group_by_id(ctx, id)).await
    }

    async fn get_group_by_org_and_name(
        &self,
        ctx: &Context,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group> {
        authorized_fetch(self.guard(), ctx, move || {
            self.store.get_group_by_org_and_name(ctx, params)
        })
        .await
    }

    async fn get_group_members(&self, ctx: &Context, group_id: Uuid) -> Result<Vec<GroupMember>> {
        let resolver = self.resolver(ctx);
        authorized_query_with_related(
            self.guard(),
            ctx,
            Action::Read,
            || self.store.get_group_members(ctx, group_id),
            |_: &Vec<GroupMember>| resolver.group(group_id),
        )
        .await
    }

    async fn get_groups_by_organization_id(
        &self,
        ctx: &Context,
        organization_id: Uuid,
    ) -> Result<Vec<Group>> {
        fetch_with_post_filter(self.guard(), ctx, Action::Read, ResourceType::Group, || {
            self.store.get_groups_by_organization_id(ctx, organization_id)
        })
        .await
    }

    async fn insert_group(&self, ctx: &Context, params: InsertGroupParams) -> Result<Group> {
        let object = ResourceType::Group.in_org(params.organization_id);
        authorized_insert(self.guard(), ctx, Action::Create, &object, move || {
            self.store.insert_group(ctx, params)
        })
        .await
    }

    async fn insert_all_users_group(&self, ctx: &Context, organization_id: Uuid) -> Result<Group> {
        let object = ResourceType::Group.in_org(organization_id);
        authorized_insert(self.guard(), ctx, Action::Create, &object, || {
            self.store.insert_all_users_group(ctx, organization_id)
        })
        .await
    }

    async fn insert_group_member(
        &self,
        ctx: &Context,
        params: InsertGroupMemberParams,
    ) -> Result<()> {
        authorized_fetch_and_query(
            self.guard(),
            ctx,
            Action::Update,
            || self.store.get_group_by_id(ctx, params.group_id),
            || self.store.insert_group_member(ctx, params),
        )
        .await
    }

    async fn delete_group_member_from_group(
        &self,
        ctx: &Context,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<()> {
        authorized_fetch_and_query(
            self.guard(),
            ctx,
            Action::Update,
            || self.store.get_group_by_id(ctx, params.group_id),
            || self.store.delete_group_member_from_group(ctx, params),
        )
        .await
    }

    async fn update_group_by_id(
        &self,
        ctx: &Context,
        params: UpdateGroupByIdParams,
    ) -> Result<Group> {
        let id = params.id;
        authorized_update(
            self.guard(),
            ctx,
            || self.store.get_group_by_id(ctx, id),
            move || self.store.update_group_by_id(ctx, params),
        )
        .await
    }

    async fn delete_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<()> {
        authorized_delete(
            self.guard(),
            ctx,
            || self.store.get_group_by_id(ctx, id),
            || self.store.delete_group_by_id(ctx, id),
        )
        .await
    }

    // =========================================================================
    // Files
    // =========================================================================

    async fn get_file_by_id(&self, ctx: &Context, id: Uuid) -> Result<File> {
        authorized_fetch(self.guard(), ctx, || self.store.get_file_by_id(ctx, id)).await
    }

    async fn get_file_by_hash_and_creator(
        &self,
        ctx: &Context,
        params: GetFileByHashAndCreatorParams,
    ) -> Result<File> {
        authorized_fetch(self.guard(), ctx, move || {
            self.store.get_file_by_hash_and_creator(ctx, params)
        })
        .await
    }

    async fn insert_file(&self, ctx: &Context, params: InsertFileParams) -> Result<File> {
        let object = ResourceType::File.with_owner(params.created_by);
        authorized_insert(self.guard(), ctx, Action::Create, &object, move || {
            self.store.insert_file(ctx, params)
        })
        .await
    }
}
