use async_trait::async_trait;
use auth_rbac::PreparedAuthorized;
use chrono::{DateTime, Utc};
use error_common::Result;
use uuid::Uuid;

use crate::context::Context;
use crate::models::*;
use crate::params::*;

/// The persistence interface of the control plane
///
/// Implementations return `Error::NotFound` with the record's
/// [`Record::RESOURCE`] name for missing rows. The `get_authorized_*`
/// variants apply a compiled policy predicate at the source.
#[async_trait]
pub trait Store: Send + Sync {
    // =========================================================================
    // Templates
    // =========================================================================

    async fn get_template_by_id(&self, ctx: &Context, id: Uuid) -> Result<Template>;

    async fn get_template_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateByOrganizationAndNameParams,
    ) -> Result<Template>;

    async fn get_templates(&self, ctx: &Context) -> Result<Vec<Template>>;

    async fn get_templates_with_filter(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
    ) -> Result<Vec<Template>>;

    async fn get_authorized_templates(
        &self,
        ctx: &Context,
        params: GetTemplatesWithFilterParams,
        prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Template>>;

    async fn insert_template(&self, ctx: &Context, params: InsertTemplateParams)
        -> Result<Template>;

    async fn update_template_acl_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateAclByIdParams,
    ) -> Result<Template>;

    async fn update_template_active_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateActiveVersionByIdParams,
    ) -> Result<()>;

    async fn update_template_meta_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateMetaByIdParams,
    ) -> Result<Template>;

    async fn update_template_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateDeletedByIdParams,
    ) -> Result<()>;

    async fn get_template_group_roles(&self, ctx: &Context, id: Uuid)
        -> Result<Vec<TemplateGroup>>;

    async fn get_template_user_roles(&self, ctx: &Context, id: Uuid) -> Result<Vec<TemplateUser>>;

    async fn get_template_daus(&self, ctx: &Context, template_id: Uuid)
        -> Result<Vec<TemplateDauRow>>;

    async fn get_template_average_build_time(
        &self,
        ctx: &Context,
        params: GetTemplateAverageBuildTimeParams,
    ) -> Result<TemplateAverageBuildTimeRow>;

    // =========================================================================
    // Template versions
    // =========================================================================

    async fn get_template_version_by_id(&self, ctx: &Context, id: Uuid)
        -> Result<TemplateVersion>;

    async fn get_template_version_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<TemplateVersion>;

    async fn get_template_version_by_organization_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByOrganizationAndNameParams,
    ) -> Result<TemplateVersion>;

    async fn get_template_version_by_template_id_and_name(
        &self,
        ctx: &Context,
        params: GetTemplateVersionByTemplateIdAndNameParams,
    ) -> Result<TemplateVersion>;

    async fn get_template_versions_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<TemplateVersion>>;

    async fn get_template_versions_by_template_id(
        &self,
        ctx: &Context,
        params: GetTemplateVersionsByTemplateIdParams,
    ) -> Result<Vec<TemplateVersion>>;

    async fn get_template_versions_created_after(
        &self,
        ctx: &Context,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<TemplateVersion>>;

    async fn get_previous_template_version(
        &self,
        ctx: &Context,
        params: GetPreviousTemplateVersionParams,
    ) -> Result<TemplateVersion>;

    async fn get_template_version_parameters(
        &self,
        ctx: &Context,
        template_version_id: Uuid,
    ) -> Result<Vec<TemplateVersionParameter>>;

    async fn insert_template_version(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParams,
    ) -> Result<TemplateVersion>;

    async fn insert_template_version_parameter(
        &self,
        ctx: &Context,
        params: InsertTemplateVersionParameterParams,
    ) -> Result<TemplateVersionParameter>;

    async fn update_template_version_by_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionByIdParams,
    ) -> Result<()>;

    async fn update_template_version_description_by_job_id(
        &self,
        ctx: &Context,
        params: UpdateTemplateVersionDescriptionByJobIdParams,
    ) -> Result<()>;

    // =========================================================================
    // Provisioner jobs
    // =========================================================================

    async fn get_provisioner_job_by_id(&self, ctx: &Context, id: Uuid) -> Result<ProvisionerJob>;

    async fn get_provisioner_jobs_by_ids(
        &self,
        ctx: &Context,
        ids: Vec<Uuid>,
    ) -> Result<Vec<ProvisionerJob>>;

    async fn get_provisioner_logs_by_id_between(
        &self,
        ctx: &Context,
        params: GetProvisionerLogsByIdBetweenParams,
    ) -> Result<Vec<ProvisionerJobLog>>;

    async fn insert_provisioner_job(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobParams,
    ) -> Result<ProvisionerJob>;

    async fn insert_provisioner_job_logs(
        &self,
        ctx: &Context,
        params: InsertProvisionerJobLogsParams,
    ) -> Result<Vec<ProvisionerJobLog>>;

    async fn update_provisioner_job_with_cancel_by_id(
        &self,
        ctx: &Context,
        params: UpdateProvisionerJobWithCancelByIdParams,
    ) -> Result<()>;

    // =========================================================================
    // Workspaces
    // =========================================================================

    async fn get_workspace_by_id(&self, ctx: &Context, id: Uuid) -> Result<Workspace>;

    async fn get_workspace_by_owner_id_and_name(
        &self,
        ctx: &Context,
        params: GetWorkspaceByOwnerIdAndNameParams,
    ) -> Result<Workspace>;

    async fn get_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
    ) -> Result<Vec<Workspace>>;

    async fn get_authorized_workspaces(
        &self,
        ctx: &Context,
        params: GetWorkspacesParams,
        prepared: &dyn PreparedAuthorized,
    ) -> Result<Vec<Workspace>>;

    async fn insert_workspace(&self, ctx: &Context, params: InsertWorkspaceParams)
        -> Result<Workspace>;

    async fn update_workspace(&self, ctx: &Context, params: UpdateWorkspaceParams)
        -> Result<Workspace>;

    async fn update_workspace_deleted_by_id(
        &self,
        ctx: &Context,
        params: UpdateWorkspaceDeletedByIdParams,
    ) -> Result<()>;

    // =========================================================================
    // Workspace builds
    // =========================================================================

    async fn get_workspace_build_by_id(&self, ctx: &Context, id: Uuid) -> Result<WorkspaceBuild>;

    async fn get_workspace_build_by_job_id(
        &self,
        ctx: &Context,
        job_id: Uuid,
    ) -> Result<WorkspaceBuild>;

    async fn get_workspace_builds_by_workspace_id(
        &self,
        ctx: &Context,
        params: GetWorkspaceBuildsByWorkspaceIdParams,
    ) -> Result<Vec<WorkspaceBuild>>;

    async fn get_latest_workspace_build_by_workspace_id(
        &self,
        ctx: &Context,
        workspace_id: Uuid,
    ) -> Result<WorkspaceBuild>;

    async fn insert_workspace_build(
        &self,
        ctx: &Context,
        params: InsertWorkspaceBuildParams,
    ) -> Result<WorkspaceBuild>;

    // =========================================================================
    // Groups
    // =========================================================================

    async fn get_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<Group>;

    async fn get_group_by_org_and_name(
        &self,
        ctx: &Context,
        params: GetGroupByOrgAndNameParams,
    ) -> Result<Group>;

    async fn get_group_members(&self, ctx: &Context, group_id: Uuid) -> Result<Vec<GroupMember>>;

    async fn get_groups_by_organization_id(
        &self,
        ctx: &Context,
        organization_id: Uuid,
    ) -> Result<Vec<Group>>;

    async fn insert_group(&self, ctx: &Context, params: InsertGroupParams) -> Result<Group>;

    async fn insert_all_users_group(&self, ctx: &Context, organization_id: Uuid) -> Result<Group>;

    async fn insert_group_member(&self, ctx: &Context, params: InsertGroupMemberParams)
        -> Result<()>;

    async fn delete_group_member_from_group(
        &self,
        ctx: &Context,
        params: DeleteGroupMemberFromGroupParams,
    ) -> Result<()>;

    async fn update_group_by_id(&self, ctx: &Context, params: UpdateGroupByIdParams)
        -> Result<Group>;

    async fn delete_group_by_id(&self, ctx: &Context, id: Uuid) -> Result<()>;

    // =========================================================================
    // Files
    // =========================================================================

    async fn get_file_by_id(&self, ctx: &Context, id: Uuid) -> Result<File>;

    async fn get_file_by_hash_and_creator(
        &self,
        ctx: &Context,
        params: GetFileByHashAndCreatorParams,
    ) -> Result<File>;

    async fn insert_file(&self, ctx: &Context, params: InsertFileParams) -> Result<File>;
}
