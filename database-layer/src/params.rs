// Query parameters. One struct per store operation that takes more than an id.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{AclMap, ProvisionerJobType, WorkspaceTransition};

// Templates

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplateByOrganizationAndNameParams {
    pub organization_id: Uuid,
    pub name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplatesWithFilterParams {
    pub deleted: bool,
    pub organization_id: Option<Uuid>,
    /// Case-insensitive exact match
    pub exact_name: Option<String>,
    /// Restrict to these ids when non-empty
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertTemplateParams {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub organization_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub provisioner: String,
    pub active_version_id: Uuid,
    pub description: String,
    pub icon: String,
    pub default_ttl: i64,
    pub created_by: Uuid,
    pub user_acl: AclMap,
    pub group_acl: AclMap,
    pub allow_user_cancel_workspace_jobs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateAclByIdParams {
    pub id: Uuid,
    pub user_acl: AclMap,
    pub group_acl: AclMap,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateActiveVersionByIdParams {
    pub id: Uuid,
    pub active_version_id: Uuid,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateMetaByIdParams {
    pub id: Uuid,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon: String,
    pub default_ttl: i64,
    pub allow_user_cancel_workspace_jobs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateDeletedByIdParams {
    pub id: Uuid,
    pub deleted: bool,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplateAverageBuildTimeParams {
    /// `None` averages over every template
    pub template_id: Option<Uuid>,
    pub start_time: DateTime<Utc>,
}

// Template versions

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplateVersionByOrganizationAndNameParams {
    pub organization_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplateVersionByTemplateIdAndNameParams {
    pub template_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetTemplateVersionsByTemplateIdParams {
    pub template_id: Uuid,
    /// Cursor: only versions created after this one
    pub after_id: Option<Uuid>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetPreviousTemplateVersionParams {
    pub organization_id: Uuid,
    pub name: String,
    pub template_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertTemplateVersionParams {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub organization_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub readme: String,
    pub job_id: Uuid,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertTemplateVersionParameterParams {
    pub template_version_id: Uuid,
    pub name: String,
    pub description: String,
    pub parameter_type: String,
    pub mutable: bool,
    pub default_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateVersionByIdParams {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateTemplateVersionDescriptionByJobIdParams {
    pub job_id: Uuid,
    pub readme: String,
    pub updated_at: DateTime<Utc>,
}

// Provisioner jobs

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetProvisionerLogsByIdBetweenParams {
    pub job_id: Uuid,
    /// Exclusive lower bound on log id
    pub created_after: Option<i64>,
    /// Exclusive upper bound on log id
    pub created_before: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertProvisionerJobParams {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub organization_id: Uuid,
    pub initiator_id: Uuid,
    pub provisioner: String,
    pub storage_method: String,
    pub file_id: Uuid,
    pub job_type: ProvisionerJobType,
    pub input: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProvisionerJobLog {
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub level: String,
    pub stage: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertProvisionerJobLogsParams {
    pub job_id: Uuid,
    pub logs: Vec<NewProvisionerJobLog>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateProvisionerJobWithCancelByIdParams {
    pub id: Uuid,
    pub canceled_at: DateTime<Utc>,
}

// Workspaces

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetWorkspaceByOwnerIdAndNameParams {
    pub owner_id: Uuid,
    pub name: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetWorkspacesParams {
    pub deleted: bool,
    pub owner_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub template_ids: Vec<Uuid>,
    /// Case-insensitive substring match on the name
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertWorkspaceParams {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: Uuid,
    pub name: String,
    pub autostart_schedule: Option<String>,
    pub ttl: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateWorkspaceParams {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateWorkspaceDeletedByIdParams {
    pub id: Uuid,
    pub deleted: bool,
}

// Workspace builds

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetWorkspaceBuildsByWorkspaceIdParams {
    pub workspace_id: Uuid,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertWorkspaceBuildParams {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub workspace_id: Uuid,
    pub template_version_id: Uuid,
    pub build_number: i32,
    pub transition: WorkspaceTransition,
    pub initiator_id: Uuid,
    pub job_id: Uuid,
    pub deadline: Option<DateTime<Utc>>,
    pub reason: String,
}

// Groups

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetGroupByOrgAndNameParams {
    pub organization_id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertGroupParams {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub avatar_url: String,
    pub quota_allowance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertGroupMemberParams {
    pub user_id: Uuid,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeleteGroupMemberFromGroupParams {
    pub user_id: Uuid,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UpdateGroupByIdParams {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: String,
    pub quota_allowance: i32,
}

// Files

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GetFileByHashAndCreatorParams {
    pub hash: String,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InsertFileParams {
    pub id: Uuid,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub mimetype: String,
    pub data: Vec<u8>,
}
