// Database models
use auth_rbac::Action;
use chrono::{DateTime, NaiveDate, Utc};
use error_common::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A record type as the persistence layer names it in `NotFound` errors
pub trait Record {
    const RESOURCE: &'static str;
}

impl<T: Record> Record for Vec<T> {
    const RESOURCE: &'static str = T::RESOURCE;
}

macro_rules! record {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(impl Record for $ty {
            const RESOURCE: &'static str = $name;
        })*
    };
}

record! {
    Template => "template",
    TemplateVersion => "template version",
    TemplateVersionParameter => "template version parameter",
    TemplateUser => "template user",
    TemplateGroup => "template group",
    TemplateDauRow => "template daus",
    TemplateAverageBuildTimeRow => "template average build time",
    ProvisionerJob => "provisioner job",
    ProvisionerJobLog => "provisioner job log",
    Workspace => "workspace",
    WorkspaceBuild => "workspace build",
    Group => "group",
    GroupMember => "group member",
    File => "file",
}

pub type AclMap = BTreeMap<Uuid, Vec<Action>>;

// =============================================================================
// Templates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Template {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub organization_id: Uuid,
    pub deleted: bool,
    pub name: String,
    pub display_name: String,
    pub provisioner: String,
    pub active_version_id: Uuid,
    pub description: String,
    pub icon: String,
    /// Default time-to-live of workspaces, in seconds
    pub default_ttl: i64,
    pub created_by: Uuid,
    pub user_acl: AclMap,
    pub group_acl: AclMap,
    pub allow_user_cancel_workspace_jobs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateVersion {
    pub id: Uuid,
    /// Unset while the version is still being imported
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
pub struct TemplateVersionParameter {
    pub template_version_id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub parameter_type: String,
    pub mutable: bool,
    pub default_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateUser {
    pub user_id: Uuid,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateGroup {
    pub group: Group,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDauRow {
    pub date: NaiveDate,
    pub user_id: Uuid,
}

/// Median build durations in milliseconds; `-1.0` when there is no data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAverageBuildTimeRow {
    pub start_median_ms: f64,
    pub stop_median_ms: f64,
    pub delete_median_ms: f64,
}

// =============================================================================
// Provisioner jobs
// =============================================================================

/// Job kinds. Persisted as the string in `ProvisionerJob::job_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionerJobType {
    WorkspaceBuild,
    TemplateVersionImport,
    TemplateVersionDryRun,
}

impl ProvisionerJobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionerJobType::WorkspaceBuild => "workspace_build",
            ProvisionerJobType::TemplateVersionImport => "template_version_import",
            ProvisionerJobType::TemplateVersionDryRun => "template_version_dry_run",
        }
    }
}

impl fmt::Display for ProvisionerJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisionerJobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "workspace_build" => Ok(ProvisionerJobType::WorkspaceBuild),
            "template_version_import" => Ok(ProvisionerJobType::TemplateVersionImport),
            "template_version_dry_run" => Ok(ProvisionerJobType::TemplateVersionDryRun),
            other => Err(Error::unknown_discriminant("provisioner job type", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProvisionerJob {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub organization_id: Uuid,
    pub initiator_id: Uuid,
    pub provisioner: String,
    pub storage_method: String,
    pub file_id: Uuid,
    /// Raw kind column; parse with [`ProvisionerJob::kind`]
    pub job_type: String,
    /// Kind-specific JSON input
    pub input: serde_json::Value,
    pub worker_id: Option<Uuid>,
}

impl ProvisionerJob {
    pub fn kind(&self) -> error_common::Result<ProvisionerJobType> {
        self.job_type.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionerJobLog {
    pub id: i64,
    pub job_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub source: String,
    pub level: String,
    pub stage: String,
    pub output: String,
}

// =============================================================================
// Workspaces
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: Uuid,
    pub organization_id: Uuid,
    pub template_id: Uuid,
    pub deleted: bool,
    pub name: String,
    pub autostart_schedule: Option<String>,
    pub ttl: Option<i64>,
    pub last_used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkspaceTransition {
    #[default]
    Start,
    Stop,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkspaceBuild {
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

// =============================================================================
// Groups and files
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub organization_id: Uuid,
    pub avatar_url: String,
    pub quota_allowance: i32,
}

impl Group {
    /// The group every organization member implicitly belongs to shares
    /// the organization's id
    pub fn is_everyone(&self) -> bool {
        self.id == self.organization_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct File {
    pub id: Uuid,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Uuid,
    pub mimetype: String,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_parses_known_strings() {
        for kind in [
            ProvisionerJobType::WorkspaceBuild,
            ProvisionerJobType::TemplateVersionImport,
            ProvisionerJobType::TemplateVersionDryRun,
        ] {
            let job = ProvisionerJob {
                job_type: kind.to_string(),
                ..Default::default()
            };
            assert_eq!(job.kind(), Ok(kind));
        }
    }

    #[test]
    fn unknown_job_kind_is_a_discriminant_error() {
        let job = ProvisionerJob {
            job_type: "template_version_export".into(),
            ..Default::default()
        };
        assert_eq!(
            job.kind(),
            Err(Error::unknown_discriminant(
                "provisioner job type",
                "template_version_export"
            ))
        );
    }

    #[test]
    fn vec_records_share_the_element_name() {
        assert_eq!(<Vec<WorkspaceBuild> as Record>::RESOURCE, "workspace build");
    }
}
