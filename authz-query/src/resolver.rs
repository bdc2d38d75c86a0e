//! Related-object resolution
//!
//! Picks the authorization object for records that are not authorized as
//! themselves. Lookups here go straight to the store; the caller performs
//! the single policy check on whatever comes back.

use auth_rbac::{Object, Objecter, ResourceType};
use database_layer::{
    Context, Group, ProvisionerJob, ProvisionerJobType, Store, Template, TemplateVersion,
    Workspace,
};
use error_common::Result;
use tracing::warn;
use uuid::Uuid;

use crate::payload::decode_dry_run_input;

/// The object a policy check is made against
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Related {
    Template(Template),
    /// Placeholder for an unlinked template version: any template in the org
    AnyTemplateInOrg(Uuid),
    /// Placeholder where not even the organization is known
    AnyTemplate,
    Workspace(Workspace),
    Group(Group),
}

impl Objecter for Related {
    fn rbac_object(&self) -> Object {
        match self {
            Related::Template(t) => t.rbac_object(),
            Related::AnyTemplateInOrg(org) => ResourceType::Template.in_org(*org),
            Related::AnyTemplate => ResourceType::Template.all(),
            Related::Workspace(w) => w.rbac_object(),
            Related::Group(g) => g.rbac_object(),
        }
    }
}

/// Parse the persisted job kind; unknown kinds are fatal
pub fn job_kind(job: &ProvisionerJob) -> Result<ProvisionerJobType> {
    job.kind().map_err(|e| {
        warn!(job_id = %job.id, job_type = %job.job_type, "unknown provisioner job type");
        e
    })
}

pub struct Resolver<'a, S: ?Sized> {
    store: &'a S,
    ctx: &'a Context,
}

impl<'a, S: Store + ?Sized> Resolver<'a, S> {
    pub fn new(store: &'a S, ctx: &'a Context) -> Self {
        Self { store, ctx }
    }

    pub async fn template(&self, id: Uuid) -> Result<Related> {
        let template = self
            .ctx
            .run(self.store.get_template_by_id(self.ctx, id))
            .await?;
        Ok(Related::Template(template))
    }

    /// The template, or "any template in `org`" while unlinked
    pub async fn template_or_org(&self, template_id: Option<Uuid>, org: Uuid) -> Result<Related> {
        match template_id {
            Some(id) => self.template(id).await,
            None => Ok(Related::AnyTemplateInOrg(org)),
        }
    }

    /// The template, or "any template" while unlinked
    pub async fn template_or_any(&self, template_id: Option<Uuid>) -> Result<Related> {
        match template_id {
            Some(id) => self.template(id).await,
            None => Ok(Related::AnyTemplate),
        }
    }

    pub async fn template_version(&self, version: &TemplateVersion) -> Result<Related> {
        self.template_or_org(version.template_id, version.organization_id)
            .await
    }

    pub async fn template_version_by_id(&self, id: Uuid) -> Result<Related> {
        let version = self
            .ctx
            .run(self.store.get_template_version_by_id(self.ctx, id))
            .await?;
        self.template_version(&version).await
    }

    pub async fn workspace(&self, id: Uuid) -> Result<Related> {
        let workspace = self
            .ctx
            .run(self.store.get_workspace_by_id(self.ctx, id))
            .await?;
        Ok(Related::Workspace(workspace))
    }

    pub async fn group(&self, id: Uuid) -> Result<Related> {
        let group = self.ctx.run(self.store.get_group_by_id(self.ctx, id)).await?;
        Ok(Related::Group(group))
    }

    /// The template version a template-version job belongs to
    pub async fn job_template_version(
        &self,
        job: &ProvisionerJob,
        kind: ProvisionerJobType,
    ) -> Result<TemplateVersion> {
        match kind {
            ProvisionerJobType::TemplateVersionImport => {
                self.ctx
                    .run(self.store.get_template_version_by_job_id(self.ctx, job.id))
                    .await
            }
            ProvisionerJobType::TemplateVersionDryRun => {
                let input = decode_dry_run_input(job.id, &job.input)?;
                self.ctx
                    .run(
                        self.store
                            .get_template_version_by_id(self.ctx, input.template_version_id),
                    )
                    .await
            }
            ProvisionerJobType::WorkspaceBuild => Err(error_common::Error::internal(format!(
                "job {} is a workspace build, not a template version job",
                job.id
            ))),
        }
    }

    /// Dispatch on the job's kind to the object the job is authorized by
    pub async fn job(&self, job: &ProvisionerJob) -> Result<Related> {
        match job_kind(job)? {
            ProvisionerJobType::WorkspaceBuild => {
                let build = self
                    .ctx
                    .run(self.store.get_workspace_build_by_job_id(self.ctx, job.id))
                    .await?;
                self.workspace(build.workspace_id).await
            }
            kind @ (ProvisionerJobType::TemplateVersionImport
            | ProvisionerJobType::TemplateVersionDryRun) => {
                let version = self.job_template_version(job, kind).await?;
                self.template_version(&version).await
            }
        }
    }

    pub async fn job_by_id(&self, job_id: Uuid) -> Result<Related> {
        let job = self
            .ctx
            .run(self.store.get_provisioner_job_by_id(self.ctx, job_id))
            .await?;
        self.job(&job).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database_layer::{InMemoryStore, WorkspaceBuild};
    use error_common::Error;
    use serde_json::json;

    #[tokio::test]
    async fn unlinked_version_resolves_to_org_placeholder() {
        let store = InMemoryStore::new();
        let ctx = Context::background();
        let org = Uuid::new_v4();
        let tv = TemplateVersion {
            id: Uuid::new_v4(),
            organization_id: org,
            ..Default::default()
        };
        let related = Resolver::new(&store, &ctx).template_version(&tv).await.unwrap();
        assert_eq!(related, Related::AnyTemplateInOrg(org));
        assert_eq!(related.rbac_object(), ResourceType::Template.in_org(org));
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn build_job_resolves_to_workspace() {
        let store = InMemoryStore::new();
        let ctx = Context::background();
        let ws = store.seed(Workspace {
            id: Uuid::new_v4(),
            ..Default::default()
        });
        let job = store.seed(ProvisionerJob {
            id: Uuid::new_v4(),
            job_type: "workspace_build".into(),
            ..Default::default()
        });
        store.seed(WorkspaceBuild {
            id: Uuid::new_v4(),
            workspace_id: ws.id,
            job_id: job.id,
            ..Default::default()
        });

        let related = Resolver::new(&store, &ctx).job(&job).await.unwrap();
        assert_eq!(related, Related::Workspace(ws));
    }

    #[tokio::test]
    async fn dry_run_job_reads_version_from_input() {
        let store = InMemoryStore::new();
        let ctx = Context::background();
        let tpl = store.seed(Template {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            ..Default::default()
        });
        let tv = store.seed(TemplateVersion {
            id: Uuid::new_v4(),
            template_id: Some(tpl.id),
            organization_id: tpl.organization_id,
            ..Default::default()
        });
        let job = ProvisionerJob {
            id: Uuid::new_v4(),
            job_type: "template_version_dry_run".into(),
            input: json!({ "template_version_id": tv.id }),
            ..Default::default()
        };

        let related = Resolver::new(&store, &ctx).job(&job).await.unwrap();
        assert_eq!(related, Related::Template(tpl));
    }

    #[tokio::test]
    async fn unknown_kind_fails_before_any_lookup() {
        let store = InMemoryStore::new();
        let ctx = Context::background();
        let job = ProvisionerJob {
            id: Uuid::new_v4(),
            job_type: "template_version_export".into(),
            ..Default::default()
        };
        let err = Resolver::new(&store, &ctx).job(&job).await.unwrap_err();
        assert!(matches!(err, Error::UnknownDiscriminant { .. }));
        assert_eq!(store.call_count(), 0);
    }
}
