use async_trait::async_trait;

use crate::{
    check::RbacAuthorizer,
    error::Result,
    models::{Action, Actor, Object, ResourceType},
    prepared::PreparedAuthorized,
};

// =============================================================================
// Policy evaluator contract
// =============================================================================

/// The policy evaluator the authorization layer talks to
///
/// `authorize` answers a single question. `prepare` compiles the answer for
/// every object of a resource type so that a store can filter at the source.
#[cfg_attr(feature = "testing", mockall::automock)]
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn authorize(&self, actor: &Actor, action: Action, object: &Object) -> Result<()>;

    async fn prepare(
        &self,
        actor: &Actor,
        action: Action,
        resource_type: ResourceType,
    ) -> Result<Box<dyn PreparedAuthorized>>;
}

#[async_trait]
impl Authorizer for RbacAuthorizer {
    async fn authorize(&self, actor: &Actor, action: Action, object: &Object) -> Result<()> {
        self.check(actor, action, object)
    }

    async fn prepare(
        &self,
        actor: &Actor,
        action: Action,
        resource_type: ResourceType,
    ) -> Result<Box<dyn PreparedAuthorized>> {
        let filter = self.compile(actor, action, resource_type)?;
        Ok(Box::new(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::org_member_role_name;
    use std::sync::Arc;
    use uuid::Uuid;

    #[tokio::test]
    async fn prepared_filter_agrees_with_authorize() {
        let authz: Arc<dyn Authorizer> = Arc::new(RbacAuthorizer::new());
        let org = Uuid::new_v4();
        let actor = Actor::new(Uuid::new_v4())
            .with_roles(["member".to_string(), org_member_role_name(org)]);

        let mine = ResourceType::Workspace.with_owner(actor.id).in_org(org);
        let theirs = ResourceType::Workspace.with_owner(Uuid::new_v4()).in_org(org);

        let filter = authz
            .prepare(&actor, Action::Read, ResourceType::Workspace)
            .await
            .unwrap();

        for obj in [&mine, &theirs] {
            assert_eq!(
                authz.authorize(&actor, Action::Read, obj).await.is_ok(),
                filter.authorize(obj).is_ok(),
                "disagreement on {obj}"
            );
        }
        assert!(filter.authorize(&mine).is_ok());
        assert!(filter.authorize(&theirs).is_err());
    }
}
