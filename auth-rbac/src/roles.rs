use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{RbacError, Result};
use crate::models::{Action, ResourceType};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";
pub const ROLE_AUDITOR: &str = "auditor";
pub const ROLE_TEMPLATE_ADMIN: &str = "template-admin";
pub const ROLE_USER_ADMIN: &str = "user-admin";
pub const ROLE_ORG_ADMIN: &str = "organization-admin";
pub const ROLE_ORG_MEMBER: &str = "organization-member";

/// A set of actions on one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub resource_type: ResourceType,
    pub actions: Vec<Action>,
}

impl Permission {
    pub fn new(resource_type: ResourceType, actions: &[Action]) -> Self {
        Self {
            resource_type,
            actions: actions.to_vec(),
        }
    }

    pub fn all(resource_type: ResourceType) -> Self {
        Self::new(resource_type, &Action::ALL)
    }

    pub fn grants(&self, resource_type: ResourceType, action: Action) -> bool {
        (self.resource_type == ResourceType::Wildcard || self.resource_type == resource_type)
            && self.actions.contains(&action)
    }
}

/// A named bundle of permissions at three scopes
///
/// - `site` applies to every object regardless of org or owner
/// - `org` applies to objects inside the keyed organization
/// - `user` applies to objects owned by the actor
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Role {
    pub name: String,
    pub site: Vec<Permission>,
    pub org: BTreeMap<Uuid, Vec<Permission>>,
    pub user: Vec<Permission>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_site(mut self, permissions: Vec<Permission>) -> Self {
        self.site = permissions;
        self
    }

    pub fn with_org(mut self, org_id: Uuid, permissions: Vec<Permission>) -> Self {
        self.org.insert(org_id, permissions);
        self
    }

    pub fn with_user(mut self, permissions: Vec<Permission>) -> Self {
        self.user = permissions;
        self
    }

    pub fn site_grants(&self, resource_type: ResourceType, action: Action) -> bool {
        self.site.iter().any(|p| p.grants(resource_type, action))
    }

    pub fn org_grants(&self, org_id: Uuid, resource_type: ResourceType, action: Action) -> bool {
        self.org
            .get(&org_id)
            .is_some_and(|perms| perms.iter().any(|p| p.grants(resource_type, action)))
    }

    pub fn user_grants(&self, resource_type: ResourceType, action: Action) -> bool {
        self.user.iter().any(|p| p.grants(resource_type, action))
    }

    /// Organizations this role is scoped to. Holding any such role makes the
    /// actor a member of that organization.
    pub fn orgs(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.org.keys().copied()
    }
}

pub fn role_owner() -> Role {
    Role::new(ROLE_OWNER).with_site(vec![Permission::all(ResourceType::Wildcard)])
}

pub fn role_member() -> Role {
    Role::new(ROLE_MEMBER).with_user(vec![Permission::all(ResourceType::Wildcard)])
}

pub fn role_auditor() -> Role {
    Role::new(ROLE_AUDITOR).with_site(vec![Permission::new(
        ResourceType::Wildcard,
        &[Action::Read],
    )])
}

pub fn role_template_admin() -> Role {
    Role::new(ROLE_TEMPLATE_ADMIN).with_site(vec![
        Permission::all(ResourceType::Template),
        Permission::all(ResourceType::File),
        Permission::all(ResourceType::ProvisionerDaemon),
        Permission::new(ResourceType::Workspace, &[Action::Read]),
        Permission::new(ResourceType::Group, &[Action::Read]),
    ])
}

pub fn role_user_admin() -> Role {
    Role::new(ROLE_USER_ADMIN).with_site(vec![
        Permission::all(ResourceType::User),
        Permission::all(ResourceType::Group),
        Permission::all(ResourceType::OrganizationMember),
    ])
}

pub fn role_org_admin(org_id: Uuid) -> Role {
    Role::new(format!("{ROLE_ORG_ADMIN}:{org_id}"))
        .with_org(org_id, vec![Permission::all(ResourceType::Wildcard)])
}

pub fn role_org_member(org_id: Uuid) -> Role {
    Role::new(format!("{ROLE_ORG_MEMBER}:{org_id}")).with_org(
        org_id,
        vec![
            Permission::new(ResourceType::Organization, &[Action::Read]),
            Permission::new(ResourceType::OrganizationMember, &[Action::Read]),
            Permission::new(ResourceType::Group, &[Action::Read]),
        ],
    )
}

/// Resolve a built-in role by name
///
/// Org-scoped roles are written `<role>:<org uuid>`.
pub fn role_by_name(name: &str) -> Result<Role> {
    if let Some((base, scope)) = name.split_once(':') {
        let org_id =
            Uuid::parse_str(scope).map_err(|_| RbacError::InvalidRoleScope(name.to_string()))?;
        return match base {
            ROLE_ORG_ADMIN => Ok(role_org_admin(org_id)),
            ROLE_ORG_MEMBER => Ok(role_org_member(org_id)),
            _ => Err(RbacError::UnknownRole(name.to_string())),
        };
    }

    match name {
        ROLE_OWNER => Ok(role_owner()),
        ROLE_MEMBER => Ok(role_member()),
        ROLE_AUDITOR => Ok(role_auditor()),
        ROLE_TEMPLATE_ADMIN => Ok(role_template_admin()),
        ROLE_USER_ADMIN => Ok(role_user_admin()),
        _ => Err(RbacError::UnknownRole(name.to_string())),
    }
}

pub fn org_admin_role_name(org_id: Uuid) -> String {
    format!("{ROLE_ORG_ADMIN}:{org_id}")
}

pub fn org_member_role_name(org_id: Uuid) -> String {
    format!("{ROLE_ORG_MEMBER}:{org_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_permission_matches_every_type() {
        let p = Permission::new(ResourceType::Wildcard, &[Action::Read]);
        assert!(p.grants(ResourceType::Template, Action::Read));
        assert!(p.grants(ResourceType::File, Action::Read));
        assert!(!p.grants(ResourceType::File, Action::Delete));
    }

    #[test]
    fn resolves_scoped_roles() {
        let org = Uuid::new_v4();
        let role = role_by_name(&org_admin_role_name(org)).unwrap();
        assert!(role.org_grants(org, ResourceType::Workspace, Action::Delete));
        assert!(!role.org_grants(Uuid::new_v4(), ResourceType::Workspace, Action::Delete));
        assert_eq!(role.orgs().collect::<Vec<_>>(), vec![org]);
    }

    #[test]
    fn rejects_unknown_and_malformed_roles() {
        assert_eq!(
            role_by_name("wizard"),
            Err(RbacError::UnknownRole("wizard".into()))
        );
        assert_eq!(
            role_by_name("organization-admin:not-a-uuid"),
            Err(RbacError::InvalidRoleScope(
                "organization-admin:not-a-uuid".into()
            ))
        );
        assert!(role_by_name(&format!("wizard:{}", Uuid::new_v4())).is_err());
    }

    #[test]
    fn template_admin_reads_but_cannot_edit_workspaces() {
        let role = role_template_admin();
        assert!(role.site_grants(ResourceType::Template, Action::Delete));
        assert!(role.site_grants(ResourceType::Workspace, Action::Read));
        assert!(!role.site_grants(ResourceType::Workspace, Action::Update));
    }
}
