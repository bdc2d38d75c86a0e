use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// An action an actor may perform on a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of resources the policy knows about
///
/// `Wildcard` only appears in role permissions, where it matches every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    #[serde(rename = "*")]
    Wildcard,
    System,
    Organization,
    OrganizationMember,
    User,
    Group,
    Template,
    Workspace,
    File,
    ProvisionerDaemon,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Wildcard => "*",
            ResourceType::System => "system",
            ResourceType::Organization => "organization",
            ResourceType::OrganizationMember => "organization_member",
            ResourceType::User => "user",
            ResourceType::Group => "group",
            ResourceType::Template => "template",
            ResourceType::Workspace => "workspace",
            ResourceType::File => "file",
            ResourceType::ProvisionerDaemon => "provisioner_daemon",
        }
    }

    /// A bare object of this type: no org, no owner, no ACL
    pub fn object(self) -> Object {
        Object {
            resource_type: self,
            id: None,
            owner: None,
            org_id: None,
            acl_user_list: BTreeMap::new(),
            acl_group_list: BTreeMap::new(),
        }
    }

    /// "Any resource of this type in the organization"
    pub fn in_org(self, org_id: Uuid) -> Object {
        self.object().in_org(org_id)
    }

    pub fn with_owner(self, owner: Uuid) -> Object {
        self.object().with_owner(owner)
    }

    pub fn with_id(self, id: impl ToString) -> Object {
        self.object().with_id(id)
    }

    /// Every resource of this type across the deployment. Only site-wide
    /// permissions can grant it.
    pub fn all(self) -> Object {
        self.object()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The calling identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    /// Role names, e.g. `owner` or `organization-admin:<org id>`
    pub roles: Vec<String>,
    /// Groups the actor belongs to; matched against group ACLs
    pub groups: Vec<Uuid>,
}

impl Actor {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            roles: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_groups(mut self, groups: Vec<Uuid>) -> Self {
        self.groups = groups;
        self
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor:{}", self.id)
    }
}

/// The thing a policy decision is made about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Object {
    pub resource_type: ResourceType,
    pub id: Option<String>,
    pub owner: Option<Uuid>,
    pub org_id: Option<Uuid>,
    pub acl_user_list: BTreeMap<Uuid, Vec<Action>>,
    pub acl_group_list: BTreeMap<Uuid, Vec<Action>>,
}

impl Object {
    pub fn with_id(mut self, id: impl ToString) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn in_org(mut self, org_id: Uuid) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_owner(mut self, owner: Uuid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_acl_user_list(mut self, acl: BTreeMap<Uuid, Vec<Action>>) -> Self {
        self.acl_user_list = acl;
        self
    }

    pub fn with_group_acl(mut self, acl: BTreeMap<Uuid, Vec<Action>>) -> Self {
        self.acl_group_list = acl;
        self
    }

    /// ACL entry grants `action` to `actor` directly or through a group
    pub(crate) fn acl_grants(&self, actor: &Actor, action: Action) -> bool {
        if self
            .acl_user_list
            .get(&actor.id)
            .is_some_and(|actions| actions.contains(&action))
        {
            return true;
        }
        actor.groups.iter().any(|group| {
            self.acl_group_list
                .get(group)
                .is_some_and(|actions| actions.contains(&action))
        })
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.resource_type)?;
        if let Some(ref id) = self.id {
            write!(f, ":{id}")?;
        }
        if let Some(org) = self.org_id {
            write!(f, " org={org}")?;
        }
        if let Some(owner) = self.owner {
            write!(f, " owner={owner}")?;
        }
        Ok(())
    }
}

/// Anything that can produce an authorization object
pub trait Objecter {
    fn rbac_object(&self) -> Object;
}

impl Objecter for Object {
    fn rbac_object(&self) -> Object {
        self.clone()
    }
}

impl<T: Objecter + ?Sized> Objecter for &T {
    fn rbac_object(&self) -> Object {
        (**self).rbac_object()
    }
}
