// Authorization objects derived from records
use auth_rbac::{Object, Objecter, ResourceType};

use crate::models::{File, Group, Template, Workspace};

impl Objecter for Template {
    fn rbac_object(&self) -> Object {
        ResourceType::Template
            .with_id(self.id)
            .in_org(self.organization_id)
            .with_acl_user_list(self.user_acl.clone())
            .with_group_acl(self.group_acl.clone())
    }
}

impl Objecter for Workspace {
    fn rbac_object(&self) -> Object {
        ResourceType::Workspace
            .with_id(self.id)
            .in_org(self.organization_id)
            .with_owner(self.owner_id)
    }
}

impl Objecter for Group {
    fn rbac_object(&self) -> Object {
        ResourceType::Group.with_id(self.id).in_org(self.organization_id)
    }
}

impl Objecter for File {
    fn rbac_object(&self) -> Object {
        ResourceType::File.with_id(self.id).with_owner(self.created_by)
    }
}
