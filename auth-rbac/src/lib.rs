//! Role-based policy evaluation for the workspace control plane
//!
//! This crate is the policy side of the authorization layer:
//! - the vocabulary (`Actor`, `Action`, `ResourceType`, `Object`)
//! - built-in roles at site, organization and user scope
//! - the `Authorizer` trait every caller depends on
//! - compiled filters (`PreparedAuthorized`) that evaluate in memory or
//!   render into a Postgres `WHERE` clause
//!
//! # Example
//!
//! ```rust
//! use auth_rbac::{Action, Actor, RbacAuthorizer, ResourceType};
//! use uuid::Uuid;
//!
//! let authz = RbacAuthorizer::new();
//! let org = Uuid::new_v4();
//! let admin = Actor::new(Uuid::new_v4())
//!     .with_roles([auth_rbac::roles::org_admin_role_name(org)]);
//!
//! assert!(authz.check(&admin, Action::Create, &ResourceType::Template.in_org(org)).is_ok());
//! assert!(authz.check(&admin, Action::Create, &ResourceType::Template.all()).is_err());
//! ```

pub mod check;
pub mod engine;
pub mod error;
pub mod models;
pub mod prepared;
pub mod recorder;
pub mod roles;

pub use check::RbacAuthorizer;
pub use engine::*;
pub use error::*;
pub use models::*;
pub use prepared::{PreparedAuthorized, RbacFilter, SqlColumns};
pub use recorder::{RecordedCall, RecordingAuthorizer};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    const ORGS: [u128; 3] = [1, 2, 3];
    const USERS: [u128; 3] = [10, 11, 12];
    const GROUPS: [u128; 2] = [20, 21];

    fn action() -> impl Strategy<Value = Action> {
        prop::sample::select(Action::ALL.to_vec())
    }

    fn resource_type() -> impl Strategy<Value = ResourceType> {
        prop::sample::select(vec![
            ResourceType::Template,
            ResourceType::Workspace,
            ResourceType::Group,
            ResourceType::File,
        ])
    }

    fn role_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("owner".to_string()),
            Just("member".to_string()),
            Just("auditor".to_string()),
            Just("template-admin".to_string()),
            Just("user-admin".to_string()),
            prop::sample::select(ORGS.to_vec())
                .prop_map(|o| roles::org_admin_role_name(Uuid::from_u128(o))),
            prop::sample::select(ORGS.to_vec())
                .prop_map(|o| roles::org_member_role_name(Uuid::from_u128(o))),
        ]
    }

    fn actor() -> impl Strategy<Value = Actor> {
        (
            prop::sample::select(USERS.to_vec()),
            prop::collection::vec(role_name(), 0..3),
            prop::sample::subsequence(GROUPS.to_vec(), 0..=2),
        )
            .prop_map(|(id, roles, groups)| {
                Actor::new(Uuid::from_u128(id))
                    .with_roles(roles)
                    .with_groups(groups.into_iter().map(Uuid::from_u128).collect())
            })
    }

    fn acl(keys: &'static [u128]) -> impl Strategy<Value = BTreeMap<Uuid, Vec<Action>>> {
        prop::collection::btree_map(
            prop::sample::select(keys.to_vec()).prop_map(Uuid::from_u128),
            prop::collection::vec(action(), 0..3),
            0..2,
        )
    }

    fn object(rt: ResourceType) -> impl Strategy<Value = Object> {
        (
            prop::option::of(prop::sample::select(USERS.to_vec())),
            prop::option::of(prop::sample::select(ORGS.to_vec())),
            acl(&USERS),
            acl(&GROUPS),
        )
            .prop_map(move |(owner, org, users, groups)| {
                let mut obj = rt.object().with_acl_user_list(users).with_group_acl(groups);
                obj.owner = owner.map(Uuid::from_u128);
                obj.org_id = org.map(Uuid::from_u128);
                obj
            })
    }

    proptest! {
        #[test]
        fn prepared_filter_matches_direct_check(
            actor in actor(),
            action in action(),
            (rt, objects) in resource_type()
                .prop_flat_map(|rt| (Just(rt), prop::collection::vec(object(rt), 1..8))),
        ) {
            let authz = RbacAuthorizer::new();
            let filter = authz.compile(&actor, action, rt).unwrap();
            for obj in &objects {
                prop_assert_eq!(
                    authz.check(&actor, action, obj).is_ok(),
                    filter.authorize(obj).is_ok(),
                    "object {}", obj
                );
            }
        }
    }
}
