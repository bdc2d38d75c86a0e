mod common;

use auth_rbac::{Action, Objecter, ResourceType};
use common::*;
use database_layer::*;
use error_common::Error;
use uuid::Uuid;

#[tokio::test]
async fn org_members_read_groups_of_their_org() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    let g = group(h.store(), org, "developers");

    let member = ctx_for(org_member(org));
    assert_eq!(h.querier.get_group_by_id(&member, g.id).await.unwrap(), g);
    assert_eq!(
        h.querier
            .get_group_by_org_and_name(
                &member,
                GetGroupByOrgAndNameParams {
                    organization_id: org,
                    name: "developers".into(),
                },
            )
            .await
            .unwrap(),
        g
    );

    let outsider = ctx_for(org_member(Uuid::new_v4()));
    let err = h.querier.get_group_by_id(&outsider, g.id).await.unwrap_err();
    assert_eq!(err, Error::not_found("group"));
}

#[tokio::test]
async fn org_listing_is_post_filtered() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    group(h.store(), org, "a");
    group(h.store(), org, "b");

    let member = ctx_for(org_member(org));
    let got = h
        .querier
        .get_groups_by_organization_id(&member, org)
        .await
        .unwrap();
    assert_eq!(got.len(), 2);

    let outsider = ctx_for(org_member(Uuid::new_v4()));
    let got = h
        .querier
        .get_groups_by_organization_id(&outsider, org)
        .await
        .unwrap();
    assert!(got.is_empty());
    assert_eq!(
        h.authz.prepared(),
        vec![(Action::Read, ResourceType::Group); 2]
    );
}

#[tokio::test]
async fn membership_changes_update_the_group() {
    let h = Harness::allow_all();
    let g = group(h.store(), Uuid::new_v4(), "ops");
    let user = Uuid::new_v4();
    let ctx = anyone();

    h.querier
        .insert_group_member(&ctx, InsertGroupMemberParams { user_id: user, group_id: g.id })
        .await
        .unwrap();
    let members = h.querier.get_group_members(&ctx, g.id).await.unwrap();
    assert_eq!(members, vec![GroupMember { user_id: user, group_id: g.id }]);
    h.querier
        .delete_group_member_from_group(
            &ctx,
            DeleteGroupMemberFromGroupParams { user_id: user, group_id: g.id },
        )
        .await
        .unwrap();

    assert_eq!(
        h.authz.checked(),
        vec![
            (Action::Update, g.rbac_object()),
            (Action::Read, g.rbac_object()),
            (Action::Update, g.rbac_object()),
        ]
    );
}

#[tokio::test]
async fn org_member_cannot_add_members() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    let g = group(h.store(), org, "ops");

    let err = h
        .querier
        .insert_group_member(
            &ctx_for(org_member(org)),
            InsertGroupMemberParams {
                user_id: Uuid::new_v4(),
                group_id: g.id,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, Error::not_found("group"));
    assert!(h
        .store()
        .get_group_members(&Context::background(), g.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn creating_groups_needs_create_in_org() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();

    let everyone = h
        .querier
        .insert_all_users_group(&ctx_for(org_admin(org)), org)
        .await
        .unwrap();
    assert!(everyone.is_everyone());

    let err = h
        .querier
        .insert_group(
            &ctx_for(org_member(org)),
            InsertGroupParams {
                id: Uuid::new_v4(),
                name: "sneaky".into(),
                organization_id: org,
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
    assert_eq!(
        h.authz.checked(),
        vec![
            (Action::Create, ResourceType::Group.in_org(org)),
            (Action::Create, ResourceType::Group.in_org(org)),
        ]
    );
}

#[tokio::test]
async fn update_and_delete() {
    let h = Harness::allow_all();
    let g = group(h.store(), Uuid::new_v4(), "ops");
    let ctx = anyone();

    let renamed = h
        .querier
        .update_group_by_id(
            &ctx,
            UpdateGroupByIdParams {
                id: g.id,
                name: "sre".into(),
                avatar_url: String::new(),
                quota_allowance: 4,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "sre");

    h.querier.delete_group_by_id(&ctx, g.id).await.unwrap();
    let err = h.querier.get_group_by_id(&ctx, g.id).await.unwrap_err();
    assert_eq!(err, Error::not_found("group"));

    assert_eq!(
        h.authz.checked(),
        vec![
            (Action::Update, g.rbac_object()),
            (Action::Delete, g.rbac_object()),
        ]
    );
}
