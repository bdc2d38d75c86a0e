mod common;

use auth_rbac::{Action, Actor, Objecter, ResourceType};
use common::*;
use database_layer::*;
use error_common::Error;
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

#[tokio::test]
async fn owner_reads_own_workspace_and_others_see_not_found() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    let tpl = template(h.store(), org);
    let owner = org_member(org);
    let ws = workspace(h.store(), owner.id, &tpl);

    let got = h
        .querier
        .get_workspace_by_id(&ctx_for(owner.clone()), ws.id)
        .await
        .unwrap();
    assert_eq!(got, ws);

    let err = h
        .querier
        .get_workspace_by_id(&ctx_for(org_member(org)), ws.id)
        .await
        .unwrap_err();
    assert_eq!(err, Error::not_found("workspace"));

    let by_name = h
        .querier
        .get_workspace_by_owner_id_and_name(
            &ctx_for(owner),
            GetWorkspaceByOwnerIdAndNameParams {
                owner_id: ws.owner_id,
                name: ws.name.clone(),
                deleted: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(by_name.id, ws.id);
}

#[tokio::test]
async fn listing_returns_only_visible_workspaces() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    let tpl = template(h.store(), org);
    let me = org_member(org);
    let mine = workspace(h.store(), me.id, &tpl);
    workspace(h.store(), Uuid::new_v4(), &tpl);

    let got = h
        .querier
        .get_workspaces(&ctx_for(me), GetWorkspacesParams::default())
        .await
        .unwrap();
    assert_eq!(got, vec![mine]);
    assert_eq!(h.authz.prepared(), vec![(Action::Read, ResourceType::Workspace)]);

    let all = h
        .querier
        .get_workspaces(&ctx_for(org_admin(org)), GetWorkspacesParams::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn insert_checks_create_for_owner_in_org() {
    let h = Harness::allow_all();
    let tpl = template(h.store(), Uuid::new_v4());
    let owner = Uuid::new_v4();

    h.querier
        .insert_workspace(
            &anyone(),
            InsertWorkspaceParams {
                id: Uuid::new_v4(),
                owner_id: owner,
                organization_id: tpl.organization_id,
                template_id: tpl.id,
                name: "dev".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        h.authz.checked(),
        vec![(
            Action::Create,
            ResourceType::Workspace
                .with_owner(owner)
                .in_org(tpl.organization_id)
        )]
    );
}

#[tokio::test]
async fn member_cannot_create_workspace_for_someone_else() {
    let h = Harness::rbac();
    let org = Uuid::new_v4();
    let tpl = template(h.store(), org);
    let me = org_member(org);

    let err = h
        .querier
        .insert_workspace(
            &ctx_for(me),
            InsertWorkspaceParams {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                organization_id: org,
                template_id: tpl.id,
                name: "not-mine".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Forbidden { .. }));
}

#[tokio::test]
async fn soft_delete_checks_delete() {
    let h = Harness::allow_all();
    let tpl = template(h.store(), Uuid::new_v4());
    let ws = workspace(h.store(), Uuid::new_v4(), &tpl);

    h.querier
        .soft_delete_workspace_by_id(&anyone(), ws.id)
        .await
        .unwrap();
    assert_eq!(h.authz.checked(), vec![(Action::Delete, ws.rbac_object())]);
    assert!(
        h.store()
            .get_workspace_by_id(&Context::background(), ws.id)
            .await
            .unwrap()
            .deleted
    );
}

// =============================================================================
// Builds
// =============================================================================

#[tokio::test]
async fn build_reads_check_the_workspace() {
    let h = Harness::allow_all();
    let tpl = template(h.store(), Uuid::new_v4());
    let ws = workspace(h.store(), Uuid::new_v4(), &tpl);
    let (b, job) = build(h.store(), &ws, WorkspaceTransition::Start);
    let ctx = anyone();

    assert_eq!(h.querier.get_workspace_build_by_id(&ctx, b.id).await.unwrap(), b);
    assert_eq!(
        h.querier.get_workspace_build_by_job_id(&ctx, job.id).await.unwrap(),
        b
    );
    assert_eq!(
        h.querier
            .get_latest_workspace_build_by_workspace_id(&ctx, ws.id)
            .await
            .unwrap(),
        b
    );
    let all = h
        .querier
        .get_workspace_builds_by_workspace_id(
            &ctx,
            GetWorkspaceBuildsByWorkspaceIdParams {
                workspace_id: ws.id,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all, vec![b]);

    assert_eq!(h.authz.checked(), vec![(Action::Read, ws.rbac_object()); 4]);
}

#[tokio::test]
async fn build_transition_selects_the_action() {
    let h = Harness::allow_all();
    let tpl = template(h.store(), Uuid::new_v4());
    let ws = workspace(h.store(), Uuid::new_v4(), &tpl);
    let ctx = anyone();

    for (number, transition) in [
        WorkspaceTransition::Start,
        WorkspaceTransition::Stop,
        WorkspaceTransition::Delete,
    ]
    .into_iter()
    .enumerate()
    {
        h.querier
            .insert_workspace_build(
                &ctx,
                InsertWorkspaceBuildParams {
                    id: Uuid::new_v4(),
                    workspace_id: ws.id,
                    build_number: number as i32 + 1,
                    transition,
                    job_id: Uuid::new_v4(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    assert_eq!(
        h.authz.checked(),
        vec![
            (Action::Update, ws.rbac_object()),
            (Action::Update, ws.rbac_object()),
            (Action::Delete, ws.rbac_object()),
        ]
    );
}

#[tokio::test]
async fn build_for_missing_workspace_is_a_relation_error() {
    let h = Harness::allow_all();
    let err = h
        .querier
        .insert_workspace_build(
            &anyone(),
            InsertWorkspaceBuildParams {
                id: Uuid::new_v4(),
                workspace_id: Uuid::new_v4(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::Dependency("resolve workspace build: related workspace not found".into())
    );
}

// =============================================================================
// Filtered listing agrees with per-row checks
// =============================================================================

fn actor_for(users: &[Uuid], orgs: &[Uuid], pick: (usize, u8)) -> Actor {
    let (user, roles) = pick;
    let mut names = vec![auth_rbac::roles::ROLE_MEMBER.to_string()];
    if roles & 1 != 0 {
        names.push(auth_rbac::roles::org_member_role_name(orgs[0]));
    }
    if roles & 2 != 0 {
        names.push(auth_rbac::roles::org_admin_role_name(orgs[1]));
    }
    if roles & 4 != 0 {
        names.push(auth_rbac::roles::ROLE_AUDITOR.to_string());
    }
    Actor::new(users[user]).with_roles(names)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn filtered_listing_matches_per_row_fetch(
        rows in prop::collection::vec((0usize..3, 0usize..2), 0..12),
        pick in (0usize..3, 0u8..8),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            let h = Harness::rbac();
            let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
            let orgs: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
            let templates: Vec<Template> = orgs.iter().map(|org| template(h.store(), *org)).collect();
            let seeded: Vec<Workspace> = rows
                .iter()
                .map(|(user, org)| workspace(h.store(), users[*user], &templates[*org]))
                .collect();

            let ctx = ctx_for(actor_for(&users, &orgs, pick));
            let listed: BTreeSet<Uuid> = h
                .querier
                .get_workspaces(&ctx, GetWorkspacesParams::default())
                .await
                .unwrap()
                .into_iter()
                .map(|w| w.id)
                .collect();

            let mut fetched = BTreeSet::new();
            for ws in &seeded {
                match h.querier.get_workspace_by_id(&ctx, ws.id).await {
                    Ok(w) => { fetched.insert(w.id); }
                    Err(e) => assert_eq!(e, Error::not_found("workspace")),
                }
            }
            assert_eq!(listed, fetched);
        });
    }
}
