//! End-to-end behavior of the cache layer over the in-memory remote store.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use rollcall_app::{
    CacheConfig, ErrorKind, ExecutionContext, ManualClock, SyncError, SyncService,
};
use rollcall_core::{
    CHECKIN_DESCRIPTION, Group, GroupId, MemberRole, NewGroup, NewHistoryEntry, NewProfile,
    NewSession, ProfileId, Session, SessionId, SessionStatus, SessionUpdate, UserRole,
};
use rollcall_store_memory::MemoryRemote;
use tempfile::TempDir;
use time::Duration;

struct Fixture {
    remote: Arc<MemoryRemote>,
    owner: ProfileId,
    guest: ProfileId,
    group: Group,
    session: Session,
}

fn add_profile(remote: &MemoryRemote, username: &str) -> ProfileId {
    let id = ProfileId::new();
    remote
        .insert_profile(NewProfile {
            id,
            username: username.into(),
            full_name: username.to_uppercase(),
            role: UserRole::Member,
            organization_id: None,
            bio: None,
            avatar_url: None,
        })
        .expect("insert profile");
    id
}

/// Owner and guest in one group with one open session; the owner is signed in.
fn fixture() -> Fixture {
    let remote = MemoryRemote::default();
    let owner = add_profile(&remote, "owner");
    let guest = add_profile(&remote, "guest");
    remote.sign_in(owner);
    let group = remote
        .insert_group(NewGroup {
            name: "climbers".into(),
            ..NewGroup::default()
        })
        .expect("insert group");
    remote.join_group(group.id, guest).expect("join group");
    let session = remote
        .insert_session(NewSession {
            name: "Monday".into(),
            description: None,
            delay: 10,
            group_id: group.id,
        })
        .expect("insert session");
    Fixture {
        remote: Arc::new(remote),
        owner,
        guest,
        group,
        session,
    }
}

fn service(fx: &Fixture, context: ExecutionContext) -> SyncService<MemoryRemote> {
    SyncService::new(Arc::clone(&fx.remote), CacheConfig::for_context(context))
}

#[tokio::test]
async fn client_reads_always_reach_the_remote() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);

    let first = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    let second = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;

    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(fx.remote.calls("sessions_by_group"), 2);
}

#[tokio::test]
async fn server_reads_trust_the_cache_until_the_ttl_expires() {
    let fx = fixture();
    let clock = Arc::new(ManualClock::default());
    let service = SyncService::with_clock(
        Arc::clone(&fx.remote),
        CacheConfig::for_context(ExecutionContext::Server),
        clock.clone(),
    );

    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert_eq!(fx.remote.calls("sessions_by_group"), 1);

    clock.advance(Duration::seconds(299));
    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert_eq!(fx.remote.calls("sessions_by_group"), 1);

    clock.advance(Duration::seconds(1));
    assert!(!service.sessions().is_fresh(fx.group.id));
    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert_eq!(fx.remote.calls("sessions_by_group"), 2);

    service.sessions().fetch_sessions_by_group(fx.group.id, true).await;
    assert_eq!(fx.remote.calls("sessions_by_group"), 3);
}

#[tokio::test]
async fn session_mutations_invalidate_the_group_partition() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Server);

    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert!(service.sessions().is_fresh(fx.group.id));

    let created = service
        .sessions()
        .create_session(NewSession {
            name: "Tuesday".into(),
            description: None,
            delay: 5,
            group_id: fx.group.id,
        })
        .await
        .expect("create session");
    assert!(!service.sessions().is_fresh(fx.group.id));
    assert_eq!(service.sessions().session(created.id), Some(created.clone()));

    let listed = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert_eq!(fx.remote.calls("sessions_by_group"), 2);
    assert_eq!(listed.first().map(|s| s.id), Some(created.id));

    service
        .sessions()
        .update_session(
            fx.session.id,
            &SessionUpdate {
                status: Some(SessionStatus::Closed),
                ..SessionUpdate::default()
            },
        )
        .await
        .expect("close session");
    assert!(!service.sessions().is_fresh(fx.group.id));
}

#[tokio::test]
async fn failed_create_records_the_error_and_keeps_the_partition() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);

    let before = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    fx.remote.sign_out();
    let err = service
        .sessions()
        .create_session(NewSession {
            name: "Nope".into(),
            description: None,
            delay: 0,
            group_id: fx.group.id,
        })
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(service.sessions().last_error().is_some());
    assert_eq!(service.sessions().sessions(fx.group.id), before);
}

#[tokio::test]
async fn checkin_happens_once_per_member_and_session() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);
    fx.remote.sign_in(fx.guest);

    let entry = service
        .perform_checkin(fx.session.id, None)
        .await
        .expect("first check-in");
    assert_eq!(entry.member_id, fx.guest);
    assert_eq!(entry.score, service.config().checkin_score);
    assert!(entry.is_checkin());
    assert_eq!(entry.action_description.as_deref(), Some(CHECKIN_DESCRIPTION));
    assert!(service.history().has_checked_in(fx.session.id, fx.guest));

    let err = service
        .perform_checkin(fx.session.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::DuplicateCheckin { member, .. } if member == fx.guest));
    assert_eq!(fx.remote.calls("insert_history"), 1);

    let fetched = service.history().fetch_session_history(fx.session.id, true).await;
    let checkins = fetched
        .iter()
        .filter(|entry| entry.member_id == fx.guest && entry.is_checkin())
        .count();
    assert_eq!(checkins, 1);
    assert_eq!(service.history().entries(fx.session.id), fetched);
}

#[tokio::test]
async fn checkin_requires_an_open_session() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);

    for status in [SessionStatus::Pending, SessionStatus::Closed] {
        fx.remote
            .update_session(
                fx.session.id,
                &SessionUpdate {
                    status: Some(status),
                    ..SessionUpdate::default()
                },
            )
            .expect("change status");
        let err = service
            .perform_checkin(fx.session.id, Some(fx.guest))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::SessionNotOpen { status: got, .. } if got == status));
    }
    assert_eq!(fx.remote.calls("insert_history"), 0);

    let missing = service
        .perform_checkin(SessionId::new(), Some(fx.guest))
        .await
        .unwrap_err();
    assert!(matches!(missing, SyncError::SessionNotFound(_)));
    assert_eq!(missing.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn member_scores_sum_history_across_sessions() {
    let fx = fixture();
    let second = fx
        .remote
        .insert_session(NewSession {
            name: "Tuesday".into(),
            description: None,
            delay: 0,
            group_id: fx.group.id,
        })
        .expect("second session");
    for (session, score) in [(fx.session.id, 100), (second.id, 50), (second.id, -20)] {
        fx.remote
            .insert_history(NewHistoryEntry {
                session_id: session,
                member_id: fx.guest,
                action: "bonus".into(),
                action_description: None,
                score: Some(score),
            })
            .expect("insert history");
    }
    let service = service(&fx, ExecutionContext::Client);

    let members = service.members().fetch_group_members(fx.group.id, false).await;

    assert_eq!(members.len(), 2);
    assert_eq!(members[0].profile_id, fx.owner);
    assert_eq!(members[0].role, MemberRole::Owner);
    assert_eq!(members[0].score, 0);
    assert_eq!(members[1].profile_id, fx.guest);
    assert_eq!(members[1].score, 130);
    assert_eq!(service.history().user_session_score(second.id, fx.guest), 0);

    service.history().fetch_session_history(second.id, false).await;
    assert_eq!(service.history().user_session_score(second.id, fx.guest), 30);
}

#[tokio::test]
async fn member_mutations_respect_cache_and_permissions() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);

    let err = service
        .members()
        .remove_member(fx.group.id, fx.guest)
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::MemberNotCached { .. }));
    assert_eq!(fx.remote.calls("remove_member"), 0);

    service.members().fetch_group_members(fx.group.id, false).await;
    let promoted = service
        .members()
        .update_member_role(fx.group.id, fx.guest, MemberRole::Admin)
        .await
        .expect("owner promotes guest");
    assert_eq!(promoted.role, MemberRole::Admin);
    assert!(service.members().permissions(fx.group.id, fx.guest).can_remove_members);
    assert!(!service.members().permissions(fx.group.id, fx.guest).can_update_roles);

    fx.remote.sign_in(fx.guest);
    let denied = service
        .members()
        .remove_member(fx.group.id, fx.owner)
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::PermissionDenied);
    assert!(service.members().member(fx.group.id, fx.owner).is_some());

    fx.remote.sign_in(fx.owner);
    service
        .members()
        .remove_member(fx.group.id, fx.guest)
        .await
        .expect("owner removes guest");
    assert_eq!(service.members().members(fx.group.id).len(), 1);
}

#[tokio::test]
async fn login_and_logout_reset_identity_scoped_caches() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);

    let groups = service.login(fx.owner).await.expect("login");
    assert_eq!(groups.len(), 1);
    assert_eq!(service.profiles().my_profile().map(|p| p.id), Some(fx.owner));
    assert_eq!(service.groups().group(fx.group.id), Some(fx.group.clone()));

    assert!(service.profiles().fetch_profile(fx.guest).await.is_some());
    assert_eq!(service.caches().profiles.lock().unwrap().len(), 2);

    service.logout();
    assert!(service.profiles().my_profile().is_none());
    assert!(service.caches().profiles.lock().unwrap().is_empty());
    assert!(service.profiles().profile(fx.guest).is_none());
    assert_eq!(service.groups().cached_len(), 0);

    let calls = fx.remote.calls("memberships_of");
    let again = service.groups().fetch_user_groups(Some(fx.owner)).await;
    assert_eq!(again.len(), 1);
    assert_eq!(fx.remote.calls("memberships_of"), calls + 1);
}

#[tokio::test]
async fn point_caches_survive_a_restart_through_the_snapshot() {
    let fx = fixture();
    let dir = TempDir::with_prefix("rollcall-persist-").expect("temp dir");
    let path = dir.path().join("cache.json");

    let first = service(&fx, ExecutionContext::Client);
    first.login(fx.owner).await.expect("login");
    first.persist(&path).expect("persist");

    let second = service(&fx, ExecutionContext::Client);
    second.restore(&path).expect("restore");
    assert_eq!(second.groups().group(fx.group.id), Some(fx.group.clone()));
    assert_eq!(second.profiles().my_profile().map(|p| p.id), Some(fx.owner));

    let calls = fx.remote.calls("group");
    assert!(second.groups().fetch_group(fx.group.id).await.is_some());
    assert_eq!(fx.remote.calls("group"), calls);
}

#[tokio::test]
async fn deleting_a_group_leaves_its_partitions_alone() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Server);
    assert!(service.groups().fetch_group(fx.group.id).await.is_some());
    let members = service.members().fetch_group_members(fx.group.id, false).await;
    let sessions = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;

    service
        .groups()
        .delete_group(fx.group.id)
        .await
        .expect("owner deletes group");

    assert!(service.groups().group(fx.group.id).is_none());
    assert_eq!(service.members().members(fx.group.id), members);
    assert_eq!(service.sessions().sessions(fx.group.id), sessions);
    assert!(service.sessions().is_fresh(fx.group.id));
    assert!(
        service
            .caches()
            .members
            .lock()
            .unwrap()
            .store
            .is_valid(&fx.group.id)
    );
}

#[tokio::test]
async fn deleting_a_session_invalidates_its_group_partition() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Server);
    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert!(service.sessions().is_fresh(fx.group.id));

    service
        .sessions()
        .delete_session(fx.session.id)
        .await
        .expect("delete session");

    assert!(!service.sessions().is_fresh(fx.group.id));
    assert!(service.sessions().session(fx.session.id).is_none());
    assert!(service.sessions().sessions(fx.group.id).is_empty());

    let listed = service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    assert!(listed.is_empty());
    assert_eq!(fx.remote.calls("sessions_by_group"), 2);
}

#[tokio::test]
async fn refresh_reads_bypass_valid_caches() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Server);

    service.sessions().fetch_sessions_by_group(fx.group.id, false).await;
    let sessions = service.sessions().refresh_group_sessions(fx.group.id).await;
    assert_eq!(sessions.len(), 1);
    assert_eq!(fx.remote.calls("sessions_by_group"), 2);
    assert!(service.sessions().is_fresh(fx.group.id));

    let point_reads = fx.remote.calls("session");
    assert!(service.sessions().fetch_session(fx.session.id).await.is_some());
    assert_eq!(fx.remote.calls("session"), point_reads);
    assert!(service.sessions().refresh_session(fx.session.id).await.is_some());
    assert_eq!(fx.remote.calls("session"), point_reads + 1);

    service.members().fetch_group_members(fx.group.id, false).await;
    let members = service.members().refresh_group_members(fx.group.id).await;
    assert_eq!(members.len(), 2);
    assert_eq!(fx.remote.calls("group_members"), 2);

    service.history().fetch_session_history(fx.session.id, false).await;
    service.history().refresh_session_history(fx.session.id).await;
    assert_eq!(fx.remote.calls("session_history"), 2);

    let group_reads = fx.remote.calls("group");
    service.groups().fetch_group(fx.group.id).await;
    service.groups().fetch_group(fx.group.id).await;
    assert_eq!(fx.remote.calls("group"), group_reads + 1);
    assert_eq!(service.groups().refresh_group(fx.group.id).await, Some(fx.group.clone()));
    assert_eq!(fx.remote.calls("group"), group_reads + 2);
}

#[tokio::test]
async fn my_profile_failures_propagate_while_point_reads_swallow_them() {
    let fx = fixture();
    let service = service(&fx, ExecutionContext::Client);
    fx.remote.sign_out();

    let err = service.profiles().fetch_my_profile(None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
    assert!(service.profiles().last_error().is_some());
    assert!(service.profiles().my_profile().is_none());

    assert!(service.profiles().fetch_profile(ProfileId::new()).await.is_none());
    assert!(service.profiles().last_error().is_some());
    assert!(service.groups().fetch_group(GroupId::new()).await.is_none());
    assert!(service.groups().last_error().is_some());
    assert!(service.sessions().fetch_session(SessionId::new()).await.is_none());
    assert!(service.sessions().last_error().is_some());
}
