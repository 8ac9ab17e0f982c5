//! Failed partition reads leave the cache as it was.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rollcall_app::{
    Caches, CascadeInvalidator, Clock, ExecutionContext, FetchPolicy, RemoteError, RemoteResult,
    SessionRemote, SessionRepository, SystemClock, TtlConfig,
};
use rollcall_core::{
    GroupId, NewGroup, NewProfile, NewSession, ProfileId, Session, SessionId, SessionUpdate,
    UserRole,
};
use rollcall_store_memory::MemoryRemote;

/// Memory store whose session reads fail while `offline` is set.
struct FlakySessions {
    inner: MemoryRemote,
    offline: AtomicBool,
}

impl FlakySessions {
    fn reachable(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(RemoteError::Failure("connection reset".into()))
        } else {
            Ok(())
        }
    }
}

impl SessionRemote for FlakySessions {
    async fn sessions_by_group(&self, group: GroupId) -> RemoteResult<Vec<Session>> {
        self.reachable()?;
        SessionRemote::sessions_by_group(&self.inner, group).await
    }

    async fn session(&self, id: SessionId) -> RemoteResult<Session> {
        self.reachable()?;
        SessionRemote::session(&self.inner, id).await
    }

    async fn recent_sessions(&self, group: GroupId, limit: usize) -> RemoteResult<Vec<Session>> {
        self.reachable()?;
        SessionRemote::recent_sessions(&self.inner, group, limit).await
    }

    async fn create_session(&self, new: NewSession) -> RemoteResult<Session> {
        SessionRemote::create_session(&self.inner, new).await
    }

    async fn update_session(&self, id: SessionId, update: &SessionUpdate) -> RemoteResult<Session> {
        SessionRemote::update_session(&self.inner, id, update).await
    }

    async fn delete_session(&self, id: SessionId) -> RemoteResult<()> {
        SessionRemote::delete_session(&self.inner, id).await
    }
}

fn setup(context: ExecutionContext) -> (Arc<FlakySessions>, SessionRepository<FlakySessions>, GroupId) {
    let inner = MemoryRemote::default();
    let owner = ProfileId::new();
    inner
        .insert_profile(NewProfile {
            id: owner,
            username: "owner".into(),
            full_name: "Owner".into(),
            role: UserRole::Member,
            organization_id: None,
            bio: None,
            avatar_url: None,
        })
        .expect("insert profile");
    inner.sign_in(owner);
    let group = inner
        .insert_group(NewGroup {
            name: "swimmers".into(),
            ..NewGroup::default()
        })
        .expect("insert group");
    inner
        .insert_session(NewSession {
            name: "Friday".into(),
            description: None,
            delay: 0,
            group_id: group.id,
        })
        .expect("insert session");

    let remote = Arc::new(FlakySessions {
        inner,
        offline: AtomicBool::new(false),
    });
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let caches = Caches::new(&TtlConfig::default(), &clock);
    let repo = SessionRepository::new(
        Arc::clone(&remote),
        Arc::clone(&caches.sessions),
        FetchPolicy::new(context),
        CascadeInvalidator::new(caches),
    );
    (remote, repo, group.id)
}

#[tokio::test]
async fn failed_read_returns_nothing_and_keeps_the_partition() {
    let (remote, repo, group) = setup(ExecutionContext::Client);
    let cached = repo.fetch_sessions_by_group(group, false).await;
    assert_eq!(cached.len(), 1);

    remote.offline.store(true, Ordering::SeqCst);
    let during_outage = repo.fetch_sessions_by_group(group, false).await;

    assert!(during_outage.is_empty());
    assert!(repo.last_error().unwrap().contains("connection reset"));
    assert!(!repo.is_loading());
    assert_eq!(repo.sessions(group), cached);
    assert!(repo.is_fresh(group));

    remote.offline.store(false, Ordering::SeqCst);
    let recovered = repo.fetch_sessions_by_group(group, false).await;
    assert_eq!(recovered, cached);
    assert!(repo.last_error().is_none());
}

#[tokio::test]
async fn failed_forced_read_does_not_touch_a_valid_partition() {
    let (remote, repo, group) = setup(ExecutionContext::Server);
    let cached = repo.fetch_sessions_by_group(group, false).await;

    remote.offline.store(true, Ordering::SeqCst);
    assert!(repo.fetch_sessions_by_group(group, true).await.is_empty());
    assert!(repo.last_error().is_some());

    // Still valid, so the next unforced read is served from the cache.
    assert_eq!(repo.fetch_sessions_by_group(group, false).await, cached);
}

#[tokio::test]
async fn failed_point_read_yields_none() {
    let (remote, repo, group) = setup(ExecutionContext::Client);
    let id = remote.inner.sessions_by_group(group).unwrap()[0].id;

    remote.offline.store(true, Ordering::SeqCst);
    assert!(repo.fetch_session(id).await.is_none());
    assert!(repo.last_error().is_some());
    assert!(repo.session(id).is_none());
}
