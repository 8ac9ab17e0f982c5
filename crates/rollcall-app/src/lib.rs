//! Client-side domain cache and synchronization layer for rollcall.
//!
//! Per-entity caches decide for every read whether cached data can be trusted
//! or must be fetched again, keep secondary indexes keyed by parent entities,
//! invalidate related partitions on mutation, and guard the one-check-in-per-
//! member-per-session rule.

pub mod caches;
pub mod cascade;
pub mod checkin;
pub mod clock;
pub mod config;
pub mod error;
pub mod fetch;
pub mod groups;
pub mod history;
pub mod members;
pub mod organizations;
pub mod persist;
pub mod profiles;
pub mod remote;
pub mod score;
pub mod service;
pub mod sessions;
pub mod store;

// Re-exports for convenience
pub use caches::Caches;
pub use cascade::CascadeInvalidator;
pub use checkin::IdempotencyGuard;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CacheConfig, DEFAULT_CHECKIN_SCORE, ExecutionContext, TtlConfig};
pub use error::{ErrorKind, RemoteError, SyncError};
pub use fetch::{FetchDecision, FetchPolicy, PartitionCache, PointCache, StoreStatus};
pub use groups::GroupRepository;
pub use history::HistoryRepository;
pub use members::{MemberPermissions, MemberRepository};
pub use organizations::OrganizationRepository;
pub use persist::PersistedCache;
pub use profiles::{CachedProfile, ProfileCache, ProfileRepository};
pub use remote::{
    GroupRemote, HistoryRemote, IdentityRemote, MemberRemote, OrganizationRemote, ProfileRemote,
    RemoteResult, RemoteSource, SessionRemote,
};
pub use score::SessionStats;
pub use service::SyncService;
pub use sessions::SessionRepository;
pub use store::{
    Entity, EntityStore, PartitionIndex, PartitionOrder, Partitioned, PartitionedStore,
    ValidityTracker,
};
