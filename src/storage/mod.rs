//! Persistence. The engine only ever depends on the narrow repository
//! traits in [`repository`]; [`kv`] provides the one concrete backend
//! shipped here (in-memory), and [`debounce`] coalesces frequent writes
//! (proxy health updates, pattern use counters) into periodic flushes.

pub mod debounce;
pub mod kv;
pub mod repository;

pub use debounce::{spawn_debounced_flush, DebounceHandle, DirtyTracker};
pub use kv::{InMemoryKeyValueStore, KeyValueStore};
pub use repository::{
    DomainRiskRepository, GroupRepository, KvRepositories, PatternRepository,
    ProxyHealthRepository, QuirksRepository,
};
