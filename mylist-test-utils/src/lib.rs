//! MyList Test Utilities
//!
//! Shared test infrastructure for the MyList workspace:
//! - Proptest generators for identifiers, snapshots and records
//! - A seeded content catalog fixture
//! - A cache backend with switchable failure modes
//! - Assertions over list ordering

pub use mylist_storage::{InMemoryCacheBackend, InMemoryCatalog, InMemoryMembershipStore};

pub use mylist_core::{
    ContentId, ContentMetadata, ContentType, EntityIdType, EpisodeId, EpisodeMetadata,
    MembershipRecord, MyListConfig, MyListError, MyListResult, NewMembership, RecordId, Snapshot,
    Timestamp, UserId,
};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for MyList types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_uuid() -> impl Strategy<Value = Uuid> {
        any::<[u8; 16]>().prop_map(Uuid::from_bytes)
    }

    pub fn arb_user_id() -> impl Strategy<Value = UserId> {
        arb_uuid().prop_map(UserId::new)
    }

    pub fn arb_content_id() -> impl Strategy<Value = ContentId> {
        arb_uuid().prop_map(ContentId::new)
    }

    pub fn arb_record_id() -> impl Strategy<Value = RecordId> {
        arb_uuid().prop_map(RecordId::new)
    }

    /// Timestamps between 2020 and 2030 at microsecond precision.
    pub fn arb_timestamp() -> impl Strategy<Value = Timestamp> {
        (1_577_836_800i64..1_893_456_000i64, 0u32..1_000_000).prop_map(|(secs, micros)| {
            chrono::DateTime::from_timestamp(secs, micros * 1_000)
                .unwrap_or(chrono::DateTime::UNIX_EPOCH)
        })
    }

    pub fn arb_content_type() -> impl Strategy<Value = ContentType> {
        prop_oneof![Just(ContentType::Movie), Just(ContentType::Show)]
    }

    pub fn arb_snapshot() -> impl Strategy<Value = Snapshot> {
        (
            "[A-Za-z][A-Za-z0-9 ]{0,40}",
            proptest::option::of("https://img\\.example/[a-z]{1,12}\\.jpg"),
            proptest::collection::vec("[A-Z][a-z]{2,10}", 0..4),
            proptest::option::of("[A-Za-z ,.]{1,80}"),
        )
            .prop_map(|(title, poster_url, genres, short_description)| Snapshot {
                title,
                poster_url,
                genres,
                short_description,
            })
    }

    /// A membership for `user_id` ready for insertion.
    pub fn arb_new_membership(user_id: UserId) -> impl Strategy<Value = NewMembership> {
        (arb_content_id(), arb_content_type(), arb_snapshot()).prop_map(
            move |(content_id, content_type, snapshot)| NewMembership {
                user_id,
                content_id,
                content_type,
                episode_id: None,
                snapshot,
            },
        )
    }

    /// A valid service configuration.
    pub fn arb_config() -> impl Strategy<Value = MyListConfig> {
        (1u32..=500, 1u64..=600, 1u64..=1000).prop_flat_map(|(max_limit, ttl, timeout)| {
            (1u32..=max_limit).prop_map(move |default_limit| MyListConfig {
                cache_ttl_seconds: ttl,
                max_limit,
                default_limit,
                version_ttl_seconds: mylist_core::DEFAULT_VERSION_TTL_SECS,
                cache_timeout_ms: timeout,
            })
        })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built catalog fixtures for common scenarios.

    use super::*;

    /// A catalog holding one registered user, two movies and two shows with
    /// one episode each.
    #[derive(Debug, Clone)]
    pub struct CatalogFixture {
        pub catalog: InMemoryCatalog,
        pub user: UserId,
        pub inception: ContentId,
        pub interstellar: ContentId,
        pub dark: ContentId,
        pub dark_pilot: EpisodeId,
        pub severance: ContentId,
        pub severance_pilot: EpisodeId,
    }

    pub fn metadata(title: &str, genres: &[&str]) -> ContentMetadata {
        ContentMetadata {
            title: title.to_string(),
            poster_url: Some(format!(
                "https://img.example/{}.jpg",
                title.to_lowercase().replace(' ', "-")
            )),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            description: Some(format!("{} description", title)),
        }
    }

    fn episode(show_id: ContentId, title: &str) -> EpisodeMetadata {
        EpisodeMetadata {
            show_id,
            title: title.to_string(),
            season: Some(1),
            number: Some(1),
        }
    }

    pub fn catalog() -> CatalogFixture {
        let catalog = InMemoryCatalog::new();
        let fixture = CatalogFixture {
            catalog: catalog.clone(),
            user: UserId::now_v7(),
            inception: ContentId::now_v7(),
            interstellar: ContentId::now_v7(),
            dark: ContentId::now_v7(),
            dark_pilot: EpisodeId::now_v7(),
            severance: ContentId::now_v7(),
            severance_pilot: EpisodeId::now_v7(),
        };

        catalog.add_user(fixture.user);
        catalog.add_movie(fixture.inception, metadata("Inception", &["Sci-Fi", "Thriller"]));
        catalog.add_movie(fixture.interstellar, metadata("Interstellar", &["Sci-Fi"]));
        catalog.add_show(fixture.dark, metadata("Dark", &["Mystery"]));
        catalog.add_episode(fixture.dark_pilot, episode(fixture.dark, "Secrets"));
        catalog.add_show(fixture.severance, metadata("Severance", &["Drama"]));
        catalog.add_episode(
            fixture.severance_pilot,
            episode(fixture.severance, "Good News About Hell"),
        );
        fixture
    }

    impl CatalogFixture {
        /// Register another user.
        pub fn add_user(&self) -> UserId {
            let user = UserId::now_v7();
            self.catalog.add_user(user);
            user
        }

        /// Add `count` movies titled "Movie 0", "Movie 1", ...
        pub fn add_movies(&self, count: usize) -> Vec<ContentId> {
            (0..count)
                .map(|i| {
                    let id = ContentId::now_v7();
                    self.catalog
                        .add_movie(id, metadata(&format!("Movie {}", i), &["Drama"]));
                    id
                })
                .collect()
        }
    }
}

// ============================================================================
// FAULT INJECTION
// ============================================================================

pub mod faults {
    //! Cache backend that fails on demand.

    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
    use std::sync::{Arc, RwLock};
    use std::time::Duration;

    use async_trait::async_trait;
    use mylist_core::CacheError;
    use mylist_storage::{CacheBackend, CacheStats, InMemoryCacheBackend};

    /// How a [`FaultyCacheBackend`] treats the operations selected to fail.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FaultMode {
        Healthy,
        /// Return `CacheError::Unavailable` immediately.
        Failing,
        /// Never answer (sleeps for an hour), exercising caller timeouts.
        Hanging,
    }

    impl FaultMode {
        fn to_u8(self) -> u8 {
            match self {
                FaultMode::Healthy => 0,
                FaultMode::Failing => 1,
                FaultMode::Hanging => 2,
            }
        }

        fn from_u8(value: u8) -> Self {
            match value {
                1 => FaultMode::Failing,
                2 => FaultMode::Hanging,
                _ => FaultMode::Healthy,
            }
        }
    }

    /// In-memory backend whose operations can be made to fail or hang.
    ///
    /// With no operation filter set, the mode applies to every operation.
    #[derive(Debug, Clone, Default)]
    pub struct FaultyCacheBackend {
        inner: InMemoryCacheBackend,
        mode: Arc<AtomicU8>,
        only: Arc<RwLock<HashSet<&'static str>>>,
        injected: Arc<AtomicU64>,
    }

    impl FaultyCacheBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_mode(&self, mode: FaultMode) {
            self.mode.store(mode.to_u8(), Ordering::SeqCst);
        }

        pub fn mode(&self) -> FaultMode {
            FaultMode::from_u8(self.mode.load(Ordering::SeqCst))
        }

        /// Restrict faults to the named operations (`"get"`, `"set_if_absent"`,
        /// `"incr"`, `"expire"`, `"purge_expired"`, `"stats"`).
        pub fn fail_only(&self, operations: &[&'static str]) {
            if let Ok(mut only) = self.only.write() {
                only.clear();
                only.extend(operations.iter().copied());
            }
        }

        /// Number of operations that were failed or hung.
        pub fn injected_faults(&self) -> u64 {
            self.injected.load(Ordering::SeqCst)
        }

        /// The healthy backend underneath.
        pub fn inner(&self) -> &InMemoryCacheBackend {
            &self.inner
        }

        async fn check(&self, operation: &'static str) -> Result<(), CacheError> {
            let selected = self
                .only
                .read()
                .map(|only| only.is_empty() || only.contains(operation))
                .unwrap_or(true);
            if !selected {
                return Ok(());
            }

            match self.mode() {
                FaultMode::Healthy => Ok(()),
                FaultMode::Failing => {
                    self.injected.fetch_add(1, Ordering::SeqCst);
                    Err(CacheError::Unavailable {
                        reason: format!("injected failure in {}", operation),
                    })
                }
                FaultMode::Hanging => {
                    self.injected.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Err(CacheError::Unavailable {
                        reason: format!("injected hang in {}", operation),
                    })
                }
            }
        }
    }

    #[async_trait]
    impl CacheBackend for FaultyCacheBackend {
        fn name(&self) -> &'static str {
            "faulty"
        }

        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
            self.check("get").await?;
            self.inner.get(key).await
        }

        async fn set_if_absent(
            &self,
            key: &str,
            value: &[u8],
            ttl: Option<Duration>,
        ) -> Result<bool, CacheError> {
            self.check("set_if_absent").await?;
            self.inner.set_if_absent(key, value, ttl).await
        }

        async fn incr(&self, key: &str) -> Result<u64, CacheError> {
            self.check("incr").await?;
            self.inner.incr(key).await
        }

        async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, CacheError> {
            self.check("expire").await?;
            self.inner.expire(key, ttl).await
        }

        async fn purge_expired(&self) -> Result<u64, CacheError> {
            self.check("purge_expired").await?;
            self.inner.purge_expired().await
        }

        async fn stats(&self) -> Result<CacheStats, CacheError> {
            self.check("stats").await?;
            self.inner.stats().await
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over list pages.

    use super::*;

    /// Assert records are in strictly descending (added_at, id) order.
    #[track_caller]
    pub fn assert_strictly_descending(records: &[MembershipRecord]) {
        for pair in records.windows(2) {
            assert!(
                pair[0].ordering_key() > pair[1].ordering_key(),
                "records out of order: {:?} then {:?}",
                pair[0].ordering_key(),
                pair[1].ordering_key()
            );
        }
    }

    /// Assert a result failed with the given error.
    #[track_caller]
    pub fn assert_error<T: std::fmt::Debug>(result: &MyListResult<T>, expected: &MyListError) {
        match result {
            Err(err) => assert_eq!(err, expected),
            Ok(value) => panic!("Expected Err({:?}), got Ok({:?})", expected, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::faults::{FaultMode, FaultyCacheBackend};
    use super::*;
    use mylist_core::ContentLookup;
    use mylist_storage::CacheBackend;

    #[tokio::test]
    async fn test_catalog_fixture_links_episodes() {
        let fixture = fixtures::catalog();
        let episode = fixture
            .catalog
            .find_episode(fixture.dark_pilot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(episode.show_id, fixture.dark);
        assert!(fixture.catalog.user_exists(fixture.user).await.unwrap());
    }

    #[tokio::test]
    async fn test_faulty_backend_modes() {
        let backend = FaultyCacheBackend::new();
        assert_eq!(backend.incr("c").await.unwrap(), 1);

        backend.set_mode(FaultMode::Failing);
        assert!(backend.incr("c").await.is_err());

        backend.fail_only(&["incr"]);
        assert_eq!(backend.get("c").await.unwrap(), Some(b"1".to_vec()));
        assert!(backend.incr("c").await.is_err());

        backend.set_mode(FaultMode::Healthy);
        assert_eq!(backend.incr("c").await.unwrap(), 2);
        assert_eq!(backend.injected_faults(), 2);
    }

    #[tokio::test]
    async fn test_hanging_mode_blocks() {
        let backend = FaultyCacheBackend::new();
        backend.set_mode(FaultMode::Hanging);
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(20), backend.get("k")).await;
        assert!(result.is_err());
    }
}
