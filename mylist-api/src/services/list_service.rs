//! List Service
//!
//! Orchestrates the membership store, the content lookup and the advisory
//! cache for the three list operations.
//!
//! Reads go through the page cache under the user's current version; writes
//! bump that version so every page computed before them becomes
//! unreachable. When the cache is disabled or unreachable, every read is
//! served from the store.

use std::sync::Arc;

use mylist_core::{
    AddOutcome, ContentId, ContentLookup, ContentRef, ContentType, EntityIdType, EpisodeId,
    ListPage, LookupError, MyListConfig, MyListError, MyListResult, NewMembership, OrderingKey,
    StorageError, UserId,
};
use mylist_storage::{cursor, ListCache, MembershipStore, PageKey, PageQuery};
use tracing::{debug, info, instrument, warn};

use crate::types::{AddItemRequest, ListQuery};

#[derive(Clone)]
pub struct ListService {
    store: Arc<dyn MembershipStore>,
    lookup: Arc<dyn ContentLookup>,
    cache: Option<ListCache>,
    config: MyListConfig,
}

impl std::fmt::Debug for ListService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListService")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

impl ListService {
    /// `cache: None` disables caching entirely.
    pub fn new(
        store: Arc<dyn MembershipStore>,
        lookup: Arc<dyn ContentLookup>,
        cache: Option<ListCache>,
        config: MyListConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            cache,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn MembershipStore> {
        &self.store
    }

    pub fn cache(&self) -> Option<&ListCache> {
        self.cache.as_ref()
    }

    pub fn config(&self) -> &MyListConfig {
        &self.config
    }

    /// Add content to the user's list.
    ///
    /// Adding content that is already present succeeds and returns the
    /// existing record with `created = false`.
    #[instrument(skip(self, request), fields(content_id = %request.content_id))]
    pub async fn add(&self, user_id: UserId, request: &AddItemRequest) -> MyListResult<AddOutcome> {
        let content_id = ContentId::parse_field("contentId", &request.content_id)?;
        let content_type: ContentType = request.content_type.parse()?;
        let episode_id = request
            .episode_id
            .as_deref()
            .map(|value| EpisodeId::parse_field("episodeId", value))
            .transpose()?;
        let content = ContentRef::new(content_type, content_id, episode_id)?;
        if let Some(snapshot) = &request.snapshot {
            snapshot.validate()?;
        }

        if !self.lookup.user_exists(user_id).await? {
            return Err(LookupError::UserNotFound { user_id }.into());
        }
        let resolved = content.resolve(self.lookup.as_ref()).await?;

        let snapshot = match &request.snapshot {
            Some(snapshot) => snapshot.clone(),
            None => resolved.metadata.to_snapshot(),
        };

        let membership = NewMembership {
            user_id,
            content_id,
            content_type,
            episode_id,
            snapshot,
        };

        match self.store.insert(membership).await {
            Ok(record) => {
                info!(%user_id, record_id = %record.id, "added item to list");
                self.bump_version(user_id).await;
                Ok(AddOutcome {
                    record,
                    created: true,
                })
            }
            Err(MyListError::Storage(StorageError::Duplicate { .. })) => {
                let existing = self
                    .store
                    .find_by_user_and_content(user_id, content_id)
                    .await?;
                match existing {
                    Some(record) => {
                        debug!(%user_id, record_id = %record.id, "item already in list");
                        self.bump_version(user_id).await;
                        Ok(AddOutcome {
                            record,
                            created: false,
                        })
                    }
                    // Removed between the conflicting insert and the lookup.
                    None => Err(StorageError::Duplicate {
                        user_id,
                        content_id,
                    }
                    .into()),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Remove content from the user's list. Returns whether anything was
    /// removed.
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, content_id: &str) -> MyListResult<bool> {
        let content_id = ContentId::parse_field("contentId", content_id)?;
        let removed = self
            .store
            .delete_by_user_and_content(user_id, content_id)
            .await?;
        if removed {
            info!(%user_id, %content_id, "removed item from list");
            self.bump_version(user_id).await;
        } else {
            debug!(%user_id, %content_id, "nothing to remove");
        }
        Ok(removed)
    }

    /// One page of the user's list, newest first.
    ///
    /// The cursor and the content-type filter are validated before the cache
    /// is consulted, so a malformed request never reads a cached page.
    #[instrument(skip(self, query))]
    pub async fn list(&self, user_id: UserId, query: &ListQuery) -> MyListResult<ListPage> {
        let limit = self.config.clamp_limit(query.limit);
        let token = query.cursor.as_deref().filter(|token| !token.is_empty());
        let after = token.map(cursor::decode).transpose()?;
        let content_type = query
            .content_type
            .as_deref()
            .map(str::parse::<ContentType>)
            .transpose()?;
        let include_total = query.include_total.unwrap_or(false);

        let cached = match &self.cache {
            Some(cache) => cache
                .versions
                .get_or_init(user_id)
                .await
                .map(|version| {
                    let key = PageKey {
                        user_id,
                        version,
                        limit,
                        cursor: token,
                        content_type,
                        include_total,
                    }
                    .render();
                    (cache, key)
                }),
            None => None,
        };

        if let Some((cache, key)) = &cached {
            if let Some(page) = cache.pages.get(key).await {
                return Ok(page);
            }
        }

        let page = self
            .load_page(user_id, after, limit, content_type, include_total)
            .await?;

        if let Some((cache, key)) = &cached {
            cache.pages.put(key, &page).await;
        }
        Ok(page)
    }

    async fn load_page(
        &self,
        user_id: UserId,
        after: Option<OrderingKey>,
        limit: u32,
        content_type: Option<ContentType>,
        include_total: bool,
    ) -> MyListResult<ListPage> {
        let mut items = self
            .store
            .query_page(&PageQuery {
                user_id,
                content_type,
                after,
                limit,
            })
            .await?;

        let next_cursor = if items.len() > limit as usize {
            items.truncate(limit as usize);
            items.last().map(|record| cursor::encode(&record.ordering_key()))
        } else {
            None
        };

        let total = if include_total {
            Some(self.store.count(user_id, content_type).await?)
        } else {
            None
        };

        Ok(ListPage {
            items,
            next_cursor,
            total,
        })
    }

    async fn bump_version(&self, user_id: UserId) {
        let Some(cache) = &self.cache else {
            return;
        };
        if cache.versions.bump(user_id).await.is_none() {
            warn!(%user_id, "list version not bumped, cached pages may stay stale until they expire");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mylist_core::{ContentMetadata, EpisodeMetadata, Snapshot, ValidationError};
    use mylist_storage::{
        CacheBackend, InMemoryCacheBackend, InMemoryCatalog, InMemoryMembershipStore,
        NoopObserver,
    };

    struct Fixture {
        service: ListService,
        store: InMemoryMembershipStore,
        catalog: InMemoryCatalog,
        user: UserId,
    }

    fn fixture(cached: bool) -> Fixture {
        let store = InMemoryMembershipStore::new();
        let catalog = InMemoryCatalog::new();
        let user = UserId::now_v7();
        catalog.add_user(user);
        let config = MyListConfig::default();
        let cache = cached.then(|| {
            let backend: Arc<dyn CacheBackend> = Arc::new(InMemoryCacheBackend::new());
            ListCache::new(backend, &config, Arc::new(NoopObserver))
        });
        let service = ListService::new(
            Arc::new(store.clone()),
            Arc::new(catalog.clone()),
            cache,
            config,
        );
        Fixture {
            service,
            store,
            catalog,
            user,
        }
    }

    fn movie(catalog: &InMemoryCatalog, title: &str) -> ContentId {
        let id = ContentId::now_v7();
        catalog.add_movie(
            id,
            ContentMetadata {
                title: title.to_string(),
                poster_url: Some(format!("https://img.example/{}.jpg", title)),
                genres: vec!["Sci-Fi".to_string()],
                description: None,
            },
        );
        id
    }

    fn add_request(content_id: ContentId, content_type: &str) -> AddItemRequest {
        AddItemRequest {
            content_id: content_id.to_string(),
            content_type: content_type.to_string(),
            episode_id: None,
            snapshot: None,
        }
    }

    #[tokio::test]
    async fn test_add_synthesizes_snapshot_from_catalog() {
        let f = fixture(true);
        let id = movie(&f.catalog, "Inception");

        let outcome = f.service.add(f.user, &add_request(id, "movie")).await.unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.record.content_type, ContentType::Movie);
        assert_eq!(outcome.record.snapshot.title, "Inception");
        assert_eq!(outcome.record.snapshot.genres, vec!["Sci-Fi".to_string()]);
    }

    #[tokio::test]
    async fn test_supplied_snapshot_wins() {
        let f = fixture(false);
        let id = movie(&f.catalog, "Inception");
        let mut request = add_request(id, "movie");
        request.snapshot = Some(Snapshot::titled("My Inception"));

        let outcome = f.service.add(f.user, &request).await.unwrap();
        assert_eq!(outcome.record.snapshot.title, "My Inception");
    }

    #[tokio::test]
    async fn test_duplicate_add_returns_existing_record() {
        let f = fixture(true);
        let id = movie(&f.catalog, "Inception");

        let first = f.service.add(f.user, &add_request(id, "movie")).await.unwrap();
        let second = f.service.add(f.user, &add_request(id, "movie")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.record, second.record);
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_not_refreshed() {
        let f = fixture(false);
        let id = movie(&f.catalog, "Inception");
        f.service.add(f.user, &add_request(id, "movie")).await.unwrap();
        assert!(f.catalog.rename_movie(id, "Inception (Remastered)"));

        let page = f.service.list(f.user, &ListQuery::default()).await.unwrap();
        assert_eq!(page.items[0].snapshot.title, "Inception");
    }

    #[tokio::test]
    async fn test_add_validation_errors() {
        let f = fixture(false);
        let id = movie(&f.catalog, "Inception");

        let mut bad_id = add_request(id, "movie");
        bad_id.content_id = "not-a-uuid".to_string();
        assert!(matches!(
            f.service.add(f.user, &bad_id).await,
            Err(MyListError::Validation(ValidationError::InvalidId { .. }))
        ));

        assert!(matches!(
            f.service.add(f.user, &add_request(id, "song")).await,
            Err(MyListError::Validation(ValidationError::InvalidContentType { .. }))
        ));

        let mut with_episode = add_request(id, "movie");
        with_episode.episode_id = Some(EpisodeId::now_v7().to_string());
        assert_eq!(
            f.service.add(f.user, &with_episode).await,
            Err(MyListError::Validation(ValidationError::EpisodeNotAllowed))
        );
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_add_lookup_errors() {
        let f = fixture(false);
        let show = ContentId::now_v7();
        let other_show = ContentId::now_v7();
        f.catalog.add_show(
            show,
            ContentMetadata {
                title: "Dark".to_string(),
                poster_url: None,
                genres: Vec::new(),
                description: None,
            },
        );
        let episode = EpisodeId::now_v7();
        f.catalog.add_episode(
            episode,
            EpisodeMetadata {
                show_id: other_show,
                title: "Pilot".to_string(),
                season: Some(1),
                number: Some(1),
            },
        );

        let stranger = UserId::now_v7();
        assert!(matches!(
            f.service.add(stranger, &add_request(show, "show")).await,
            Err(MyListError::Lookup(LookupError::UserNotFound { .. }))
        ));

        assert!(matches!(
            f.service.add(f.user, &add_request(show, "movie")).await,
            Err(MyListError::Lookup(LookupError::ContentNotFound { .. }))
        ));

        let mut missing_episode = add_request(show, "show");
        missing_episode.episode_id = Some(EpisodeId::now_v7().to_string());
        assert!(matches!(
            f.service.add(f.user, &missing_episode).await,
            Err(MyListError::Lookup(LookupError::EpisodeNotFound { .. }))
        ));

        let mut mismatched = add_request(show, "show");
        mismatched.episode_id = Some(episode.to_string());
        assert!(matches!(
            f.service.add(f.user, &mismatched).await,
            Err(MyListError::Lookup(LookupError::EpisodeShowMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_remove_reports_not_found() {
        let f = fixture(true);
        let id = movie(&f.catalog, "Inception");

        assert!(!f.service.remove(f.user, &id.to_string()).await.unwrap());
        f.service.add(f.user, &add_request(id, "movie")).await.unwrap();
        assert!(f.service.remove(f.user, &id.to_string()).await.unwrap());
        assert!(!f.service.remove(f.user, &id.to_string()).await.unwrap());
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_list_invalid_cursor() {
        let f = fixture(true);
        let query = ListQuery {
            cursor: Some("definitely-not-a-cursor".to_string()),
            ..ListQuery::default()
        };
        assert!(matches!(
            f.service.list(f.user, &query).await,
            Err(MyListError::Validation(ValidationError::InvalidCursor { .. }))
        ));
    }

    #[tokio::test]
    async fn test_mutation_invalidates_cached_page() {
        let f = fixture(true);
        let first = movie(&f.catalog, "Inception");
        let second = movie(&f.catalog, "Interstellar");
        f.service.add(f.user, &add_request(first, "movie")).await.unwrap();

        let before = f.service.list(f.user, &ListQuery::default()).await.unwrap();
        assert_eq!(before.items.len(), 1);

        f.service.add(f.user, &add_request(second, "movie")).await.unwrap();
        let after = f.service.list(f.user, &ListQuery::default()).await.unwrap();
        assert_eq!(after.items.len(), 2);
        assert_eq!(after.items[0].content_id, second);

        f.service.remove(f.user, &second.to_string()).await.unwrap();
        let removed = f.service.list(f.user, &ListQuery::default()).await.unwrap();
        assert_eq!(removed, before);
    }

    #[tokio::test]
    async fn test_total_is_filter_scoped() {
        let f = fixture(false);
        let id = movie(&f.catalog, "Inception");
        f.service.add(f.user, &add_request(id, "movie")).await.unwrap();

        let shows = ListQuery {
            content_type: Some("show".to_string()),
            include_total: Some(true),
            ..ListQuery::default()
        };
        let page = f.service.list(f.user, &shows).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, Some(0));

        let all = ListQuery {
            include_total: Some(true),
            ..ListQuery::default()
        };
        assert_eq!(f.service.list(f.user, &all).await.unwrap().total, Some(1));
    }
}
