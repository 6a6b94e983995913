//! Membership store trait and in-memory implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use mylist_core::{
    ContentId, ContentType, MembershipRecord, MyListResult, NewMembership, OrderingKey,
    StorageError, UserId,
};

/// Parameters of a single page fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub user_id: UserId,
    pub content_type: Option<ContentType>,
    /// Position of the last item of the previous page.
    pub after: Option<OrderingKey>,
    pub limit: u32,
}

impl PageQuery {
    /// Number of rows a store returns at most: one beyond the page, so the
    /// caller can tell whether another page exists.
    pub fn fetch_size(&self) -> usize {
        self.limit as usize + 1
    }
}

/// Durable collection of (user, content) memberships.
///
/// Implementations guarantee that (user_id, content_id) is unique and that
/// [`MembershipStore::query_page`] is ordered by (added_at DESC, id DESC).
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Persist a new membership, assigning its id and timestamp.
    ///
    /// Fails with [`StorageError::Duplicate`] when the pair already exists.
    async fn insert(&self, membership: NewMembership) -> MyListResult<MembershipRecord>;

    /// Remove the membership for the pair. Returns whether one was removed.
    async fn delete_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<bool>;

    async fn find_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<Option<MembershipRecord>>;

    /// Up to `query.fetch_size()` records strictly after `query.after`,
    /// newest first.
    async fn query_page(&self, query: &PageQuery) -> MyListResult<Vec<MembershipRecord>>;

    /// Number of memberships of a user, optionally restricted to one type.
    async fn count(&self, user_id: UserId, content_type: Option<ContentType>)
        -> MyListResult<u64>;

    /// Cheap reachability probe used by readiness checks.
    async fn health_check(&self) -> MyListResult<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct UserList {
    by_key: BTreeMap<OrderingKey, MembershipRecord>,
    by_content: HashMap<ContentId, OrderingKey>,
}

/// In-memory membership store for tests and single-node development.
#[derive(Debug, Default, Clone)]
pub struct InMemoryMembershipStore {
    lists: Arc<RwLock<HashMap<UserId, UserList>>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, keeping its id and timestamp.
    ///
    /// Lets tests build lists whose records share a timestamp.
    pub fn insert_record(&self, record: MembershipRecord) -> MyListResult<MembershipRecord> {
        let mut lists = self.lists.write().map_err(|_| StorageError::LockPoisoned)?;
        let list = lists.entry(record.user_id).or_default();

        if list.by_content.contains_key(&record.content_id) {
            return Err(StorageError::Duplicate {
                user_id: record.user_id,
                content_id: record.content_id,
            }
            .into());
        }

        let key = record.ordering_key();
        list.by_content.insert(record.content_id, key);
        list.by_key.insert(key, record.clone());
        Ok(record)
    }

    /// Total number of records across all users.
    pub fn len(&self) -> usize {
        self.lists
            .read()
            .map(|lists| lists.values().map(|l| l.by_key.len()).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MembershipStore for InMemoryMembershipStore {
    async fn insert(&self, membership: NewMembership) -> MyListResult<MembershipRecord> {
        self.insert_record(membership.into_record())
    }

    async fn delete_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<bool> {
        let mut lists = self.lists.write().map_err(|_| StorageError::LockPoisoned)?;
        let Some(list) = lists.get_mut(&user_id) else {
            return Ok(false);
        };

        match list.by_content.remove(&content_id) {
            Some(key) => {
                list.by_key.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn find_by_user_and_content(
        &self,
        user_id: UserId,
        content_id: ContentId,
    ) -> MyListResult<Option<MembershipRecord>> {
        let lists = self.lists.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(lists.get(&user_id).and_then(|list| {
            list.by_content
                .get(&content_id)
                .and_then(|key| list.by_key.get(key))
                .cloned()
        }))
    }

    async fn query_page(&self, query: &PageQuery) -> MyListResult<Vec<MembershipRecord>> {
        let lists = self.lists.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(list) = lists.get(&query.user_id) else {
            return Ok(Vec::new());
        };

        let matches = |record: &&MembershipRecord| {
            query
                .content_type
                .map_or(true, |content_type| record.content_type == content_type)
        };

        let page = match query.after {
            Some(after) => list
                .by_key
                .range(..after)
                .rev()
                .map(|(_, record)| record)
                .filter(matches)
                .take(query.fetch_size())
                .cloned()
                .collect(),
            None => list
                .by_key
                .values()
                .rev()
                .filter(matches)
                .take(query.fetch_size())
                .cloned()
                .collect(),
        };
        Ok(page)
    }

    async fn count(
        &self,
        user_id: UserId,
        content_type: Option<ContentType>,
    ) -> MyListResult<u64> {
        let lists = self.lists.read().map_err(|_| StorageError::LockPoisoned)?;
        let count = lists.get(&user_id).map_or(0, |list| match content_type {
            None => list.by_key.len(),
            Some(content_type) => list
                .by_key
                .values()
                .filter(|record| record.content_type == content_type)
                .count(),
        });
        Ok(count as u64)
    }
}
