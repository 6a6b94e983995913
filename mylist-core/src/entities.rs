//! Entity structures

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::identity::{now_micros, EntityIdType};
use crate::{ContentId, ContentType, EpisodeId, RecordId, Timestamp, UserId, Visibility};

/// Maximum length of a snapshot title.
pub const MAX_TITLE_LEN: usize = 512;

/// Denormalized display metadata captured when an item is added.
///
/// Never refreshed from the catalog afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Missing titles deserialize empty and fail [`Snapshot::validate`].
    #[serde(default)]
    #[cfg_attr(feature = "openapi", schema(required = true))]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
}

impl Snapshot {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            poster_url: None,
            genres: Vec::new(),
            short_description: None,
        }
    }

    /// Check a client-supplied snapshot.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::InvalidSnapshot {
                reason: "title must not be empty".to_string(),
            });
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(ValidationError::InvalidSnapshot {
                reason: format!("title exceeds {} bytes", MAX_TITLE_LEN),
            });
        }
        if self.genres.iter().any(|g| g.trim().is_empty()) {
            return Err(ValidationError::InvalidSnapshot {
                reason: "genres must not contain empty entries".to_string(),
            });
        }
        Ok(())
    }
}

/// A membership about to be inserted. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMembership {
    pub user_id: UserId,
    pub content_id: ContentId,
    pub content_type: ContentType,
    pub episode_id: Option<EpisodeId>,
    pub snapshot: Snapshot,
}

impl NewMembership {
    /// Stamp the membership with a fresh record id and creation time.
    pub fn into_record(self) -> MembershipRecord {
        MembershipRecord {
            id: RecordId::now_v7(),
            user_id: self.user_id,
            content_id: self.content_id,
            content_type: self.content_type,
            episode_id: self.episode_id,
            added_at: now_micros(),
            snapshot: self.snapshot,
            visibility: Visibility::default(),
        }
    }
}

/// One user's saved reference to one piece of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct MembershipRecord {
    pub id: RecordId,
    pub user_id: UserId,
    pub content_id: ContentId,
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub episode_id: Option<EpisodeId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub added_at: Timestamp,
    pub snapshot: Snapshot,
    #[serde(default)]
    pub visibility: Visibility,
}

impl MembershipRecord {
    pub fn ordering_key(&self) -> OrderingKey {
        OrderingKey {
            added_at: self.added_at,
            record_id: self.id,
        }
    }
}

/// Position of a record in a user's list.
///
/// The derived `Ord` is ascending; lists are served in descending order, so
/// a page after key `k` holds records strictly less than `k`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderingKey {
    pub added_at: Timestamp,
    pub record_id: RecordId,
}

/// One page of a user's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ListPage {
    pub items: Vec<MembershipRecord>,
    /// Opaque token for the next page, `null` at the end of the list.
    pub next_cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Result of an add: the stored record and whether this call created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    pub record: MembershipRecord,
    pub created: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_membership() -> NewMembership {
        NewMembership {
            user_id: UserId::now_v7(),
            content_id: ContentId::now_v7(),
            content_type: ContentType::Movie,
            episode_id: None,
            snapshot: Snapshot::titled("Inception"),
        }
    }

    #[test]
    fn test_snapshot_requires_title() {
        assert!(Snapshot::titled("Inception").validate().is_ok());
        assert!(matches!(
            Snapshot::titled("   ").validate(),
            Err(ValidationError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_snapshot_without_title_fails_validation() {
        let snapshot: Snapshot =
            serde_json::from_str(r#"{"posterUrl":"https://img/1.jpg"}"#).expect("deserialize");
        assert!(matches!(
            snapshot.validate(),
            Err(ValidationError::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_snapshot_rejects_blank_genre() {
        let mut snapshot = Snapshot::titled("Dark");
        snapshot.genres = vec!["Drama".to_string(), "".to_string()];
        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_into_record_defaults() {
        let record = new_membership().into_record();
        assert_eq!(record.visibility, Visibility::Available);
        assert_eq!(record.added_at.timestamp_subsec_nanos() % 1_000, 0);
    }

    #[test]
    fn test_ordering_key_tiebreak_on_id() {
        let a = new_membership().into_record();
        let mut b = new_membership().into_record();
        b.added_at = a.added_at;
        assert!(b.ordering_key() > a.ordering_key());
    }

    #[test]
    fn test_record_json_is_camel_case() {
        let record = new_membership().into_record();
        let json = serde_json::to_value(&record).expect("serialize");
        assert!(json.get("contentType").is_some());
        assert!(json.get("addedAt").is_some());
        assert!(json.get("episodeId").is_none());
    }

    #[test]
    fn test_list_page_serializes_null_cursor() {
        let page = ListPage {
            items: vec![],
            next_cursor: None,
            total: None,
        };
        let json = serde_json::to_string(&page).expect("serialize");
        assert_eq!(json, r#"{"items":[],"nextCursor":null}"#);
    }

    #[cfg(feature = "openapi")]
    #[test]
    fn test_record_schema_documents_timestamp() {
        use utoipa::PartialSchema;

        let schema = serde_json::to_value(MembershipRecord::schema()).expect("serialize");
        let added_at = &schema["properties"]["addedAt"];
        assert_eq!(added_at["type"], "string");
        assert_eq!(added_at["format"], "date-time");

        let snapshot = serde_json::to_value(Snapshot::schema()).expect("serialize");
        let required = snapshot["required"].as_array().cloned().unwrap_or_default();
        assert!(required.contains(&serde_json::json!("title")));
    }
}
