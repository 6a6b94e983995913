//! Identity types for MyList entities

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Current time truncated to microseconds.
///
/// Membership timestamps are stored at microsecond precision (Postgres
/// `timestamptz`), so they are truncated at creation. A value read back from
/// any store then compares equal to the value that was written, and cursors
/// built from it round-trip exactly.
pub fn now_micros() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Common behavior of the strongly-typed UUID identifiers.
pub trait EntityIdType:
    Copy + Clone + fmt::Debug + fmt::Display + PartialEq + Eq + std::hash::Hash + Send + Sync + 'static
{
    /// Human-readable name used in error messages (e.g. "content").
    const ENTITY_NAME: &'static str;

    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// Unwrap to the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a new time-ordered id.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// Parse an id supplied by a client, naming `field` in the error.
    fn parse_field(field: &str, value: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(value.trim())
            .map(Self::new)
            .map_err(|_| ValidationError::InvalidId {
                field: field.to_string(),
                value: value.to_string(),
            })
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $entity_name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity_name;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse_field($entity_name, s)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

define_entity_id!(
    /// Identifier of the user owning a list.
    UserId,
    "user"
);
define_entity_id!(
    /// Identifier of a movie or show in the content catalog.
    ContentId,
    "content"
);
define_entity_id!(
    /// Identifier of a single episode of a show.
    EpisodeId,
    "episode"
);
define_entity_id!(
    /// Surrogate id of a membership record.
    ///
    /// Generated as UUIDv7, so ids are increasing at creation and serve as the
    /// tiebreaker of the list ordering key.
    RecordId,
    "record"
);
