//! Content references and the catalog lookup capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::entities::Snapshot;
use crate::error::{LookupError, MyListResult, ValidationError};
use crate::{ContentId, ContentType, EpisodeId, UserId};

/// Display metadata of a movie or show as the catalog currently holds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentMetadata {
    pub title: String,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ContentMetadata {
    /// Capture the metadata as an immutable snapshot.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            title: self.title.clone(),
            poster_url: self.poster_url.clone(),
            genres: self.genres.clone(),
            short_description: self.description.clone(),
        }
    }
}

/// An episode and the show it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeMetadata {
    pub show_id: ContentId,
    pub title: String,
    #[serde(default)]
    pub season: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
}

/// Read access to the content catalog and the user directory.
#[async_trait]
pub trait ContentLookup: Send + Sync {
    async fn user_exists(&self, user_id: UserId) -> Result<bool, LookupError>;

    async fn find_movie(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError>;

    async fn find_show(&self, id: ContentId) -> Result<Option<ContentMetadata>, LookupError>;

    async fn find_episode(&self, id: EpisodeId) -> Result<Option<EpisodeMetadata>, LookupError>;
}

/// A validated reference to catalog content.
///
/// Building one rejects movies that carry an episode, so the remaining
/// rule (episode belongs to show) is checked in [`ContentRef::resolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRef {
    Movie {
        id: ContentId,
    },
    Show {
        id: ContentId,
        episode: Option<EpisodeId>,
    },
}

/// Content that was found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub content: ContentRef,
    pub metadata: ContentMetadata,
    pub episode: Option<EpisodeMetadata>,
}

impl ContentRef {
    pub fn new(
        content_type: ContentType,
        id: ContentId,
        episode: Option<EpisodeId>,
    ) -> Result<Self, ValidationError> {
        match (content_type, episode) {
            (ContentType::Movie, Some(_)) => Err(ValidationError::EpisodeNotAllowed),
            (ContentType::Movie, None) => Ok(ContentRef::Movie { id }),
            (ContentType::Show, episode) => Ok(ContentRef::Show { id, episode }),
        }
    }

    pub fn content_id(&self) -> ContentId {
        match self {
            ContentRef::Movie { id } | ContentRef::Show { id, .. } => *id,
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            ContentRef::Movie { .. } => ContentType::Movie,
            ContentRef::Show { .. } => ContentType::Show,
        }
    }

    pub fn episode_id(&self) -> Option<EpisodeId> {
        match self {
            ContentRef::Movie { .. } => None,
            ContentRef::Show { episode, .. } => *episode,
        }
    }

    /// Look the content up and check that any episode belongs to the show.
    pub async fn resolve(&self, lookup: &dyn ContentLookup) -> MyListResult<ResolvedContent> {
        match *self {
            ContentRef::Movie { id } => {
                let metadata = lookup.find_movie(id).await?.ok_or(LookupError::ContentNotFound {
                    content_type: ContentType::Movie,
                    content_id: id,
                })?;
                Ok(ResolvedContent {
                    content: *self,
                    metadata,
                    episode: None,
                })
            }
            ContentRef::Show { id, episode } => {
                let metadata = lookup.find_show(id).await?.ok_or(LookupError::ContentNotFound {
                    content_type: ContentType::Show,
                    content_id: id,
                })?;

                let episode = match episode {
                    None => None,
                    Some(episode_id) => {
                        let found = lookup
                            .find_episode(episode_id)
                            .await?
                            .ok_or(LookupError::EpisodeNotFound { episode_id })?;
                        if found.show_id != id {
                            return Err(LookupError::EpisodeShowMismatch {
                                episode_id,
                                show_id: id,
                            }
                            .into());
                        }
                        Some(found)
                    }
                };

                Ok(ResolvedContent {
                    content: *self,
                    metadata,
                    episode,
                })
            }
        }
    }
}
