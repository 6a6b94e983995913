//! Request types of the MyList API.
//!
//! Identifier fields arrive as strings and are parsed by the service, so a
//! malformed id surfaces as `INVALID_ID` rather than a body rejection.

use mylist_core::Snapshot;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/v1/mylist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub content_id: String,
    /// `movie` or `show`
    pub content_type: String,
    /// Only allowed for shows.
    #[serde(default)]
    pub episode_id: Option<String>,
    /// Captured from the catalog when absent.
    #[serde(default)]
    pub snapshot: Option<Snapshot>,
}

/// Query string of `GET /api/v1/mylist`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::IntoParams))]
#[cfg_attr(feature = "openapi", into_params(parameter_in = Query))]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Page size, clamped to the configured maximum.
    pub limit: Option<i64>,
    /// `nextCursor` of the previous page, percent-encoded. The token is
    /// standard base64, so an unencoded `+` arrives as a space and fails
    /// with `INVALID_CURSOR`.
    pub cursor: Option<String>,
    /// Restrict to `movie` or `show`.
    pub content_type: Option<String>,
    /// Attach the number of matching items.
    pub include_total: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_request_camel_case() -> Result<(), serde_json::Error> {
        let req: AddItemRequest = serde_json::from_str(
            r#"{"contentId":"c","contentType":"show","episodeId":"e","snapshot":{"title":"Dark"}}"#,
        )?;
        assert_eq!(req.content_id, "c");
        assert_eq!(req.episode_id.as_deref(), Some("e"));
        assert_eq!(req.snapshot, Some(Snapshot::titled("Dark")));
        Ok(())
    }

    #[test]
    fn test_add_request_optional_fields() -> Result<(), serde_json::Error> {
        let req: AddItemRequest =
            serde_json::from_str(r#"{"contentId":"c","contentType":"movie"}"#)?;
        assert!(req.episode_id.is_none());
        assert!(req.snapshot.is_none());
        Ok(())
    }
}
