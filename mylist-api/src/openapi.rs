//! OpenAPI Document for the MyList API
//!
//! Generated with utoipa from the handler annotations and the schema derives
//! in mylist-core.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{health, mylist};
use crate::types::AddItemRequest;

use mylist_core::{
    ContentId, ContentType, EpisodeId, ListPage, MembershipRecord, RecordId, Snapshot, UserId,
    Visibility,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "MyList API",
        version = "0.1.0",
        description = "Per-user watchlist of movies and shows with cursor pagination"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "MyList", description = "Add, remove and page through the caller's list"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics")
    ),
    paths(
        mylist::add_item,
        mylist::remove_item,
        mylist::list_items,
        health::ping,
        health::liveness,
        health::readiness,
        crate::telemetry::metrics::metrics_handler,
    ),
    components(
        schemas(
            ApiError, ErrorCode,
            AddItemRequest,
            MembershipRecord, ListPage, Snapshot, ContentType, Visibility,
            UserId, ContentId, EpisodeId, RecordId,
            health::HealthResponse, health::HealthStatus, health::HealthDetails,
            health::ComponentHealth,
        )
    ),
    modifiers(&UserHeaderAddon)
)]
pub struct ApiDoc;

/// Documents the `x-user-id` identity header.
struct UserHeaderAddon;

impl Modify for UserHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "user_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("x-user-id"))),
            );
        }
    }
}

impl ApiDoc {
    /// Generate the OpenAPI document as a JSON string.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "MyList API");

        assert!(openapi.paths.paths.contains_key("/api/v1/mylist"));
        assert!(openapi.paths.paths.contains_key("/api/v1/mylist/{content_id}"));
        assert!(openapi.paths.paths.contains_key("/health/ready"));

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.security_schemes.contains_key("user_id"));
        assert!(components.schemas.contains_key("MembershipRecord"));
        Ok(())
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        serde_json::from_str::<serde_json::Value>(&json)
            .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(json.contains("MyList API"));
        assert!(json.contains("INVALID_CURSOR"));
        assert!(json.contains("INVALID_REQUEST"));
        Ok(())
    }

    #[test]
    fn test_cursor_param_documents_encoding() -> Result<(), String> {
        let doc: serde_json::Value = serde_json::from_str(
            &ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?,
        )
        .map_err(|e| format!("Generated JSON invalid: {}", e))?;
        let params = doc["paths"]["/api/v1/mylist"]["get"]["parameters"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        let cursor = params
            .iter()
            .find(|p| p["name"] == "cursor")
            .ok_or_else(|| "cursor parameter missing".to_string())?;
        let description = cursor["description"].as_str().unwrap_or_default();
        assert!(description.contains("percent-encoded"), "{}", description);
        Ok(())
    }
}
