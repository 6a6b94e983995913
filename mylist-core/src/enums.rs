//! Enum types for MyList entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Kind of content a membership points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Movie,
    Show,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Show => "show",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" => Ok(ContentType::Movie),
            "show" => Ok(ContentType::Show),
            _ => Err(ValidationError::InvalidContentType {
                value: s.to_string(),
            }),
        }
    }
}

/// Visibility of a membership, reserved for soft-delete propagation from the
/// content catalog. Nothing in this workspace changes it after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Available,
    Unavailable,
    Removed,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Available => "available",
            Visibility::Unavailable => "unavailable",
            Visibility::Removed => "removed",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Visibility::Available),
            "unavailable" => Ok(Visibility::Unavailable),
            "removed" => Ok(Visibility::Removed),
            other => Err(format!("unknown visibility '{}'", other)),
        }
    }
}
