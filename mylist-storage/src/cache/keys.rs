//! Cache key construction.
//!
//! Version counter: `mylist:<userId>:version`
//!
//! Page: `mylist:<userId>:v<version>:limit<limit>:cursor<cursorOrStart>`
//! followed by `:type<movie|show>` when filtered and `:total` when a total was
//! requested. Cursor tokens are standard base64 and never contain `:`.

use mylist_core::{ContentType, UserId};

const PREFIX: &str = "mylist";
const START: &str = "start";

pub fn version_key(user_id: UserId) -> String {
    format!("{}:{}:version", PREFIX, user_id)
}

/// Everything that shapes a list response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageKey<'a> {
    pub user_id: UserId,
    pub version: u64,
    pub limit: u32,
    pub cursor: Option<&'a str>,
    pub content_type: Option<ContentType>,
    pub include_total: bool,
}

impl PageKey<'_> {
    pub fn render(&self) -> String {
        let mut key = format!(
            "{}:{}:v{}:limit{}:cursor{}",
            PREFIX,
            self.user_id,
            self.version,
            self.limit,
            self.cursor.unwrap_or(START)
        );
        if let Some(content_type) = self.content_type {
            key.push_str(":type");
            key.push_str(content_type.as_str());
        }
        if self.include_total {
            key.push_str(":total");
        }
        key
    }
}
