//! Custom request extractors.

mod rejection;
mod user_id;

pub use rejection::{ApiJson, ApiQuery};
pub use user_id::CurrentUser;
