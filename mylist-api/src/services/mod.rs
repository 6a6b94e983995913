//! Service layer between the HTTP routes and the storage crates.

mod list_service;

pub use list_service::ListService;
