//! MyList Core - Entity Types
//!
//! Data structures shared by every MyList crate: typed identifiers, the
//! membership record, content references, errors and configuration.
//! No I/O lives here.

pub mod config;
pub mod content;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;

pub use config::*;
pub use content::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
