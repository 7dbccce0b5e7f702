pub mod backends;
mod connection;
mod metadata;
pub mod repository;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::LibSqlBackend;
pub use connection::Database;
pub use metadata::{MetadataRepository, LAST_SYNC_KEY, SCHEMA_VERSION_KEY};
pub use traits::*;
