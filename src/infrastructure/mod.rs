// Infrastructure - remote store access, query cache, and object storage
pub mod cache_layer;           // Query cache keyed by entity kind and scope
pub mod object_storage;        // SigV4 presigning for media uploads
pub mod query_client;          // Cached typed reads
pub mod repository;            // Row <-> entity mapping over a RemoteStore
pub mod rest_store;            // PostgREST-style HTTP store
pub mod sqlite_database;       // SQLite store for local development and tests
pub mod store_decorators;      // Timeout decorator
pub mod traits;                // Infrastructure traits

pub use cache_layer::{CacheEntry, QueryCache, QueryKey};
pub use object_storage::S3Storage;
pub use query_client::QueryClient;
pub use repository::Repository;
pub use rest_store::RestStore;
pub use sqlite_database::SqliteStore;
pub use store_decorators::TimeoutStore;
pub use traits::{ObjectStorage, PresignedUpload, RemoteStore};
