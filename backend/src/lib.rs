//! Gallery backend: lists, uploads and deletes files in an S3-compatible
//! bucket and hands out presigned download URLs

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// Gallery file operations
pub mod file_storage;

/// Paginated listing with URL signing
pub mod listing;

/// Object store abstraction and implementations
pub mod object_store;

/// Upload payload decoding
pub mod payload;

/// HTTP routes
pub mod routes;

/// Router assembly and server startup
pub mod server;

/// Configuration, errors and extractors
pub mod types;
