/// Blob Storage System
///
/// Stores uploaded files under generated identifiers and hands them back by
/// stored name. The upload directory is flat: every object is a single
/// `<id><extension>` file and presence on disk is the only source of truth.

pub mod disk;
pub mod id;
pub mod models;
pub mod naming;
pub mod store;

pub use id::{IdGenerator, NanoIdGenerator};
pub use models::*;
pub use store::{BlobStore, BlobStoreConfig, MAX_NAME_ATTEMPTS};
