/// File Relay
///
/// Upload a file, receive a short unguessable link, download it later.
/// The storage core lives in [`blob_store`]; everything else is the HTTP
/// surface around it.

pub mod api;
pub mod blob_store;
pub mod config;
pub mod context;
pub mod error;
pub mod metrics;
pub mod server;
