//! BiteStore - local key/value persistence for BiteMatch
//!
//! A deliberately small storage layer: string keys map to string values,
//! synchronously, on the local device. There is exactly one user profile
//! per store directory and no transactions.
//!
//! The store itself never fails from the caller's point of view - IO
//! trouble is logged and reads surface as "absent". Callers that persist
//! JSON use [`load_json`]/[`save_json`], which treat corrupt values as
//! absent so a bad record triggers reinitialization instead of an error.

mod store;

pub use store::{FileStore, MemoryStore, Store, load_json, save_json};
