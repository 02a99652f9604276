//! Stores.

mod json_file_store;
mod memory_store;

pub use json_file_store::{JsonFileStore, JsonVariable};
pub use memory_store::MemoryStore;
