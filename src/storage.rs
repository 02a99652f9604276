//! Storage of compressed data and auxiliary arrays.
//!
//! Compressed data, auxiliary index arrays and aggregation fragments are read through the [`ReadableStorageTraits`] interface.
//! A store holds named variables, each addressed by a string and read as a [`Block`](crate::array::Block) over an [`ArraySubset`](crate::array_subset::ArraySubset).
//!
//! This module includes an in-memory [`MemoryStore`](store::MemoryStore), a read-only [`JsonFileStore`](store::JsonFileStore), the [`StoredVariable`] handle that pairs a store with an address, and the [`StoragePool`] that shares opened stores between concurrent reads.

mod storage_pool;
mod storage_sync;
pub mod store;
mod stored_variable;

use std::sync::Arc;

use thiserror::Error;

use crate::{
    array::{ArrayShape, ShapeError},
    array_subset::ArraySubset,
};

pub use self::{
    storage_pool::StoragePool, storage_sync::ReadableStorageTraits,
    stored_variable::StoredVariable,
};

/// [`Arc`] wrapped readable storage.
pub type ReadableStorage = Arc<dyn ReadableStorageTraits>;

/// A storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An IO error.
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    /// An error deserialising JSON.
    #[error(transparent)]
    InvalidJSON(#[from] serde_json::Error),
    /// A variable was not found.
    #[error("variable {0} not found")]
    VariableNotFound(String),
    /// A variable is inconsistent.
    #[error("variable {0} is invalid: {1}")]
    InvalidVariable(String, ShapeError),
    /// A read outside the bounds of a variable.
    #[error("array subset {1} is out of bounds of variable {0} with shape {2:?}")]
    OutOfBounds(String, ArraySubset, ArrayShape),
    /// A stored element cannot be represented exactly.
    #[error("element {position} of variable {address} has value {value}, which is not exactly representable")]
    UnrepresentableValue {
        /// The address of the variable.
        address: String,
        /// The position of the element in C order.
        position: usize,
        /// The stored value.
        value: String,
    },
    /// The location of a store is not supported.
    #[error("unsupported store location {0}")]
    UnsupportedLocation(String),
    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl From<&str> for StorageError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}

impl From<String> for StorageError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}
