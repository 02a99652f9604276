use std::sync::Arc;

use derive_more::Display;

use crate::{
    array::{ArrayShape, Block, DataType},
    array_subset::ArraySubset,
};

use super::{ReadableStorage, ReadableStorageTraits, StorageError};

/// A variable in a store.
///
/// Pairs a [`ReadableStorage`] with the address of one variable within it.
#[derive(Clone, Debug, Display)]
#[display("{address}")]
pub struct StoredVariable {
    storage: ReadableStorage,
    address: String,
}

impl StoredVariable {
    /// Create a new stored variable.
    pub fn new(storage: ReadableStorage, address: impl Into<String>) -> Self {
        Self {
            storage,
            address: address.into(),
        }
    }

    /// Create a new stored variable from a concrete store.
    pub fn from_store<TStorage: ReadableStorageTraits + 'static>(
        storage: &Arc<TStorage>,
        address: impl Into<String>,
    ) -> Self {
        Self::new(storage.clone(), address)
    }

    /// The address of the variable.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The storage holding the variable.
    #[must_use]
    pub fn storage(&self) -> &ReadableStorage {
        &self.storage
    }

    /// Read the elements within `array_subset`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the read fails.
    pub fn read(&self, array_subset: &ArraySubset) -> Result<Block, StorageError> {
        self.storage.read(&self.address, array_subset)
    }

    /// Read every element.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the read fails.
    pub fn read_all(&self) -> Result<Block, StorageError> {
        self.storage.read_all(&self.address)
    }

    /// Return the shape of the variable.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist.
    pub fn shape(&self) -> Result<ArrayShape, StorageError> {
        self.storage.shape(&self.address)
    }

    /// Return the data type of the variable.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist.
    pub fn data_type(&self) -> Result<DataType, StorageError> {
        self.storage.data_type(&self.address)
    }
}
