//! An in-memory store.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;

use crate::{
    array::{ArrayShape, Block, DataType},
    array_subset::ArraySubset,
    storage::{ReadableStorageTraits, StorageError},
};

#[derive(Debug)]
struct MemoryVariable {
    data_type: DataType,
    block: Arc<Block>,
}

/// An in-memory store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    variables: RwLock<BTreeMap<String, MemoryVariable>>,
}

impl MemoryStore {
    /// Create a new, empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `block` as the variable at `address`, replacing any existing variable.
    pub fn set(&self, address: impl Into<String>, data_type: DataType, block: Block) {
        self.variables.write().insert(
            address.into(),
            MemoryVariable {
                data_type,
                block: Arc::new(block),
            },
        );
    }

    /// Store `block` as the `float64` variable at `address`, returning the store.
    #[must_use]
    pub fn with(self, address: impl Into<String>, block: Block) -> Self {
        self.set(address, DataType::Float64, block);
        self
    }

    /// Remove the variable at `address`.
    ///
    /// Returns true if the variable existed.
    pub fn erase(&self, address: &str) -> bool {
        self.variables.write().remove(address).is_some()
    }

    /// Return the addresses of every variable.
    #[must_use]
    pub fn addresses(&self) -> Vec<String> {
        self.variables.read().keys().cloned().collect()
    }

    fn block(&self, address: &str) -> Result<Arc<Block>, StorageError> {
        self.variables
            .read()
            .get(address)
            .map(|variable| variable.block.clone())
            .ok_or_else(|| StorageError::VariableNotFound(address.to_string()))
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn read(&self, address: &str, array_subset: &ArraySubset) -> Result<Block, StorageError> {
        let block = self.block(address)?;
        block.extract(array_subset).map_err(|_| {
            StorageError::OutOfBounds(address.to_string(), array_subset.clone(), block.shape())
        })
    }

    fn shape(&self, address: &str) -> Result<ArrayShape, StorageError> {
        Ok(self.block(address)?.shape())
    }

    fn data_type(&self, address: &str) -> Result<DataType, StorageError> {
        self.variables
            .read()
            .get(address)
            .map(|variable| variable.data_type)
            .ok_or_else(|| StorageError::VariableNotFound(address.to_string()))
    }
}
