use std::sync::{Arc, OnceLock};

use crate::storage::{StorageError, StoredVariable};

use super::{ArrayError, ArrayShape, Block};

/// An auxiliary array.
///
/// Count, index, list, connectivity, tie point index and interpolation parameter arrays parametrise decompression.
/// A stored auxiliary array is read in full on first access and cached; clones share the cache.
#[derive(Clone, Debug)]
pub struct AuxiliaryArray {
    stored: Option<StoredVariable>,
    block: Arc<OnceLock<Arc<Block>>>,
}

impl AuxiliaryArray {
    /// Create an auxiliary array read from a stored variable on first access.
    #[must_use]
    pub fn new_stored(variable: StoredVariable) -> Self {
        Self {
            stored: Some(variable),
            block: Arc::default(),
        }
    }

    /// Returns true if the auxiliary array has been read into memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.block.get().is_some()
    }

    /// Return the shape of the auxiliary array.
    ///
    /// Does not read the array data.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the shape of a stored variable cannot be retrieved.
    pub fn shape(&self) -> Result<ArrayShape, StorageError> {
        match (self.block.get(), &self.stored) {
            (Some(block), _) => Ok(block.shape()),
            (None, Some(stored)) => stored.shape(),
            (None, None) => Err(StorageError::from("auxiliary array has no data")),
        }
    }

    /// Return the auxiliary array, reading it on first access.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a stored variable cannot be read.
    pub fn read(&self) -> Result<Arc<Block>, StorageError> {
        if let Some(block) = self.block.get() {
            return Ok(block.clone());
        }
        let Some(stored) = &self.stored else {
            return Err(StorageError::from("auxiliary array has no data"));
        };
        let block = Arc::new(stored.read_all()?);
        Ok(self.block.get_or_init(|| block).clone())
    }

    /// Return the elements in C order as non-negative integer indices.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the array cannot be read or an element is masked or not a valid index.
    pub fn index_values(&self) -> Result<Vec<u64>, ArrayError> {
        Ok(self.read()?.to_index_values()?)
    }

    /// Return an equivalent auxiliary array held in memory.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a stored variable cannot be read.
    pub fn to_memory(&self) -> Result<Self, StorageError> {
        self.read().map(Self::from)
    }
}

impl From<Arc<Block>> for AuxiliaryArray {
    fn from(block: Arc<Block>) -> Self {
        Self {
            stored: None,
            block: Arc::new(OnceLock::from(block)),
        }
    }
}

impl From<Block> for AuxiliaryArray {
    fn from(block: Block) -> Self {
        Self::from(Arc::new(block))
    }
}

impl From<StoredVariable> for AuxiliaryArray {
    fn from(variable: StoredVariable) -> Self {
        Self::new_stored(variable)
    }
}
