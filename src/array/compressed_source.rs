use std::sync::Arc;

use derive_more::Display;

use crate::{
    array_subset::ArraySubset,
    storage::{StorageError, StoredVariable},
};

use super::{ArrayError, ArrayShape, Block, DataType};

/// The compressed data of an array.
///
/// Either a block held in memory or a variable in a store.
/// Unlike an [`AuxiliaryArray`](super::AuxiliaryArray), a stored compressed source is never read in full.
/// Each subarray reads only the compressed region it needs.
#[derive(Clone, Debug, Display)]
pub enum CompressedSource {
    /// Compressed data in memory.
    #[display("memory")]
    Memory {
        /// The data.
        block: Arc<Block>,
        /// The data type.
        data_type: DataType,
    },
    /// Compressed data in a store.
    #[display("{_0}")]
    Stored(StoredVariable),
}

impl CompressedSource {
    /// Create an in-memory compressed source with a data type.
    #[must_use]
    pub fn new_memory(block: Block, data_type: DataType) -> Self {
        Self::Memory {
            block: Arc::new(block),
            data_type,
        }
    }

    /// Return the shape of the compressed data.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the shape of a stored variable cannot be retrieved.
    pub fn shape(&self) -> Result<ArrayShape, StorageError> {
        match self {
            Self::Memory { block, .. } => Ok(block.shape()),
            Self::Stored(variable) => variable.shape(),
        }
    }

    /// Return the data type of the compressed data.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the data type of a stored variable cannot be retrieved.
    pub fn data_type(&self) -> Result<DataType, StorageError> {
        match self {
            Self::Memory { data_type, .. } => Ok(*data_type),
            Self::Stored(variable) => variable.data_type(),
        }
    }

    /// Read the compressed data within `array_subset`.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `array_subset` is out of bounds or the read fails.
    pub fn read(&self, array_subset: &ArraySubset) -> Result<Block, ArrayError> {
        match self {
            Self::Memory { block, .. } => Ok(block.extract(array_subset)?),
            Self::Stored(variable) => Ok(variable.read(array_subset)?),
        }
    }

    /// Returns true if the compressed data is held in memory.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self, Self::Memory { .. })
    }

    /// Return an equivalent compressed source held in memory.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if a stored variable cannot be read.
    pub fn to_memory(&self) -> Result<Self, StorageError> {
        match self {
            Self::Memory { .. } => Ok(self.clone()),
            Self::Stored(variable) => Ok(Self::new_memory(
                variable.read_all()?,
                variable.data_type()?,
            )),
        }
    }
}

impl From<Block> for CompressedSource {
    /// Create an in-memory `float64` compressed source.
    fn from(block: Block) -> Self {
        Self::new_memory(block, DataType::Float64)
    }
}

impl From<StoredVariable> for CompressedSource {
    fn from(variable: StoredVariable) -> Self {
        Self::Stored(variable)
    }
}
