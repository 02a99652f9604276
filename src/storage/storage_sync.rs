use std::fmt::Debug;

use crate::{
    array::{ArrayShape, Block, DataType},
    array_subset::ArraySubset,
};

use super::StorageError;

/// Readable storage traits.
///
/// Implementations must be safe to read from concurrently.
pub trait ReadableStorageTraits: Send + Sync + Debug {
    /// Read the elements of the variable at `address` within `array_subset`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist, `array_subset` is out of its bounds, or there is an underlying storage error.
    fn read(&self, address: &str, array_subset: &ArraySubset) -> Result<Block, StorageError>;

    /// Return the shape of the variable at `address`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist or there is an underlying storage error.
    fn shape(&self, address: &str) -> Result<ArrayShape, StorageError>;

    /// Return the data type of the variable at `address`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist or there is an underlying storage error.
    fn data_type(&self, address: &str) -> Result<DataType, StorageError>;

    /// Read every element of the variable at `address`.
    ///
    /// # Errors
    /// Returns a [`StorageError`] if the variable does not exist or there is an underlying storage error.
    fn read_all(&self, address: &str) -> Result<Block, StorageError> {
        let shape = self.shape(address)?;
        self.read(address, &ArraySubset::new_with_shape(shape))
    }
}
