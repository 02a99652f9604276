use std::sync::Arc;

use crate::{array_subset::ArraySubset, chunk_geometry::ChunkSpec};

use super::{
    super::{
        ArrayError, ArrayShape, AuxiliaryArray, CompressedDimensions, CompressedSource,
        CompressionKindTraits, DataType, MalformedCompressionError, Subarray, SubarrayDescriptor,
        UncompressedShape, to_usize,
    },
    check_instances, ragged_shape, ragged_subarray, ragged_subarrays, sample_count, RaggedLocation,
    RaggedRows,
};

/// An indexed ragged array.
///
/// The index array holds, for every sample, the zero-based position of the instance it belongs to.
/// The elements of an instance keep their sample order.
/// Row `i` of the uncompressed array is instance `i`, whatever order the instances first occur in the index array.
#[derive(Clone, Debug)]
pub struct RaggedIndexed {
    data: CompressedSource,
    index: AuxiliaryArray,
    data_type: DataType,
    shape: ArrayShape,
    rows: Arc<Vec<Vec<u64>>>,
}

impl RaggedIndexed {
    /// Create an indexed ragged array, with one more instance than the largest index value.
    ///
    /// Without a declared instance dimension, index values are bounded by the number of samples.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the arrays cannot be read, the index array does not have one value per sample, or an index value is not less than the number of samples.
    pub fn new(data: CompressedSource, index: AuxiliaryArray) -> Result<Self, ArrayError> {
        let samples = sample_count(&data.shape()?)?;
        let values = index.index_values()?;
        check_instances(&values, samples)?;
        let instances = values.iter().max().map_or(0, |max| max + 1);
        Self::new_with_instances(data, index, instances)
    }

    /// Create an indexed ragged array with an explicit number of instances.
    ///
    /// Instances without samples are entirely missing.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the arrays cannot be read, the index array does not have one value per sample, or an index value is not less than `instances`.
    pub fn new_with_instances(
        data: CompressedSource,
        index: AuxiliaryArray,
        instances: u64,
    ) -> Result<Self, ArrayError> {
        let compressed_shape = data.shape()?;
        let samples = sample_count(&compressed_shape)?;
        let values = index.index_values()?;
        if values.len() as u64 != samples {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "index",
                got: index.shape()?,
                expected: format!("[{samples}]"),
            }
            .into());
        }

        check_instances(&values, instances)?;
        let mut rows = vec![Vec::new(); to_usize(instances)];
        for (position, &value) in values.iter().enumerate() {
            rows[to_usize(value)].push(position as u64);
        }
        let elements = rows.iter().map(Vec::len).max().unwrap_or_default() as u64;

        Ok(Self {
            data_type: data.data_type()?,
            shape: ragged_shape(&[instances], elements, &compressed_shape),
            data,
            index,
            rows: Arc::new(rows),
        })
    }

    /// The index array.
    #[must_use]
    pub fn index(&self) -> &AuxiliaryArray {
        &self.index
    }

    /// The rows of the sample dimension holding `instance`.
    #[must_use]
    pub fn instance_rows(&self, instance: usize) -> Option<RaggedRows> {
        self.rows.get(instance).cloned().map(RaggedRows::Indexed)
    }
}

impl CompressionKindTraits for RaggedIndexed {
    type Location = RaggedLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::single(0, vec![0, 1])
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        let instances = self.rows.iter().enumerate().map(|(instance, rows)| {
            (vec![instance as u64], RaggedRows::Indexed(rows.clone()))
        });
        ragged_subarrays(&self.shape, self.data_type, chunks, 1, instances)
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &RaggedLocation,
    ) -> Result<Subarray, ArrayError> {
        Ok(ragged_subarray(&self.data, region, location)?.into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            data: self.data.to_memory()?,
            index: self.index.to_memory()?,
            ..self.clone()
        })
    }
}
