use std::sync::Arc;

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{cumulative_offsets, ChunkSpec},
};

use super::{
    super::{
        ArrayError, ArrayShape, AuxiliaryArray, CompressedDimensions, CompressedSource,
        CompressionKindTraits, DataType, MalformedCompressionError, Subarray, SubarrayDescriptor,
        UncompressedShape,
    },
    ragged_shape, ragged_subarray, ragged_subarrays, sample_count, RaggedLocation, RaggedRows,
};

/// A contiguous ragged array.
///
/// The elements of each instance are stored contiguously, in instance order.
/// The count array holds the number of elements of each instance.
#[derive(Clone, Debug)]
pub struct RaggedContiguous {
    data: CompressedSource,
    count: AuxiliaryArray,
    data_type: DataType,
    shape: ArrayShape,
    offsets: Arc<Vec<u64>>,
}

impl RaggedContiguous {
    /// Create a contiguous ragged array from its compressed data and count array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the arrays cannot be read, or the counts reference more elements than the compressed data has samples.
    pub fn new(data: CompressedSource, count: AuxiliaryArray) -> Result<Self, ArrayError> {
        let compressed_shape = data.shape()?;
        let samples = sample_count(&compressed_shape)?;
        let counts = count.index_values()?;
        let offsets = cumulative_offsets(&counts);
        let referenced = offsets.last().copied().unwrap_or_default();
        if referenced > samples {
            return Err(
                MalformedCompressionError::CountExceedsSamples { referenced, samples }.into(),
            );
        }
        let elements = counts.iter().copied().max().unwrap_or_default();
        Ok(Self {
            data_type: data.data_type()?,
            shape: ragged_shape(&[counts.len() as u64], elements, &compressed_shape),
            data,
            count,
            offsets: Arc::new(offsets),
        })
    }

    /// The count array.
    #[must_use]
    pub fn count(&self) -> &AuxiliaryArray {
        &self.count
    }

    /// The rows of the sample dimension holding `instance`.
    #[must_use]
    pub fn instance_rows(&self, instance: usize) -> Option<RaggedRows> {
        Some(RaggedRows::Contiguous(
            *self.offsets.get(instance)?..*self.offsets.get(instance + 1)?,
        ))
    }
}

impl CompressionKindTraits for RaggedContiguous {
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
        let instances = self
            .offsets
            .windows(2)
            .enumerate()
            .map(|(instance, window)| {
                (
                    vec![instance as u64],
                    RaggedRows::Contiguous(window[0]..window[1]),
                )
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
            count: self.count.to_memory()?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{Block, CompressedArray};

    use super::*;

    fn ragged() -> RaggedContiguous {
        RaggedContiguous::new(
            Block::from_elements(vec![6], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
                .unwrap()
                .into(),
            Block::from_elements(vec![3], vec![3.0, 2.0, 1.0]).unwrap().into(),
        )
        .unwrap()
    }

    #[test]
    fn ragged_contiguous_shape() {
        let ragged = ragged();
        assert_eq!(ragged.shape(), UncompressedShape::new_known(&[3, 3]));
        assert_eq!(ragged.instance_rows(1), Some(RaggedRows::Contiguous(3..5)));
        assert_eq!(ragged.instance_rows(3), None);
        assert_eq!(
            ragged.compressed_dimensions().uncompressed_axes(0),
            Some([0, 1].as_slice())
        );
    }

    #[test]
    fn ragged_contiguous_get_all() {
        let array = CompressedArray::new(ragged());
        assert_eq!(
            array.get_all().unwrap().to_optional_vec(),
            vec![
                Some(1.0),
                Some(2.0),
                Some(3.0),
                Some(4.0),
                Some(5.0),
                None,
                Some(6.0),
                None,
                None
            ]
        );
        assert_eq!(array.subarrays(&ChunkSpec::Auto).unwrap().len(), 3);
    }

    #[test]
    fn ragged_contiguous_count_exceeds_samples() {
        let result = RaggedContiguous::new(
            Block::from_elements(vec![2], vec![1.0, 2.0]).unwrap().into(),
            Block::from_elements(vec![2], vec![2.0, 1.0]).unwrap().into(),
        );
        assert!(matches!(
            result,
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::CountExceedsSamples {
                    referenced: 3,
                    samples: 2
                }
            ))
        ));
    }

    #[test]
    fn ragged_contiguous_trailing_dimension() {
        let ragged = RaggedContiguous::new(
            Block::from_elements(vec![3, 2], vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0])
                .unwrap()
                .into(),
            Block::from_elements(vec![2], vec![1.0, 2.0]).unwrap().into(),
        )
        .unwrap();
        let array = CompressedArray::new(ragged);
        assert_eq!(array.known_shape().unwrap(), vec![2, 2, 2]);
        let subarrays = array
            .subarrays(&ChunkSpec::PerAxis(vec![
                crate::chunk_geometry::AxisChunkSpec::Auto,
                crate::chunk_geometry::AxisChunkSpec::Auto,
                crate::chunk_geometry::AxisChunkSpec::Size(1),
            ]))
            .unwrap();
        assert_eq!(subarrays.len(), 4);
        assert_eq!(
            array.get_all().unwrap().to_optional_vec(),
            vec![
                Some(1.0),
                Some(10.0),
                None,
                None,
                Some(2.0),
                Some(20.0),
                Some(3.0),
                Some(30.0)
            ]
        );
    }
}
