use std::{ops::Range, sync::Arc};

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{cumulative_offsets, ChunkSpec},
};

use super::{
    super::{
        to_usize, ArrayError, ArrayShape, AuxiliaryArray, CompressedDimensions, CompressedSource,
        CompressionKindTraits, DataType, MalformedCompressionError, Subarray, SubarrayDescriptor,
        UncompressedShape,
    },
    check_instances, ragged_shape, ragged_subarray, ragged_subarrays, sample_count, RaggedLocation,
    RaggedRows,
};

/// An indexed contiguous ragged array.
///
/// Each profile is stored contiguously with the element count held by the count array.
/// The index array holds, for every profile, the zero-based position of the instance it belongs to.
/// The uncompressed array has dimensions `(instance, profile, element, ...)`.
#[derive(Clone, Debug)]
pub struct RaggedIndexedContiguous {
    data: CompressedSource,
    count: AuxiliaryArray,
    index: AuxiliaryArray,
    data_type: DataType,
    shape: ArrayShape,
    profiles: Arc<Vec<Vec<Range<u64>>>>,
}

impl RaggedIndexedContiguous {
    /// Create an indexed contiguous ragged array, with one more instance than the largest index value.
    ///
    /// Without a declared instance dimension, index values are bounded by the number of profiles.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the arrays cannot be read or are inconsistent.
    pub fn new(
        data: CompressedSource,
        count: AuxiliaryArray,
        index: AuxiliaryArray,
    ) -> Result<Self, ArrayError> {
        let values = index.index_values()?;
        check_instances(&values, values.len() as u64)?;
        let instances = values.iter().max().map_or(0, |max| max + 1);
        Self::new_with_instances(data, count, index, instances)
    }

    /// Create an indexed contiguous ragged array with an explicit number of instances.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the arrays cannot be read,
    ///  - the count and index arrays do not have one value per profile,
    ///  - the counts reference more elements than the compressed data has samples, or
    ///  - an index value is not less than `instances`.
    pub fn new_with_instances(
        data: CompressedSource,
        count: AuxiliaryArray,
        index: AuxiliaryArray,
        instances: u64,
    ) -> Result<Self, ArrayError> {
        let compressed_shape = data.shape()?;
        let samples = sample_count(&compressed_shape)?;
        let counts = count.index_values()?;
        let values = index.index_values()?;
        if values.len() != counts.len() {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "index",
                got: index.shape()?,
                expected: format!("[{}], one value per profile", counts.len()),
            }
            .into());
        }
        let offsets = cumulative_offsets(&counts);
        let referenced = offsets.last().copied().unwrap_or_default();
        if referenced > samples {
            return Err(
                MalformedCompressionError::CountExceedsSamples { referenced, samples }.into(),
            );
        }

        check_instances(&values, instances)?;
        let mut profiles = vec![Vec::new(); to_usize(instances)];
        for (&value, window) in values.iter().zip(offsets.windows(2)) {
            profiles[to_usize(value)].push(window[0]..window[1]);
        }
        let max_profiles = profiles.iter().map(Vec::len).max().unwrap_or_default() as u64;
        let elements = counts.iter().copied().max().unwrap_or_default();

        Ok(Self {
            data_type: data.data_type()?,
            shape: ragged_shape(&[instances, max_profiles], elements, &compressed_shape),
            data,
            count,
            index,
            profiles: Arc::new(profiles),
        })
    }

    /// The count array.
    #[must_use]
    pub fn count(&self) -> &AuxiliaryArray {
        &self.count
    }

    /// The index array.
    #[must_use]
    pub fn index(&self) -> &AuxiliaryArray {
        &self.index
    }

    /// The rows of the sample dimension holding a `profile` of an `instance`.
    #[must_use]
    pub fn profile_rows(&self, instance: usize, profile: usize) -> Option<RaggedRows> {
        self.profiles
            .get(instance)?
            .get(profile)
            .cloned()
            .map(RaggedRows::Contiguous)
    }
}

impl CompressionKindTraits for RaggedIndexedContiguous {
    type Location = RaggedLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::single(0, vec![0, 1, 2])
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        // an unused profile slot has no rows and is entirely missing
        let max_profiles = self.shape[1];
        let instances = self
            .profiles
            .iter()
            .enumerate()
            .flat_map(|(instance, profiles)| {
                (0..max_profiles).map(move |profile| {
                    let rows = profiles
                        .get(to_usize(profile))
                        .cloned()
                        .unwrap_or(0..0);
                    (
                        vec![instance as u64, profile],
                        RaggedRows::Contiguous(rows),
                    )
                })
            });
        ragged_subarrays(&self.shape, self.data_type, chunks, 2, instances)
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
            index: self.index.to_memory()?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{Block, CompressedArray};

    use super::*;

    fn block(elements: &[f64]) -> Block {
        Block::from_elements(vec![elements.len() as u64], elements.to_vec()).unwrap()
    }

    #[test]
    fn ragged_indexed_contiguous_get_all() {
        // station 0 has profiles of 2 and 1 elements, station 1 has one profile of 3 elements
        let ragged = RaggedIndexedContiguous::new(
            block(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).into(),
            block(&[2.0, 3.0, 1.0]).into(),
            block(&[0.0, 1.0, 0.0]).into(),
        )
        .unwrap();
        assert_eq!(ragged.profile_rows(0, 1), Some(RaggedRows::Contiguous(5..6)));
        assert_eq!(ragged.profile_rows(1, 1), None);
        let array = CompressedArray::new(ragged);
        assert_eq!(array.known_shape().unwrap(), vec![2, 2, 3]);
        assert_eq!(array.subarrays(&ChunkSpec::Auto).unwrap().len(), 4);
        assert_eq!(
            array.get_all().unwrap().to_optional_vec(),
            vec![
                Some(1.0),
                Some(2.0),
                None,
                Some(6.0),
                None,
                None,
                Some(3.0),
                Some(4.0),
                Some(5.0),
                None,
                None,
                None
            ]
        );
        assert_eq!(
            array.compressed_dimensions().uncompressed_axes(0),
            Some([0, 1, 2].as_slice())
        );
    }

    #[test]
    fn ragged_indexed_contiguous_profile_count() {
        let result = RaggedIndexedContiguous::new(
            block(&[1.0, 2.0]).into(),
            block(&[1.0, 1.0]).into(),
            block(&[0.0]).into(),
        );
        assert!(matches!(
            result,
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::AuxiliaryShape { name: "index", .. }
            ))
        ));
    }

    #[test]
    fn ragged_indexed_contiguous_index_beyond_profiles() {
        let result = RaggedIndexedContiguous::new(
            block(&[1.0, 2.0]).into(),
            block(&[1.0, 1.0]).into(),
            block(&[1_099_511_627_776.0, 0.0]).into(),
        );
        assert!(matches!(
            result,
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::InstanceOutOfRange {
                    position: 0,
                    instances: 2,
                    ..
                }
            ))
        ));
    }
}
