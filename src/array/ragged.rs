//! Ragged arrays.
//!
//! A ragged array packs variable length per-instance sequences along a single sample dimension.
//! The uncompressed array has an instance dimension and an element dimension, with missing values padding every instance to the length of the longest.
//!
//! - [`RaggedContiguous`]: a `count` array holds the number of elements of each instance, stored contiguously in instance order.
//! - [`RaggedIndexed`]: an `index` array holds the instance of each element.
//! - [`RaggedIndexedContiguous`]: an `index` array holds the instance of each profile and a `count` array holds the number of elements of each profile.
//!
//! Compressed data may have trailing dimensions after the sample dimension (e.g. `(sample, z)`).
//! These are uncompressed one to one.
//!
//! Every subarray is one instance (or one instance profile), spanning the element dimension.
//! Requested chunking is honoured along trailing dimensions.

mod contiguous;
mod indexed;
mod indexed_contiguous;

pub use contiguous::RaggedContiguous;
pub use indexed::RaggedIndexed;
pub use indexed_contiguous::RaggedIndexedContiguous;

use std::ops::Range;

use derive_more::Display;
use itertools::Itertools;

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{chunk_locations, ChunkSpec},
};

use super::{
    requested_chunks, ArrayError, ArrayIndices, ArrayShape, Block, CompressedSource, DataType,
    MalformedCompressionError, SubarrayDescriptor,
};

/// The compressed rows of one ragged instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RaggedRows {
    /// A contiguous range of rows.
    Contiguous(Range<u64>),
    /// Individual rows, in element order.
    Indexed(Vec<u64>),
}

impl RaggedRows {
    /// The number of rows.
    #[must_use]
    pub fn len(&self) -> u64 {
        match self {
            Self::Contiguous(range) => range.end - range.start,
            Self::Indexed(rows) => rows.len() as u64,
        }
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for RaggedRows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contiguous(range) => write!(f, "{}..{}", range.start, range.end),
            Self::Indexed(rows) => write!(f, "{rows:?}"),
        }
    }
}

/// The compressed location of a ragged subarray.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("instance {instance:?} rows {rows} of the sample dimension")]
pub struct RaggedLocation {
    instance: ArrayIndices,
    rows: RaggedRows,
    trailing: Vec<Range<u64>>,
}

impl RaggedLocation {
    /// The instance position, followed by the profile position for indexed contiguous arrays.
    #[must_use]
    pub fn instance(&self) -> &[u64] {
        &self.instance
    }

    /// The rows of the sample dimension.
    #[must_use]
    pub fn rows(&self) -> &RaggedRows {
        &self.rows
    }

    /// The ranges of any trailing dimensions.
    #[must_use]
    pub fn trailing(&self) -> &[Range<u64>] {
        &self.trailing
    }
}

/// Check that every index value is an instance in `0..instances`.
fn check_instances(values: &[u64], instances: u64) -> Result<(), MalformedCompressionError> {
    match values.iter().enumerate().find(|(_, &value)| value >= instances) {
        Some((position, &value)) => Err(MalformedCompressionError::InstanceOutOfRange {
            position,
            value,
            instances,
        }),
        None => Ok(()),
    }
}

/// The compressed rows of one ragged instance, read into memory.
#[derive(Clone, Debug)]
pub struct RaggedSubarray {
    rows: Block,
    shape: ArrayShape,
    leading: usize,
}

impl RaggedSubarray {
    /// Decompress the subarray, padding the element dimension with missing values.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the rows do not fit the subarray shape.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        let mut output = Block::masked(&self.shape);
        let mut rows = self.rows.clone();
        for _ in 0..self.leading {
            rows = rows.insert_axis(0);
        }
        output.assign(&ArraySubset::new_with_shape(rows.shape()), &rows)?;
        Ok(output)
    }
}

/// Return the uncompressed shape of a ragged array.
fn ragged_shape(leading: &[u64], elements: u64, compressed_shape: &[u64]) -> ArrayShape {
    leading
        .iter()
        .copied()
        .chain(std::iter::once(elements))
        .chain(compressed_shape.iter().skip(1).copied())
        .collect()
}

/// Return the number of samples of the compressed data.
fn sample_count(compressed_shape: &[u64]) -> Result<u64, MalformedCompressionError> {
    compressed_shape
        .first()
        .copied()
        .ok_or_else(|| MalformedCompressionError::AuxiliaryShape {
            name: "compressed data",
            got: compressed_shape.to_vec(),
            expected: "a sample dimension".to_string(),
        })
}

/// Partition a ragged array into one subarray per instance and trailing chunk.
fn ragged_subarrays(
    shape: &[u64],
    data_type: DataType,
    chunks: &ChunkSpec,
    leading: usize,
    instances: impl Iterator<Item = (ArrayIndices, RaggedRows)>,
) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
    let requested = requested_chunks(chunks, shape, data_type)?;
    let elements = shape[leading];
    let trailing_chunks = chunk_locations(&requested[leading + 1..])
        .map(|subset| subset.to_ranges())
        .collect_vec();

    let mut subarrays = Vec::new();
    for (instance, rows) in instances {
        for trailing in &trailing_chunks {
            let start = instance
                .iter()
                .copied()
                .chain(std::iter::once(0))
                .chain(trailing.iter().map(|range| range.start))
                .collect();
            let region_shape = std::iter::repeat(1)
                .take(instance.len())
                .chain(std::iter::once(elements))
                .chain(trailing.iter().map(|range| range.end - range.start))
                .collect();
            let region = ArraySubset::new_with_start_shape(start, region_shape)?;
            subarrays.push(SubarrayDescriptor::new(
                region,
                RaggedLocation {
                    instance: instance.clone(),
                    rows: rows.clone(),
                    trailing: trailing.clone(),
                },
            ));
        }
    }
    Ok(subarrays)
}

/// Read the compressed rows of a ragged subarray.
fn ragged_subarray(
    data: &CompressedSource,
    region: &ArraySubset,
    location: &RaggedLocation,
) -> Result<RaggedSubarray, ArrayError> {
    let trailing_shape = location
        .trailing
        .iter()
        .map(|range| range.end - range.start)
        .collect_vec();
    let rows = match &location.rows {
        RaggedRows::Contiguous(range) => {
            let ranges = std::iter::once(range.clone())
                .chain(location.trailing.iter().cloned())
                .collect_vec();
            data.read(&ArraySubset::new_with_ranges(&ranges))?
        }
        RaggedRows::Indexed(rows) => match (rows.iter().min(), rows.iter().max()) {
            (Some(&first), Some(&last)) => {
                let ranges = std::iter::once(first..last + 1)
                    .chain(location.trailing.iter().cloned())
                    .collect_vec();
                let span = data.read(&ArraySubset::new_with_ranges(&ranges))?;
                let selection = rows
                    .iter()
                    .map(|&row| super::to_usize(row - first))
                    .collect_vec();
                span.select(0, &selection)
            }
            _ => Block::masked(
                &std::iter::once(0)
                    .chain(trailing_shape.iter().copied())
                    .collect_vec(),
            ),
        },
    };
    Ok(RaggedSubarray {
        rows,
        shape: region.shape().to_vec(),
        leading: location.instance.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_subarray_pads() {
        let subarray = RaggedSubarray {
            rows: Block::from_elements(vec![2], vec![4.0, 5.0]).unwrap(),
            shape: vec![1, 3],
            leading: 1,
        };
        assert_eq!(
            subarray.decompress().unwrap().to_optional_vec(),
            vec![Some(4.0), Some(5.0), None]
        );
    }

    #[test]
    fn ragged_rows() {
        assert_eq!(RaggedRows::Contiguous(3..5).len(), 2);
        assert!(RaggedRows::Indexed(vec![]).is_empty());
        assert_eq!(RaggedRows::Contiguous(3..5).to_string(), "3..5");
    }
}
