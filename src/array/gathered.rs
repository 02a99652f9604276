//! Gathered arrays.
//!
//! A gathered array (compression by gathering) packs the selected points of one or more gathered dimensions along a single list dimension.
//! Each value of the list array is a flat index into the gathered dimensions, unravelled in C order.
//! Points of the gathered dimensions absent from the list are missing.
//!
//! For example, gathered dimensions of shape `(2, 3)` with `list = [0, 2, 4]` uncompress compressed values `[c0, c1, c2]` to
//! ```text
//! [[c0, --, c1],
//!  [--, c2, --]]
//! ```
//!
//! Every subarray spans the gathered dimensions in full.
//! Requested chunking is honoured along the retained dimensions.

use std::{ops::Range, sync::Arc};

use derive_more::Display;
use itertools::Itertools;

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{chunk_locations, ChunkSpec},
};

use super::{
    requested_chunks, unravel_index, ArrayError, ArrayShape, AuxiliaryArray, Block,
    CompressedDimensions, CompressedSource, CompressionKindTraits, DataType,
    MalformedCompressionError, Subarray, SubarrayDescriptor, UncompressedShape,
};

/// A gathered array.
#[derive(Clone, Debug)]
pub struct Gathered {
    data: CompressedSource,
    list: AuxiliaryArray,
    list_axis: usize,
    gathered_shape: ArrayShape,
    data_type: DataType,
    shape: ArrayShape,
    list_values: Arc<Vec<u64>>,
}

impl Gathered {
    /// Create a gathered array.
    ///
    /// `list_axis` is the list dimension of the compressed data and `gathered_shape` the shape of the gathered dimensions it replaces.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the arrays cannot be read,
    ///  - `list_axis` is not a dimension of the compressed data,
    ///  - the list array does not have one value per element of the list dimension, or
    ///  - a list value is outside the gathered dimensions.
    pub fn new(
        data: CompressedSource,
        list: AuxiliaryArray,
        list_axis: usize,
        gathered_shape: ArrayShape,
    ) -> Result<Self, ArrayError> {
        let compressed_shape = data.shape()?;
        let Some(&list_size) = compressed_shape.get(list_axis) else {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "compressed data",
                got: compressed_shape,
                expected: format!("a list dimension at axis {list_axis}"),
            }
            .into());
        };
        if gathered_shape.is_empty() {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "gathered dimensions",
                got: gathered_shape,
                expected: "at least one dimension".to_string(),
            }
            .into());
        }

        let list_values = list.index_values()?;
        if list_values.len() as u64 != list_size {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "list",
                got: list.shape()?,
                expected: format!("[{list_size}]"),
            }
            .into());
        }
        let size = gathered_shape.iter().product::<u64>();
        if let Some((position, &value)) = list_values.iter().find_position(|&&value| value >= size)
        {
            return Err(MalformedCompressionError::ListOutOfRange {
                position,
                value,
                size,
            }
            .into());
        }

        let shape = compressed_shape[..list_axis]
            .iter()
            .chain(&gathered_shape)
            .chain(&compressed_shape[list_axis + 1..])
            .copied()
            .collect();
        Ok(Self {
            data_type: data.data_type()?,
            data,
            list,
            list_axis,
            gathered_shape,
            shape,
            list_values: Arc::new(list_values),
        })
    }

    /// The list array.
    #[must_use]
    pub fn list(&self) -> &AuxiliaryArray {
        &self.list
    }

    /// The list dimension of the compressed data.
    #[must_use]
    pub fn list_axis(&self) -> usize {
        self.list_axis
    }

    /// The shape of the gathered dimensions.
    #[must_use]
    pub fn gathered_shape(&self) -> &[u64] {
        &self.gathered_shape
    }

    fn gathered_axes(&self) -> Range<usize> {
        self.list_axis..self.list_axis + self.gathered_shape.len()
    }
}

/// The compressed location of a gathered subarray.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("list dimension {list_axis} with retained ranges {retained:?}")]
pub struct GatheredLocation {
    list_axis: usize,
    retained: Vec<Range<u64>>,
}

impl GatheredLocation {
    /// The list dimension of the compressed data.
    #[must_use]
    pub fn list_axis(&self) -> usize {
        self.list_axis
    }

    /// The ranges of the retained dimensions, in compressed dimension order excluding the list dimension.
    #[must_use]
    pub fn retained(&self) -> &[Range<u64>] {
        &self.retained
    }
}

/// The compressed data of a gathered subarray, read into memory.
#[derive(Clone, Debug)]
pub struct GatheredSubarray {
    data: Block,
    list_values: Arc<Vec<u64>>,
    list_axis: usize,
    gathered_shape: ArrayShape,
    shape: ArrayShape,
}

impl GatheredSubarray {
    /// Decompress the subarray, scattering each list element to its unravelled position.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the compressed data does not fit the subarray shape.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        let mut output = Block::masked(&self.shape);
        let data_shape = self.data.shape();
        let gathered_ndim = self.gathered_shape.len();
        let before = &data_shape[..self.list_axis];
        let after = &data_shape[self.list_axis + 1..];
        let point_shape = before
            .iter()
            .copied()
            .chain(std::iter::repeat(1).take(gathered_ndim))
            .chain(after.iter().copied())
            .collect_vec();

        for (position, &value) in self.list_values.iter().enumerate() {
            let point = self
                .data
                .select(self.list_axis, &[position])
                .reshape(&point_shape)?;
            let start = std::iter::repeat(0)
                .take(before.len())
                .chain(unravel_index(value, &self.gathered_shape))
                .chain(std::iter::repeat(0).take(after.len()))
                .collect();
            let subset = ArraySubset::new_with_start_shape(start, point_shape.clone())?;
            output.assign(&subset, &point)?;
        }
        Ok(output)
    }
}

impl CompressionKindTraits for Gathered {
    type Location = GatheredLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::single(self.list_axis, self.gathered_axes().collect())
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        let gathered_axes = self.gathered_axes();
        let mut requested = requested_chunks(chunks, &self.shape, self.data_type)?;
        for axis in gathered_axes.clone() {
            requested[axis] = vec![self.shape[axis]];
        }
        Ok(chunk_locations(&requested)
            .map(|region| {
                let retained = region
                    .to_ranges()
                    .into_iter()
                    .enumerate()
                    .filter(|(axis, _)| !gathered_axes.contains(axis))
                    .map(|(_, range)| range)
                    .collect();
                SubarrayDescriptor::new(
                    region,
                    GatheredLocation {
                        list_axis: self.list_axis,
                        retained,
                    },
                )
            })
            .collect())
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &GatheredLocation,
    ) -> Result<Subarray, ArrayError> {
        let list_size = self.list_values.len() as u64;
        let mut ranges = location.retained.clone();
        ranges.insert(location.list_axis.min(ranges.len()), 0..list_size);
        let data = self.data.read(&ArraySubset::new_with_ranges(&ranges))?;
        Ok(GatheredSubarray {
            data,
            list_values: self.list_values.clone(),
            list_axis: location.list_axis,
            gathered_shape: self.gathered_shape.clone(),
            shape: region.shape().to_vec(),
        }
        .into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            data: self.data.to_memory()?,
            list: self.list.to_memory()?,
            ..self.clone()
        })
    }
}
