//! Compressed arrays.
//!
//! A [`CompressedArray`] presents a compressed or virtual encoding as its logical uncompressed array.
//! The encoding is one of the closed set of [`CompressionKind`]s, chosen when the array is constructed:
//!  - [`ragged`] arrays (contiguous, indexed and indexed contiguous),
//!  - [`gathered`] arrays,
//!  - [`subsampled`] coordinate arrays reconstructed by tie point interpolation,
//!  - [`mesh`] derived arrays of UGRID topologies, and
//!  - [`aggregated`] arrays assembled from fragments.
//!
//! Every kind decomposes its uncompressed array into a partition of disjoint regions with [`CompressedArray::subarrays`].
//! Each region is decompressed independently: reading its compressed data yields a [`Subarray`], and decompressing that subarray yields a [`Block`].
//! [`CompressedArray::get`] decompresses exactly the regions overlapping a request, and [`CompressedArray::to_chunked_graph`] packages every region as an independent [`ChunkTask`].

pub mod aggregated;
mod array_errors;
mod auxiliary_array;
mod block;
mod compressed_dimensions;
mod compressed_source;
mod data_type;
pub mod gathered;
pub mod mesh;
pub mod ragged;
pub mod subsampled;
mod subarray;
mod task_graph;

use std::{fmt::Debug, sync::Arc};

use derive_more::{Deref, From};
use rayon::prelude::*;
use rayon_iter_concurrent_limit::iter_concurrent_limit;

pub use self::{
    array_errors::{
        ArrayError, FragmentUnavailableError, InterpolationParameterError,
        MalformedCompressionError, MaskCastError, ShapeError, UnsupportedInterpolationError,
    },
    auxiliary_array::AuxiliaryArray,
    block::Block,
    compressed_dimensions::CompressedDimensions,
    compressed_source::CompressedSource,
    data_type::DataType,
    subarray::{Subarray, SubarrayDescriptor, SubarrayLocation},
    task_graph::{ChunkTask, TaskGraph},
};

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{normalize_chunks, resolved_chunks, ChunkShapes, ChunkSpec},
    config::global_config,
};

use self::{
    aggregated::Aggregated,
    gathered::Gathered,
    mesh::{BoundsFromNodes, CellConnectivity, PointTopology},
    ragged::{RaggedContiguous, RaggedIndexed, RaggedIndexedContiguous},
    subsampled::Subsampled,
};

/// An ND index to an element in an array.
pub type ArrayIndices = Vec<u64>;

/// The shape of an array.
pub type ArrayShape = Vec<u64>;

/// The shape of an uncompressed array.
///
/// A [`None`] size is not yet known, such as the number of neighbours in a [`PointTopology`] array before its connectivity is read.
#[derive(Clone, Debug, PartialEq, Eq, Deref, From)]
pub struct UncompressedShape(Vec<Option<u64>>);

impl UncompressedShape {
    /// Create an uncompressed shape where every size is known.
    #[must_use]
    pub fn new_known(shape: &[u64]) -> Self {
        Self(shape.iter().copied().map(Some).collect())
    }

    /// Return the shape if every size is known.
    #[must_use]
    pub fn known(&self) -> Option<ArrayShape> {
        self.0.iter().copied().collect()
    }

    /// Return the dimensionality.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.0.len()
    }
}

/// The interface shared by every compression kind.
pub trait CompressionKindTraits: Debug + Send + Sync {
    /// The compressed location of one subarray.
    type Location;

    /// Return the uncompressed shape.
    fn shape(&self) -> UncompressedShape;

    /// Return the uncompressed shape, reading auxiliary arrays if any size is not yet known.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the auxiliary arrays cannot be read or a size cannot be determined.
    fn known_shape(&self) -> Result<ArrayShape, ArrayError> {
        let shape = self.shape();
        shape.known().ok_or_else(|| {
            let axis = shape.iter().position(Option::is_none).unwrap_or_default();
            ShapeError::UnknownSize { axis }.into()
        })
    }

    /// Return the data type of the uncompressed array.
    fn data_type(&self) -> DataType;

    /// Return the mapping of compressed dimensions to uncompressed dimensions.
    fn compressed_dimensions(&self) -> CompressedDimensions;

    /// Partition the uncompressed array into subarrays.
    ///
    /// `chunks` is a request. A compression kind may split or merge chunks along an axis where its encoding requires it.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the request is invalid or the auxiliary arrays cannot be read.
    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError>;

    /// Read the compressed data of one subarray.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the compressed data or auxiliary arrays cannot be read.
    fn subarray(
        &self,
        region: &ArraySubset,
        location: &Self::Location,
    ) -> Result<Subarray, ArrayError>;

    /// Read the compressed data and every auxiliary array into memory.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if any array cannot be read.
    fn to_memory(&self) -> Result<Self, ArrayError>
    where
        Self: Sized;
}

/// A compression kind.
///
/// Resolved once when a [`CompressedArray`] is created.
#[derive(Debug, From)]
pub enum CompressionKind {
    /// A contiguous ragged array.
    RaggedContiguous(RaggedContiguous),
    /// An indexed ragged array.
    RaggedIndexed(RaggedIndexed),
    /// An indexed contiguous ragged array.
    RaggedIndexedContiguous(RaggedIndexedContiguous),
    /// A gathered array.
    Gathered(Gathered),
    /// A subsampled array.
    Subsampled(Subsampled),
    /// Cell bounds derived from a mesh node connectivity.
    BoundsFromNodes(BoundsFromNodes),
    /// Cell connectivity derived from a mesh cell connectivity.
    CellConnectivity(CellConnectivity),
    /// Point topology derived from a mesh node connectivity.
    PointTopology(PointTopology),
    /// An aggregated array.
    Aggregated(Aggregated),
}

macro_rules! dispatch {
    ($kind:expr, $inner:ident => $body:expr) => {
        match $kind {
            CompressionKind::RaggedContiguous($inner) => $body,
            CompressionKind::RaggedIndexed($inner) => $body,
            CompressionKind::RaggedIndexedContiguous($inner) => $body,
            CompressionKind::Gathered($inner) => $body,
            CompressionKind::Subsampled($inner) => $body,
            CompressionKind::BoundsFromNodes($inner) => $body,
            CompressionKind::CellConnectivity($inner) => $body,
            CompressionKind::PointTopology($inner) => $body,
            CompressionKind::Aggregated($inner) => $body,
        }
    };
}

impl CompressionKind {
    fn subarray(
        &self,
        region: &ArraySubset,
        location: &SubarrayLocation,
    ) -> Result<Subarray, ArrayError> {
        match (self, location) {
            (Self::RaggedContiguous(kind), SubarrayLocation::Ragged(location)) => {
                kind.subarray(region, location)
            }
            (Self::RaggedIndexed(kind), SubarrayLocation::Ragged(location)) => {
                kind.subarray(region, location)
            }
            (Self::RaggedIndexedContiguous(kind), SubarrayLocation::Ragged(location)) => {
                kind.subarray(region, location)
            }
            (Self::Gathered(kind), SubarrayLocation::Gathered(location)) => {
                kind.subarray(region, location)
            }
            (Self::Subsampled(kind), SubarrayLocation::Subsampled(location)) => {
                kind.subarray(region, location)
            }
            (Self::BoundsFromNodes(kind), SubarrayLocation::Mesh(location)) => {
                kind.subarray(region, location)
            }
            (Self::CellConnectivity(kind), SubarrayLocation::Mesh(location)) => {
                kind.subarray(region, location)
            }
            (Self::PointTopology(kind), SubarrayLocation::Mesh(location)) => {
                kind.subarray(region, location)
            }
            (Self::Aggregated(kind), SubarrayLocation::Fragment(location)) => {
                kind.subarray(region, location)
            }
            _ => Err(ArrayError::IncompatibleSubarray(location.to_string())),
        }
    }
}

/// A compressed array.
///
/// Cloning a compressed array is cheap, the compression kind is shared.
#[derive(Clone, Debug)]
pub struct CompressedArray {
    kind: Arc<CompressionKind>,
}

impl CompressedArray {
    /// Create a compressed array from a compression kind.
    #[must_use]
    pub fn new(kind: impl Into<CompressionKind>) -> Self {
        Self {
            kind: Arc::new(kind.into()),
        }
    }

    /// Return the compression kind.
    #[must_use]
    pub fn kind(&self) -> &CompressionKind {
        &self.kind
    }

    /// Return the uncompressed shape.
    ///
    /// Some sizes may not be known until auxiliary arrays are read, see [`known_shape`](Self::known_shape).
    #[must_use]
    pub fn shape(&self) -> UncompressedShape {
        dispatch!(self.kind.as_ref(), kind => kind.shape())
    }

    /// Return the uncompressed shape, reading auxiliary arrays if any size is not yet known.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the auxiliary arrays cannot be read.
    pub fn known_shape(&self) -> Result<ArrayShape, ArrayError> {
        dispatch!(self.kind.as_ref(), kind => kind.known_shape())
    }

    /// Return the dimensionality of the uncompressed array.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.shape().dimensionality()
    }

    /// Return the data type of the uncompressed array.
    #[must_use]
    pub fn data_type(&self) -> DataType {
        dispatch!(self.kind.as_ref(), kind => kind.data_type())
    }

    /// Return the mapping of compressed dimensions to uncompressed dimensions.
    #[must_use]
    pub fn compressed_dimensions(&self) -> CompressedDimensions {
        dispatch!(self.kind.as_ref(), kind => kind.compressed_dimensions())
    }

    /// Partition the uncompressed array into subarrays.
    ///
    /// The regions of the returned subarrays are pairwise disjoint and their union is the uncompressed array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunks` is invalid for the array shape or the auxiliary arrays cannot be read.
    pub fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        dispatch!(self.kind.as_ref(), kind => kind.subarrays(chunks))
    }

    /// Read the compressed data of a subarray.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the data cannot be read or `descriptor` does not belong to this array.
    pub fn subarray(&self, descriptor: &SubarrayDescriptor) -> Result<Subarray, ArrayError> {
        self.kind
            .subarray(descriptor.region(), descriptor.location())
            .map_err(|err| descriptor.wrap_error(err))
    }

    /// Read and decompress a subarray.
    ///
    /// # Errors
    /// Returns an [`ArrayError::SubarrayError`] identifying the subarray if it cannot be read or decompressed.
    pub fn decompress(&self, descriptor: &SubarrayDescriptor) -> Result<Block, ArrayError> {
        self.kind
            .subarray(descriptor.region(), descriptor.location())
            .and_then(|subarray| subarray.decompress())
            .map_err(|err| descriptor.wrap_error(err))
    }

    /// Decompress the elements within `array_subset`.
    ///
    /// Only the subarrays overlapping `array_subset` are read and decompressed.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - `array_subset` is out of bounds ([`ShapeError::OutOfBounds`]),
    ///  - the interpolation method is not supported, or
    ///  - any overlapping subarray fails to decompress.
    pub fn get(&self, array_subset: &ArraySubset) -> Result<Block, ArrayError> {
        let shape = self.known_shape()?;
        if !array_subset.inbounds(&shape) {
            return Err(ShapeError::OutOfBounds(array_subset.clone(), shape).into());
        }
        if array_subset.is_empty() {
            return Ok(Block::masked(array_subset.shape()));
        }

        let descriptors = self
            .subarrays(&ChunkSpec::Auto)?
            .into_iter()
            .filter(|descriptor| {
                descriptor
                    .region()
                    .overlap(array_subset)
                    .is_ok_and(|overlap| !overlap.is_empty())
            })
            .collect::<Vec<_>>();
        log::debug!(
            "decompressing {} of {} with {} subarrays",
            array_subset,
            self.kind_name(),
            descriptors.len()
        );

        let chunk_concurrent_limit = global_config().chunk_concurrent_limit();
        let blocks = iter_concurrent_limit!(
            chunk_concurrent_limit,
            descriptors,
            map,
            |descriptor: SubarrayDescriptor| {
                let block = self.decompress(&descriptor)?;
                Ok::<_, ArrayError>((descriptor, block))
            }
        )
        .collect::<Result<Vec<_>, ArrayError>>()?;

        let mut output = Block::masked(array_subset.shape());
        for (descriptor, block) in blocks {
            let overlap = descriptor.region().overlap(array_subset)?;
            let block = block.extract(&overlap.relative_to(descriptor.region().start())?)?;
            output.assign(&overlap.relative_to(array_subset.start())?, &block)?;
        }
        Ok(output)
    }

    /// Decompress the entire array.
    ///
    /// # Errors
    /// See [`get`](Self::get).
    pub fn get_all(&self) -> Result<Block, ArrayError> {
        let shape = self.known_shape()?;
        self.get(&ArraySubset::new_with_shape(shape))
    }

    /// Build a chunked evaluation plan.
    ///
    /// Every [`ChunkTask`] of the returned graph decompresses one subarray and is independent of every other task.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if `chunks` is invalid for the array shape or the auxiliary arrays cannot be read.
    pub fn to_chunked_graph(&self, chunks: &ChunkSpec) -> Result<TaskGraph, ArrayError> {
        let shape = self.known_shape()?;
        let tasks = self
            .subarrays(chunks)?
            .into_iter()
            .map(|descriptor| ChunkTask::new(self.clone(), descriptor))
            .collect::<Vec<_>>();
        log::debug!(
            "built a graph of {} tasks for {} with shape {shape:?}",
            tasks.len(),
            self.kind_name()
        );
        Ok(TaskGraph::new(shape, tasks))
    }

    /// Return an equivalent array with the compressed data and every auxiliary array held in memory.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if any array cannot be read.
    pub fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(match self.kind.as_ref() {
            CompressionKind::RaggedContiguous(kind) => Self::new(kind.to_memory()?),
            CompressionKind::RaggedIndexed(kind) => Self::new(kind.to_memory()?),
            CompressionKind::RaggedIndexedContiguous(kind) => Self::new(kind.to_memory()?),
            CompressionKind::Gathered(kind) => Self::new(kind.to_memory()?),
            CompressionKind::Subsampled(kind) => Self::new(kind.to_memory()?),
            CompressionKind::BoundsFromNodes(kind) => Self::new(kind.to_memory()?),
            CompressionKind::CellConnectivity(kind) => Self::new(kind.to_memory()?),
            CompressionKind::PointTopology(kind) => Self::new(kind.to_memory()?),
            CompressionKind::Aggregated(kind) => Self::new(kind.to_memory()?),
        })
    }

    fn kind_name(&self) -> &'static str {
        match self.kind.as_ref() {
            CompressionKind::RaggedContiguous(_) => "contiguous ragged array",
            CompressionKind::RaggedIndexed(_) => "indexed ragged array",
            CompressionKind::RaggedIndexedContiguous(_) => "indexed contiguous ragged array",
            CompressionKind::Gathered(_) => "gathered array",
            CompressionKind::Subsampled(_) => "subsampled array",
            CompressionKind::BoundsFromNodes(_) => "mesh bounds array",
            CompressionKind::CellConnectivity(_) => "mesh cell connectivity array",
            CompressionKind::PointTopology(_) => "mesh point topology array",
            CompressionKind::Aggregated(_) => "aggregated array",
        }
    }
}

/// Resolve a chunk request against a known shape.
pub(crate) fn requested_chunks(
    chunks: &ChunkSpec,
    shape: &[u64],
    data_type: DataType,
) -> Result<ChunkShapes, ShapeError> {
    let shape = shape.iter().copied().map(Some).collect::<Vec<_>>();
    resolved_chunks(&normalize_chunks(chunks, &shape, data_type)?)
}

/// Convert a `u64` index or size to a `usize`.
#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn to_usize(value: u64) -> usize {
    value as usize
}

/// Unravel a linearised index to ND indices.
#[must_use]
pub fn unravel_index(mut index: u64, shape: &[u64]) -> ArrayIndices {
    let mut indices = vec![0; shape.len()];
    for (indices_i, &dim) in std::iter::zip(indices.iter_mut().rev(), shape.iter().rev()) {
        if dim == 0 {
            continue;
        }
        *indices_i = index % dim;
        index /= dim;
    }
    indices
}

/// Ravel ND indices to a linearised index.
#[must_use]
pub fn ravel_indices(indices: &[u64], shape: &[u64]) -> u64 {
    let mut index: u64 = 0;
    let mut count = 1;
    for (i, s) in std::iter::zip(indices, shape).rev() {
        index += i * count;
        count *= s;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unravel_ravel() {
        assert_eq!(unravel_index(4, &[2, 3]), vec![1, 1]);
        assert_eq!(unravel_index(2, &[2, 3]), vec![0, 2]);
        assert_eq!(unravel_index(0, &[]), Vec::<u64>::new());
        assert_eq!(ravel_indices(&[1, 1], &[2, 3]), 4);
        for index in 0..24 {
            assert_eq!(
                ravel_indices(&unravel_index(index, &[2, 3, 4]), &[2, 3, 4]),
                index
            );
        }
    }

    #[test]
    fn uncompressed_shape() {
        let shape = UncompressedShape::from(vec![Some(3), None]);
        assert_eq!(shape.known(), None);
        assert_eq!(shape.dimensionality(), 2);
        assert_eq!(
            UncompressedShape::new_known(&[3, 4]).known(),
            Some(vec![3, 4])
        );
    }
}
