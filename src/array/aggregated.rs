//! Aggregated arrays.
//!
//! An aggregated array is a virtual array assembled from fragments, each covering a hyperrectangle of the aggregated array.
//! A fragment is either a variable stored in a file, with alternative locations tried in order, or a constant value.
//!
//! The fragments are described by [`AggregationInstructions`].
//! Any dimension spanned by more than one fragment is chunked at fragment boundaries, whatever the requested chunking, so that a subarray never spans two fragments.
//! Dimensions spanned by a single fragment honour the requested chunking.
//!
//! Fragment stores are opened by a list of [`FragmentBackend`]s and shared through a [`StoragePool`].
//! ```rust
//! # use cfdm_compressed::array::{aggregated::{AggregatedBuilder, AggregationInstructions}, CompressedArray};
//! let instructions = AggregationInstructions::from_json(
//!     r#"{"shape": [[1, 2]], "fragments": [{"value": 1.0}, {"value": null}]}"#,
//! )?;
//! let array = CompressedArray::new(AggregatedBuilder::new(instructions).build()?);
//! assert_eq!(array.get_all()?.to_optional_vec(), vec![Some(1.0), None, None]);
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod backend;
mod fragment;
mod instructions;

pub use backend::{FragmentBackend, JsonFileBackend, RegisteredStoresBackend};
pub use fragment::{FragmentDescriptor, FragmentSource};
pub use instructions::{parse_substitutions, AggregationInstructions, FragmentInstruction};

use std::sync::Arc;

use itertools::Itertools;
use url::Url;

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{chunk_locations, chunk_positions, cumulative_offsets, ChunkSpec},
    storage::{ReadableStorage, StoragePool, StorageError},
};

use super::{
    ravel_indices, requested_chunks, to_usize, ArrayError, ArrayIndices, ArrayShape, Block,
    CompressedDimensions, CompressionKindTraits, DataType, FragmentUnavailableError,
    MalformedCompressionError, ShapeError, Subarray, SubarrayDescriptor, UncompressedShape,
};

/// An aggregated array.
#[derive(Clone, Debug)]
pub struct Aggregated {
    fragments: Arc<Vec<FragmentDescriptor>>,
    fragment_shape: Vec<Vec<u64>>,
    offsets: Vec<Vec<u64>>,
    data_type: DataType,
    shape: ArrayShape,
    backends: Arc<Vec<Arc<dyn FragmentBackend>>>,
    storage_pool: Arc<StoragePool>,
}

/// An [`Aggregated`] array builder.
///
/// By default, fragments are opened with a [`JsonFileBackend`], the data type is `float64` and fragment stores are shared through a [`StoragePool::default`].
#[derive(Debug)]
pub struct AggregatedBuilder {
    instructions: AggregationInstructions,
    aggregation_location: Option<Url>,
    shape: Option<ArrayShape>,
    data_type: DataType,
    backends: Vec<Arc<dyn FragmentBackend>>,
    storage_pool: Option<Arc<StoragePool>>,
}

impl AggregatedBuilder {
    /// Create a new aggregated array builder.
    #[must_use]
    pub fn new(instructions: AggregationInstructions) -> Self {
        Self {
            instructions,
            aggregation_location: None,
            shape: None,
            data_type: DataType::Float64,
            backends: Vec::new(),
            storage_pool: None,
        }
    }

    /// Set the location of the aggregation file, against which relative fragment locations are resolved.
    pub fn aggregation_location(&mut self, location: Url) -> &mut Self {
        self.aggregation_location = Some(location);
        self
    }

    /// Set the declared shape of the aggregated array, which the fragments must tile.
    pub fn shape(&mut self, shape: ArrayShape) -> &mut Self {
        self.shape = Some(shape);
        self
    }

    /// Set the data type of the aggregated array.
    pub fn data_type(&mut self, data_type: DataType) -> &mut Self {
        self.data_type = data_type;
        self
    }

    /// Add a fragment backend.
    ///
    /// Backends are tried in the order they are added.
    pub fn backend(&mut self, backend: Arc<dyn FragmentBackend>) -> &mut Self {
        self.backends.push(backend);
        self
    }

    /// Set the storage pool sharing opened fragment stores.
    pub fn storage_pool(&mut self, storage_pool: Arc<StoragePool>) -> &mut Self {
        self.storage_pool = Some(storage_pool);
        self
    }

    /// Build an [`Aggregated`] array.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the number of fragments does not match the fragment grid or a fragment is empty ([`MalformedCompressionError::InvalidAggregation`]),
    ///  - the fragments do not tile the declared shape ([`ShapeError::Tiling`]), or
    ///  - a fragment location cannot be resolved.
    pub fn build(&self) -> Result<Aggregated, ArrayError> {
        let fragment_shape = &self.instructions.shape;
        let grid_shape = fragment_shape
            .iter()
            .map(|sizes| sizes.len() as u64)
            .collect_vec();
        let fragment_count: u64 = grid_shape.iter().product();
        if fragment_count != self.instructions.fragments.len() as u64 {
            return Err(MalformedCompressionError::InvalidAggregation(format!(
                "a fragment grid of shape {grid_shape:?} has {fragment_count} fragments, got {}",
                self.instructions.fragments.len()
            ))
            .into());
        }
        if let Some(axis) = fragment_shape
            .iter()
            .position(|sizes| sizes.is_empty() || sizes.contains(&0))
        {
            return Err(MalformedCompressionError::InvalidAggregation(format!(
                "empty fragment along axis {axis}"
            ))
            .into());
        }

        let offsets = fragment_shape
            .iter()
            .map(|sizes| cumulative_offsets(sizes))
            .collect_vec();
        let shape = offsets
            .iter()
            .map(|offsets| offsets.last().copied().unwrap_or_default())
            .collect_vec();
        if let Some(declared) = &self.shape {
            if declared.len() != shape.len() {
                return Err(ShapeError::Mismatch {
                    got: shape,
                    expected: declared.clone(),
                }
                .into());
            }
            if let Some((axis, (&covered, &size))) = std::iter::zip(&shape, declared)
                .find_position(|(covered, size)| covered != size)
            {
                return Err(ShapeError::Tiling {
                    axis,
                    covered,
                    size,
                }
                .into());
            }
        }

        let fragments = std::iter::zip(
            chunk_positions(fragment_shape),
            chunk_locations(fragment_shape),
        )
        .zip(&self.instructions.fragments)
        .map(|((index, region), instruction)| -> Result<_, MalformedCompressionError> {
            let source = FragmentSource::new(
                instruction,
                &self.instructions,
                self.aggregation_location.as_ref(),
            )?;
            Ok(FragmentDescriptor::new(index, region, source))
        })
        .collect::<Result<Vec<_>, MalformedCompressionError>>()?;
        log::debug!(
            "aggregated {} fragments into an array of shape {shape:?}",
            fragments.len()
        );

        let backends = if self.backends.is_empty() {
            vec![Arc::new(JsonFileBackend) as Arc<dyn FragmentBackend>]
        } else {
            self.backends.clone()
        };
        Ok(Aggregated {
            fragments: Arc::new(fragments),
            fragment_shape: fragment_shape.clone(),
            offsets,
            data_type: self.data_type,
            shape,
            backends: Arc::new(backends),
            storage_pool: self
                .storage_pool
                .clone()
                .unwrap_or_else(|| Arc::new(StoragePool::default())),
        })
    }
}

impl Aggregated {
    /// The fragments, in C order over the fragment grid.
    #[must_use]
    pub fn fragments(&self) -> &[FragmentDescriptor] {
        &self.fragments
    }

    /// The shape of the fragment grid.
    #[must_use]
    pub fn fragment_grid_shape(&self) -> ArrayShape {
        self.fragment_shape
            .iter()
            .map(|sizes| sizes.len() as u64)
            .collect()
    }

    /// The chunk sizes along each dimension for a chunk request.
    ///
    /// Dimensions spanned by more than one fragment are chunked at fragment boundaries.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] if the request is invalid for the array shape.
    pub fn subarray_shapes(&self, chunks: &ChunkSpec) -> Result<Vec<Vec<u64>>, ShapeError> {
        let requested = requested_chunks(chunks, &self.shape, self.data_type)?;
        Ok(std::iter::zip(requested, &self.fragment_shape)
            .map(|(requested, fragments)| {
                if fragments.len() > 1 {
                    fragments.clone()
                } else {
                    requested
                }
            })
            .collect())
    }

    /// The fragment containing the element at `indices`.
    fn fragment_index(&self, indices: &[u64]) -> ArrayIndices {
        std::iter::zip(indices, &self.offsets)
            .map(|(&index, offsets)| {
                offsets
                    .iter()
                    .skip(1)
                    .position(|&end| index < end)
                    .unwrap_or_default() as u64
            })
            .collect()
    }

    fn fragment(&self, index: &[u64]) -> &FragmentDescriptor {
        &self.fragments[to_usize(ravel_indices(index, &self.fragment_grid_shape()))]
    }

    /// Open the store at `location` with the first backend that supports it.
    fn open(&self, location: &Url) -> Result<ReadableStorage, StorageError> {
        let mut errors = Vec::with_capacity(self.backends.len());
        for backend in self.backends.iter() {
            match backend.open(location) {
                Ok(storage) => return Ok(storage),
                Err(err) => errors.push(format!("{}: {err}", backend.name())),
            }
        }
        Err(StorageError::Other(errors.join(", ")))
    }

    /// Read `subset` of a file fragment from the first of its locations that can be read.
    ///
    /// A location that cannot be opened or read is skipped.
    /// A fragment whose stored shape is incompatible with its region is an error.
    fn read_fragment(
        &self,
        fragment: &FragmentDescriptor,
        locations: &[Url],
        identifier: &str,
        subset: &ArraySubset,
    ) -> Result<Block, ArrayError> {
        for location in locations {
            let read = self
                .storage_pool
                .get_or_open(location.as_str(), || self.open(location))
                .and_then(|storage| {
                    read_variable(&storage, identifier, fragment.region().shape(), subset)
                });
            match read {
                Ok(block) => {
                    log::debug!("read fragment {:?} from {location}", fragment.index());
                    return Ok(block);
                }
                Err(StorageError::InvalidVariable(address, err)) => {
                    return Err(ArrayError::StorageError(StorageError::InvalidVariable(
                        address, err,
                    )));
                }
                Err(err) => log::warn!(
                    "fragment {:?} is unavailable at {location}: {err}",
                    fragment.index()
                ),
            }
        }
        Err(FragmentUnavailableError::new(
            fragment.index().to_vec(),
            locations.iter().map(Url::to_string).collect(),
        )
        .into())
    }
}

/// Read `subset` of the fragment variable `identifier`.
///
/// A stored variable whose shape differs from the fragment shape only by size one dimensions is reshaped.
fn read_variable(
    storage: &ReadableStorage,
    identifier: &str,
    fragment_shape: &[u64],
    subset: &ArraySubset,
) -> Result<Block, StorageError> {
    let stored_shape = storage.shape(identifier)?;
    if stored_shape == fragment_shape {
        return storage.read(identifier, subset);
    }
    let squeeze = |shape: &[u64]| shape.iter().copied().filter(|&size| size != 1).collect_vec();
    let mismatch = |err| StorageError::InvalidVariable(identifier.to_string(), err);
    if squeeze(&stored_shape) != squeeze(fragment_shape) {
        return Err(mismatch(ShapeError::Mismatch {
            got: stored_shape,
            expected: fragment_shape.to_vec(),
        }));
    }
    storage
        .read_all(identifier)?
        .reshape(fragment_shape)
        .and_then(|block| block.extract(subset))
        .map_err(mismatch)
}

/// The compressed location of an aggregated subarray.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FragmentLocation {
    fragment: ArrayIndices,
    subset: ArraySubset,
    source: String,
}

impl FragmentLocation {
    /// The position of the fragment in the fragment grid.
    #[must_use]
    pub fn fragment(&self) -> &[u64] {
        &self.fragment
    }

    /// The region of the fragment.
    #[must_use]
    pub fn subset(&self) -> &ArraySubset {
        &self.subset
    }
}

impl std::fmt::Display for FragmentLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fragment {:?} ({}) region {}",
            self.fragment, self.source, self.subset
        )
    }
}

/// The values of an aggregated subarray, read into memory.
#[derive(Clone, Debug)]
pub enum FragmentSubarray {
    /// A constant value, [`None`] for missing values.
    Value {
        /// The value.
        value: Option<f64>,
        /// The subarray shape.
        shape: ArrayShape,
    },
    /// Values read from a fragment file.
    Data(Block),
}

impl FragmentSubarray {
    /// Decompress the subarray.
    ///
    /// # Errors
    /// Infallible, returns a [`Result`] for consistency with other subarrays.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        Ok(match self {
            Self::Value {
                value: Some(value),
                shape,
            } => Block::filled(shape, *value),
            Self::Value { value: None, shape } => Block::masked(shape),
            Self::Data(block) => block.clone(),
        })
    }
}

impl CompressionKindTraits for Aggregated {
    type Location = FragmentLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::default()
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        let chunk_sizes = self.subarray_shapes(chunks)?;
        chunk_locations(&chunk_sizes)
            .map(|region| -> Result<SubarrayDescriptor, ArrayError> {
                let index = self.fragment_index(region.start());
                let fragment = self.fragment(&index);
                let subset = region.relative_to(fragment.region().start())?;
                Ok(SubarrayDescriptor::new(
                    region,
                    FragmentLocation {
                        fragment: index,
                        subset,
                        source: fragment.source().to_string(),
                    },
                ))
            })
            .collect()
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &FragmentLocation,
    ) -> Result<Subarray, ArrayError> {
        let fragment = self.fragment(&location.fragment);
        let subarray = match fragment.source() {
            FragmentSource::Value(value) => FragmentSubarray::Value {
                value: *value,
                shape: region.shape().to_vec(),
            },
            FragmentSource::File {
                locations,
                identifier,
            } => FragmentSubarray::Data(self.read_fragment(
                fragment,
                locations,
                identifier,
                &location.subset,
            )?),
            FragmentSource::Memory(block) => {
                FragmentSubarray::Data(block.extract(&location.subset)?)
            }
        };
        Ok(subarray.into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        let fragments = self
            .fragments
            .iter()
            .map(|fragment| -> Result<FragmentDescriptor, ArrayError> {
                let FragmentSource::File {
                    locations,
                    identifier,
                } = fragment.source()
                else {
                    return Ok(fragment.clone());
                };
                let subset = ArraySubset::new_with_shape(fragment.region().shape().to_vec());
                let block = self.read_fragment(fragment, locations, identifier, &subset)?;
                Ok(FragmentDescriptor::new(
                    fragment.index().to_vec(),
                    fragment.region().clone(),
                    FragmentSource::Memory(Arc::new(block)),
                ))
            })
            .collect::<Result<Vec<_>, ArrayError>>()?;
        Ok(Self {
            fragments: Arc::new(fragments),
            ..self.clone()
        })
    }
}
