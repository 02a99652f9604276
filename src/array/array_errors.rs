use thiserror::Error;

use crate::{
    array_subset::{ArraySubset, IncompatibleDimensionalityError},
    storage::StorageError,
};

use super::{ArrayIndices, ArrayShape};

/// Array errors.
#[derive(Debug, Error)]
pub enum ArrayError {
    /// A shape error.
    #[error(transparent)]
    ShapeError(#[from] ShapeError),
    /// Malformed compression.
    #[error(transparent)]
    MalformedCompressionError(#[from] MalformedCompressionError),
    /// An unsupported interpolation method.
    #[error(transparent)]
    UnsupportedInterpolationError(#[from] UnsupportedInterpolationError),
    /// Missing or inconsistent interpolation parameters.
    #[error(transparent)]
    InterpolationParameterError(#[from] InterpolationParameterError),
    /// No fragment location could be read.
    #[error(transparent)]
    FragmentUnavailableError(#[from] FragmentUnavailableError),
    /// An auxiliary value could not be cast to an index.
    #[error(transparent)]
    MaskCastError(#[from] MaskCastError),
    /// A storage error.
    #[error(transparent)]
    StorageError(#[from] StorageError),
    /// A subarray location that does not belong to the array.
    #[error("subarray location {0} does not belong to this array")]
    IncompatibleSubarray(String),
    /// An error decompressing one subarray.
    ///
    /// Identifies the region of the uncompressed array and the location of the compressed data that failed.
    #[error("failed to decompress {region} from {location}: {source}")]
    SubarrayError {
        /// The region of the uncompressed array.
        region: ArraySubset,
        /// The location of the compressed data, fragment or interpolation subarea.
        location: String,
        /// The underlying error.
        source: Box<ArrayError>,
    },
}

impl From<IncompatibleDimensionalityError> for ArrayError {
    fn from(error: IncompatibleDimensionalityError) -> Self {
        Self::ShapeError(error.into())
    }
}

impl ArrayError {
    /// Wrap this error with the identity of the subarray that raised it.
    ///
    /// An error that already identifies a subarray is returned unchanged.
    #[must_use]
    pub fn in_subarray(self, region: &ArraySubset, location: String) -> Self {
        match self {
            Self::SubarrayError { .. } => self,
            error => Self::SubarrayError {
                region: region.clone(),
                location,
                source: Box::new(error),
            },
        }
    }

    /// Return the innermost error, looking through any [`ArrayError::SubarrayError`] wrapper.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::SubarrayError { source, .. } => source.root(),
            error => error,
        }
    }
}

/// A shape error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ShapeError {
    /// A requested subset is outside the bounds of the array.
    #[error("array subset {0} is out of bounds of array shape {1:?}")]
    OutOfBounds(ArraySubset, ArrayShape),
    /// Incompatible dimensionality.
    #[error(transparent)]
    IncompatibleDimensionality(#[from] IncompatibleDimensionalityError),
    /// A shape does not match the expected shape.
    #[error("got shape {got:?}, expected {expected:?}")]
    Mismatch {
        /// The shape received.
        got: ArrayShape,
        /// The expected shape.
        expected: ArrayShape,
    },
    /// The number of elements does not match a shape.
    #[error("got {got} elements, expected {expected}")]
    ElementCount {
        /// The number of elements received.
        got: usize,
        /// The expected number of elements.
        expected: usize,
    },
    /// A per-axis chunk request does not match the array dimensionality.
    #[error("chunk request has {got} axes, expected {expected}")]
    ChunkDimensionality {
        /// The number of axes in the request.
        got: usize,
        /// The array dimensionality.
        expected: usize,
    },
    /// A requested chunk size is zero.
    #[error("chunk size along axis {axis} must be greater than zero")]
    InvalidChunkSize {
        /// The axis.
        axis: usize,
    },
    /// Explicit chunk sizes do not sum to the axis size.
    #[error("chunk sizes along axis {axis} sum to {sum}, expected {size}")]
    ChunkSum {
        /// The axis.
        axis: usize,
        /// The sum of the chunk sizes.
        sum: u64,
        /// The axis size.
        size: u64,
    },
    /// Chunks along an axis of unknown size have not been resolved.
    #[error("chunks along axis {axis} are unresolved, the axis size is unknown")]
    UnresolvedChunks {
        /// The axis.
        axis: usize,
    },
    /// An invalid compressed dimension mapping.
    #[error("invalid compressed dimensions {0:?}")]
    InvalidCompressedDimensions(Vec<(usize, Vec<usize>)>),
    /// The size of an axis is not known.
    #[error("the size of axis {axis} is not known")]
    UnknownSize {
        /// The axis.
        axis: usize,
    },
    /// The regions of an array fail to tile its declared shape.
    #[error("regions along axis {axis} cover {covered} elements, expected {size}")]
    Tiling {
        /// The axis.
        axis: usize,
        /// The number of elements covered.
        covered: u64,
        /// The declared axis size.
        size: u64,
    },
}

/// Compressed data that is inconsistent with its auxiliary arrays.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MalformedCompressionError {
    /// Ragged counts reference more elements than the sample dimension holds.
    #[error("counts reference {referenced} elements but the sample dimension has {samples}")]
    CountExceedsSamples {
        /// The number of elements referenced by the counts.
        referenced: u64,
        /// The size of the sample dimension.
        samples: u64,
    },
    /// A ragged index value is not a valid instance.
    #[error("index value {value} at position {position} is not an instance in 0..{instances}")]
    InstanceOutOfRange {
        /// The position in the index array.
        position: usize,
        /// The index value.
        value: u64,
        /// The number of instances.
        instances: u64,
    },
    /// A gathered list value is outside the gathered dimensions.
    #[error("list value {value} at position {position} is outside the gathered size {size}")]
    ListOutOfRange {
        /// The position in the list array.
        position: usize,
        /// The list value.
        value: u64,
        /// The combined size of the gathered dimensions.
        size: u64,
    },
    /// A mesh connectivity value does not reference a node.
    #[error("connectivity value {value} of cell {cell} does not reference one of {nodes} nodes")]
    ConnectivityOutOfRange {
        /// The cell.
        cell: u64,
        /// The connectivity value.
        value: u64,
        /// The number of nodes.
        nodes: u64,
    },
    /// Tie point indices are not strictly increasing.
    #[error("tie point indices along axis {axis} are not strictly increasing at position {position}")]
    TiePointIndicesNotIncreasing {
        /// The tie point axis.
        axis: usize,
        /// The position of the offending index.
        position: usize,
    },
    /// An auxiliary array has an unexpected shape.
    #[error("{name} has shape {got:?}, expected {expected}")]
    AuxiliaryShape {
        /// The name of the auxiliary array.
        name: &'static str,
        /// The shape received.
        got: ArrayShape,
        /// A description of the expected shape.
        expected: String,
    },
    /// An invalid `start_index`.
    #[error("start index {0} is not 0 or 1")]
    InvalidStartIndex(u64),
    /// An invalid `cell_dimension`.
    #[error("cell dimension {0} is not 0 or 1")]
    InvalidCellDimension(usize),
    /// An inconsistent aggregation instruction.
    #[error("invalid aggregation instructions: {0}")]
    InvalidAggregation(String),
}

/// An unsupported interpolation method.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported interpolation {}: {}", .name.as_deref().unwrap_or("<unnamed>"), .description.as_deref().unwrap_or("no description"))]
pub struct UnsupportedInterpolationError {
    name: Option<String>,
    description: Option<String>,
}

impl UnsupportedInterpolationError {
    /// Create a new unsupported interpolation error.
    #[must_use]
    pub fn new(name: Option<String>, description: Option<String>) -> Self {
        Self { name, description }
    }

    /// The interpolation name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The interpolation description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// Missing or inconsistent interpolation parameters.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterpolationParameterError {
    /// The number of subsampled dimensions does not suit the interpolation method.
    #[error("interpolation {method} requires {expected} subsampled dimension(s), got {got}")]
    SubsampledDimensions {
        /// The interpolation method.
        method: String,
        /// The number of subsampled dimensions.
        got: usize,
        /// The required number of subsampled dimensions.
        expected: usize,
    },
    /// Dependent tie points are missing or contradictory.
    #[error("dependent tie points: {0}")]
    DependentTiePoints(String),
    /// A parameter axis has a size that cannot be addressed.
    #[error("parameter {name} has size {size} along axis {axis}, expected one of {allowed:?}")]
    ParameterShape {
        /// The parameter name.
        name: String,
        /// The tie point axis.
        axis: usize,
        /// The parameter size along the axis.
        size: u64,
        /// The allowed sizes.
        allowed: Vec<u64>,
    },
    /// Parameter axes do not map to distinct tie point axes.
    #[error("parameter {name} axes {axes:?} do not map to distinct tie point axes of a {dimensionality} dimensional array")]
    ParameterAxes {
        /// The parameter name.
        name: String,
        /// The tie point axis of each parameter axis.
        axes: Vec<usize>,
        /// The tie point array dimensionality.
        dimensionality: usize,
    },
    /// A parameter that is not used by the interpolation method.
    #[error("parameter {name} is not used by interpolation {method}")]
    UnexpectedParameter {
        /// The parameter name.
        name: String,
        /// The interpolation method.
        method: String,
    },
    /// An invalid computational precision.
    #[error("computational precision {0} is not \"32\" or \"64\"")]
    ComputationalPrecision(String),
    /// Tie point indices for an axis that does not exist.
    #[error("tie point indices for axis {axis} of a {dimensionality} dimensional array")]
    TiePointAxis {
        /// The axis.
        axis: usize,
        /// The tie point array dimensionality.
        dimensionality: usize,
    },
}

/// No location of a fragment could be read.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("fragment {fragment:?} is unavailable, attempted locations {locations:?}")]
pub struct FragmentUnavailableError {
    fragment: ArrayIndices,
    locations: Vec<String>,
}

impl FragmentUnavailableError {
    /// Create a new fragment unavailable error.
    #[must_use]
    pub fn new(fragment: ArrayIndices, locations: Vec<String>) -> Self {
        Self {
            fragment,
            locations,
        }
    }

    /// The fragment position in the fragment array.
    #[must_use]
    pub fn fragment(&self) -> &[u64] {
        &self.fragment
    }

    /// Every attempted location, in the order attempted.
    #[must_use]
    pub fn locations(&self) -> &[String] {
        &self.locations
    }
}

/// An auxiliary value that cannot be cast to an index.
#[derive(Copy, Clone, Debug, Error, PartialEq)]
#[error("value {} at position {position} cannot be cast to an index", .value.map_or_else(|| "--".to_string(), |value| value.to_string()))]
pub struct MaskCastError {
    position: usize,
    value: Option<f64>,
}

impl MaskCastError {
    /// Create a new mask cast error.
    ///
    /// `value` is [`None`] for a masked value.
    #[must_use]
    pub const fn new(position: usize, value: Option<f64>) -> Self {
        Self { position, value }
    }

    /// The flat position of the value.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}
