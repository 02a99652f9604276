use derive_more::{Display, From};

use crate::array_subset::ArraySubset;

use super::{
    aggregated::{FragmentLocation, FragmentSubarray},
    gathered::{GatheredLocation, GatheredSubarray},
    mesh::{MeshLocation, MeshSubarray},
    ragged::{RaggedLocation, RaggedSubarray},
    subsampled::{SubsampledLocation, SubsampledSubarray},
    ArrayError, Block,
};

/// The compressed location of a subarray.
#[derive(Clone, Debug, PartialEq, Eq, Display, From)]
pub enum SubarrayLocation {
    /// The rows of a ragged array.
    Ragged(RaggedLocation),
    /// A region of a gathered array.
    Gathered(GatheredLocation),
    /// Interpolation subareas of a subsampled array.
    Subsampled(SubsampledLocation),
    /// Cells of a mesh derived array.
    Mesh(MeshLocation),
    /// A region of an aggregated array fragment.
    Fragment(FragmentLocation),
}

/// A subarray descriptor.
///
/// Pairs a region of the uncompressed array with the location of the compressed data it is decompressed from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubarrayDescriptor {
    region: ArraySubset,
    location: SubarrayLocation,
}

impl SubarrayDescriptor {
    pub(crate) fn new(region: ArraySubset, location: impl Into<SubarrayLocation>) -> Self {
        Self {
            region,
            location: location.into(),
        }
    }

    /// The region of the uncompressed array.
    #[must_use]
    pub fn region(&self) -> &ArraySubset {
        &self.region
    }

    /// The location of the compressed data.
    #[must_use]
    pub fn location(&self) -> &SubarrayLocation {
        &self.location
    }

    pub(crate) fn wrap_error(&self, error: ArrayError) -> ArrayError {
        error.in_subarray(&self.region, self.location.to_string())
    }
}

/// The compressed data of one subarray, read into memory.
///
/// [`decompress`](Subarray::decompress) is pure computation and performs no I/O.
#[derive(Clone, Debug, From)]
pub enum Subarray {
    /// A ragged subarray.
    Ragged(RaggedSubarray),
    /// A gathered subarray.
    Gathered(GatheredSubarray),
    /// A subsampled subarray.
    Subsampled(SubsampledSubarray),
    /// A mesh derived subarray.
    Mesh(MeshSubarray),
    /// An aggregated array fragment subarray.
    Fragment(FragmentSubarray),
}

impl Subarray {
    /// Decompress the subarray.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the compressed data is inconsistent with its auxiliary arrays or the interpolation method is unsupported.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        match self {
            Self::Ragged(subarray) => subarray.decompress(),
            Self::Gathered(subarray) => subarray.decompress(),
            Self::Subsampled(subarray) => subarray.decompress(),
            Self::Mesh(subarray) => subarray.decompress(),
            Self::Fragment(subarray) => subarray.decompress(),
        }
    }
}
