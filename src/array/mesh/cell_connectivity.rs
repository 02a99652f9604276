use crate::{array_subset::ArraySubset, chunk_geometry::ChunkSpec};

use super::{
    super::{
        ArrayError, ArrayShape, AuxiliaryArray, CompressedDimensions, CompressionKindTraits,
        DataType, Subarray, SubarrayDescriptor, UncompressedShape,
    },
    mesh_subarrays, selected_elements, Connectivity, LocationIndexSet, MeshDerivation,
    MeshLocation, MeshSubarray,
};

/// Cell connectivity derived from a mesh cell connectivity.
///
/// Each row holds a cell followed by its neighbouring cells, zero based.
/// The connectivity is a UGRID `face_face_connectivity` style array of the neighbours of each cell.
/// The uncompressed shape is `(cells, 1 + max neighbours per cell)`.
#[derive(Clone, Debug)]
pub struct CellConnectivity {
    connectivity: Connectivity,
    location_index_set: Option<LocationIndexSet>,
    shape: ArrayShape,
}

impl CellConnectivity {
    /// Create cell connectivity from the neighbours of each cell.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the connectivity cannot be read, `start_index` or `cell_dimension` is not 0 or 1, or a value does not reference a cell.
    pub fn new(
        cell_connectivity: AuxiliaryArray,
        start_index: u64,
        cell_dimension: usize,
    ) -> Result<Self, ArrayError> {
        let cells = cell_connectivity
            .shape()?
            .get(cell_dimension)
            .copied()
            .unwrap_or_default();
        let connectivity =
            Connectivity::new(&cell_connectivity, start_index, cell_dimension, cells)?;
        Ok(Self {
            shape: vec![connectivity.len(), connectivity.columns() + 1],
            connectivity,
            location_index_set: None,
        })
    }

    /// Select the cells of a location index set.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the location index set cannot be read or does not reference a cell.
    pub fn with_location_index_set(
        mut self,
        location_index_set: AuxiliaryArray,
        start_index: u64,
    ) -> Result<Self, ArrayError> {
        let set = LocationIndexSet::new(location_index_set, start_index, self.connectivity.len())?;
        self.shape[0] = set.elements.len() as u64;
        self.location_index_set = Some(set);
        Ok(self)
    }

    /// The zero based neighbours of `cell`.
    #[must_use]
    pub fn neighbours(&self, cell: u64) -> Vec<u64> {
        self.connectivity.nodes(cell)
    }
}

impl CompressionKindTraits for CellConnectivity {
    type Location = MeshLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        DataType::Int64
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::default()
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        mesh_subarrays(&self.shape, DataType::Int64, chunks)
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &MeshLocation,
    ) -> Result<Subarray, ArrayError> {
        let cells = selected_elements(self.location_index_set.as_ref(), location.rows());
        Ok(MeshSubarray {
            derivation: MeshDerivation::Connectivity {
                connectivity: self.connectivity.select(&cells),
                cells,
            },
            shape: region.shape().to_vec(),
        }
        .into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            location_index_set: self
                .location_index_set
                .as_ref()
                .map(LocationIndexSet::to_memory)
                .transpose()?,
            ..self.clone()
        })
    }
}
