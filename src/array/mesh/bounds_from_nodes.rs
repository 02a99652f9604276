use crate::{array_subset::ArraySubset, chunk_geometry::ChunkSpec};

use super::{
    super::{
        ArrayError, ArrayShape, AuxiliaryArray, Block, CompressedDimensions, CompressedSource,
        CompressionKindTraits, DataType, MalformedCompressionError, Subarray, SubarrayDescriptor,
        UncompressedShape,
    },
    mesh_subarrays, selected_elements, Connectivity, LocationIndexSet, MeshDerivation,
    MeshLocation, MeshSubarray,
};

/// Cell bounds derived from a mesh node connectivity.
///
/// The bounds of a cell are the node coordinates of its nodes, in connectivity order.
/// The uncompressed shape is `(cells, max nodes per cell)`, missing connectivity values giving missing bounds.
#[derive(Clone, Debug)]
pub struct BoundsFromNodes {
    connectivity: Connectivity,
    node_coordinates: CompressedSource,
    location_index_set: Option<LocationIndexSet>,
    data_type: DataType,
    shape: ArrayShape,
}

impl BoundsFromNodes {
    /// Create cell bounds from a node connectivity and the node coordinates.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the arrays cannot be read,
    ///  - the node coordinates are not one dimensional,
    ///  - `start_index` or `cell_dimension` is not 0 or 1, or
    ///  - a connectivity value does not reference a node.
    pub fn new(
        node_connectivity: AuxiliaryArray,
        node_coordinates: CompressedSource,
        start_index: u64,
        cell_dimension: usize,
    ) -> Result<Self, ArrayError> {
        let coordinates_shape = node_coordinates.shape()?;
        let [nodes] = coordinates_shape[..] else {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "node coordinates",
                got: coordinates_shape,
                expected: "1 dimension".to_string(),
            }
            .into());
        };
        let connectivity =
            Connectivity::new(&node_connectivity, start_index, cell_dimension, nodes)?;
        Ok(Self {
            data_type: node_coordinates.data_type()?,
            shape: connectivity.shape(),
            connectivity,
            node_coordinates,
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
}

impl CompressionKindTraits for BoundsFromNodes {
    type Location = MeshLocation;

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
        mesh_subarrays(&self.shape, self.data_type, chunks)
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &MeshLocation,
    ) -> Result<Subarray, ArrayError> {
        let cells = selected_elements(self.location_index_set.as_ref(), location.rows());
        let connectivity = self.connectivity.select(&cells);
        let nodes = connectivity
            .to_optional_index_values()?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();
        let (first_node, coordinates) = match (nodes.iter().min(), nodes.iter().max()) {
            (Some(&first), Some(&last)) => (
                first,
                self.node_coordinates
                    .read(&ArraySubset::new_with_ranges(&[first..last + 1]))?,
            ),
            _ => (0, Block::masked(&[0])),
        };
        Ok(MeshSubarray {
            derivation: MeshDerivation::Bounds {
                connectivity,
                coordinates,
                first_node,
            },
            shape: region.shape().to_vec(),
        }
        .into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            node_coordinates: self.node_coordinates.to_memory()?,
            location_index_set: self
                .location_index_set
                .as_ref()
                .map(LocationIndexSet::to_memory)
                .transpose()?,
            ..self.clone()
        })
    }
}

impl BoundsFromNodes {
    /// The zero based nodes of `cell`, excluding missing values.
    #[must_use]
    pub fn cell_nodes(&self, cell: u64) -> Vec<u64> {
        self.connectivity.nodes(cell)
    }
}
