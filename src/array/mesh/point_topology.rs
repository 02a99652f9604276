use std::{
    collections::BTreeSet,
    sync::{Arc, OnceLock},
};

use crate::{array_subset::ArraySubset, chunk_geometry::ChunkSpec};

use super::{
    super::{
        to_usize, ArrayError, ArrayShape, AuxiliaryArray, CompressedDimensions,
        CompressionKindTraits, DataType, MalformedCompressionError, Subarray, SubarrayDescriptor,
        UncompressedShape,
    },
    mesh_subarrays, selected_elements, validate_start_index, Connectivity, LocationIndexSet,
    MeshDerivation, MeshLocation, MeshSubarray,
};

/// The node neighbours of a mesh.
#[derive(Debug)]
struct Topology {
    neighbours: Vec<Arc<Vec<u64>>>,
    location_index_set: Option<LocationIndexSet>,
    shape: ArrayShape,
}

/// Point topology derived from a mesh node connectivity.
///
/// Each row holds a node followed by the nodes it shares a cell edge with, in ascending order.
/// Nodes are adjacent when they are consecutive in the connectivity of a cell, the last node of a face being adjacent to its first.
///
/// Node numbers are bounded by the number of connectivity entries.
/// The number of nodes and neighbours is not known until the connectivity is read.
/// The shape reported by [`CompressionKindTraits::shape`] is unknown until then; [`CompressionKindTraits::known_shape`] reads the connectivity.
#[derive(Clone, Debug)]
pub struct PointTopology {
    connectivity: AuxiliaryArray,
    start_index: u64,
    cell_dimension: usize,
    location_index_set: Option<(AuxiliaryArray, u64)>,
    topology: Arc<OnceLock<Arc<Topology>>>,
}

impl PointTopology {
    /// Create a point topology from an edge or face node connectivity.
    ///
    /// The connectivity is not read.
    ///
    /// # Errors
    /// Returns a [`MalformedCompressionError`] if `start_index` or `cell_dimension` is not 0 or 1.
    pub fn new(
        node_connectivity: AuxiliaryArray,
        start_index: u64,
        cell_dimension: usize,
    ) -> Result<Self, MalformedCompressionError> {
        if cell_dimension > 1 {
            return Err(MalformedCompressionError::InvalidCellDimension(cell_dimension));
        }
        Ok(Self {
            connectivity: node_connectivity,
            start_index: validate_start_index(start_index)?,
            cell_dimension,
            location_index_set: None,
            topology: Arc::default(),
        })
    }

    /// Select the nodes of a location index set.
    ///
    /// The location index set is not read.
    ///
    /// # Errors
    /// Returns a [`MalformedCompressionError`] if `start_index` is not 0 or 1.
    pub fn with_location_index_set(
        mut self,
        location_index_set: AuxiliaryArray,
        start_index: u64,
    ) -> Result<Self, MalformedCompressionError> {
        self.location_index_set = Some((location_index_set, validate_start_index(start_index)?));
        self.topology = Arc::default();
        Ok(self)
    }

    /// The zero based neighbours of `node`, reading the connectivity if required.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the connectivity cannot be read.
    pub fn neighbours(&self, node: u64) -> Result<Vec<u64>, ArrayError> {
        Ok(self
            .topology()?
            .neighbours
            .get(usize::try_from(node).unwrap_or(usize::MAX))
            .map(|neighbours| neighbours.as_ref().clone())
            .unwrap_or_default())
    }

    fn topology(&self) -> Result<Arc<Topology>, ArrayError> {
        if let Some(topology) = self.topology.get() {
            return Ok(topology.clone());
        }
        // every node is referenced by a connectivity entry
        let entries = self.connectivity.shape()?.iter().product::<u64>();
        let connectivity = Connectivity::new(
            &self.connectivity,
            self.start_index,
            self.cell_dimension,
            entries,
        )?;

        let mut neighbours: Vec<BTreeSet<u64>> = Vec::new();
        for cell in 0..connectivity.len() {
            let nodes = connectivity.nodes(cell);
            if let Some(&last) = nodes.iter().max() {
                if neighbours.len() as u64 <= last {
                    neighbours.resize_with(to_usize(last + 1), BTreeSet::new);
                }
            }
            let ring = nodes.iter().zip(nodes.iter().cycle().skip(1));
            for (&a, &b) in ring.take(if nodes.len() > 1 { nodes.len() } else { 0 }) {
                if a != b {
                    neighbours[to_usize(a)].insert(b);
                    neighbours[to_usize(b)].insert(a);
                }
            }
        }
        let nodes = neighbours.len() as u64;
        let columns = 1 + neighbours.iter().map(BTreeSet::len).max().unwrap_or_default() as u64;
        let location_index_set = self
            .location_index_set
            .as_ref()
            .map(|(array, start_index)| LocationIndexSet::new(array.clone(), *start_index, nodes))
            .transpose()?;
        let rows = location_index_set
            .as_ref()
            .map_or(nodes, |set| set.elements.len() as u64);
        log::debug!(
            "derived the point topology of {nodes} nodes from {} cells",
            connectivity.len()
        );

        let topology = Arc::new(Topology {
            neighbours: neighbours
                .into_iter()
                .map(|neighbours| Arc::new(neighbours.into_iter().collect()))
                .collect(),
            location_index_set,
            shape: vec![rows, columns],
        });
        Ok(self.topology.get_or_init(|| topology).clone())
    }
}

impl CompressionKindTraits for PointTopology {
    type Location = MeshLocation;

    fn shape(&self) -> UncompressedShape {
        match self.topology.get() {
            Some(topology) => UncompressedShape::new_known(&topology.shape),
            None => UncompressedShape::from(vec![None, None]),
        }
    }

    fn known_shape(&self) -> Result<ArrayShape, ArrayError> {
        Ok(self.topology()?.shape.clone())
    }

    fn data_type(&self) -> DataType {
        DataType::Int64
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::single(0, vec![0, 1])
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        mesh_subarrays(&self.known_shape()?, DataType::Int64, chunks)
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &MeshLocation,
    ) -> Result<Subarray, ArrayError> {
        let topology = self.topology()?;
        let nodes = selected_elements(topology.location_index_set.as_ref(), location.rows());
        let neighbours = nodes
            .iter()
            .map(|&node| topology.neighbours[to_usize(node)].clone())
            .collect();
        Ok(MeshSubarray {
            derivation: MeshDerivation::Topology { nodes, neighbours },
            shape: region.shape().to_vec(),
        }
        .into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            connectivity: self.connectivity.to_memory()?,
            location_index_set: self
                .location_index_set
                .as_ref()
                .map(|(array, start_index)| -> Result<_, ArrayError> {
                    Ok((array.to_memory()?, *start_index))
                })
                .transpose()?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::array::{Block, CompressedArray};

    use super::*;

    fn faces() -> Block {
        // two triangles sharing the edge 1-2, and a missing fourth node
        Block::from_optional_elements(
            vec![2, 4],
            vec![
                Some(0.0),
                Some(1.0),
                Some(2.0),
                None,
                Some(1.0),
                Some(3.0),
                Some(2.0),
                None,
            ],
        )
        .unwrap()
    }

    #[test]
    fn point_topology_faces() {
        let topology = PointTopology::new(faces().into(), 0, 0).unwrap();
        assert_eq!(topology.shape(), UncompressedShape::from(vec![None, None]));
        let array = CompressedArray::new(topology);
        assert_eq!(array.known_shape().unwrap(), vec![4, 4]);
        assert_eq!(array.shape(), UncompressedShape::new_known(&[4, 4]));
        assert_eq!(
            array.get_all().unwrap().to_optional_vec(),
            vec![
                Some(0.0),
                Some(1.0),
                Some(2.0),
                None,
                Some(1.0),
                Some(0.0),
                Some(2.0),
                Some(3.0),
                Some(2.0),
                Some(0.0),
                Some(1.0),
                Some(3.0),
                Some(3.0),
                Some(1.0),
                Some(2.0),
                None,
            ]
        );
    }

    #[test]
    fn point_topology_edges() {
        // edges 1-2 and 2-3, one based, stored node major
        let edges = Block::from_elements(vec![2, 2], vec![1.0, 2.0, 2.0, 3.0]).unwrap();
        let topology = PointTopology::new(edges.into(), 1, 1)
            .unwrap()
            .with_location_index_set(Block::from_elements(vec![1], vec![2.0]).unwrap().into(), 1)
            .unwrap();
        assert_eq!(topology.neighbours(1).unwrap(), vec![0, 2]);
        assert_eq!(topology.known_shape().unwrap(), vec![1, 3]);
        assert_eq!(
            CompressedArray::new(topology)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            vec![Some(1.0), Some(0.0), Some(2.0)]
        );
    }

    #[test]
    fn point_topology_invalid() {
        assert!(matches!(
            PointTopology::new(faces().into(), 0, 3),
            Err(MalformedCompressionError::InvalidCellDimension(3))
        ));
    }

    #[test]
    fn point_topology_node_beyond_entries() {
        let edges = Block::from_elements(vec![1, 2], vec![0.0, 1_099_511_627_776.0]).unwrap();
        let topology = PointTopology::new(edges.into(), 0, 0).unwrap();
        assert!(matches!(
            topology.known_shape(),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::ConnectivityOutOfRange {
                    cell: 0,
                    value: 1_099_511_627_776,
                    nodes: 2
                }
            ))
        ));
    }
}
