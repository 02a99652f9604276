//! Mesh derived arrays.
//!
//! UGRID mesh topologies describe unstructured grids with connectivity arrays that index mesh nodes, edges or faces.
//! Each array here is derived from one connectivity array:
//!  - [`BoundsFromNodes`]: the bounds of each cell, gathered from the node coordinates of its nodes,
//!  - [`CellConnectivity`]: each cell followed by its neighbouring cells, and
//!  - [`PointTopology`]: each node followed by the nodes it shares a cell edge with.
//!
//! Connectivity values are offset by a `start_index` of 0 or 1 and the cell dimension of a stored connectivity array may be its first or second dimension (`cell_dimension`).
//! Derived connectivity values are zero based.
//!
//! A location index set selects a subset of the cells (or nodes) of a mesh, in order.
//! Every subarray is a run of consecutive rows of the derived array spanning every column.

mod bounds_from_nodes;
mod cell_connectivity;
mod point_topology;

pub use bounds_from_nodes::BoundsFromNodes;
pub use cell_connectivity::CellConnectivity;
pub use point_topology::PointTopology;

use std::{ops::Range, sync::Arc};

use derive_more::Display;

use crate::{array_subset::ArraySubset, chunk_geometry::ChunkSpec};

use super::{
    requested_chunks, to_usize, ArrayError, ArrayShape, AuxiliaryArray, Block, DataType,
    MalformedCompressionError, SubarrayDescriptor,
};

/// The compressed location of a mesh derived subarray.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
#[display("rows {}..{} of the mesh derived array", rows.start, rows.end)]
pub struct MeshLocation {
    rows: Range<u64>,
}

impl MeshLocation {
    /// The rows of the derived array.
    #[must_use]
    pub fn rows(&self) -> &Range<u64> {
        &self.rows
    }
}

/// The derivation of a mesh subarray.
#[derive(Clone, Debug)]
enum MeshDerivation {
    /// Gather node coordinates. `coordinates` holds the nodes from `first_node`.
    Bounds {
        connectivity: Block,
        coordinates: Block,
        first_node: u64,
    },
    /// Prepend each cell to its neighbours.
    Connectivity { cells: Vec<u64>, connectivity: Block },
    /// Each node followed by its neighbours.
    Topology {
        nodes: Vec<u64>,
        neighbours: Vec<Arc<Vec<u64>>>,
    },
}

/// The connectivity of a mesh subarray, read into memory.
#[derive(Clone, Debug)]
pub struct MeshSubarray {
    derivation: MeshDerivation,
    shape: ArrayShape,
}

impl MeshSubarray {
    /// Derive the subarray from its connectivity.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if a connectivity value does not reference a node or cell of the mesh.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        let mut output = Block::masked(&self.shape);
        match &self.derivation {
            MeshDerivation::Bounds {
                connectivity,
                coordinates,
                first_node,
            } => {
                for (row, column) in connectivity_elements(connectivity) {
                    if let Some(node) = connectivity.value(&[row, column]) {
                        let node = to_index(node) - first_node;
                        output.set_value(&[row, column], coordinates.value(&[node]));
                    }
                }
            }
            MeshDerivation::Connectivity {
                cells,
                connectivity,
            } => {
                for (row, &cell) in cells.iter().enumerate() {
                    output.set_value(&[row as u64, 0], Some(cell as f64));
                }
                for (row, column) in connectivity_elements(connectivity) {
                    output.set_value(&[row, column + 1], connectivity.value(&[row, column]));
                }
            }
            MeshDerivation::Topology { nodes, neighbours } => {
                for (row, (&node, neighbours)) in std::iter::zip(nodes, neighbours).enumerate() {
                    output.set_value(&[row as u64, 0], Some(node as f64));
                    for (column, &neighbour) in neighbours.iter().enumerate() {
                        output.set_value(&[row as u64, column as u64 + 1], Some(neighbour as f64));
                    }
                }
            }
        }
        Ok(output)
    }
}

fn connectivity_elements(connectivity: &Block) -> impl Iterator<Item = (u64, u64)> {
    let shape = connectivity.shape();
    let (rows, columns) = (shape[0], shape.get(1).copied().unwrap_or_default());
    (0..rows).flat_map(move |row| (0..columns).map(move |column| (row, column)))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_index(value: f64) -> u64 {
    value as u64
}

/// Check a `start_index`.
fn validate_start_index(start_index: u64) -> Result<u64, MalformedCompressionError> {
    if start_index > 1 {
        Err(MalformedCompressionError::InvalidStartIndex(start_index))
    } else {
        Ok(start_index)
    }
}

/// A validated UGRID connectivity array.
///
/// Values are held zero based, with cells along the first dimension.
#[derive(Clone, Debug)]
struct Connectivity {
    cells: Arc<Block>,
}

impl Connectivity {
    /// Read and validate a connectivity array.
    ///
    /// `nodes` is the number of referenced elements.
    fn new(
        array: &AuxiliaryArray,
        start_index: u64,
        cell_dimension: usize,
        nodes: u64,
    ) -> Result<Self, ArrayError> {
        let start_index = validate_start_index(start_index)?;
        if cell_dimension > 1 {
            return Err(MalformedCompressionError::InvalidCellDimension(cell_dimension).into());
        }
        let stored = array.read()?;
        if stored.dimensionality() != 2 {
            return Err(MalformedCompressionError::AuxiliaryShape {
                name: "connectivity",
                got: stored.shape(),
                expected: "2 dimensions".to_string(),
            }
            .into());
        }
        let cell_major = if cell_dimension == 1 {
            stored.as_ref().clone().permuted_axes(&[1, 0])
        } else {
            stored.as_ref().clone()
        };
        let values = cell_major.to_optional_index_values()?;
        let columns = cell_major.shape()[1];
        let mut zero_based = Vec::with_capacity(values.len());
        for (position, value) in values.into_iter().enumerate() {
            let node = value
                .map(|value| {
                    value
                        .checked_sub(start_index)
                        .filter(|&node| node < nodes)
                        .ok_or(MalformedCompressionError::ConnectivityOutOfRange {
                            cell: position as u64 / columns.max(1),
                            value,
                            nodes,
                        })
                })
                .transpose()?;
            zero_based.push(node.map(|node| node as f64));
        }
        let cells = Block::from_optional_elements(cell_major.shape(), zero_based)?;
        Ok(Self {
            cells: Arc::new(cells),
        })
    }

    fn shape(&self) -> ArrayShape {
        self.cells.shape()
    }

    /// The number of cells.
    fn len(&self) -> u64 {
        self.shape()[0]
    }

    /// The maximum number of nodes of a cell.
    fn columns(&self) -> u64 {
        self.shape()[1]
    }

    /// The zero based nodes of a cell, excluding missing values.
    fn nodes(&self, cell: u64) -> Vec<u64> {
        (0..self.columns())
            .filter_map(|column| self.cells.value(&[cell, column]))
            .map(to_index)
            .collect()
    }

    /// The connectivity of `cells`, in order.
    fn select(&self, cells: &[u64]) -> Block {
        let cells = cells.iter().map(|&cell| to_usize(cell)).collect::<Vec<_>>();
        self.cells.select(0, &cells)
    }
}

/// A location index set.
///
/// Selects mesh elements by their (zero based) position.
#[derive(Clone, Debug)]
struct LocationIndexSet {
    array: AuxiliaryArray,
    elements: Arc<Vec<u64>>,
}

impl LocationIndexSet {
    fn new(array: AuxiliaryArray, start_index: u64, elements: u64) -> Result<Self, ArrayError> {
        let start_index = validate_start_index(start_index)?;
        let values = array.index_values()?;
        let selected = values
            .iter()
            .enumerate()
            .map(|(position, &value)| {
                value
                    .checked_sub(start_index)
                    .filter(|&element| element < elements)
                    .ok_or(MalformedCompressionError::InstanceOutOfRange {
                        position,
                        value,
                        instances: elements,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            array,
            elements: Arc::new(selected),
        })
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            array: self.array.to_memory()?,
            ..self.clone()
        })
    }
}

/// The elements of the derived rows `rows`, through an optional location index set.
fn selected_elements(location_index_set: Option<&LocationIndexSet>, rows: &Range<u64>) -> Vec<u64> {
    match location_index_set {
        Some(set) => set.elements[to_usize(rows.start)..to_usize(rows.end)].to_vec(),
        None => rows.clone().collect(),
    }
}

/// Partition a derived mesh array into runs of rows spanning every column.
fn mesh_subarrays(
    shape: &[u64],
    data_type: DataType,
    chunks: &ChunkSpec,
) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
    let requested = requested_chunks(chunks, shape, data_type)?;
    let columns = shape[1];
    let mut start = 0;
    let mut subarrays = Vec::with_capacity(requested[0].len());
    for &size in &requested[0] {
        let rows = start..start + size;
        subarrays.push(SubarrayDescriptor::new(
            ArraySubset::new_with_ranges(&[rows.clone(), 0..columns]),
            MeshLocation { rows },
        ));
        start += size;
    }
    Ok(subarrays)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connectivity_start_index_and_cell_dimension() {
        // 2 cells of 3 nodes, stored node major with one based values
        let stored = Block::from_elements(vec![3, 2], vec![1.0, 2.0, 2.0, 4.0, 3.0, 3.0]).unwrap();
        let connectivity = Connectivity::new(&stored.into(), 1, 1, 4).unwrap();
        assert_eq!(connectivity.shape(), vec![2, 3]);
        assert_eq!(connectivity.nodes(0), vec![0, 1, 2]);
        assert_eq!(connectivity.nodes(1), vec![1, 3, 2]);
    }

    #[test]
    fn connectivity_invalid() {
        let stored = || Block::from_elements(vec![1, 2], vec![0.0, 4.0]).unwrap();
        assert!(matches!(
            Connectivity::new(&stored().into(), 0, 0, 4),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::ConnectivityOutOfRange {
                    cell: 0,
                    value: 4,
                    nodes: 4
                }
            ))
        ));
        assert!(matches!(
            Connectivity::new(&stored().into(), 1, 0, 4),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::ConnectivityOutOfRange { value: 0, .. }
            ))
        ));
        assert!(matches!(
            Connectivity::new(&stored().into(), 2, 0, 4),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::InvalidStartIndex(2)
            ))
        ));
        assert!(matches!(
            Connectivity::new(&stored().into(), 0, 2, 4),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::InvalidCellDimension(2)
            ))
        ));
    }

    #[test]
    fn mesh_subarrays_span_columns() {
        let subarrays = mesh_subarrays(&[5, 3], DataType::Int32, &ChunkSpec::Uniform(2)).unwrap();
        assert_eq!(subarrays.len(), 3);
        assert_eq!(subarrays[2].region().to_ranges(), vec![4..5, 0..3]);
        assert_eq!(
            subarrays[2].location().to_string(),
            "rows 4..5 of the mesh derived array"
        );
    }
}
