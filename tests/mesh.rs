use std::collections::BTreeMap;

use cfdm_compressed::array::{
    mesh::{BoundsFromNodes, PointTopology},
    Block, CompressedArray, DataType,
};
use cfdm_compressed::chunk_geometry::ChunkSpec;
use cfdm_compressed::storage::{
    store::{JsonFileStore, JsonVariable},
    StoredVariable,
};

// 0 --- 1 --- 2
// |  a  |  b  |
// 3 --- 4 --- 5
fn face_nodes() -> Block {
    Block::from_elements(vec![2, 4], vec![0.0, 1.0, 4.0, 3.0, 1.0, 2.0, 5.0, 4.0]).unwrap()
}

#[test]
fn mesh_bounds_from_stored_nodes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("mesh.json");
    let node_x = Block::from_elements(vec![6], vec![0.0, 1.0, 2.0, 0.0, 1.0, 2.0])?;
    let store = std::sync::Arc::new(JsonFileStore::create(
        &path,
        BTreeMap::from([
            (
                "face_nodes".to_string(),
                JsonVariable::new(DataType::Int32, &face_nodes()),
            ),
            (
                "node_x".to_string(),
                JsonVariable::new(DataType::Float64, &node_x),
            ),
        ]),
    )?);

    let bounds = BoundsFromNodes::new(
        StoredVariable::from_store(&store, "face_nodes").into(),
        StoredVariable::from_store(&store, "node_x").into(),
        0,
        0,
    )?;
    let array = CompressedArray::new(bounds);
    assert_eq!(array.known_shape()?, vec![2, 4]);

    let graph = array.to_chunked_graph(&ChunkSpec::Uniform(1))?;
    assert_eq!(graph.len(), 2);
    assert_eq!(
        graph.tasks()[1].compute()?.to_optional_vec(),
        vec![Some(1.0), Some(2.0), Some(2.0), Some(1.0)]
    );
    assert_eq!(graph.assemble()?, array.get_all()?);
    Ok(())
}

#[test]
fn mesh_point_topology_of_quadrilaterals() -> Result<(), Box<dyn std::error::Error>> {
    let topology = PointTopology::new(face_nodes().into(), 0, 0)?;
    assert_eq!(topology.neighbours(4)?, vec![1, 3, 5]);
    let array = CompressedArray::new(topology);
    assert_eq!(array.known_shape()?, vec![6, 4]);
    assert_eq!(
        array.get_all()?.to_optional_vec()[..8],
        [
            Some(0.0),
            Some(1.0),
            Some(3.0),
            None,
            Some(1.0),
            Some(0.0),
            Some(2.0),
            Some(4.0)
        ]
    );
    Ok(())
}
