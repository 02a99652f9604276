use cfdm_compressed::array::{
    aggregated::{AggregatedBuilder, AggregationInstructions},
    gathered::Gathered,
    mesh::{BoundsFromNodes, CellConnectivity, PointTopology},
    ragged::{RaggedContiguous, RaggedIndexed, RaggedIndexedContiguous},
    ravel_indices,
    subsampled::SubsampledBuilder,
    Block, CompressedArray,
};
use cfdm_compressed::chunk_geometry::{AxisChunkSpec, ChunkSpec};

fn block(shape: &[u64], elements: &[f64]) -> Block {
    Block::from_elements(shape.to_vec(), elements.to_vec()).unwrap()
}

fn arrays() -> Vec<CompressedArray> {
    vec![
        CompressedArray::new(
            RaggedContiguous::new(
                block(&[7], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]).into(),
                block(&[4], &[3.0, 0.0, 2.0, 2.0]).into(),
            )
            .unwrap(),
        ),
        CompressedArray::new(
            RaggedIndexed::new(
                block(&[4], &[1.0, 2.0, 3.0, 4.0]).into(),
                block(&[4], &[1.0, 1.0, 0.0, 1.0]).into(),
            )
            .unwrap(),
        ),
        CompressedArray::new(
            RaggedIndexedContiguous::new(
                block(&[6], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).into(),
                block(&[3], &[2.0, 1.0, 3.0]).into(),
                block(&[3], &[0.0, 1.0, 0.0]).into(),
            )
            .unwrap(),
        ),
        CompressedArray::new(
            Gathered::new(
                block(&[3, 2], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).into(),
                block(&[2], &[1.0, 5.0]).into(),
                1,
                vec![2, 3],
            )
            .unwrap(),
        ),
        CompressedArray::new(
            SubsampledBuilder::new(
                block(&[2, 3], &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]).into(),
                vec![2, 5],
            )
            .tie_point_indices(1, block(&[3], &[0.0, 2.0, 4.0]).into())
            .interpolation_name("linear")
            .build()
            .unwrap(),
        ),
        CompressedArray::new(
            SubsampledBuilder::new(block(&[3], &[0.0, 10.0, 30.0]).into(), vec![5, 2])
                .tie_point_indices(0, block(&[3], &[0.0, 2.0, 4.0]).into())
                .interpolation_name("linear")
                .build()
                .unwrap(),
        ),
        CompressedArray::new(
            PointTopology::new(block(&[2, 3], &[0.0, 1.0, 2.0, 1.0, 3.0, 2.0]).into(), 0, 0)
                .unwrap(),
        ),
        CompressedArray::new(
            CellConnectivity::new(
                Block::from_optional_elements(vec![2, 1], vec![Some(1.0), Some(0.0)])
                    .unwrap()
                    .into(),
                0,
                0,
            )
            .unwrap(),
        ),
        CompressedArray::new(
            BoundsFromNodes::new(
                block(&[2, 3], &[0.0, 1.0, 2.0, 2.0, 3.0, 1.0]).into(),
                block(&[4], &[10.0, 20.0, 30.0, 40.0]).into(),
                0,
                0,
            )
            .unwrap(),
        ),
        CompressedArray::new(
            AggregatedBuilder::new(
                AggregationInstructions::from_json(
                    r#"{"shape": [[2, 1], [3]], "fragments": [{"value": 1.0}, {"value": 2.0}]}"#,
                )
                .unwrap(),
            )
            .build()
            .unwrap(),
        ),
    ]
}

fn chunk_specs(dimensionality: usize) -> Vec<ChunkSpec> {
    vec![
        ChunkSpec::Auto,
        ChunkSpec::Uniform(1),
        ChunkSpec::Uniform(2),
        ChunkSpec::PerAxis(vec![AxisChunkSpec::Full; dimensionality]),
    ]
}

#[test]
fn subarrays_partition_the_array() {
    for array in arrays() {
        let shape = array.known_shape().unwrap();
        let elements = shape.iter().product::<u64>();
        for chunks in chunk_specs(shape.len()) {
            let mut covered = vec![0; usize::try_from(elements).unwrap()];
            for subarray in array.subarrays(&chunks).unwrap() {
                assert!(subarray.region().inbounds(&shape));
                for indices in subarray.region().indices() {
                    covered[usize::try_from(ravel_indices(&indices, &shape)).unwrap()] += 1;
                }
            }
            assert!(
                covered.iter().all(|&count| count == 1),
                "{:?} does not partition {chunks:?}: {covered:?}",
                array.kind()
            );
        }
    }
}

#[test]
fn chunked_graph_matches_get() {
    for array in arrays() {
        let expected = array.get_all().unwrap();
        for chunks in chunk_specs(array.dimensionality()) {
            let graph = array.to_chunked_graph(&chunks).unwrap();
            assert_eq!(graph.shape(), expected.shape().as_slice());
            assert_eq!(graph.assemble().unwrap(), expected);
            assert_eq!(
                graph.compute_subset(&[graph.len() - 1, 0]).len(),
                2,
                "{chunks:?}"
            );
        }
    }
}

#[test]
fn to_memory_round_trip() {
    for array in arrays() {
        assert_eq!(
            array.to_memory().unwrap().get_all().unwrap(),
            array.get_all().unwrap()
        );
    }
}
