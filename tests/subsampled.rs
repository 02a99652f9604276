use cfdm_compressed::array::{
    subsampled::{InterpolationParameter, SubsampledBuilder},
    ArrayError, Block, CompressedArray,
};
use cfdm_compressed::chunk_geometry::ChunkSpec;

fn block(shape: &[u64], elements: &[f64]) -> Block {
    Block::from_elements(shape.to_vec(), elements.to_vec()).unwrap()
}

fn assert_close(got: &Block, expected: &[f64]) {
    let got = got.to_optional_vec();
    assert_eq!(got.len(), expected.len());
    for (got, expected) in std::iter::zip(got, expected) {
        let got = got.unwrap();
        assert!((got - expected).abs() < 1e-9, "{got} != {expected}");
    }
}

#[test]
fn subsampled_linear_five_points() -> Result<(), Box<dyn std::error::Error>> {
    let array = CompressedArray::new(
        SubsampledBuilder::new(block(&[2], &[15.0, 135.0]).into(), vec![5])
            .tie_point_indices(0, block(&[2], &[0.0, 4.0]).into())
            .interpolation_name("linear")
            .build()?,
    );
    assert_close(&array.get_all()?, &[15.0, 45.0, 75.0, 105.0, 135.0]);
    Ok(())
}

#[test]
fn subsampled_quadratic_without_curvature_is_linear() -> Result<(), Box<dyn std::error::Error>> {
    let tie_points = block(&[3], &[0.0, 8.0, 12.0]);
    let indices = block(&[3], &[0.0, 4.0, 6.0]);
    let linear = CompressedArray::new(
        SubsampledBuilder::new(tie_points.clone().into(), vec![7])
            .tie_point_indices(0, indices.clone().into())
            .interpolation_name("linear")
            .build()?,
    );
    let quadratic = CompressedArray::new(
        SubsampledBuilder::new(tie_points.into(), vec![7])
            .tie_point_indices(0, indices.into())
            .interpolation_name("quadratic")
            .parameter(
                "w",
                InterpolationParameter::new(block(&[2], &[0.0, 0.0]).into(), vec![0]),
            )
            .build()?,
    );
    let expected = [0.0, 2.0, 4.0, 6.0, 8.0, 10.0, 12.0];
    assert_close(&linear.get_all()?, &expected);
    assert_close(&quadratic.get_all()?, &expected);
    Ok(())
}

#[test]
fn subsampled_continuous_areas_share_tie_points() -> Result<(), Box<dyn std::error::Error>> {
    // two continuous areas, 0..5 and 5..8, the first split into two subareas
    let array = CompressedArray::new(
        SubsampledBuilder::new(block(&[5], &[0.0, 4.0, 8.0, 20.0, 24.0]).into(), vec![8])
            .tie_point_indices(0, block(&[5], &[0.0, 2.0, 4.0, 5.0, 7.0]).into())
            .interpolation_name("linear")
            .build()?,
    );
    let subarrays = array.subarrays(&ChunkSpec::Auto)?;
    let sizes = subarrays
        .iter()
        .map(|subarray| subarray.region().num_elements())
        .collect::<Vec<_>>();
    // the shared tie point is only computed by the first of two subareas of a continuous area
    assert_eq!(sizes, vec![3, 2, 3]);
    assert_close(
        &array.get_all()?,
        &[0.0, 2.0, 4.0, 6.0, 8.0, 20.0, 22.0, 24.0],
    );

    // individual subareas agree with the whole array
    let graph = array.to_chunked_graph(&ChunkSpec::Auto)?;
    assert_eq!(graph.len(), 3);
    assert_close(&graph.tasks()[1].compute()?, &[6.0, 8.0]);
    assert_eq!(graph.assemble()?, array.get_all()?);
    Ok(())
}

#[test]
fn subsampled_bounds_stay_within_tie_points() -> Result<(), Box<dyn std::error::Error>> {
    let array = CompressedArray::new(
        SubsampledBuilder::new(block(&[3], &[0.0, 10.0, 30.0]).into(), vec![5, 2])
            .tie_point_indices(0, block(&[3], &[0.0, 2.0, 4.0]).into())
            .interpolation_name("linear")
            .build()?,
    );
    let bounds = array
        .get_all()?
        .to_optional_vec()
        .into_iter()
        .map(Option::unwrap)
        .collect::<Vec<_>>();
    assert_eq!(bounds.len(), 10);
    assert!(
        bounds.iter().all(|bound| (0.0..=30.0).contains(bound)),
        "a bound lies outside the tie points: {bounds:?}"
    );
    assert_eq!(bounds.first(), Some(&0.0));
    assert_eq!(bounds.last(), Some(&30.0));
    // adjacent cells share a vertex
    for cell in 1..5 {
        assert!((bounds[2 * cell] - bounds[2 * cell - 1]).abs() < 1e-9);
    }
    Ok(())
}

#[test]
fn subsampled_bi_linear_chunked() -> Result<(), Box<dyn std::error::Error>> {
    // u = 10 y + x sampled at its corners and centre lines
    let tie_points = block(
        &[3, 3],
        &[0.0, 2.0, 4.0, 20.0, 22.0, 24.0, 40.0, 42.0, 44.0],
    );
    let array = CompressedArray::new(
        SubsampledBuilder::new(tie_points.into(), vec![5, 5])
            .tie_point_indices(0, block(&[3], &[0.0, 2.0, 4.0]).into())
            .tie_point_indices(1, block(&[3], &[0.0, 2.0, 4.0]).into())
            .interpolation_name("bi_linear")
            .build()?,
    );
    let expected = (0..5)
        .flat_map(|y| (0..5).map(move |x| f64::from(10 * y + x)))
        .collect::<Vec<_>>();
    assert_close(&array.get_all()?, &expected);
    assert_eq!(array.to_chunked_graph(&ChunkSpec::Auto)?.len(), 4);
    Ok(())
}

#[test]
fn subsampled_unsupported_method_fails_on_read() {
    let array = CompressedArray::new(
        SubsampledBuilder::new(block(&[2], &[0.0, 1.0]).into(), vec![3])
            .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
            .interpolation_description("a bespoke scheme")
            .build()
            .unwrap(),
    );
    let error = array.get_all().unwrap_err();
    assert!(matches!(
        error.root(),
        ArrayError::UnsupportedInterpolationError(_)
    ));
}
