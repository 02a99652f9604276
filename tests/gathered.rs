use cfdm_compressed::array::{
    gathered::Gathered, ArrayError, Block, CompressedArray, MalformedCompressionError,
};
use cfdm_compressed::array_subset::ArraySubset;
use cfdm_compressed::chunk_geometry::ChunkSpec;

#[test]
fn gathered_scatter_by_unravel() -> Result<(), Box<dyn std::error::Error>> {
    // c0 -- c1
    // -- c2 --
    let array = CompressedArray::new(Gathered::new(
        Block::from_elements(vec![3], vec![1.5, 2.5, 3.5])?.into(),
        Block::from_elements(vec![3], vec![0.0, 2.0, 4.0])?.into(),
        0,
        vec![2, 3],
    )?);
    assert_eq!(
        array.get_all()?.to_optional_vec(),
        vec![Some(1.5), None, Some(2.5), None, Some(3.5), None]
    );
    Ok(())
}

#[test]
fn gathered_retained_dimensions() -> Result<(), Box<dyn std::error::Error>> {
    // time x list, gathered into time x lat x lon
    let array = CompressedArray::new(Gathered::new(
        Block::from_elements(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?.into(),
        Block::from_elements(vec![3], vec![0.0, 3.0, 1.0])?.into(),
        1,
        vec![2, 2],
    )?);
    assert_eq!(array.known_shape()?, vec![2, 2, 2]);
    assert_eq!(
        array.compressed_dimensions().uncompressed_axes(1),
        Some([1, 2].as_slice())
    );

    let subarrays = array.subarrays(&ChunkSpec::Uniform(1))?;
    assert_eq!(subarrays.len(), 2);
    for subarray in &subarrays {
        assert_eq!(&subarray.region().shape()[1..], &[2, 2]);
    }

    assert_eq!(
        array
            .get(&ArraySubset::new_with_ranges(&[1..2, 0..2, 0..2]))?
            .to_optional_vec(),
        vec![Some(4.0), Some(6.0), None, Some(5.0)]
    );
    Ok(())
}

#[test]
fn gathered_list_out_of_range() {
    let result = Gathered::new(
        Block::from_elements(vec![2], vec![1.0, 2.0]).unwrap().into(),
        Block::from_elements(vec![2], vec![0.0, 6.0]).unwrap().into(),
        0,
        vec![2, 3],
    );
    assert!(matches!(
        result,
        Err(ArrayError::MalformedCompressionError(
            MalformedCompressionError::ListOutOfRange {
                position: 1,
                value: 6,
                size: 6
            }
        ))
    ));
}
