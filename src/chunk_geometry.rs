//! Chunk geometry.
//!
//! Pure arithmetic for carving an uncompressed shape into addressable chunks.
//!
//! A chunking request is described by a [`ChunkSpec`] and resolved against a shape with [`normalize_chunks`] into explicit per-axis chunk sizes ([`AxisChunks`]).
//! Resolved chunk sizes can then be enumerated with [`chunk_positions`] (the position of each chunk in the chunk grid) and [`chunk_locations`] (the region of the array each chunk covers).
//! Chunks always tile an axis exactly: the chunk sizes of an axis sum to its size.

use crate::{
    array::{ArrayShape, DataType, ShapeError},
    array_subset::{ArraySubset, IndicesIterator},
    config::global_config,
};

/// The requested chunking of one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisChunkSpec {
    /// Choose a chunk size automatically.
    Auto,
    /// A single chunk spanning the axis.
    Full,
    /// Chunks of a fixed size, the last chunk holding any remainder.
    Size(u64),
    /// Explicit chunk sizes, which must sum to the axis size.
    Explicit(Vec<u64>),
}

/// A chunking request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChunkSpec {
    /// Choose chunk sizes automatically, targeting the [auto chunk size](crate::config::Config#auto-chunk-size).
    #[default]
    Auto,
    /// The same chunk size along every axis.
    Uniform(u64),
    /// An explicit request for each axis.
    PerAxis(Vec<AxisChunkSpec>),
}

impl From<u64> for ChunkSpec {
    fn from(size: u64) -> Self {
        Self::Uniform(size)
    }
}

impl From<Vec<AxisChunkSpec>> for ChunkSpec {
    fn from(axes: Vec<AxisChunkSpec>) -> Self {
        Self::PerAxis(axes)
    }
}

/// The normalised chunks of one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AxisChunks {
    /// Resolved chunk sizes.
    Sizes(Vec<u64>),
    /// A single chunk of unknown size along an axis of unknown size.
    ///
    /// Must be resolved against the known axis size before execution.
    Unresolved,
}

/// Resolved chunk sizes for each axis.
pub type ChunkShapes = Vec<Vec<u64>>;

/// Normalise a chunking request against an uncompressed `shape`.
///
/// Axes with an unknown size (`None`) produce [`AxisChunks::Unresolved`].
///
/// # Errors
/// Returns a [`ShapeError`] if
///  - a per-axis request does not match the dimensionality of `shape`,
///  - a requested chunk size is zero, or
///  - explicit chunk sizes do not sum to the axis size.
pub fn normalize_chunks(
    spec: &ChunkSpec,
    shape: &[Option<u64>],
    data_type: DataType,
) -> Result<Vec<AxisChunks>, ShapeError> {
    let axes: Vec<AxisChunkSpec> = match spec {
        ChunkSpec::Auto => vec![AxisChunkSpec::Auto; shape.len()],
        ChunkSpec::Uniform(size) => vec![AxisChunkSpec::Size(*size); shape.len()],
        ChunkSpec::PerAxis(axes) => {
            if axes.len() != shape.len() {
                return Err(ShapeError::ChunkDimensionality {
                    got: axes.len(),
                    expected: shape.len(),
                });
            }
            axes.clone()
        }
    };

    let mut chunks: Vec<Option<AxisChunks>> = vec![None; shape.len()];
    let mut fixed_elements: u64 = 1;
    for (axis, (axis_spec, size)) in std::iter::zip(&axes, shape).enumerate() {
        let Some(size) = *size else {
            chunks[axis] = Some(AxisChunks::Unresolved);
            continue;
        };
        let sizes = match axis_spec {
            AxisChunkSpec::Auto => continue,
            AxisChunkSpec::Full => split_axis(size, size.max(1)),
            AxisChunkSpec::Size(chunk_size) => {
                if *chunk_size == 0 {
                    return Err(ShapeError::InvalidChunkSize { axis });
                }
                split_axis(size, *chunk_size)
            }
            AxisChunkSpec::Explicit(sizes) => {
                let total: u64 = sizes.iter().sum();
                if total != size {
                    return Err(ShapeError::ChunkSum {
                        axis,
                        sum: total,
                        size,
                    });
                }
                sizes.iter().copied().filter(|&size| size > 0).collect()
            }
        };
        fixed_elements *= sizes.iter().copied().max().unwrap_or(1).max(1);
        chunks[axis] = Some(AxisChunks::Sizes(sizes));
    }

    // Auto axes share the remaining element budget, fastest varying axis first
    let target_elements = (global_config().auto_chunk_size() / data_type.size() as u64).max(1);
    let mut remaining = (target_elements / fixed_elements).max(1);
    for axis in (0..shape.len()).rev() {
        if chunks[axis].is_some() {
            continue;
        }
        let size = shape[axis].unwrap_or_default();
        let chunk_size = remaining.clamp(1, size.max(1));
        remaining = (remaining / chunk_size).max(1);
        chunks[axis] = Some(AxisChunks::Sizes(split_axis(size, chunk_size)));
    }

    Ok(chunks.into_iter().flatten().collect())
}

/// Return the resolved chunk sizes of normalised chunks.
///
/// # Errors
/// Returns [`ShapeError::UnresolvedChunks`] if any axis is [`AxisChunks::Unresolved`].
pub fn resolved_chunks(chunks: &[AxisChunks]) -> Result<ChunkShapes, ShapeError> {
    chunks
        .iter()
        .enumerate()
        .map(|(axis, chunks)| match chunks {
            AxisChunks::Sizes(sizes) => Ok(sizes.clone()),
            AxisChunks::Unresolved => Err(ShapeError::UnresolvedChunks { axis }),
        })
        .collect()
}

/// Split an axis of `size` into chunks of `chunk_size`, the last chunk holding any remainder.
#[must_use]
pub fn split_axis(size: u64, chunk_size: u64) -> Vec<u64> {
    debug_assert!(chunk_size > 0);
    let mut sizes = vec![chunk_size; usize::try_from(size / chunk_size).unwrap_or_default()];
    if size % chunk_size != 0 {
        sizes.push(size % chunk_size);
    }
    sizes
}

/// Return the cumulative offsets of `sizes`, starting at zero.
///
/// The result has one more element than `sizes`.
#[must_use]
pub fn cumulative_offsets(sizes: &[u64]) -> Vec<u64> {
    std::iter::once(0)
        .chain(sizes.iter().scan(0, |offset, size| {
            *offset += size;
            Some(*offset)
        }))
        .collect()
}

/// Return the number of chunks along each axis.
#[must_use]
pub fn chunk_grid_shape(chunks: &[Vec<u64>]) -> ArrayShape {
    chunks.iter().map(|sizes| sizes.len() as u64).collect()
}

/// Returns an iterator over the positions of every chunk in the chunk grid.
///
/// This is the cartesian product of `0..chunks[d].len()` over each axis `d`, in C order.
#[must_use]
pub fn chunk_positions(chunks: &[Vec<u64>]) -> IndicesIterator {
    ArraySubset::new_with_shape(chunk_grid_shape(chunks)).indices()
}

/// Returns an iterator over the region of the array covered by every chunk, in the same order as [`chunk_positions`].
///
/// The start and shape of each region come from the cumulative sums of the chunk sizes of each axis.
pub fn chunk_locations(chunks: &[Vec<u64>]) -> impl Iterator<Item = ArraySubset> + '_ {
    let offsets: Vec<Vec<u64>> = chunks.iter().map(|sizes| cumulative_offsets(sizes)).collect();
    chunk_positions(chunks).map(move |position| {
        let (start, shape) = position
            .iter()
            .enumerate()
            .map(|(axis, &index)| {
                let index = usize::try_from(index).unwrap_or_default();
                (offsets[axis][index], chunks[axis][index])
            })
            .unzip();
        ArraySubset::new_with_start_shape(start, shape).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_uniform() {
        let chunks =
            normalize_chunks(&ChunkSpec::Uniform(2), &[Some(5), Some(4)], DataType::Float64)
                .unwrap();
        assert_eq!(
            chunks,
            vec![
                AxisChunks::Sizes(vec![2, 2, 1]),
                AxisChunks::Sizes(vec![2, 2])
            ]
        );
        assert!(normalize_chunks(&ChunkSpec::Uniform(0), &[Some(5)], DataType::Float64).is_err());
    }

    #[test]
    fn normalize_per_axis() {
        let spec = ChunkSpec::PerAxis(vec![
            AxisChunkSpec::Explicit(vec![1, 3, 1]),
            AxisChunkSpec::Full,
            AxisChunkSpec::Auto,
        ]);
        let chunks =
            normalize_chunks(&spec, &[Some(5), Some(4), Some(3)], DataType::Int32).unwrap();
        assert_eq!(
            resolved_chunks(&chunks).unwrap(),
            vec![vec![1, 3, 1], vec![4], vec![3]]
        );

        let bad_sum = ChunkSpec::PerAxis(vec![AxisChunkSpec::Explicit(vec![1, 3])]);
        assert!(matches!(
            normalize_chunks(&bad_sum, &[Some(5)], DataType::Int32),
            Err(ShapeError::ChunkSum { axis: 0, sum: 4, size: 5 })
        ));
        assert!(normalize_chunks(&bad_sum, &[Some(4), Some(1)], DataType::Int32).is_err());
    }

    #[test]
    fn normalize_auto_unknown() {
        let chunks = normalize_chunks(&ChunkSpec::Auto, &[None, Some(7)], DataType::Int64).unwrap();
        assert_eq!(chunks[0], AxisChunks::Unresolved);
        assert_eq!(chunks[1], AxisChunks::Sizes(vec![7]));
        assert!(matches!(
            resolved_chunks(&chunks),
            Err(ShapeError::UnresolvedChunks { axis: 0 })
        ));
    }

    #[test]
    fn normalize_auto_sums_to_shape() {
        let shape = [Some(1000), Some(333), Some(17)];
        let chunks = normalize_chunks(&ChunkSpec::Auto, &shape, DataType::Float64).unwrap();
        for (chunks, size) in std::iter::zip(resolved_chunks(&chunks).unwrap(), shape) {
            assert_eq!(chunks.iter().sum::<u64>(), size.unwrap());
        }
    }

    #[test]
    fn positions_and_locations() {
        let chunks = vec![vec![2, 1], vec![3, 3]];
        let positions: Vec<_> = chunk_positions(&chunks).collect();
        assert_eq!(
            positions,
            vec![vec![0, 0], vec![0, 1], vec![1, 0], vec![1, 1]]
        );
        let locations: Vec<_> = chunk_locations(&chunks).collect();
        assert_eq!(
            locations,
            vec![
                ArraySubset::new_with_ranges(&[0..2, 0..3]),
                ArraySubset::new_with_ranges(&[0..2, 3..6]),
                ArraySubset::new_with_ranges(&[2..3, 0..3]),
                ArraySubset::new_with_ranges(&[2..3, 3..6]),
            ]
        );
    }

    #[test]
    fn offsets() {
        assert_eq!(cumulative_offsets(&[3, 0, 2]), vec![0, 3, 3, 5]);
        assert_eq!(split_axis(7, 3), vec![3, 3, 1]);
        assert_eq!(split_axis(0, 3), Vec::<u64>::new());
    }
}
