use std::ops::Range;

use crate::array::{ArrayError, MalformedCompressionError, ShapeError};

/// An interpolation subarea along one subsampled dimension.
///
/// Spans the uncompressed indices between two tie points.
/// The first index of a subarea duplicates the last index of the previous subarea, unless the subarea starts a continuous area.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterpolationSubarea {
    index: usize,
    tie_point: usize,
    tie_point_indices: [u64; 2],
    first: bool,
}

impl InterpolationSubarea {
    /// The position of the subarea along its subsampled dimension.
    ///
    /// This addresses interpolation parameters along an interpolation subarea dimension.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The position of the first of the two tie points bounding the subarea.
    #[must_use]
    pub fn tie_point(&self) -> usize {
        self.tie_point
    }

    /// The uncompressed indices of the two bounding tie points.
    #[must_use]
    pub fn tie_point_indices(&self) -> [u64; 2] {
        self.tie_point_indices
    }

    /// Returns true if the subarea starts a continuous area.
    #[must_use]
    pub fn first(&self) -> bool {
        self.first
    }

    /// The number of intervals between the bounding tie points.
    #[must_use]
    pub fn intervals(&self) -> u64 {
        self.tie_point_indices[1] - self.tie_point_indices[0]
    }

    /// The uncompressed range produced by the subarea.
    #[must_use]
    pub fn range(&self) -> Range<u64> {
        let [start, end] = self.tie_point_indices;
        if self.first {
            start..end + 1
        } else {
            start + 1..end + 1
        }
    }

    /// The interpolation coordinate `s` of every interpolated point, in order.
    ///
    /// Coordinates are `k / n` for the `n` intervals of the subarea, dropping `k = 0` unless the subarea starts a continuous area.
    /// Cell bounds have one more vertex than the subarea has cells, spaced evenly over `[0, 1]` so the outer vertices lie on the tie points.
    #[must_use]
    pub fn positions(&self, bounds: bool) -> Vec<f64> {
        let range = self.range();
        let count = range.end - range.start;
        if bounds {
            let cells = count as f64;
            (0..=count).map(|k| k as f64 / cells).collect()
        } else {
            let intervals = self.intervals() as f64;
            let offset = u64::from(!self.first);
            (0..count)
                .map(|k| (k + offset) as f64 / intervals)
                .collect()
        }
    }
}

/// Decompose the tie point indices of a subsampled dimension into interpolation subareas.
///
/// Consecutive tie point indices `(i0, i1)` bound an interpolation subarea when `i1 - i0 > 1`.
/// Adjacent indices (`i1 - i0 == 1`) bound no subarea and mark the start of a new continuous area.
///
/// # Errors
/// Returns an [`ArrayError`] if
///  - the tie point indices are not strictly increasing ([`MalformedCompressionError::TiePointIndicesNotIncreasing`]), or
///  - the subareas do not tile `0..size` ([`ShapeError::Tiling`]).
pub fn interpolation_subareas(
    axis: usize,
    tie_point_indices: &[u64],
    size: u64,
) -> Result<Vec<InterpolationSubarea>, ArrayError> {
    let mut subareas = Vec::new();
    let mut first = true;
    let mut covered = 0;
    for (tie_point, pair) in tie_point_indices.windows(2).enumerate() {
        let (i0, i1) = (pair[0], pair[1]);
        if i1 <= i0 {
            return Err(MalformedCompressionError::TiePointIndicesNotIncreasing {
                axis,
                position: tie_point + 1,
            }
            .into());
        }
        if i1 - i0 == 1 {
            first = true;
            continue;
        }
        let subarea = InterpolationSubarea {
            index: subareas.len(),
            tie_point,
            tie_point_indices: [i0, i1],
            first,
        };
        let range = subarea.range();
        if range.start != covered {
            return Err(ShapeError::Tiling {
                axis,
                covered,
                size,
            }
            .into());
        }
        covered = range.end;
        subareas.push(subarea);
        first = false;
    }
    if covered != size {
        return Err(ShapeError::Tiling {
            axis,
            covered,
            size,
        }
        .into());
    }
    Ok(subareas)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subareas_continuous_areas() {
        let subareas = interpolation_subareas(0, &[0, 3, 4, 6], 7).unwrap();
        assert_eq!(subareas.len(), 2);
        assert!(subareas[0].first());
        assert_eq!(subareas[0].range(), 0..4);
        assert!(subareas[1].first());
        assert_eq!(subareas[1].range(), 4..7);
        assert_eq!(subareas[1].index(), 1);
        assert_eq!(subareas[1].tie_point(), 2);
    }

    #[test]
    fn subareas_trimming() {
        let subareas = interpolation_subareas(1, &[0, 2, 4], 5).unwrap();
        assert_eq!(subareas[0].range(), 0..3);
        assert_eq!(subareas[0].positions(false), vec![0.0, 0.5, 1.0]);
        assert!(!subareas[1].first());
        assert_eq!(subareas[1].range(), 3..5);
        assert_eq!(subareas[1].positions(false), vec![0.5, 1.0]);
        // three cells in the first subarea, two in the second
        assert_eq!(
            subareas[0].positions(true),
            vec![0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]
        );
        assert_eq!(subareas[1].positions(true), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn subareas_invalid() {
        assert!(matches!(
            interpolation_subareas(0, &[0, 2, 2], 3),
            Err(ArrayError::MalformedCompressionError(
                MalformedCompressionError::TiePointIndicesNotIncreasing {
                    axis: 0,
                    position: 2
                }
            ))
        ));
        assert!(matches!(
            interpolation_subareas(0, &[0, 2], 4),
            Err(ArrayError::ShapeError(ShapeError::Tiling {
                axis: 0,
                covered: 3,
                size: 4
            }))
        ));
        // an isolated tie point is not covered by any subarea
        assert!(matches!(
            interpolation_subareas(0, &[0, 1, 3], 4),
            Err(ArrayError::ShapeError(ShapeError::Tiling { .. }))
        ));
    }
}
