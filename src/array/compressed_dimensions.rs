use std::collections::BTreeMap;

use derive_more::Deref;

use super::ShapeError;

/// The mapping of compressed dimensions to the uncompressed dimensions they expand into.
///
/// Compressed dimensions absent from the mapping correspond to exactly one uncompressed dimension.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deref)]
pub struct CompressedDimensions(BTreeMap<usize, Vec<usize>>);

impl CompressedDimensions {
    /// Create a new compressed dimension mapping.
    ///
    /// # Errors
    /// Returns [`ShapeError::InvalidCompressedDimensions`] unless every compressed dimension maps to a non-empty run of consecutive uncompressed dimensions,
    /// in the same order as the compressed dimensions and consistent with the unmapped dimensions between them.
    pub fn new(
        mapping: impl IntoIterator<Item = (usize, Vec<usize>)>,
    ) -> Result<Self, ShapeError> {
        let mapping: BTreeMap<usize, Vec<usize>> = mapping.into_iter().collect();
        let mut offset = 0;
        let mut compressed_axis = 0;
        for (&axis, uncompressed) in &mapping {
            offset += axis - compressed_axis;
            let consecutive = uncompressed
                .iter()
                .enumerate()
                .all(|(i, &uncompressed_axis)| uncompressed_axis == offset + i);
            if uncompressed.is_empty() || !consecutive {
                return Err(ShapeError::InvalidCompressedDimensions(
                    mapping.into_iter().collect(),
                ));
            }
            offset += uncompressed.len();
            compressed_axis = axis + 1;
        }
        Ok(Self(mapping))
    }

    pub(crate) fn single(compressed_axis: usize, uncompressed_axes: Vec<usize>) -> Self {
        Self(BTreeMap::from([(compressed_axis, uncompressed_axes)]))
    }

    /// Compressed dimensions that each uncompress to the dimension at the same position.
    pub(crate) fn identity(axes: impl IntoIterator<Item = usize>) -> Self {
        Self(axes.into_iter().map(|axis| (axis, vec![axis])).collect())
    }

    /// Return the uncompressed dimensions of `compressed_axis`, if it is compressed.
    #[must_use]
    pub fn uncompressed_axes(&self, compressed_axis: usize) -> Option<&[usize]> {
        self.0.get(&compressed_axis).map(Vec::as_slice)
    }

    /// Return the uncompressed dimensions of every axis of a compressed array with `compressed_dimensionality` dimensions.
    #[must_use]
    pub fn expand(&self, compressed_dimensionality: usize) -> Vec<Vec<usize>> {
        let mut offset = 0;
        (0..compressed_dimensionality)
            .map(|axis| {
                let width = self.0.get(&axis).map_or(1, Vec::len);
                let axes = (offset..offset + width).collect();
                offset += width;
                axes
            })
            .collect()
    }
}
