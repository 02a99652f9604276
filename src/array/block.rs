//! Masked in-memory blocks.

use itertools::izip;
use ndarray::{ArrayD, Axis, IxDyn, Slice};

use crate::array_subset::ArraySubset;

use super::{to_usize, ArrayShape, MaskCastError, ShapeError};

/// A masked N-dimensional block of array data.
///
/// A block pairs an [`ArrayD<f64>`] of element values with an equally shaped [`ArrayD<bool>`] mask.
/// A `true` mask element marks a missing value; its data element is unspecified.
///
/// Blocks are the in-memory exchange type of this crate.
/// Storage reads produce blocks, auxiliary arrays are materialised as blocks, and decompressed subarrays are returned as blocks.
#[derive(Clone, Debug)]
pub struct Block {
    data: ArrayD<f64>,
    mask: ArrayD<bool>,
}

fn dim(shape: &[u64]) -> IxDyn {
    IxDyn(&shape.iter().map(|&size| to_usize(size)).collect::<Vec<_>>())
}

fn num_elements(shape: &[u64]) -> usize {
    shape.iter().map(|&size| to_usize(size)).product()
}

impl Block {
    /// Create a block from data and a mask.
    ///
    /// # Errors
    /// Returns [`ShapeError::Mismatch`] if `data` and `mask` have different shapes.
    pub fn new(data: ArrayD<f64>, mask: ArrayD<bool>) -> Result<Self, ShapeError> {
        if data.shape() == mask.shape() {
            Ok(Self { data, mask })
        } else {
            Err(ShapeError::Mismatch {
                got: mask.shape().iter().map(|&size| size as u64).collect(),
                expected: data.shape().iter().map(|&size| size as u64).collect(),
            })
        }
    }

    /// Create an unmasked block from C order `elements`.
    ///
    /// # Errors
    /// Returns [`ShapeError::ElementCount`] if the number of elements does not match `shape`.
    pub fn from_elements(shape: ArrayShape, elements: Vec<f64>) -> Result<Self, ShapeError> {
        let expected = num_elements(&shape);
        let got = elements.len();
        let data = ArrayD::from_shape_vec(dim(&shape), elements)
            .map_err(|_| ShapeError::ElementCount { got, expected })?;
        let mask = ArrayD::from_elem(dim(&shape), false);
        Ok(Self { data, mask })
    }

    /// Create a block from C order `elements`, where [`None`] is a missing value.
    ///
    /// # Errors
    /// Returns [`ShapeError::ElementCount`] if the number of elements does not match `shape`.
    pub fn from_optional_elements(
        shape: ArrayShape,
        elements: Vec<Option<f64>>,
    ) -> Result<Self, ShapeError> {
        let mask = elements.iter().map(Option::is_none).collect::<Vec<_>>();
        let data = elements
            .into_iter()
            .map(|element| element.unwrap_or(f64::NAN))
            .collect::<Vec<_>>();
        let mut block = Self::from_elements(shape, data)?;
        block.mask = ArrayD::from_shape_vec(block.data.raw_dim(), mask).map_err(|_| {
            ShapeError::ElementCount {
                got: block.data.len(),
                expected: block.data.len(),
            }
        })?;
        Ok(block)
    }

    /// Create a block with every element missing.
    #[must_use]
    pub fn masked(shape: &[u64]) -> Self {
        Self {
            data: ArrayD::from_elem(dim(shape), f64::NAN),
            mask: ArrayD::from_elem(dim(shape), true),
        }
    }

    /// Create a block with every element equal to `value`.
    #[must_use]
    pub fn filled(shape: &[u64], value: f64) -> Self {
        Self {
            data: ArrayD::from_elem(dim(shape), value),
            mask: ArrayD::from_elem(dim(shape), false),
        }
    }

    /// Create a block from floating point data, masking every `NaN`.
    #[must_use]
    pub fn from_nan_masked(data: ArrayD<f64>) -> Self {
        let mask = data.mapv(f64::is_nan);
        Self { data, mask }
    }

    /// Return the shape of the block.
    #[must_use]
    pub fn shape(&self) -> ArrayShape {
        self.data.shape().iter().map(|&size| size as u64).collect()
    }

    /// Return the dimensionality of the block.
    #[must_use]
    pub fn dimensionality(&self) -> usize {
        self.data.ndim()
    }

    /// Return the number of elements in the block.
    #[must_use]
    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    /// Return the element values.
    ///
    /// Values at masked positions are unspecified.
    #[must_use]
    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    /// Return the mask.
    #[must_use]
    pub fn mask(&self) -> &ArrayD<bool> {
        &self.mask
    }

    /// Return the data and mask.
    #[must_use]
    pub fn into_parts(self) -> (ArrayD<f64>, ArrayD<bool>) {
        (self.data, self.mask)
    }

    /// Return the value at `indices`.
    ///
    /// Returns [`None`] if the value is masked or `indices` are out of bounds.
    #[must_use]
    pub fn value(&self, indices: &[u64]) -> Option<f64> {
        let indices = dim(indices);
        match self.mask.get(indices.clone()) {
            Some(false) => self.data.get(indices).copied(),
            _ => None,
        }
    }

    /// Set the value at `indices`, where [`None`] masks the element.
    ///
    /// # Panics
    /// Panics if `indices` are out of bounds.
    pub fn set_value(&mut self, indices: &[u64], value: Option<f64>) {
        let indices = dim(indices);
        self.mask[indices.clone()] = value.is_none();
        self.data[indices] = value.unwrap_or(f64::NAN);
    }

    /// Return the elements in C order, [`None`] marking a missing value.
    #[must_use]
    pub fn to_optional_vec(&self) -> Vec<Option<f64>> {
        izip!(self.data.iter(), self.mask.iter())
            .map(|(&value, &masked)| (!masked).then_some(value))
            .collect()
    }

    /// Return the data with masked elements replaced by `NaN`.
    #[must_use]
    pub fn to_nan_filled(&self) -> ArrayD<f64> {
        let mut data = self.data.clone();
        data.zip_mut_with(&self.mask, |value, &masked| {
            if masked {
                *value = f64::NAN;
            }
        });
        data
    }

    /// Return the number of masked elements.
    #[must_use]
    pub fn count_masked(&self) -> usize {
        self.mask.iter().filter(|&&masked| masked).count()
    }

    /// Extract the elements within `subset`.
    ///
    /// # Errors
    /// Returns [`ShapeError::OutOfBounds`] if `subset` is not within the block.
    pub fn extract(&self, subset: &ArraySubset) -> Result<Self, ShapeError> {
        if !subset.inbounds(&self.shape()) {
            return Err(ShapeError::OutOfBounds(subset.clone(), self.shape()));
        }
        let ranges = subset.to_ranges();
        let slice = |axis: usize| {
            let range = &ranges[axis];
            Slice::from(to_usize(range.start)..to_usize(range.end))
        };
        Ok(Self {
            data: self
                .data
                .slice_each_axis(|description| slice(description.axis.index()))
                .to_owned(),
            mask: self
                .mask
                .slice_each_axis(|description| slice(description.axis.index()))
                .to_owned(),
        })
    }

    /// Write `block` into the elements within `subset`.
    ///
    /// # Errors
    /// Returns a [`ShapeError`] if `subset` is not within this block or `block` does not have the shape of `subset`.
    pub fn assign(&mut self, subset: &ArraySubset, block: &Self) -> Result<(), ShapeError> {
        if !subset.inbounds(&self.shape()) {
            return Err(ShapeError::OutOfBounds(subset.clone(), self.shape()));
        }
        if subset.shape() != block.shape() {
            return Err(ShapeError::Mismatch {
                got: block.shape(),
                expected: subset.shape().to_vec(),
            });
        }
        let ranges = subset.to_ranges();
        let slice = |axis: usize| {
            let range = &ranges[axis];
            Slice::from(to_usize(range.start)..to_usize(range.end))
        };
        self.data
            .slice_each_axis_mut(|description| slice(description.axis.index()))
            .assign(&block.data);
        self.mask
            .slice_each_axis_mut(|description| slice(description.axis.index()))
            .assign(&block.mask);
        Ok(())
    }

    /// Reshape the block, preserving the C order of its elements.
    ///
    /// # Errors
    /// Returns [`ShapeError::ElementCount`] if `shape` has a different number of elements.
    pub fn reshape(&self, shape: &[u64]) -> Result<Self, ShapeError> {
        let expected = num_elements(shape);
        if expected != self.num_elements() {
            return Err(ShapeError::ElementCount {
                got: self.num_elements(),
                expected,
            });
        }
        let data = ArrayD::from_shape_vec(dim(shape), self.data.iter().copied().collect())
            .map_err(|_| ShapeError::ElementCount {
                got: self.num_elements(),
                expected,
            })?;
        let mask = ArrayD::from_shape_vec(dim(shape), self.mask.iter().copied().collect())
            .map_err(|_| ShapeError::ElementCount {
                got: self.num_elements(),
                expected,
            })?;
        Ok(Self { data, mask })
    }

    /// Select `indices` along `axis`, in the given order.
    ///
    /// # Panics
    /// Panics if `axis` or any of `indices` are out of bounds.
    #[must_use]
    pub fn select(&self, axis: usize, indices: &[usize]) -> Self {
        Self {
            data: self.data.select(Axis(axis), indices),
            mask: self.mask.select(Axis(axis), indices),
        }
    }

    /// Permute the axes of the block.
    ///
    /// # Panics
    /// Panics if `axes` is not a permutation of the block axes.
    #[must_use]
    pub fn permuted_axes(self, axes: &[usize]) -> Self {
        Self {
            data: self.data.permuted_axes(IxDyn(axes)),
            mask: self.mask.permuted_axes(IxDyn(axes)),
        }
    }

    /// Insert a size 1 axis at `axis`.
    ///
    /// # Panics
    /// Panics if `axis` is greater than the dimensionality of the block.
    #[must_use]
    pub fn insert_axis(self, axis: usize) -> Self {
        Self {
            data: self.data.insert_axis(Axis(axis)),
            mask: self.mask.insert_axis(Axis(axis)),
        }
    }

    /// Return the elements in C order as non-negative integer indices.
    ///
    /// # Errors
    /// Returns a [`MaskCastError`] if any element is masked, negative, non-finite or not integral.
    pub fn to_index_values(&self) -> Result<Vec<u64>, MaskCastError> {
        self.to_optional_index_values()?
            .into_iter()
            .enumerate()
            .map(|(position, value)| value.ok_or(MaskCastError::new(position, None)))
            .collect()
    }

    /// Return the elements in C order as non-negative integer indices, [`None`] marking a masked element.
    ///
    /// # Errors
    /// Returns a [`MaskCastError`] if any unmasked element is negative, non-finite or not integral.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_optional_index_values(&self) -> Result<Vec<Option<u64>>, MaskCastError> {
        izip!(self.data.iter(), self.mask.iter())
            .enumerate()
            .map(|(position, (&value, &masked))| {
                if masked {
                    Ok(None)
                } else if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
                    Ok(Some(value as u64))
                } else {
                    Err(MaskCastError::new(position, Some(value)))
                }
            })
            .collect()
    }
}

impl PartialEq for Block {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
            && izip!(self.data.iter(), other.data.iter(), self.mask.iter())
                .all(|(a, b, &masked)| masked || a == b)
    }
}

impl From<ArrayD<f64>> for Block {
    fn from(data: ArrayD<f64>) -> Self {
        let mask = ArrayD::from_elem(data.raw_dim(), false);
        Self { data, mask }
    }
}
