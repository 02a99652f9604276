use std::ops::Range;

use itertools::Itertools;

use crate::{
    array::{ArrayShape, AuxiliaryArray, Block, InterpolationParameterError},
    storage::StorageError,
};

use super::InterpolationSubarea;

/// An interpolation parameter.
///
/// Parameter values are addressed along each tie point dimension they span.
/// `axes` holds the tie point dimension of each parameter dimension.
#[derive(Clone, Debug)]
pub struct InterpolationParameter {
    values: AuxiliaryArray,
    axes: Vec<usize>,
}

impl InterpolationParameter {
    /// Create a new interpolation parameter.
    #[must_use]
    pub fn new(values: AuxiliaryArray, axes: Vec<usize>) -> Self {
        Self { values, axes }
    }

    /// The parameter values.
    #[must_use]
    pub fn values(&self) -> &AuxiliaryArray {
        &self.values
    }

    /// The tie point dimension of each parameter dimension.
    #[must_use]
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub(crate) fn to_memory(&self) -> Result<Self, StorageError> {
        Ok(Self {
            values: self.values.to_memory()?,
            axes: self.axes.clone(),
        })
    }
}

/// How a conformed parameter is addressed along one tie point dimension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ParameterAxis {
    /// A single value broadcast along the dimension.
    Broadcast,
    /// One value per interpolation subarea.
    Subarea,
    /// One value per tie point.
    TiePoint,
    /// One value per element of a dimension that is not subsampled.
    Outer,
}

fn validate_axes(
    name: &str,
    ndim: usize,
    axes: &[usize],
    dimensionality: usize,
) -> Result<(), InterpolationParameterError> {
    if ndim != axes.len()
        || !axes.iter().all_unique()
        || axes.iter().any(|&axis| axis >= dimensionality)
    {
        return Err(InterpolationParameterError::ParameterAxes {
            name: name.to_string(),
            axes: axes.to_vec(),
            dimensionality,
        });
    }
    Ok(())
}

/// Return the shape of a parameter conformed to a tie point array of `dimensionality`.
///
/// # Errors
/// Returns [`InterpolationParameterError::ParameterAxes`] if `axes` do not map the parameter dimensions to distinct tie point dimensions.
pub(crate) fn conformed_shape(
    name: &str,
    shape: &[u64],
    axes: &[usize],
    dimensionality: usize,
) -> Result<ArrayShape, InterpolationParameterError> {
    validate_axes(name, shape.len(), axes, dimensionality)?;
    let mut conformed = vec![1; dimensionality];
    for (&axis, &size) in std::iter::zip(axes, shape) {
        conformed[axis] = size;
    }
    Ok(conformed)
}

/// Conform parameter values to a tie point array of `dimensionality`.
///
/// The parameter dimensions are transposed into tie point dimension order and size one dimensions are inserted for every tie point dimension the parameter does not span.
/// Conforming a conformed parameter (with `axes` `0..dimensionality`) returns it unchanged.
///
/// # Errors
/// Returns [`InterpolationParameterError::ParameterAxes`] if `axes` do not map the parameter dimensions to distinct tie point dimensions.
pub fn conform(
    name: &str,
    values: &Block,
    axes: &[usize],
    dimensionality: usize,
) -> Result<Block, InterpolationParameterError> {
    validate_axes(name, values.dimensionality(), axes, dimensionality)?;
    let order = (0..axes.len()).sorted_by_key(|&i| axes[i]).collect_vec();
    let mut conformed = values.clone().permuted_axes(&order);
    for axis in 0..dimensionality {
        if !axes.contains(&axis) {
            conformed = conformed.insert_axis(axis);
        }
    }
    Ok(conformed)
}

/// Resolve how a conformed parameter is addressed along each tie point dimension.
///
/// `subareas` holds the interpolation subareas of each tie point dimension, [`None`] for dimensions that are not subsampled.
///
/// # Errors
/// Returns [`InterpolationParameterError::ParameterShape`] if the parameter size along a dimension cannot be addressed.
pub(crate) fn parameter_axes(
    name: &str,
    conformed_shape: &[u64],
    tie_point_shape: &[u64],
    subareas: &[Option<&Vec<InterpolationSubarea>>],
) -> Result<Vec<ParameterAxis>, InterpolationParameterError> {
    itertools::izip!(conformed_shape, tie_point_shape, subareas)
        .enumerate()
        .map(|(axis, (&size, &tie_point_size, subareas))| {
            let (allowed, addressing) = match subareas {
                Some(subareas) => (
                    vec![1, subareas.len() as u64, tie_point_size],
                    [
                        ParameterAxis::Broadcast,
                        ParameterAxis::Subarea,
                        ParameterAxis::TiePoint,
                    ],
                ),
                None => (
                    vec![1, tie_point_size, tie_point_size],
                    [
                        ParameterAxis::Broadcast,
                        ParameterAxis::Outer,
                        ParameterAxis::Outer,
                    ],
                ),
            };
            allowed
                .iter()
                .position(|&allowed| allowed == size)
                .map(|i| addressing[i])
                .ok_or_else(|| InterpolationParameterError::ParameterShape {
                    name: name.to_string(),
                    axis,
                    size,
                    allowed: allowed.into_iter().dedup().collect(),
                })
        })
        .collect()
}

/// Return the region of a conformed parameter used by one subarray.
///
/// `subareas` holds the interpolation subarea of each subsampled tie point dimension and `outer` the range of each other dimension.
pub(crate) fn parameter_ranges(
    axes: &[ParameterAxis],
    subareas: &[Option<&InterpolationSubarea>],
    outer: &[Option<Range<u64>>],
) -> Vec<Range<u64>> {
    itertools::izip!(axes, subareas, outer)
        .map(|(axis, subarea, outer)| match (axis, subarea, outer) {
            (ParameterAxis::Subarea, Some(subarea), _) => {
                let index = subarea.index() as u64;
                index..index + 1
            }
            (ParameterAxis::TiePoint, Some(subarea), _) => {
                let tie_point = subarea.tie_point() as u64;
                tie_point..tie_point + 2
            }
            (ParameterAxis::Outer, _, Some(range)) => range.clone(),
            _ => 0..1,
        })
        .collect()
}
