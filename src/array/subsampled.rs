//! Subsampled arrays.
//!
//! A subsampled array stores a coordinate array as tie points, a subset of its values at known indices, and reconstructs the other values by interpolation.
//! The tie point indices of each subsampled dimension partition it into interpolation subareas bounded by consecutive tie points.
//! Adjacent tie points separate continuous areas, across which no interpolation takes place.
//!
//! Cell bounds are reconstructed from bounds tie points when the uncompressed array has one more (trailing) dimension than the tie points.
//! Bounds vertices are interpolated like coordinates and then broadcast to the 2 (one subsampled dimension) or 4 (two subsampled dimensions) vertices of each cell.
//!
//! Every subarray is one interpolation subarea (the combination of one subarea of each subsampled dimension).
//! Requested chunking is honoured along the dimensions that are not subsampled.
//!
//! A [`Subsampled`] array is created with a [`SubsampledBuilder`].
//! ```rust
//! # use cfdm_compressed::array::{AuxiliaryArray, Block, CompressedArray, subsampled::SubsampledBuilder};
//! let tie_points = Block::from_elements(vec![3], vec![0.0, 10.0, 30.0])?;
//! let tie_point_indices = Block::from_elements(vec![3], vec![0.0, 2.0, 4.0])?;
//! let subsampled = SubsampledBuilder::new(tie_points.into(), vec![5])
//!     .tie_point_indices(0, tie_point_indices.into())
//!     .interpolation_name("linear")
//!     .build()?;
//! let array = CompressedArray::new(subsampled);
//! assert_eq!(
//!     array.get_all()?.to_optional_vec(),
//!     vec![Some(0.0), Some(5.0), Some(10.0), Some(20.0), Some(30.0)]
//! );
//! # Ok::<_, Box<dyn std::error::Error>>(())
//! ```

mod formulas;
mod interpolation;
mod parameters;
mod subareas;

pub use interpolation::{Interpolation, LOCATION_USE_3D_CARTESIAN};
pub use parameters::{conform, InterpolationParameter};
pub use subareas::{interpolation_subareas, InterpolationSubarea};

use std::{collections::BTreeMap, ops::Range, sync::Arc};

use derive_more::Display;
use itertools::Itertools;
use ndarray::{ArrayD, IxDyn};
use num::{Float, ToPrimitive};

use crate::{
    array_subset::ArraySubset,
    chunk_geometry::{chunk_locations, ChunkSpec},
    storage::StorageError,
};

use self::{
    formulas::{arc_midpoint, cast, fl, fll2v, fq, fq3, fq3v, fv2ll, unwrap_longitude, Vector3},
    parameters::{conformed_shape, parameter_axes, parameter_ranges, ParameterAxis},
};

use super::{
    requested_chunks, ArrayError, ArrayShape, AuxiliaryArray, Block, CompressedDimensions,
    CompressedSource, CompressionKindTraits, DataType, InterpolationParameterError,
    MalformedCompressionError, ShapeError, Subarray, SubarrayDescriptor, UncompressedShape,
};

/// The floating point precision of interpolation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Display)]
pub enum ComputationalPrecision {
    /// `"32"`: single precision.
    #[display("32")]
    Float32,
    /// `"64"`: double precision.
    #[default]
    #[display("64")]
    Float64,
}

impl TryFrom<&str> for ComputationalPrecision {
    type Error = InterpolationParameterError;

    fn try_from(precision: &str) -> Result<Self, Self::Error> {
        match precision {
            "32" => Ok(Self::Float32),
            "64" => Ok(Self::Float64),
            _ => Err(InterpolationParameterError::ComputationalPrecision(
                precision.to_string(),
            )),
        }
    }
}

/// A geographic coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum GeographicCoordinate {
    /// Latitude.
    #[display("latitude")]
    Latitude,
    /// Longitude.
    #[display("longitude")]
    Longitude,
}

#[derive(Clone, Debug)]
struct Parameter {
    name: String,
    parameter: InterpolationParameter,
    axes: Vec<ParameterAxis>,
}

/// A subsampled array.
#[derive(Clone, Debug)]
pub struct Subsampled {
    tie_points: CompressedSource,
    tie_point_shape: ArrayShape,
    tie_point_indices: BTreeMap<usize, AuxiliaryArray>,
    subareas: Arc<BTreeMap<usize, Vec<InterpolationSubarea>>>,
    interpolation: Interpolation,
    parameters: Vec<Parameter>,
    dependent_tie_points: Option<AuxiliaryArray>,
    coordinate: Option<GeographicCoordinate>,
    precision: ComputationalPrecision,
    data_type: DataType,
    shape: ArrayShape,
    vertices: Option<u64>,
}

/// A [`Subsampled`] array builder.
///
/// The builder is initialised from the tie points and the uncompressed shape.
/// Tie point indices must be added for every subsampled dimension.
/// The default computational precision is `"64"`.
#[derive(Clone, Debug)]
pub struct SubsampledBuilder {
    tie_points: CompressedSource,
    shape: ArrayShape,
    tie_point_indices: BTreeMap<usize, AuxiliaryArray>,
    interpolation_name: Option<String>,
    interpolation_description: Option<String>,
    parameters: BTreeMap<String, InterpolationParameter>,
    dependent_latitude: Option<AuxiliaryArray>,
    dependent_longitude: Option<AuxiliaryArray>,
    computational_precision: Option<String>,
}

impl SubsampledBuilder {
    /// Create a new subsampled array builder.
    ///
    /// A `shape` with one more dimension than the tie points reconstructs cell bounds.
    #[must_use]
    pub fn new(tie_points: CompressedSource, shape: ArrayShape) -> Self {
        Self {
            tie_points,
            shape,
            tie_point_indices: BTreeMap::new(),
            interpolation_name: None,
            interpolation_description: None,
            parameters: BTreeMap::new(),
            dependent_latitude: None,
            dependent_longitude: None,
            computational_precision: None,
        }
    }

    /// Set the tie point indices of the subsampled tie point dimension `axis`.
    pub fn tie_point_indices(&mut self, axis: usize, indices: AuxiliaryArray) -> &mut Self {
        self.tie_point_indices.insert(axis, indices);
        self
    }

    /// Set the `interpolation_name`.
    pub fn interpolation_name(&mut self, name: &str) -> &mut Self {
        self.interpolation_name = Some(name.to_string());
        self
    }

    /// Set the `interpolation_description`.
    pub fn interpolation_description(&mut self, description: &str) -> &mut Self {
        self.interpolation_description = Some(description.to_string());
        self
    }

    /// Add an interpolation parameter.
    pub fn parameter(&mut self, name: &str, parameter: InterpolationParameter) -> &mut Self {
        self.parameters.insert(name.to_string(), parameter);
        self
    }

    /// Set the dependent tie points of a geographic interpolation method.
    ///
    /// Exactly one of `latitude` and `longitude` is expected, the other coordinate being reconstructed from the tie points of the builder.
    pub fn dependent_tie_points(
        &mut self,
        latitude: Option<AuxiliaryArray>,
        longitude: Option<AuxiliaryArray>,
    ) -> &mut Self {
        self.dependent_latitude = latitude;
        self.dependent_longitude = longitude;
        self
    }

    /// Set the `computational_precision`, `"32"` or `"64"`.
    pub fn computational_precision(&mut self, precision: &str) -> &mut Self {
        self.computational_precision = Some(precision.to_string());
        self
    }

    /// Build a [`Subsampled`] array.
    ///
    /// An unknown interpolation method is accepted; decompressing the array fails with an [`UnsupportedInterpolationError`](crate::array::UnsupportedInterpolationError).
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if
    ///  - the tie points or auxiliary arrays cannot be read,
    ///  - the tie point indices do not decompose into interpolation subareas tiling the uncompressed shape,
    ///  - the number of subsampled dimensions does not suit the interpolation method,
    ///  - the dependent tie points are missing or contradictory,
    ///  - a parameter is not used by the interpolation method or cannot be addressed, or
    ///  - the computational precision is invalid.
    pub fn build(&self) -> Result<Subsampled, ArrayError> {
        let tie_point_shape = self.tie_points.shape()?;
        let dimensionality = tie_point_shape.len();
        let vertices = match self.shape.len() {
            ndim if ndim == dimensionality => None,
            ndim if ndim == dimensionality + 1 => self.shape.last().copied(),
            ndim => {
                return Err(MalformedCompressionError::AuxiliaryShape {
                    name: "tie points",
                    got: tie_point_shape,
                    expected: format!("{ndim} or {} dimensions", ndim.saturating_sub(1)),
                }
                .into())
            }
        };

        let interpolation = Interpolation::new(
            self.interpolation_name.as_deref(),
            self.interpolation_description.as_deref(),
        );
        let subsampled_dimensions = self.tie_point_indices.len();
        if let Some(expected) = interpolation.subsampled_dimensions() {
            if subsampled_dimensions != expected {
                return Err(InterpolationParameterError::SubsampledDimensions {
                    method: interpolation.to_string(),
                    got: subsampled_dimensions,
                    expected,
                }
                .into());
            }
        } else if subsampled_dimensions == 0 {
            return Err(InterpolationParameterError::SubsampledDimensions {
                method: interpolation.to_string(),
                got: 0,
                expected: 1,
            }
            .into());
        }

        let mut subareas = BTreeMap::new();
        for (&axis, indices) in &self.tie_point_indices {
            if axis >= dimensionality {
                return Err(InterpolationParameterError::TiePointAxis {
                    axis,
                    dimensionality,
                }
                .into());
            }
            let values = indices.index_values()?;
            if values.len() as u64 != tie_point_shape[axis] {
                return Err(MalformedCompressionError::AuxiliaryShape {
                    name: "tie point indices",
                    got: indices.shape()?,
                    expected: format!("[{}]", tie_point_shape[axis]),
                }
                .into());
            }
            subareas.insert(
                axis,
                interpolation_subareas(axis, &values, self.shape[axis])?,
            );
        }
        for axis in (0..dimensionality).filter(|axis| !subareas.contains_key(axis)) {
            if self.shape[axis] != tie_point_shape[axis] {
                return Err(ShapeError::Mismatch {
                    got: self.shape[..dimensionality].to_vec(),
                    expected: tie_point_shape,
                }
                .into());
            }
        }
        if let Some(vertices) = vertices {
            if subsampled_dimensions > 2 || vertices != 1 << subsampled_dimensions {
                return Err(MalformedCompressionError::AuxiliaryShape {
                    name: "bounds",
                    got: self.shape.clone(),
                    expected: format!(
                        "{} trailing vertices for {subsampled_dimensions} subsampled dimension(s)",
                        1_u64 << subsampled_dimensions.min(2)
                    ),
                }
                .into());
            }
        }

        let precision = self
            .computational_precision
            .as_deref()
            .map(ComputationalPrecision::try_from)
            .transpose()?
            .unwrap_or_default();

        let (coordinate, dependent_tie_points) = if interpolation.is_geographic() {
            let (coordinate, dependent) =
                match (&self.dependent_latitude, &self.dependent_longitude) {
                    (Some(latitude), None) => (GeographicCoordinate::Longitude, latitude),
                    (None, Some(longitude)) => (GeographicCoordinate::Latitude, longitude),
                    (None, None) => {
                        return Err(InterpolationParameterError::DependentTiePoints(format!(
                            "interpolation {interpolation} requires latitude or longitude dependent tie points"
                        ))
                        .into())
                    }
                    (Some(_), Some(_)) => {
                        return Err(InterpolationParameterError::DependentTiePoints(
                            "expected one of latitude and longitude dependent tie points, got both"
                                .to_string(),
                        )
                        .into())
                    }
                };
            let dependent_shape = dependent.shape()?;
            if dependent_shape != tie_point_shape {
                return Err(MalformedCompressionError::AuxiliaryShape {
                    name: "dependent tie points",
                    got: dependent_shape,
                    expected: format!("{tie_point_shape:?}"),
                }
                .into());
            }
            (Some(coordinate), Some(dependent.clone()))
        } else {
            if self.interpolation_is_supported(&interpolation)
                && (self.dependent_latitude.is_some() || self.dependent_longitude.is_some())
            {
                return Err(InterpolationParameterError::DependentTiePoints(format!(
                    "interpolation {interpolation} has no dependent tie points"
                ))
                .into());
            }
            (None, None)
        };

        let mut parameters = Vec::new();
        if self.interpolation_is_supported(&interpolation) {
            let subareas_per_axis = (0..dimensionality)
                .map(|axis| subareas.get(&axis))
                .collect_vec();
            for (name, parameter) in &self.parameters {
                if !interpolation.parameter_names().contains(&name.as_str()) {
                    return Err(InterpolationParameterError::UnexpectedParameter {
                        name: name.clone(),
                        method: interpolation.to_string(),
                    }
                    .into());
                }
                let shape = conformed_shape(
                    name,
                    &parameter.values().shape()?,
                    parameter.axes(),
                    dimensionality,
                )?;
                let axes = parameter_axes(name, &shape, &tie_point_shape, &subareas_per_axis)?;
                parameters.push(Parameter {
                    name: name.clone(),
                    parameter: parameter.clone(),
                    axes,
                });
            }
        }

        Ok(Subsampled {
            data_type: self.tie_points.data_type()?,
            tie_points: self.tie_points.clone(),
            tie_point_shape,
            tie_point_indices: self.tie_point_indices.clone(),
            subareas: Arc::new(subareas),
            interpolation,
            parameters,
            dependent_tie_points,
            coordinate,
            precision,
            shape: self.shape.clone(),
            vertices,
        })
    }

    fn interpolation_is_supported(&self, interpolation: &Interpolation) -> bool {
        !matches!(interpolation, Interpolation::Unsupported(_))
    }
}

impl Subsampled {
    /// The interpolation method.
    #[must_use]
    pub fn interpolation(&self) -> &Interpolation {
        &self.interpolation
    }

    /// The computational precision.
    #[must_use]
    pub fn computational_precision(&self) -> ComputationalPrecision {
        self.precision
    }

    /// The shape of the tie points.
    #[must_use]
    pub fn tie_point_shape(&self) -> &[u64] {
        &self.tie_point_shape
    }

    /// The interpolation subareas of the subsampled tie point dimension `axis`.
    #[must_use]
    pub fn subareas(&self, axis: usize) -> Option<&[InterpolationSubarea]> {
        self.subareas.get(&axis).map(Vec::as_slice)
    }

    /// The geographic coordinate reconstructed by a geographic interpolation method.
    #[must_use]
    pub fn coordinate(&self) -> Option<GeographicCoordinate> {
        self.coordinate
    }

    /// Returns true if the array holds cell bounds.
    #[must_use]
    pub fn is_bounds(&self) -> bool {
        self.vertices.is_some()
    }

    fn outer_axes(&self) -> Vec<usize> {
        (0..self.tie_point_shape.len())
            .filter(|axis| !self.subareas.contains_key(axis))
            .collect()
    }
}

/// The compressed location of a subsampled subarray.
///
/// Identifies the interpolation subarea of each subsampled dimension and the range of each other tie point dimension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubsampledLocation {
    subareas: Vec<(usize, InterpolationSubarea)>,
    outer: Vec<(usize, Range<u64>)>,
}

impl SubsampledLocation {
    /// The interpolation subarea of each subsampled dimension.
    #[must_use]
    pub fn subareas(&self) -> &[(usize, InterpolationSubarea)] {
        &self.subareas
    }

    /// The range of each tie point dimension that is not subsampled.
    #[must_use]
    pub fn outer(&self) -> &[(usize, Range<u64>)] {
        &self.outer
    }
}

impl std::fmt::Display for SubsampledLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let subareas = self
            .subareas
            .iter()
            .map(|(axis, subarea)| {
                let [start, end] = subarea.tie_point_indices();
                format!(
                    "axis {axis} subarea {} (tie point indices {start}..={end})",
                    subarea.index()
                )
            })
            .join(", ");
        write!(f, "interpolation {subareas}")?;
        for (axis, range) in &self.outer {
            write!(f, ", axis {axis} {}..{}", range.start, range.end)?;
        }
        Ok(())
    }
}

/// The tie points and parameters of a subsampled subarray, read into memory.
#[derive(Clone, Debug)]
pub struct SubsampledSubarray {
    interpolation: Interpolation,
    precision: ComputationalPrecision,
    coordinate: Option<GeographicCoordinate>,
    tie_points: Block,
    dependent_tie_points: Option<Block>,
    parameters: BTreeMap<String, Block>,
    subareas: Vec<(usize, InterpolationSubarea)>,
    vertices: Option<u64>,
    shape: ArrayShape,
}

/// The tie points of one subarea at one position of the dimensions that are not subsampled.
struct SubareaCorners<'a> {
    subarray: &'a SubsampledSubarray,
    outer: &'a [u64],
    outer_axes: &'a [usize],
}

impl SubareaCorners<'_> {
    fn indices(&self, block: &Block, corner: &[u64]) -> Vec<u64> {
        let shape = block.shape();
        let mut indices = vec![0; shape.len()];
        let subsampled_axes = self.subarray.subareas.iter().map(|(axis, _)| axis);
        for (&axis, &index) in std::iter::zip(self.outer_axes, self.outer)
            .chain(std::iter::zip(subsampled_axes, corner))
        {
            indices[axis] = if shape[axis] == 1 { 0 } else { index };
        }
        indices
    }

    fn tie_point<T: Float>(&self, corner: &[u64]) -> T {
        let tie_points = &self.subarray.tie_points;
        cast(
            tie_points
                .value(&self.indices(tie_points, corner))
                .unwrap_or(f64::NAN),
        )
    }

    fn dependent_tie_point<T: Float>(&self, corner: &[u64]) -> T {
        self.subarray
            .dependent_tie_points
            .as_ref()
            .and_then(|dependent| dependent.value(&self.indices(dependent, corner)))
            .map_or_else(T::nan, cast)
    }

    fn parameter(&self, name: &str, corner: &[u64]) -> Option<f64> {
        let parameter = self.subarray.parameters.get(name)?;
        parameter.value(&self.indices(parameter, corner))
    }

    fn coefficient<T: Float>(&self, name: &str, corner: &[u64]) -> T {
        self.parameter(name, corner).map_or_else(T::zero, cast)
    }

    fn latitude_longitude<T: Float>(&self, corner: &[u64]) -> (T, T) {
        match self.subarray.coordinate {
            Some(GeographicCoordinate::Longitude) => {
                (self.dependent_tie_point(corner), self.tie_point(corner))
            }
            _ => (self.tie_point(corner), self.dependent_tie_point(corner)),
        }
    }

    fn use_3d_cartesian(&self, corner: &[u64]) -> bool {
        self.parameter("interpolation_subarea_flags", corner)
            .and_then(|flags| flags.to_u64())
            .is_some_and(|flags| flags & LOCATION_USE_3D_CARTESIAN != 0)
    }
}

/// An interpolation method prepared for one subarea.
///
/// Control values along two subsampled dimensions are indexed `[first dimension][second dimension]`.
enum Prepared<T> {
    Linear([T; 2]),
    BiLinear([[T; 2]; 2]),
    Quadratic { ua: T, ub: T, w: T },
    QuadraticControl([T; 3]),
    BiQuadraticControl([[T; 3]; 3]),
    Cartesian([Vector3<T>; 3], GeographicCoordinate),
    BiCartesian([[Vector3<T>; 3]; 3], GeographicCoordinate),
}

fn geographic<T: Float>(latitude_longitude: (T, T), coordinate: GeographicCoordinate) -> T {
    match coordinate {
        GeographicCoordinate::Latitude => latitude_longitude.0,
        GeographicCoordinate::Longitude => latitude_longitude.1,
    }
}

impl<T: Float> Prepared<T> {
    fn new(
        interpolation: &Interpolation,
        coordinate: Option<GeographicCoordinate>,
        corners: &SubareaCorners,
    ) -> Result<Self, ArrayError> {
        let coordinate = coordinate.unwrap_or(GeographicCoordinate::Latitude);
        Ok(match interpolation {
            Interpolation::Linear => {
                Self::Linear([corners.tie_point(&[0]), corners.tie_point(&[1])])
            }
            Interpolation::BiLinear => Self::BiLinear([
                [corners.tie_point(&[0, 0]), corners.tie_point(&[0, 1])],
                [corners.tie_point(&[1, 0]), corners.tie_point(&[1, 1])],
            ]),
            Interpolation::Quadratic => Self::Quadratic {
                ua: corners.tie_point(&[0]),
                ub: corners.tie_point(&[1]),
                w: corners.coefficient("w", &[0]),
            },
            Interpolation::QuadraticLatitudeLongitude => {
                let (a, b) = (
                    corners.latitude_longitude::<T>(&[0]),
                    corners.latitude_longitude::<T>(&[1]),
                );
                let (va, vb) = (fll2v(a.0, a.1), fll2v(b.0, b.1));
                let vm = arc_midpoint(
                    &va,
                    &vb,
                    corners.coefficient("ce", &[0]),
                    corners.coefficient("ca", &[0]),
                );
                if corners.use_3d_cartesian(&[0]) {
                    Self::Cartesian([va, vm, vb], coordinate)
                } else {
                    let m = fv2ll(&vm);
                    Self::QuadraticControl(match coordinate {
                        GeographicCoordinate::Latitude => [a.0, m.0, b.0],
                        GeographicCoordinate::Longitude => [
                            a.1,
                            unwrap_longitude(m.1, a.1),
                            unwrap_longitude(b.1, a.1),
                        ],
                    })
                }
            }
            Interpolation::BiQuadraticLatitudeLongitude => {
                let corner = |i: u64, j: u64| corners.latitude_longitude::<T>(&[i, j]);
                let lat_lon = [
                    [Some(corner(0, 0)), None, Some(corner(0, 1))],
                    [None, None, None],
                    [Some(corner(1, 0)), None, Some(corner(1, 1))],
                ];
                let to_vector =
                    |ll: Option<(T, T)>| ll.map_or([T::nan(); 3], |ll| fll2v(ll.0, ll.1));
                let mut v = lat_lon.map(|row| row.map(to_vector));
                let midpoint =
                    |va: &Vector3<T>, vb: &Vector3<T>, ce: &str, ca: &str, corner: [u64; 2]| {
                        arc_midpoint(
                            va,
                            vb,
                            corners.coefficient(ce, &corner),
                            corners.coefficient(ca, &corner),
                        )
                    };
                v[0][1] = midpoint(&v[0][0], &v[0][2], "ce1", "ca1", [0, 0]);
                v[2][1] = midpoint(&v[2][0], &v[2][2], "ce1", "ca1", [1, 0]);
                v[1][0] = midpoint(&v[0][0], &v[2][0], "ce2", "ca2", [0, 0]);
                v[1][2] = midpoint(&v[0][2], &v[2][2], "ce2", "ca2", [0, 1]);
                v[1][1] = midpoint(&v[1][0], &v[1][2], "ce3", "ca3", [0, 0]);
                if corners.use_3d_cartesian(&[0, 0]) {
                    Self::BiCartesian(v, coordinate)
                } else {
                    let reference = lat_lon[0][0].map_or_else(T::nan, |ll| ll.1);
                    let mut control = [[T::nan(); 3]; 3];
                    for (i, j) in (0..3).cartesian_product(0..3) {
                        let ll = lat_lon[i][j].unwrap_or_else(|| fv2ll(&v[i][j]));
                        control[i][j] = match coordinate {
                            GeographicCoordinate::Latitude => ll.0,
                            GeographicCoordinate::Longitude => unwrap_longitude(ll.1, reference),
                        };
                    }
                    Self::BiQuadraticControl(control)
                }
            }
            Interpolation::Unsupported(error) => return Err(error.clone().into()),
        })
    }

    /// Evaluate at interpolation coordinates `s`, one per subsampled dimension.
    fn evaluate(&self, s: &[T]) -> T {
        match self {
            Self::Linear([ua, ub]) => fl(*ua, *ub, s[0]),
            Self::BiLinear(u) => fl(
                fl(u[0][0], u[0][1], s[1]),
                fl(u[1][0], u[1][1], s[1]),
                s[0],
            ),
            Self::Quadratic { ua, ub, w } => fq(*ua, *ub, *w, s[0]),
            Self::QuadraticControl([ua, um, ub]) => fq3(*ua, *um, *ub, s[0]),
            Self::BiQuadraticControl(u) => {
                let rows = u.map(|row| fq3(row[0], row[1], row[2], s[1]));
                fq3(rows[0], rows[1], rows[2], s[0])
            }
            Self::Cartesian([va, vm, vb], coordinate) => {
                geographic(fv2ll(&fq3v(va, vm, vb, s[0])), *coordinate)
            }
            Self::BiCartesian(v, coordinate) => {
                let rows = v.map(|row| fq3v(&row[0], &row[1], &row[2], s[1]));
                geographic(
                    fv2ll(&fq3v(&rows[0], &rows[1], &rows[2], s[0])),
                    *coordinate,
                )
            }
        }
    }
}

/// The vertex offsets along each subsampled dimension of the bounds of a cell, in vertex order.
fn vertex_offsets(subsampled_dimensions: usize) -> &'static [&'static [u64]] {
    if subsampled_dimensions == 1 {
        &[&[0], &[1]]
    } else {
        &[&[0, 0], &[0, 1], &[1, 1], &[1, 0]]
    }
}

impl SubsampledSubarray {
    /// Interpolate the subarea.
    ///
    /// Coordinates that duplicate the last point of the previous subarea are trimmed.
    /// Bounds are broadcast from the interpolated vertices.
    ///
    /// # Errors
    /// Returns an [`ArrayError`] if the interpolation method is unsupported or the interpolated values do not fit the subarray shape.
    pub fn decompress(&self) -> Result<Block, ArrayError> {
        let tie_point_shape = self.tie_points.shape();
        let outer_axes = (0..tie_point_shape.len())
            .filter(|axis| self.subareas.iter().all(|(subsampled, _)| subsampled != axis))
            .collect_vec();
        let outer_shape = outer_axes
            .iter()
            .map(|&axis| tie_point_shape[axis])
            .collect_vec();
        let positions = self
            .subareas
            .iter()
            .map(|(_, subarea)| subarea.positions(self.vertices.is_some()))
            .collect_vec();

        let mut output = Block::masked(&self.shape);
        for outer in ArraySubset::new_with_shape(outer_shape).indices() {
            let corners = SubareaCorners {
                subarray: self,
                outer: &outer,
                outer_axes: &outer_axes,
            };
            let values = match self.precision {
                ComputationalPrecision::Float32 => self.interpolate::<f32>(&corners, &positions)?,
                ComputationalPrecision::Float64 => self.interpolate::<f64>(&corners, &positions)?,
            };
            self.place(&mut output, &outer, &outer_axes, &Block::from_nan_masked(values))?;
        }
        Ok(output)
    }

    fn interpolate<T: Float>(
        &self,
        corners: &SubareaCorners,
        positions: &[Vec<f64>],
    ) -> Result<ArrayD<f64>, ArrayError> {
        let prepared = Prepared::<T>::new(&self.interpolation, self.coordinate, corners)?;
        let grid = positions.iter().map(Vec::len).collect_vec();
        Ok(ArrayD::from_shape_fn(IxDyn(&grid), |index| {
            let s = positions
                .iter()
                .enumerate()
                .map(|(dimension, positions)| cast::<T>(positions[index[dimension]]))
                .collect_vec();
            prepared.evaluate(&s).to_f64().unwrap_or(f64::NAN)
        }))
    }

    /// Place the interpolated values at one position of the dimensions that are not subsampled.
    fn place(
        &self,
        output: &mut Block,
        outer: &[u64],
        outer_axes: &[usize],
        values: &Block,
    ) -> Result<(), ArrayError> {
        let dimensionality = self.tie_points.dimensionality();
        let mut start = vec![0; dimensionality];
        let mut shape = vec![1; dimensionality];
        for (&axis, &index) in std::iter::zip(outer_axes, outer) {
            start[axis] = index;
        }
        let grid = values.shape();

        let Some(vertices) = self.vertices else {
            for ((axis, _), &size) in std::iter::zip(&self.subareas, &grid) {
                shape[*axis] = size;
            }
            let subset = ArraySubset::new_with_start_shape(start, shape.clone())?;
            output.assign(&subset, &values.reshape(&shape)?)?;
            return Ok(());
        };

        for ((axis, _), &size) in std::iter::zip(&self.subareas, &grid) {
            shape[*axis] = size - 1;
        }
        start.push(0);
        shape.push(1);
        for (vertex, offsets) in vertex_offsets(self.subareas.len())
            .iter()
            .take(usize::try_from(vertices).unwrap_or_default())
            .enumerate()
        {
            let ranges = std::iter::zip(offsets.iter(), &grid)
                .map(|(&offset, &size)| offset..offset + size - 1)
                .collect_vec();
            let cells = values
                .extract(&ArraySubset::new_with_ranges(&ranges))?
                .reshape(&shape)?;
            start[dimensionality] = vertex as u64;
            let subset = ArraySubset::new_with_start_shape(start.clone(), shape.clone())?;
            output.assign(&subset, &cells)?;
        }
        Ok(())
    }
}

impl CompressionKindTraits for Subsampled {
    type Location = SubsampledLocation;

    fn shape(&self) -> UncompressedShape {
        UncompressedShape::new_known(&self.shape)
    }

    fn data_type(&self) -> DataType {
        self.data_type
    }

    fn compressed_dimensions(&self) -> CompressedDimensions {
        CompressedDimensions::identity(self.subareas.keys().copied())
    }

    fn subarrays(&self, chunks: &ChunkSpec) -> Result<Vec<SubarrayDescriptor>, ArrayError> {
        let requested = requested_chunks(chunks, &self.shape, self.data_type)?;
        let outer_axes = self.outer_axes();
        let outer_chunks = outer_axes
            .iter()
            .map(|&axis| requested[axis].clone())
            .collect_vec();
        let outer_regions = chunk_locations(&outer_chunks).collect_vec();

        let mut subarrays = Vec::new();
        for combination in self
            .subareas
            .values()
            .map(|subareas| subareas.iter())
            .multi_cartesian_product()
        {
            for outer_region in &outer_regions {
                let mut ranges = vec![0..0; self.tie_point_shape.len()];
                let subareas = std::iter::zip(self.subareas.keys(), &combination)
                    .map(|(&axis, &subarea)| {
                        ranges[axis] = subarea.range();
                        (axis, subarea.clone())
                    })
                    .collect_vec();
                let outer = std::iter::zip(&outer_axes, outer_region.to_ranges())
                    .map(|(&axis, range)| {
                        ranges[axis] = range.clone();
                        (axis, range)
                    })
                    .collect_vec();
                if let Some(vertices) = self.vertices {
                    ranges.push(0..vertices);
                }
                subarrays.push(SubarrayDescriptor::new(
                    ArraySubset::new_with_ranges(&ranges),
                    SubsampledLocation { subareas, outer },
                ));
            }
        }
        Ok(subarrays)
    }

    fn subarray(
        &self,
        region: &ArraySubset,
        location: &SubsampledLocation,
    ) -> Result<Subarray, ArrayError> {
        if let Interpolation::Unsupported(error) = &self.interpolation {
            return Err(error.clone().into());
        }
        let dimensionality = self.tie_point_shape.len();
        let mut subareas = vec![None; dimensionality];
        let mut outer = vec![None; dimensionality];
        let mut tie_point_ranges = vec![0..0; dimensionality];
        for (axis, subarea) in &location.subareas {
            let tie_point = subarea.tie_point() as u64;
            tie_point_ranges[*axis] = tie_point..tie_point + 2;
            subareas[*axis] = Some(subarea);
        }
        for (axis, range) in &location.outer {
            tie_point_ranges[*axis] = range.clone();
            outer[*axis] = Some(range.clone());
        }
        let tie_point_subset = ArraySubset::new_with_ranges(&tie_point_ranges);

        let tie_points = self.tie_points.read(&tie_point_subset)?;
        let dependent_tie_points = self
            .dependent_tie_points
            .as_ref()
            .map(|dependent| -> Result<Block, ArrayError> {
                Ok(dependent.read()?.extract(&tie_point_subset)?)
            })
            .transpose()?;
        let parameters = self
            .parameters
            .iter()
            .map(|parameter| -> Result<(String, Block), ArrayError> {
                let values = conform(
                    &parameter.name,
                    &*parameter.parameter.values().read()?,
                    parameter.parameter.axes(),
                    dimensionality,
                )?;
                let ranges = parameter_ranges(&parameter.axes, &subareas, &outer);
                Ok((
                    parameter.name.clone(),
                    values.extract(&ArraySubset::new_with_ranges(&ranges))?,
                ))
            })
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(SubsampledSubarray {
            interpolation: self.interpolation.clone(),
            precision: self.precision,
            coordinate: self.coordinate,
            tie_points,
            dependent_tie_points,
            parameters,
            subareas: location.subareas.clone(),
            vertices: self.vertices,
            shape: region.shape().to_vec(),
        }
        .into())
    }

    fn to_memory(&self) -> Result<Self, ArrayError> {
        Ok(Self {
            tie_points: self.tie_points.to_memory()?,
            tie_point_indices: self
                .tie_point_indices
                .iter()
                .map(|(&axis, indices)| -> Result<_, StorageError> {
                    Ok((axis, indices.to_memory()?))
                })
                .collect::<Result<_, _>>()?,
            parameters: self
                .parameters
                .iter()
                .map(|parameter| -> Result<_, StorageError> {
                    Ok(Parameter {
                        parameter: parameter.parameter.to_memory()?,
                        ..parameter.clone()
                    })
                })
                .collect::<Result<_, _>>()?,
            dependent_tie_points: self
                .dependent_tie_points
                .as_ref()
                .map(AuxiliaryArray::to_memory)
                .transpose()?,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::array::CompressedArray;

    use super::*;

    fn block(shape: &[u64], elements: &[f64]) -> Block {
        Block::from_elements(shape.to_vec(), elements.to_vec()).unwrap()
    }

    fn assert_close(got: &[Option<f64>], expected: &[f64]) {
        assert_eq!(got.len(), expected.len());
        for (got, expected) in std::iter::zip(got, expected) {
            let got = got.unwrap();
            assert!((got - expected).abs() < 1e-9, "{got} != {expected}");
        }
    }

    #[test]
    fn subsampled_linear_trims_duplicates() {
        let subsampled = SubsampledBuilder::new(block(&[3], &[0.0, 10.0, 30.0]).into(), vec![5])
            .tie_point_indices(0, block(&[3], &[0.0, 2.0, 4.0]).into())
            .interpolation_name("linear")
            .build()
            .unwrap();
        assert_eq!(subsampled.subareas(0).unwrap().len(), 2);
        let array = CompressedArray::new(subsampled);
        let subarrays = array.subarrays(&ChunkSpec::Auto).unwrap();
        assert_eq!(subarrays[0].region().to_ranges(), vec![0..3]);
        assert_eq!(subarrays[1].region().to_ranges(), vec![3..5]);
        assert_close(
            &array.get_all().unwrap().to_optional_vec(),
            &[0.0, 5.0, 10.0, 20.0, 30.0],
        );
    }

    #[test]
    fn subsampled_quadratic() {
        let subsampled = SubsampledBuilder::new(block(&[2], &[0.0, 4.0]).into(), vec![5])
            .tie_point_indices(0, block(&[2], &[0.0, 4.0]).into())
            .interpolation_name("quadratic")
            .parameter(
                "w",
                InterpolationParameter::new(block(&[1], &[1.0]).into(), vec![0]),
            )
            .build()
            .unwrap();
        // fl + 4 w s (1 - s)
        assert_close(
            &CompressedArray::new(subsampled)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[0.0, 1.75, 3.0, 3.75, 4.0],
        );
    }

    #[test]
    fn subsampled_bounds() {
        let subsampled =
            SubsampledBuilder::new(block(&[3], &[0.0, 10.0, 30.0]).into(), vec![5, 2])
                .tie_point_indices(0, block(&[3], &[0.0, 2.0, 4.0]).into())
                .interpolation_name("linear")
                .build()
                .unwrap();
        assert!(subsampled.is_bounds());
        let bounds = CompressedArray::new(subsampled).get_all().unwrap();
        assert_eq!(bounds.shape(), vec![5, 2]);
        // the vertices of the first three cells divide the first subarea evenly
        let third = 10.0 / 3.0;
        assert_close(
            &bounds.to_optional_vec(),
            &[
                0.0,
                third,
                third,
                2.0 * third,
                2.0 * third,
                10.0,
                10.0,
                20.0,
                20.0,
                30.0,
            ],
        );
    }

    #[test]
    fn subsampled_bi_linear() {
        // a plane u = 10 y + x on a 3 x 3 grid from its corners
        let subsampled = SubsampledBuilder::new(
            block(&[2, 2], &[0.0, 2.0, 20.0, 22.0]).into(),
            vec![3, 3],
        )
        .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
        .tie_point_indices(1, block(&[2], &[0.0, 2.0]).into())
        .interpolation_name("bi_linear")
        .computational_precision("32")
        .build()
        .unwrap();
        assert_eq!(
            subsampled.computational_precision(),
            ComputationalPrecision::Float32
        );
        assert_close(
            &CompressedArray::new(subsampled)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0, 20.0, 21.0, 22.0],
        );
    }

    #[test]
    fn subsampled_bi_linear_bounds() {
        // vertices of a plane u = 10 y + x, three cells along each dimension
        let subsampled = SubsampledBuilder::new(
            block(&[2, 2], &[0.0, 3.0, 30.0, 33.0]).into(),
            vec![3, 3, 4],
        )
        .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
        .tie_point_indices(1, block(&[2], &[0.0, 2.0]).into())
        .interpolation_name("bi_linear")
        .build()
        .unwrap();
        assert!(subsampled.is_bounds());
        let bounds = CompressedArray::new(subsampled).get_all().unwrap();
        assert_eq!(bounds.shape(), vec![3, 3, 4]);
        let expected = (0..3)
            .cartesian_product(0..3)
            .flat_map(|(y, x)| {
                let u = |dy: u32, dx: u32| f64::from(10 * (y + dy) + x + dx);
                [u(0, 0), u(0, 1), u(1, 1), u(1, 0)]
            })
            .collect_vec();
        assert_close(&bounds.to_optional_vec(), &expected);
    }

    fn quadratic_latitude_longitude(
        tie_points: &[f64],
        dependent: &[f64],
        coordinate: GeographicCoordinate,
    ) -> SubsampledBuilder {
        let size = tie_points.len() as u64;
        let dependent = Some(AuxiliaryArray::from(block(&[size], dependent)));
        let indices: &[f64] = if size == 2 {
            &[0.0, 4.0]
        } else {
            &[0.0, 2.0, 4.0]
        };
        let mut builder = SubsampledBuilder::new(block(&[size], tie_points).into(), vec![5]);
        builder
            .tie_point_indices(0, block(&[size], indices).into())
            .interpolation_name("quadratic_latitude_longitude");
        match coordinate {
            GeographicCoordinate::Latitude => builder.dependent_tie_points(None, dependent),
            GeographicCoordinate::Longitude => builder.dependent_tie_points(dependent, None),
        };
        builder
    }

    #[test]
    fn subsampled_quadratic_latitude_longitude_arc_parameters() {
        // from (10, 0) to (30, 40) with the arc midpoint displaced by ce = 0.02 and ca = -0.01
        let arc = |builder: &mut SubsampledBuilder| {
            builder
                .parameter(
                    "ce",
                    InterpolationParameter::new(block(&[1], &[0.02]).into(), vec![0]),
                )
                .parameter(
                    "ca",
                    InterpolationParameter::new(block(&[1], &[-0.01]).into(), vec![0]),
                )
                .build()
                .unwrap()
        };
        let latitude = arc(&mut quadratic_latitude_longitude(
            &[10.0, 30.0],
            &[0.0, 40.0],
            GeographicCoordinate::Latitude,
        ));
        assert_eq!(latitude.coordinate(), Some(GeographicCoordinate::Latitude));
        assert_close(
            &CompressedArray::new(latitude)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[
                10.0,
                16.415_601_451_744_89,
                21.887_468_602_326_52,
                26.415_601_451_744_89,
                30.0,
            ],
        );

        let longitude = arc(&mut quadratic_latitude_longitude(
            &[0.0, 40.0],
            &[10.0, 30.0],
            GeographicCoordinate::Longitude,
        ));
        assert_close(
            &CompressedArray::new(longitude)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[
                0.0,
                8.141_852_712_124_807,
                17.522_470_282_833_076,
                28.141_852_712_124_81,
                40.0,
            ],
        );

        // the arc midpoint is shared by both paths, the other points differ
        let mut cartesian = quadratic_latitude_longitude(
            &[10.0, 30.0],
            &[0.0, 40.0],
            GeographicCoordinate::Latitude,
        );
        cartesian.parameter(
            "interpolation_subarea_flags",
            InterpolationParameter::new(block(&[1], &[1.0]).into(), vec![0]),
        );
        assert_close(
            &CompressedArray::new(arc(&mut cartesian))
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[
                10.0,
                16.377_067_101_618_67,
                21.887_468_602_326_52,
                26.499_818_536_282_927,
                30.0,
            ],
        );
    }

    #[test]
    fn subsampled_interpolation_subarea_flags() {
        // the second subarea interpolates in three-dimensional cartesian space
        let subsampled = quadratic_latitude_longitude(
            &[10.0, 20.0, 40.0],
            &[0.0, 30.0, 50.0],
            GeographicCoordinate::Latitude,
        )
        .parameter(
            "ce",
            InterpolationParameter::new(block(&[1], &[0.02]).into(), vec![0]),
        )
        .parameter(
            "interpolation_subarea_flags",
            InterpolationParameter::new(block(&[2], &[0.0, 1.0]).into(), vec![0]),
        )
        .build()
        .unwrap();
        assert_close(
            &CompressedArray::new(subsampled)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[
                10.0,
                16.584_758_553_728_54,
                20.0,
                31.110_669_647_279_618,
                40.0,
            ],
        );
    }

    #[test]
    fn subsampled_bi_quadratic_latitude_longitude() {
        // corners at latitudes 0 and 20 and longitudes 0 and 20, the centre displaced by ce3
        let latitudes = [0.0, 0.0, 20.0, 20.0];
        let longitudes = [0.0, 20.0, 0.0, 20.0];
        let build = |tie_points: &[f64], dependent: &[f64], coordinate: GeographicCoordinate| {
            let dependent = Some(AuxiliaryArray::from(block(&[2, 2], dependent)));
            let mut builder =
                SubsampledBuilder::new(block(&[2, 2], tie_points).into(), vec![3, 3]);
            builder
                .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
                .tie_point_indices(1, block(&[2], &[0.0, 2.0]).into())
                .interpolation_name("bi_quadratic_latitude_longitude")
                .parameter(
                    "ce3",
                    InterpolationParameter::new(block(&[1, 1], &[0.01]).into(), vec![0, 1]),
                );
            match coordinate {
                GeographicCoordinate::Latitude => builder.dependent_tie_points(None, dependent),
                GeographicCoordinate::Longitude => builder.dependent_tie_points(dependent, None),
            };
            CompressedArray::new(builder.build().unwrap())
                .get_all()
                .unwrap()
                .to_optional_vec()
        };
        assert_close(
            &build(&latitudes, &longitudes, GeographicCoordinate::Latitude),
            &[
                0.0,
                0.0,
                0.0,
                10.0,
                10.724_049_055_905_288,
                10.0,
                20.0,
                20.283_559_454_529_716,
                20.0,
            ],
        );
        assert_close(
            &build(&longitudes, &latitudes, GeographicCoordinate::Longitude),
            &[0.0, 10.0, 20.0, 0.0, 10.0, 20.0, 0.0, 10.0, 20.0],
        );
    }

    #[test]
    fn subsampled_dimensions_mismatch() {
        let result = SubsampledBuilder::new(block(&[2], &[0.0, 1.0]).into(), vec![3])
            .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
            .interpolation_name("bi_linear")
            .build();
        assert!(matches!(
            result,
            Err(ArrayError::InterpolationParameterError(
                InterpolationParameterError::SubsampledDimensions {
                    got: 1,
                    expected: 2,
                    ..
                }
            ))
        ));
    }

    #[test]
    fn subsampled_unsupported() {
        let subsampled = SubsampledBuilder::new(block(&[2], &[0.0, 1.0]).into(), vec![3])
            .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
            .interpolation_name("cubic")
            .build()
            .unwrap();
        let array = CompressedArray::new(subsampled);
        assert_eq!(array.subarrays(&ChunkSpec::Auto).unwrap().len(), 1);
        let error = array.get_all().unwrap_err();
        assert!(matches!(
            error.root(),
            ArrayError::UnsupportedInterpolationError(_)
        ));
    }

    #[test]
    fn subsampled_dependent_tie_points() {
        let builder = |latitude: Option<AuxiliaryArray>, longitude: Option<AuxiliaryArray>| {
            SubsampledBuilder::new(block(&[2], &[0.0, 10.0]).into(), vec![3])
                .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
                .interpolation_name("quadratic_latitude_longitude")
                .dependent_tie_points(latitude, longitude)
                .build()
        };
        let dependent = || Some(AuxiliaryArray::from(block(&[2], &[0.0, 0.0])));
        assert!(matches!(
            builder(None, None),
            Err(ArrayError::InterpolationParameterError(
                InterpolationParameterError::DependentTiePoints(_)
            ))
        ));
        assert!(matches!(
            builder(dependent(), dependent()),
            Err(ArrayError::InterpolationParameterError(
                InterpolationParameterError::DependentTiePoints(_)
            ))
        ));
        let longitude = builder(dependent(), None).unwrap();
        assert_eq!(longitude.coordinate(), Some(GeographicCoordinate::Longitude));

        // longitudes 0 and 10 along the equator, interpolated along the great circle
        assert_close(
            &CompressedArray::new(longitude)
                .get_all()
                .unwrap()
                .to_optional_vec(),
            &[0.0, 5.0, 10.0],
        );
    }

    #[test]
    fn subsampled_unexpected_parameter() {
        let result = SubsampledBuilder::new(block(&[2], &[0.0, 1.0]).into(), vec![3])
            .tie_point_indices(0, block(&[2], &[0.0, 2.0]).into())
            .interpolation_name("linear")
            .parameter(
                "w",
                InterpolationParameter::new(block(&[1], &[1.0]).into(), vec![0]),
            )
            .build();
        assert!(matches!(
            result,
            Err(ArrayError::InterpolationParameterError(
                InterpolationParameterError::UnexpectedParameter { .. }
            ))
        ));
    }

    #[test]
    fn subsampled_location_display() {
        let subsampled = SubsampledBuilder::new(block(&[2, 2], &[0.0; 4]).into(), vec![2, 3])
            .tie_point_indices(1, block(&[2], &[0.0, 2.0]).into())
            .interpolation_name("linear")
            .build()
            .unwrap();
        let subarrays = subsampled.subarrays(&ChunkSpec::Uniform(1)).unwrap();
        assert_eq!(subarrays.len(), 2);
        assert_eq!(
            subarrays[1].location().to_string(),
            "interpolation axis 1 subarea 0 (tie point indices 0..=2), axis 0 1..2"
        );
        assert_eq!(
            subsampled.compressed_dimensions().uncompressed_axes(1),
            Some([1].as_slice())
        );
    }
}
