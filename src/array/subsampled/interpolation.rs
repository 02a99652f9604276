use derive_more::Display;

use crate::array::UnsupportedInterpolationError;

/// An interpolation method.
#[derive(Clone, Debug, PartialEq, Eq, Display)]
pub enum Interpolation {
    /// `linear`: linear interpolation along one subsampled dimension.
    #[display("linear")]
    Linear,
    /// `bi_linear`: linear interpolation along two subsampled dimensions.
    #[display("bi_linear")]
    BiLinear,
    /// `quadratic`: quadratic interpolation along one subsampled dimension.
    ///
    /// Parameter `w` is the departure from linear interpolation at the subarea midpoint, zero if absent.
    #[display("quadratic")]
    Quadratic,
    /// `quadratic_latitude_longitude`: quadratic interpolation of latitude and longitude along one subsampled dimension.
    ///
    /// Parameters `ce` and `ca` locate the arc midpoint and `interpolation_subarea_flags` selects three dimensional Cartesian interpolation.
    #[display("quadratic_latitude_longitude")]
    QuadraticLatitudeLongitude,
    /// `bi_quadratic_latitude_longitude`: quadratic interpolation of latitude and longitude along two subsampled dimensions.
    ///
    /// Parameters `ce1`/`ca1` locate edge midpoints along the second subsampled dimension, `ce2`/`ca2` along the first, and `ce3`/`ca3` the subarea centre.
    #[display("bi_quadratic_latitude_longitude")]
    BiQuadraticLatitudeLongitude,
    /// An interpolation method without an implementation.
    #[display("{_0}")]
    Unsupported(UnsupportedInterpolationError),
}

/// The interpolation subarea flag selecting three dimensional Cartesian interpolation.
pub const LOCATION_USE_3D_CARTESIAN: u64 = 1;

impl Interpolation {
    /// Resolve an interpolation method from its `interpolation_name`.
    ///
    /// A method without a name, or with an unknown name, is [`Interpolation::Unsupported`].
    #[must_use]
    pub fn new(name: Option<&str>, description: Option<&str>) -> Self {
        match name {
            Some("linear") => Self::Linear,
            Some("bi_linear") => Self::BiLinear,
            Some("quadratic") => Self::Quadratic,
            Some("quadratic_latitude_longitude") => Self::QuadraticLatitudeLongitude,
            Some("bi_quadratic_latitude_longitude") => Self::BiQuadraticLatitudeLongitude,
            _ => Self::Unsupported(UnsupportedInterpolationError::new(
                name.map(str::to_string),
                description.map(str::to_string),
            )),
        }
    }

    /// The number of subsampled dimensions the method interpolates, [`None`] if unsupported.
    #[must_use]
    pub fn subsampled_dimensions(&self) -> Option<usize> {
        match self {
            Self::Linear | Self::Quadratic | Self::QuadraticLatitudeLongitude => Some(1),
            Self::BiLinear | Self::BiQuadraticLatitudeLongitude => Some(2),
            Self::Unsupported(_) => None,
        }
    }

    /// The names of the interpolation parameters the method accepts.
    #[must_use]
    pub fn parameter_names(&self) -> &'static [&'static str] {
        match self {
            Self::Linear | Self::BiLinear | Self::Unsupported(_) => &[],
            Self::Quadratic => &["w"],
            Self::QuadraticLatitudeLongitude => &["ce", "ca", "interpolation_subarea_flags"],
            Self::BiQuadraticLatitudeLongitude => &[
                "ce1",
                "ca1",
                "ce2",
                "ca2",
                "ce3",
                "ca3",
                "interpolation_subarea_flags",
            ],
        }
    }

    /// Returns true if the method interpolates latitude and longitude together, requiring dependent tie points.
    #[must_use]
    pub fn is_geographic(&self) -> bool {
        matches!(
            self,
            Self::QuadraticLatitudeLongitude | Self::BiQuadraticLatitudeLongitude
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_names() {
        for name in [
            "linear",
            "bi_linear",
            "quadratic",
            "quadratic_latitude_longitude",
            "bi_quadratic_latitude_longitude",
        ] {
            assert_eq!(Interpolation::new(Some(name), None).to_string(), name);
        }
        let unsupported = Interpolation::new(Some("cubic"), Some("cubic splines"));
        assert_eq!(unsupported.subsampled_dimensions(), None);
        assert_eq!(
            unsupported.to_string(),
            "unsupported interpolation cubic: cubic splines"
        );
        assert!(matches!(
            Interpolation::new(None, Some("a description")),
            Interpolation::Unsupported(_)
        ));
    }
}
