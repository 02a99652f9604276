//! Interpolation formulas.
//!
//! Scalar and three dimensional Cartesian interpolation helpers, generic over the computational precision.
//! Latitudes and longitudes are in degrees.

use num::Float;

/// A three dimensional Cartesian vector.
pub type Vector3<T> = [T; 3];

/// Cast an `f64` to the computational precision.
pub fn cast<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::nan)
}

/// Linear interpolation between `ua` (at `s = 0`) and `ub` (at `s = 1`).
pub fn fl<T: Float>(ua: T, ub: T, s: T) -> T {
    ua + s * (ub - ua)
}

/// Quadratic interpolation between `ua` and `ub` with coefficient `w`.
///
/// `w` is the departure from linear interpolation at `s = 0.5`.
pub fn fq<T: Float>(ua: T, ub: T, w: T, s: T) -> T {
    let four = cast::<T>(4.0);
    fl(ua, ub, s) + four * w * s * (T::one() - s)
}

/// The quadratic coefficient of the curve through `ua`, `um` (at `s = 0.5`) and `ub`.
pub fn fw<T: Float>(ua: T, um: T, ub: T) -> T {
    um - fl(ua, ub, cast(0.5))
}

/// Quadratic interpolation through `ua`, `um` (at `s = 0.5`) and `ub`.
pub fn fq3<T: Float>(ua: T, um: T, ub: T, s: T) -> T {
    fq(ua, ub, fw(ua, um, ub), s)
}

/// Quadratic interpolation through three control vectors, component-wise.
pub fn fq3v<T: Float>(va: &Vector3<T>, vm: &Vector3<T>, vb: &Vector3<T>, s: T) -> Vector3<T> {
    [
        fq3(va[0], vm[0], vb[0], s),
        fq3(va[1], vm[1], vb[1], s),
        fq3(va[2], vm[2], vb[2], s),
    ]
}

/// Convert a latitude and longitude to a unit vector.
pub fn fll2v<T: Float>(latitude: T, longitude: T) -> Vector3<T> {
    let (latitude, longitude) = (latitude.to_radians(), longitude.to_radians());
    [
        latitude.cos() * longitude.cos(),
        latitude.cos() * longitude.sin(),
        latitude.sin(),
    ]
}

/// Convert a vector to a latitude and longitude.
///
/// The vector need not have unit length.
pub fn fv2ll<T: Float>(v: &Vector3<T>) -> (T, T) {
    let latitude = v[2].atan2(v[0].hypot(v[1])).to_degrees();
    let longitude = v[1].atan2(v[0]).to_degrees();
    (latitude, longitude)
}

fn add<T: Float>(a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

fn sub<T: Float>(a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn scale<T: Float>(a: &Vector3<T>, factor: T) -> Vector3<T> {
    [a[0] * factor, a[1] * factor, a[2] * factor]
}

fn norm<T: Float>(a: &Vector3<T>) -> T {
    (a[0] * a[0] + a[1] * a[1] + a[2] * a[2]).sqrt()
}

fn cross<T: Float>(a: &Vector3<T>, b: &Vector3<T>) -> Vector3<T> {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// The correction vector of the great circle arc from `va` to `vb`.
///
/// `ce` and `ca` are the cross-arc and along-arc components of the arc midpoint.
/// With both zero, the midpoint is the great circle midpoint.
pub fn fcv<T: Float>(va: &Vector3<T>, vb: &Vector3<T>, ce: T, ca: T) -> Vector3<T> {
    let vm = scale(&add(va, vb), cast(0.5));
    let norm_m = norm(&vm);
    let erv = scale(&vm, norm_m.recip());
    let along = sub(vb, va);
    let norm_along = norm(&along);
    let eav = if norm_along > T::zero() {
        scale(&along, norm_along.recip())
    } else {
        [T::zero(); 3]
    };
    let ecv = cross(&erv, &eav);
    let radial = (T::one() - ce * ce - ca * ca).sqrt() - norm_m;
    add(
        &add(&scale(&ecv, ce), &scale(&eav, ca)),
        &scale(&erv, radial),
    )
}

/// The midpoint of the arc from `va` to `vb` with arc parameters `ce` and `ca`.
pub fn arc_midpoint<T: Float>(va: &Vector3<T>, vb: &Vector3<T>, ce: T, ca: T) -> Vector3<T> {
    add(&scale(&add(va, vb), cast(0.5)), &fcv(va, vb, ce, ca))
}

/// Unwrap `longitude` to within 180 degrees of `reference`.
pub fn unwrap_longitude<T: Float>(longitude: T, reference: T) -> T {
    let full = cast::<T>(360.0);
    longitude - full * ((longitude - reference) / full).round()
}
