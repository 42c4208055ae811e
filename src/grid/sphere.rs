//! Tangent-space operations on the unit 2-sphere.

use nalgebra::Vector3;

/// Remove the component of `v` along the unit vector `n`: `v - (v . n) n`.
#[inline]
pub fn project_orthogonal(v: &Vector3<f64>, n: &Vector3<f64>) -> Vector3<f64> {
    v - n * v.dot(n)
}

/// Geodesic exponential map at `n` applied to the tangent vector `v`:
/// `cos|v| n + sin|v| v / |v|`.
///
/// Tangent vectors shorter than `eps` return `n` unchanged.
#[inline]
pub fn exp_map(v: &Vector3<f64>, n: &Vector3<f64>, eps: f64) -> Vector3<f64> {
    let len = v.norm();
    if len < eps {
        return *n;
    }
    n * len.cos() + v * (len.sin() / len)
}

/// Arc length between two unit vectors.
#[inline]
pub fn geodesic_distance(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    a.dot(b).clamp(-1.0, 1.0).acos()
}
