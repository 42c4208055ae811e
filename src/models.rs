//! Models fitted by the robust estimator.

use nalgebra::Vector3;

/// Albedo-scaled surface normal `m = albedo * n`, the unknown of the
/// Lambertian model `I = S . m`.
#[derive(Clone, Debug, PartialEq)]
pub struct ScaledNormal {
    pub m: Vector3<f64>,
}

impl ScaledNormal {
    pub fn new(m: Vector3<f64>) -> Self {
        Self { m }
    }

    /// Predicted intensity under light vector `s`.
    #[inline]
    pub fn predict(&self, s: &Vector3<f64>) -> f64 {
        s.dot(&self.m)
    }

    pub fn albedo(&self) -> f64 {
        self.m.norm()
    }

    /// Unit normal, `None` for a (near) zero vector.
    pub fn normal(&self) -> Option<Vector3<f64>> {
        self.m.try_normalize(f64::EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn albedo_and_normal_split_the_vector() {
        let model = ScaledNormal::new(Vector3::new(0.0, 3.0, 4.0));
        assert!((model.albedo() - 5.0).abs() < 1e-12);
        let n = model.normal().unwrap();
        assert!((n - Vector3::new(0.0, 0.6, 0.8)).norm() < 1e-12);
        assert!((model.predict(&Vector3::new(1.0, 1.0, 1.0)) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn zero_vector_has_no_normal() {
        assert!(ScaledNormal::new(Vector3::zeros()).normal().is_none());
    }
}
