use crate::traits::Scalar;
use anyhow::{bail, Result};

/// Affine mapping `y = a*x + b` between two scalar intervals.
///
/// Used by consumers to scale phase-space coordinates (angles, momenta) into
/// screen or texture coordinates. Not numerically interesting on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScalarTransform<T: Scalar> {
    a: T,
    b: T,
}

impl<T: Scalar> LinearScalarTransform<T> {
    /// Builds the transform mapping `from.0 -> to.0` and `from.1 -> to.1`.
    pub fn new(from: (T, T), to: (T, T)) -> Result<Self> {
        let span = from.1 - from.0;
        if span == T::zero() {
            bail!("Source interval is degenerate.");
        }
        let a = (to.1 - to.0) / span;
        let b = to.0 - a * from.0;
        Ok(Self { a, b })
    }

    pub fn identity() -> Self {
        Self {
            a: T::one(),
            b: T::zero(),
        }
    }

    pub fn apply(&self, x: T) -> T {
        self.a * x + self.b
    }

    /// Returns the inverse mapping. Fails when the transform collapses the
    /// axis (a == 0).
    pub fn invert(&self) -> Result<Self> {
        if self.a == T::zero() {
            bail!("Transform is not invertible.");
        }
        let a = T::one() / self.a;
        Ok(Self { a, b: -self.b * a })
    }

    /// Composition: applies `self` first, then `other`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: other.a * self.a,
            b: other.a * self.b + other.b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LinearScalarTransform;

    #[test]
    fn maps_interval_endpoints() {
        let t: LinearScalarTransform<f64> =
            LinearScalarTransform::new((-1.0, 1.0), (0.0, 100.0)).unwrap();
        assert!((t.apply(-1.0) - 0.0).abs() < 1e-12);
        assert!((t.apply(1.0) - 100.0).abs() < 1e-12);
        assert!((t.apply(0.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_degenerate_source_interval() {
        assert!(LinearScalarTransform::new((2.0, 2.0), (0.0, 1.0)).is_err());
    }

    #[test]
    fn inverse_round_trips() {
        let t: LinearScalarTransform<f64> =
            LinearScalarTransform::new((0.0, 4.0), (-2.0, 2.0)).unwrap();
        let inv = t.invert().unwrap();
        for x in [0.0, 0.5, 3.25, 4.0] {
            assert!((inv.apply(t.apply(x)) - x).abs() < 1e-12);
        }
    }

    #[test]
    fn composition_matches_sequential_application() {
        let first: LinearScalarTransform<f64> =
            LinearScalarTransform::new((0.0, 1.0), (0.0, 10.0)).unwrap();
        let second = LinearScalarTransform::new((0.0, 10.0), (5.0, 25.0)).unwrap();
        let composed = first.then(&second);
        for x in [0.0, 0.3, 1.0] {
            let expected = second.apply(first.apply(x));
            assert!((composed.apply(x) - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn identity_is_neutral() {
        let id = LinearScalarTransform::<f64>::identity();
        assert_eq!(id.apply(7.5), 7.5);
    }
}
