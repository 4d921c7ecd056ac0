use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Default tolerance for the discriminant of the momentum quadratic.
pub const DEFAULT_EPSILON: f64 = 1e-12;

/// Failure modes of the constrained momentum solve on the section.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum EnergyError {
    #[error("energy {e0} is too low for q1 = {q1}, L1 = {l1}")]
    NoRealSolution { e0: f64, q1: f64, l1: f64 },

    #[error("configuration yields w2 = {w2} < 0, off the section branch")]
    RejectedBranch { w2: f64 },
}

/// Solves for the conjugate momentum L2 on the Poincaré section (q2 = 0),
/// given the total energy `e0`, the angle `q1` and the momentum `l1`.
///
/// In units of time sqrt(l/g), energy m*g*l and angular momentum
/// m*l*sqrt(l*g), the Lagrangian of the planar double pendulum is
///
///   L = w1^2 + w2^2/2 + w1*w2*cos - (3 - 2*cos(q1) - cos(q2)),
///
/// with cos = cos(q1 - q2). The conjugate momenta are L1 = 2*w1 + w2*cos and
/// L2 = w2 + w1*cos, and the Hamiltonian becomes
///
///   H = (L1^2/2 + L2^2 - L1*L2*cos)/b + ePot,   b = 2 - cos^2.
///
/// Requiring H = e0 turns this into a quadratic in L2:
///
///   L2^2 - (L1*cos)*L2 + [b*(ePot - e0) + L1^2/2] = 0.
///
/// Of the two roots only p + sqrt(p^2 - q) is taken (p = L1*cos/2, which is
/// already the -p/2 of the quadratic normal form); the other root belongs to
/// the w2 < 0 trajectory, which never intersects the section branch.
pub fn solve_l2(e0: f64, q1: f64, l1: f64, epsilon: f64) -> Result<f64, EnergyError> {
    let cos = q1.cos(); // cos(q1 - q2) with q2 = 0
    let b = 2.0 - cos * cos;

    let e_pot = potential_energy(q1, 0.0);
    let p = l1 * cos * 0.5;
    let q = b * (e_pot - e0) + l1 * l1 * 0.5;
    let arg = p * p - q;

    if arg < -epsilon {
        return Err(EnergyError::NoRealSolution { e0, q1, l1 });
    }

    if arg <= epsilon {
        // double root
        return Ok(p);
    }

    Ok(p + arg.sqrt())
}

/// Angular velocities from the conjugate momenta at relative angle cosine
/// `cos`: w1 = (L1 - L2*cos)/b, w2 = (2*L2 - L1*cos)/b.
pub fn angular_velocities(l1: f64, l2: f64, cos: f64) -> (f64, f64) {
    let b = 2.0 - cos * cos;
    let w1 = (l1 - l2 * cos) / b;
    let w2 = (2.0 * l2 - l1 * cos) / b;
    (w1, w2)
}

/// Conjugate momenta from the kinematic state: L1 = 2*w1 + w2*cos,
/// L2 = w2 + w1*cos, with cos = cos(q1 - q2).
pub fn conjugate_momenta(q1: f64, q2: f64, w1: f64, w2: f64) -> (f64, f64) {
    let cos = (q1 - q2).cos();
    (2.0 * w1 + w2 * cos, w2 + w1 * cos)
}

/// Potential energy, zero at the hanging rest position.
pub fn potential_energy(q1: f64, q2: f64) -> f64 {
    3.0 - 2.0 * q1.cos() - q2.cos()
}

/// Total energy of a kinematic state. Without gravity only the kinetic term
/// remains.
pub fn total_energy(q1: f64, q2: f64, w1: f64, w2: f64, gravity: bool) -> f64 {
    let e_kin = w1 * w1 + w2 * w2 / 2.0 + w1 * w2 * (q1 - q2).cos();

    if !gravity {
        return e_kin;
    }

    e_kin + potential_energy(q1, q2)
}

/// Bounds of the phase space accessible at a given total energy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseBounds {
    pub q1_max: f64,
    pub q2_max: f64,
    pub l1_max: f64,
    pub l2_max: f64,
}

impl PhaseBounds {
    /// Derives the bounds from the total energy. Without gravity nothing
    /// restricts the angles, so both angle bounds open up to π.
    pub fn from_energy(e0: f64, gravity: bool) -> Self {
        let q1_max = if e0 >= 4.0 || !gravity {
            PI
        } else {
            (1.0 - e0 / 2.0).acos()
        };
        let q2_max = if e0 >= 2.0 || !gravity {
            PI
        } else {
            (1.0 - e0).acos()
        };

        Self {
            q1_max,
            q2_max,
            l1_max: 2.0 * e0.sqrt(),
            l2_max: (2.0 * e0).sqrt(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        angular_velocities, conjugate_momenta, potential_energy, solve_l2, total_energy,
        EnergyError, PhaseBounds, DEFAULT_EPSILON,
    };
    use std::f64::consts::PI;

    #[test]
    fn rejects_momentum_beyond_energy() {
        // At e0 = 0.5 the largest reachable |L1| is 2*sqrt(0.5) < 3.
        let result = solve_l2(0.5, 0.0, 3.0, DEFAULT_EPSILON);
        assert_eq!(
            result,
            Err(EnergyError::NoRealSolution {
                e0: 0.5,
                q1: 0.0,
                l1: 3.0
            })
        );
    }

    #[test]
    fn plus_branch_gives_non_negative_w2() {
        let l2 = solve_l2(0.8, 0.0, 0.0, DEFAULT_EPSILON).unwrap();
        let (w1, w2) = angular_velocities(0.0, l2, 1.0);
        assert!(w2 >= 0.0);

        let e = total_energy(0.0, 0.0, w1, w2, true);
        assert!((e - 0.8).abs() < 1e-12);
    }

    #[test]
    fn double_root_collapses_to_p() {
        // q = p^2 exactly: pick l1 so that the discriminant vanishes.
        // With q1 = 0: cos = 1, b = 1, ePot = 0, p = l1/2,
        // arg = l1^2/4 - (l1^2/2 - e0) = e0 - l1^2/4 == 0 at l1 = 2*sqrt(e0).
        let e0: f64 = 0.5;
        let l1 = 2.0 * e0.sqrt();
        let l2 = solve_l2(e0, 0.0, l1, DEFAULT_EPSILON).unwrap();
        assert!((l2 - l1 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn momenta_and_velocities_are_inverse_maps() {
        let (q1, q2, w1, w2) = (0.4, -0.2, 0.3, -0.1);
        let (l1, l2) = conjugate_momenta(q1, q2, w1, w2);
        let (v1, v2) = angular_velocities(l1, l2, (q1 - q2).cos());
        assert!((v1 - w1).abs() < 1e-12);
        assert!((v2 - w2).abs() < 1e-12);
    }

    #[test]
    fn potential_vanishes_at_rest() {
        assert!(potential_energy(0.0, 0.0).abs() < 1e-15);
        assert!((potential_energy(PI, PI) - 6.0).abs() < 1e-12);
    }

    #[test]
    fn bounds_close_below_threshold_energies() {
        let bounds = PhaseBounds::from_energy(1.0, true);
        assert!((bounds.q1_max - (0.5f64).acos()).abs() < 1e-12);
        assert!((bounds.q2_max - (0.0f64).acos()).abs() < 1e-12);
        assert!((bounds.l1_max - 2.0).abs() < 1e-12);
        assert!((bounds.l2_max - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn bounds_open_at_high_energy_or_without_gravity() {
        let high = PhaseBounds::from_energy(4.0, true);
        assert_eq!(high.q1_max, PI);
        assert_eq!(high.q2_max, PI);

        let mid = PhaseBounds::from_energy(2.0, true);
        assert!(mid.q1_max < PI);
        assert_eq!(mid.q2_max, PI);

        let free = PhaseBounds::from_energy(0.1, false);
        assert_eq!(free.q1_max, PI);
        assert_eq!(free.q2_max, PI);
    }
}
