use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI};

use crate::energy::DEFAULT_EPSILON;
use crate::state::{Pendulum, PoincarePoint};

/// Tuning knobs for the fixed-step integration and the section detection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntegratorSettings {
    /// Upper bound on q2 accepted as a section crossing. The sign change of
    /// q2 alone would also fire when the inner pendulum flips over at the
    /// far side (q2 jumping past ±π), so crossings are only accepted while
    /// q2 stays well below that.
    pub poincare_threshold: f64,
    /// Tolerance for the discriminant of the momentum quadratic.
    pub epsilon: f64,
    /// Coefficient k of the timestep heuristic dt = k / (sqrt(e0) + 1).
    pub dt_coefficient: f64,
}

impl Default for IntegratorSettings {
    fn default() -> Self {
        Self {
            poincare_threshold: FRAC_PI_2,
            epsilon: DEFAULT_EPSILON,
            dt_coefficient: 2e-6,
        }
    }
}

impl Pendulum {
    /// Advances the state by exactly `num_steps` fixed timesteps and records
    /// at most one Poincaré crossing per step. Returns the number of
    /// crossings recorded.
    ///
    /// The crossing test runs against the pre-update sample, using the
    /// accelerations of the step that produced it; the back-interpolation is
    /// sign-correct for negative dt (time-reversed runs).
    pub fn advance(&mut self, num_steps: usize) -> usize {
        let dt = self.dt;
        let threshold = self.settings.poincare_threshold;
        let mut crossings = 0;

        for _ in 0..num_steps {
            if self.q2_old < 0.0 && self.q2 >= 0.0 && self.q2 < threshold {
                self.record_crossing();
                crossings += 1;
            }
            self.q2_old = self.q2;

            let c = (self.q1 - self.q2).cos();
            let s = (self.q1 - self.q2).sin();
            let b = 2.0 - c * c;
            let mut b1 = -s * self.w2 * self.w2;
            let mut b2 = s * self.w1 * self.w1;

            if self.gravity {
                b1 -= 2.0 * self.q1.sin();
                b2 -= self.q2.sin();
            }

            self.a1 = (b1 - b2 * c) / b;
            self.w1 += self.a1 * dt;
            self.q1 = normalize_angle(self.q1 + self.w1 * dt);

            self.a2 = (2.0 * b2 - b1 * c) / b;
            self.w2 += self.a2 * dt;
            self.q2 = normalize_angle(self.q2 + self.w2 * dt);
        }

        self.time += num_steps as f64 * dt;
        crossings
    }

    fn record_crossing(&mut self) {
        let bt = crossing_back_time(self.dt, self.q2, self.q2_old);
        let point = PoincarePoint::new(
            self.q1 + self.w1 * bt,
            self.w1 + self.a1 * bt,
            self.w2 + self.a2 * bt,
        );
        log::trace!("section crossing #{} at t = {}", self.points.len(), self.time);
        self.points.push(point);
    }
}

/// Time offset back to the exact q2 = 0 crossing, assuming q2 moved linearly
/// over the last step. Opposite in sign to dt, so it is <= 0 for forward
/// runs and >= 0 for reversed ones.
pub(crate) fn crossing_back_time(dt: f64, q2: f64, q2_old: f64) -> f64 {
    -dt * q2 / (q2 - q2_old)
}

/// Wraps an angle into (-π, π]. A single correction suffices: with the
/// accepted |dt| band no angle moves by more than 2π in one step.
pub(crate) fn normalize_angle(angle: f64) -> f64 {
    if angle < -PI {
        return angle + 2.0 * PI;
    }
    if angle > PI {
        return angle - 2.0 * PI;
    }
    angle
}
