use serde::{Deserialize, Serialize};

use crate::energy::{self, EnergyError, PhaseBounds};
use crate::integrator::IntegratorSettings;

/// Seconds of wall time per simulated time unit. Time is measured in units
/// of sqrt(l/g); for pendulum arms of 12.425 cm one unit is this many
/// seconds, which makes the default timesteps feel like real pendulums.
pub const SECONDS_PER_TIME_UNIT: f64 = 0.1125396;

/// Largest accepted |dt|. Assignments outside the band are ignored.
const DT_LIMIT: f64 = 1e-3;

/// Sentinel for q2_old priming the crossing detector after an energy init.
const Q2_OLD_SENTINEL: f64 = -0.1;

/// One intersection of the trajectory with the section q2 = 0, crossing with
/// w2 > 0. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoincarePoint {
    pub q1: f64,
    pub w1: f64,
    pub w2: f64,
}

impl PoincarePoint {
    pub fn new(q1: f64, w1: f64, w2: f64) -> Self {
        Self { q1, w1, w2 }
    }

    /// L1 evaluated on the section, where cos(q1 - q2) = cos(q1).
    pub fn l1(&self) -> f64 {
        2.0 * self.w1 + self.w2 * self.q1.cos()
    }

    /// L2 evaluated on the section.
    pub fn l2(&self) -> f64 {
        self.w2 + self.w1 * self.q1.cos()
    }

    /// Total energy of the point; with q2 = 0 the potential term reduces to
    /// 2 - 2*cos(q1).
    pub fn energy(&self) -> f64 {
        let cos = self.q1.cos();
        let e_kin = self.w1 * self.w1 + self.w2 * self.w2 / 2.0 + self.w1 * self.w2 * cos;
        e_kin + 2.0 - 2.0 * cos
    }
}

/// The full mutable state of one double pendulum plus its Poincaré map.
///
/// Field order matches the persisted record layout: initial snapshot first,
/// then the current kinematic state, then the energy bookkeeping, then the
/// point sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pendulum {
    q1_0: f64,
    q2_0: f64,
    w1_0: f64,
    w2_0: f64,
    l1_0: f64,
    l2_0: f64,
    pub(crate) q1: f64,
    pub(crate) q2: f64,
    pub(crate) w1: f64,
    pub(crate) w2: f64,
    pub(crate) a1: f64,
    pub(crate) a2: f64,
    pub(crate) q2_old: f64,
    pub(crate) time: f64,
    e0: f64,
    drift: f64,
    pub(crate) dt: f64,
    pub(crate) gravity: bool,
    bounds: PhaseBounds,
    pub(crate) settings: IntegratorSettings,
    pub(crate) points: Vec<PoincarePoint>,
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(IntegratorSettings::default())
    }
}

impl Pendulum {
    pub fn new(settings: IntegratorSettings) -> Self {
        Self {
            q1_0: 0.0,
            q2_0: 0.0,
            w1_0: 0.0,
            w2_0: 0.0,
            l1_0: 0.0,
            l2_0: 0.0,
            q1: 0.0,
            q2: 0.0,
            w1: 0.0,
            w2: 0.0,
            a1: 0.0,
            a2: 0.0,
            q2_old: 0.0,
            time: 0.0,
            e0: 0.0,
            drift: 0.0,
            dt: 1e-6,
            gravity: true,
            bounds: PhaseBounds::default(),
            settings,
            points: Vec::new(),
        }
    }

    /// Seeds the pendulum from a full kinematic state (angles and angular
    /// velocities). The total energy follows from the state, so this form
    /// always succeeds.
    pub fn init_kinematic(&mut self, q1: f64, q2: f64, w1: f64, w2: f64) {
        self.q1 = q1;
        self.q1_0 = q1;
        self.q2 = q2;
        self.q2_0 = q2;
        self.q2_old = q2;
        self.w1 = w1;
        self.w1_0 = w1;
        self.w2 = w2;
        self.w2_0 = w2;
        self.a1 = 0.0;
        self.a2 = 0.0;

        let (l1, l2) = energy::conjugate_momenta(q1, q2, w1, w2);
        self.l1_0 = l1;
        self.l2_0 = l2;

        self.set_energy(self.calculate_energy());
        self.reset_movement();
    }

    /// Seeds the pendulum from a total energy plus the section coordinates
    /// (q1, L1). q2 is pinned to 0 and the complementary momentum L2 follows
    /// from the energy constraint. Fails when no trajectory with w2 >= 0
    /// passes through the requested point.
    pub fn init_energy(&mut self, e0: f64, q1: f64, l1: f64) -> Result<(), EnergyError> {
        let l2 = energy::solve_l2(e0, q1, l1, self.settings.epsilon)?;

        let cos = q1.cos();
        let (w1, w2) = energy::angular_velocities(l1, l2, cos);
        if w2 < 0.0 {
            return Err(EnergyError::RejectedBranch { w2 });
        }

        self.set_energy(e0);
        self.q1 = q1;
        self.q1_0 = q1;
        self.l1_0 = l1;
        self.l2_0 = l2;
        self.q2 = 0.0;
        self.q2_0 = 0.0;
        self.q2_old = Q2_OLD_SENTINEL;
        self.w1 = w1;
        self.w1_0 = w1;
        self.w2 = w2;
        self.w2_0 = w2;
        self.a1 = 0.0;
        self.a2 = 0.0;

        self.reset_movement();
        Ok(())
    }

    fn set_energy(&mut self, e0: f64) {
        self.e0 = e0;
        self.bounds = PhaseBounds::from_energy(e0, self.gravity);
    }

    fn reset_movement(&mut self) {
        self.drift = 0.0;
        self.time = 0.0;
        self.dt = round_significant(self.settings.dt_coefficient / (self.e0.sqrt() + 1.0), 1);
        self.points.clear();
        log::info!(
            "pendulum initialized: e0 = {:.6}, dt = {:e}",
            self.e0,
            self.dt
        );
    }

    /// Instantaneous total energy of the current state.
    pub fn calculate_energy(&self) -> f64 {
        energy::total_energy(self.q1, self.q2, self.w1, self.w2, self.gravity)
    }

    /// Recomputes and returns the relative energy drift in percent.
    pub fn check_energy(&mut self) -> f64 {
        let e = self.calculate_energy();
        self.drift = (e - self.e0) / self.e0 * 100.0;
        self.drift
    }

    pub fn q1(&self) -> f64 {
        self.q1
    }

    pub fn q2(&self) -> f64 {
        self.q2
    }

    pub fn w1(&self) -> f64 {
        self.w1
    }

    pub fn w2(&self) -> f64 {
        self.w2
    }

    pub fn a1(&self) -> f64 {
        self.a1
    }

    pub fn a2(&self) -> f64 {
        self.a2
    }

    pub fn l1(&self) -> f64 {
        energy::conjugate_momenta(self.q1, self.q2, self.w1, self.w2).0
    }

    pub fn l2(&self) -> f64 {
        energy::conjugate_momenta(self.q1, self.q2, self.w1, self.w2).1
    }

    pub fn q1_0(&self) -> f64 {
        self.q1_0
    }

    pub fn q2_0(&self) -> f64 {
        self.q2_0
    }

    pub fn w1_0(&self) -> f64 {
        self.w1_0
    }

    pub fn w2_0(&self) -> f64 {
        self.w2_0
    }

    pub fn l1_0(&self) -> f64 {
        self.l1_0
    }

    pub fn l2_0(&self) -> f64 {
        self.l2_0
    }

    pub fn e0(&self) -> f64 {
        self.e0
    }

    /// Relative energy drift in percent, as of the last `check_energy`.
    pub fn drift(&self) -> f64 {
        self.drift
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Sets the timestep. Values with |dt| >= 1e-3 are silently ignored and
    /// the last accepted value stays in effect. Negative values are allowed
    /// and integrate backwards in time.
    pub fn set_dt(&mut self, dt: f64) {
        if dt > -DT_LIMIT && dt < DT_LIMIT {
            self.dt = dt;
        }
    }

    /// Elapsed simulated time, in integration time units.
    pub fn elapsed_time(&self) -> f64 {
        self.time
    }

    /// Elapsed simulated time converted to seconds.
    pub fn simulation_seconds(&self) -> f64 {
        self.time * SECONDS_PER_TIME_UNIT
    }

    pub fn gravity(&self) -> bool {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: bool) {
        self.gravity = gravity;
    }

    pub fn bounds(&self) -> PhaseBounds {
        self.bounds
    }

    pub fn settings(&self) -> IntegratorSettings {
        self.settings
    }

    /// The recorded section crossings, in crossing order.
    pub fn points(&self) -> &[PoincarePoint] {
        &self.points
    }

    pub fn clear_points(&mut self) {
        self.points.clear();
    }
}

/// Rounds to the given number of significant decimal digits.
fn round_significant(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let factor = 10f64.powi(digits - 1 - magnitude);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::{round_significant, Pendulum, PoincarePoint};
    use crate::energy::{self, EnergyError};

    #[test]
    fn kinematic_init_always_succeeds_and_conserves_inputs() {
        let mut p = Pendulum::default();
        p.init_kinematic(0.3, -0.1, 0.2, 0.4);

        assert_eq!(p.q1(), 0.3);
        assert_eq!(p.q2(), -0.1);
        assert_eq!(p.w1(), 0.2);
        assert_eq!(p.w2(), 0.4);
        assert_eq!(p.elapsed_time(), 0.0);
        assert!(p.points().is_empty());

        let e = energy::total_energy(0.3, -0.1, 0.2, 0.4, true);
        assert!((p.e0() - e).abs() < 1e-15);
    }

    #[test]
    fn energy_init_succeeds_on_section() {
        let mut p = Pendulum::default();
        p.init_energy(0.8, 0.0, 0.0).unwrap();

        assert_eq!(p.q2(), 0.0);
        assert!(p.w2() >= 0.0);
        assert!((p.calculate_energy() - 0.8).abs() < 1e-12);
        assert!(p.q2_old < 0.0);
    }

    #[test]
    fn energy_init_rejects_unreachable_momentum() {
        let mut p = Pendulum::default();
        let result = p.init_energy(0.5, 0.0, 3.0);
        assert!(matches!(result, Err(EnergyError::NoRealSolution { .. })));
    }

    #[test]
    fn round_trip_between_init_forms() {
        let mut a = Pendulum::default();
        a.init_kinematic(0.3, 0.0, 0.1, 0.2);

        let mut b = Pendulum::default();
        b.init_energy(a.e0(), a.q1(), a.l1()).unwrap();

        assert!((b.w1() - a.w1()).abs() < 1e-12);
        assert!((b.w2() - a.w2()).abs() < 1e-12);
    }

    #[test]
    fn dt_setter_keeps_last_good_value() {
        let mut p = Pendulum::default();
        p.init_energy(0.8, 0.0, 0.0).unwrap();
        let dt = p.dt();

        p.set_dt(1e-3);
        assert_eq!(p.dt(), dt);
        p.set_dt(-2.0);
        assert_eq!(p.dt(), dt);

        p.set_dt(-5e-7);
        assert_eq!(p.dt(), -5e-7);
    }

    #[test]
    fn dt_heuristic_is_rounded_to_one_digit() {
        let mut p = Pendulum::default();
        p.init_energy(0.8, 0.0, 0.0).unwrap();
        // 2e-6 / (sqrt(0.8) + 1) = 1.0557e-6, rounded to 1e-6.
        assert!((p.dt() - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn poincare_point_derives_section_quantities() {
        let point = PoincarePoint::new(0.0, 0.5, 1.0);
        assert!((point.l1() - 2.0).abs() < 1e-12);
        assert!((point.l2() - 1.5).abs() < 1e-12);
        // eKin = 0.25 + 0.5 + 0.5, ePot = 0 at q1 = 0.
        assert!((point.energy() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn rounding_keeps_one_significant_digit() {
        assert_eq!(round_significant(1.0557e-6, 1), 1e-6);
        assert_eq!(round_significant(5.4e-7, 1), 5e-7);
        assert_eq!(round_significant(-2.6e-6, 1), -3e-6);
        assert_eq!(round_significant(0.0, 1), 0.0);
    }
}
