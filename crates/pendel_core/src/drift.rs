use crate::state::Pendulum;

/// Periodic relative-energy-drift sampling.
///
/// Computing the energy is cheap, but the drift is validation telemetry and
/// not a control input to the integration, so it is only refreshed every
/// `stride` steps rather than on each one.
#[derive(Debug)]
pub struct DriftMonitor {
    stride: usize,
    since_last: usize,
}

impl DriftMonitor {
    pub fn new(stride: usize) -> Self {
        Self {
            stride: stride.max(1),
            since_last: 0,
        }
    }

    /// Accounts for `steps` just integrated and, once the stride is reached,
    /// refreshes the pendulum's drift figure and returns it.
    pub fn sample(&mut self, pendulum: &mut Pendulum, steps: usize) -> Option<f64> {
        self.since_last += steps;
        if self.since_last < self.stride {
            return None;
        }
        self.since_last = 0;

        let drift = pendulum.check_energy();
        log::debug!(
            "energy drift {:.6}% after t = {:.3}",
            drift,
            pendulum.elapsed_time()
        );
        Some(drift)
    }
}
