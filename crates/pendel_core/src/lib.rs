pub mod drift;
pub mod energy;
pub mod integrator;
pub mod simulation;
/// The `pendel_core` crate is the numerical engine behind the pendel
/// double-pendulum laboratory. It integrates the planar double pendulum with
/// a fixed-step explicit scheme and samples the trajectory on the Poincaré
/// section q2 = 0 (w2 > 0 branch).
///
/// Key components:
/// - **Energy**: closed-form solver for the conjugate momentum L2 given total
///   energy, plus phase-space bounds and energy bookkeeping.
/// - **State**: the mutable `Pendulum` and the immutable `PoincarePoint`.
/// - **Integrator**: the per-step physics update and sub-step crossing
///   interpolation.
/// - **Drift**: periodic relative-energy-drift telemetry.
/// - **Simulation**: cancellable background workers and their registry.
pub mod state;
pub mod traits;
pub mod transform;
