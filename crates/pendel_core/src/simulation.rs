use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::drift::DriftMonitor;
use crate::state::{Pendulum, PoincarePoint};

/// Tuning knobs for the background simulation worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimulatorSettings {
    /// Steps integrated per batch. Cancellation is polled once per batch, so
    /// this bounds both the lock hold time and the stop latency.
    pub batch_size: usize,
    /// Steps between energy-drift samples.
    pub drift_stride: usize,
    /// Batches between trajectory events.
    pub trajectory_stride: usize,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            batch_size: 20_000,
            drift_stride: 4_000_000,
            trajectory_stride: 10,
        }
    }
}

/// A low-rate sample of the current trajectory, for consumers that draw the
/// pendulum rather than the section map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySample {
    pub q1: f64,
    pub q2: f64,
    pub l1: f64,
    pub l2: f64,
}

/// Events pushed by the worker onto the queue handed out by
/// [`Simulator::take_events`]. The consuming layer drains them on its own
/// schedule, which decouples producer cadence from consumer threads.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationEvent {
    Poincare(PoincarePoint),
    Trajectory(TrajectorySample),
    Drift { percent: f64, steps_per_second: u64 },
}

/// Drives one pendulum on a background worker thread.
///
/// Single-writer model: while running, only the worker mutates the shared
/// pendulum; other threads take short read locks. Cancellation is
/// cooperative and polled once per batch, so `stop` returns immediately and
/// the halt is observed via `join` or `is_running`. The state is left
/// mid-simulation and can be resumed with another `start`.
pub struct Simulator {
    pendulum: Arc<RwLock<Pendulum>>,
    settings: SimulatorSettings,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    events_wanted: Arc<AtomicBool>,
    steps_per_second: Arc<AtomicU64>,
    events_tx: Sender<SimulationEvent>,
    events_rx: Option<Receiver<SimulationEvent>>,
    handle: Option<JoinHandle<()>>,
}

impl Simulator {
    pub fn new(pendulum: Pendulum, settings: SimulatorSettings) -> Self {
        let (events_tx, events_rx) = channel();
        Self {
            pendulum: Arc::new(RwLock::new(pendulum)),
            settings,
            cancel: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            events_wanted: Arc::new(AtomicBool::new(false)),
            steps_per_second: Arc::new(AtomicU64::new(0)),
            events_tx,
            events_rx: Some(events_rx),
            handle: None,
        }
    }

    /// The shared state handle. Readers must not hold the lock for long
    /// while the worker runs; the worker takes the write lock once per
    /// batch.
    pub fn pendulum(&self) -> Arc<RwLock<Pendulum>> {
        Arc::clone(&self.pendulum)
    }

    /// Hands out the event queue. Events are only produced once this has
    /// been called, so an unobserved simulation does not accumulate an
    /// unbounded backlog.
    pub fn take_events(&mut self) -> Option<Receiver<SimulationEvent>> {
        let receiver = self.events_rx.take();
        if receiver.is_some() {
            self.events_wanted.store(true, Ordering::Relaxed);
        }
        receiver
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Steps per wall-clock second, refreshed on the drift cadence.
    pub fn steps_per_second(&self) -> u64 {
        self.steps_per_second.load(Ordering::Relaxed)
    }

    /// Spawns the worker. Idempotent: returns false when already running.
    pub fn start(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.cancel.store(false, Ordering::Relaxed);
        self.running.store(true, Ordering::Relaxed);

        let worker = Worker {
            pendulum: Arc::clone(&self.pendulum),
            settings: self.settings,
            cancel: Arc::clone(&self.cancel),
            running: Arc::clone(&self.running),
            events_wanted: Arc::clone(&self.events_wanted),
            steps_per_second: Arc::clone(&self.steps_per_second),
            events: self.events_tx.clone(),
        };

        self.handle = Some(thread::spawn(move || worker.run()));
        log::info!("simulation started");
        true
    }

    /// Requests cooperative cancellation and returns immediately. The
    /// worker finishes its current batch first.
    pub fn stop(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Blocks until the worker has exited. No-op when none is running.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Simulator {
    fn drop(&mut self) {
        self.stop();
        self.join();
    }
}

struct Worker {
    pendulum: Arc<RwLock<Pendulum>>,
    settings: SimulatorSettings,
    cancel: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    events_wanted: Arc<AtomicBool>,
    steps_per_second: Arc<AtomicU64>,
    events: Sender<SimulationEvent>,
}

impl Worker {
    fn run(self) {
        let batch = self.settings.batch_size.max(1);
        let mut monitor = DriftMonitor::new(self.settings.drift_stride);
        let mut batches = 0usize;
        let mut steps_since_sample = 0u64;
        let mut sampled_at = Instant::now();

        loop {
            let events_wanted = self.events_wanted.load(Ordering::Relaxed);
            let mut new_points = Vec::new();
            let mut trajectory = None;
            let drift;

            {
                let mut pendulum = self.pendulum.write();

                if events_wanted && batches % self.settings.trajectory_stride.max(1) == 0 {
                    trajectory = Some(TrajectorySample {
                        q1: pendulum.q1(),
                        q2: pendulum.q2(),
                        l1: pendulum.l1(),
                        l2: pendulum.l2(),
                    });
                }

                let before = pendulum.points().len();
                pendulum.advance(batch);
                if events_wanted {
                    new_points.extend_from_slice(&pendulum.points()[before..]);
                }

                drift = monitor.sample(&mut pendulum, batch);
            }

            batches += 1;
            steps_since_sample += batch as u64;

            if let Some(percent) = drift {
                let elapsed = sampled_at.elapsed().as_secs_f64();
                let rate = if elapsed > 0.0 {
                    (steps_since_sample as f64 / elapsed) as u64
                } else {
                    0
                };
                self.steps_per_second.store(rate, Ordering::Relaxed);
                steps_since_sample = 0;
                sampled_at = Instant::now();

                if events_wanted {
                    let _ = self.events.send(SimulationEvent::Drift {
                        percent,
                        steps_per_second: rate,
                    });
                }
            }

            if let Some(sample) = trajectory {
                let _ = self.events.send(SimulationEvent::Trajectory(sample));
            }
            for point in new_points {
                let _ = self.events.send(SimulationEvent::Poincare(point));
            }

            if self.cancel.load(Ordering::Relaxed) {
                break;
            }
        }

        self.running.store(false, Ordering::Relaxed);
        log::info!("simulation worker exited");
    }
}

/// Explicit registry of simulations. Each entry owns its pendulum and its
/// worker; independent entries run fully in parallel with no shared state.
#[derive(Default)]
pub struct SimulationManager {
    simulators: Vec<Simulator>,
}

impl SimulationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pendulum and returns its id (the index, stable for the
    /// lifetime of the manager).
    pub fn add(&mut self, pendulum: Pendulum, settings: SimulatorSettings) -> usize {
        self.simulators.push(Simulator::new(pendulum, settings));
        self.simulators.len() - 1
    }

    pub fn get(&self, id: usize) -> Option<&Simulator> {
        self.simulators.get(id)
    }

    pub fn get_mut(&mut self, id: usize) -> Option<&mut Simulator> {
        self.simulators.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.simulators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.simulators.is_empty()
    }

    /// Starts every registered simulation; returns how many actually
    /// launched (already-running ones are skipped).
    pub fn start_all(&mut self) -> usize {
        let mut launched = 0;
        for simulator in &mut self.simulators {
            if simulator.start() {
                launched += 1;
            }
        }
        launched
    }

    pub fn stop_all(&self) {
        for simulator in &self.simulators {
            simulator.stop();
        }
    }

    pub fn join_all(&mut self) {
        for simulator in &mut self.simulators {
            simulator.join();
        }
    }
}
