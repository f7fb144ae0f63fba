//! Shared circuit plus a ticker thread.
//!
//! [`Simulation`] puts a [`Circuit`] behind one `parking_lot::Mutex`. The
//! ticker thread takes the lock for each [`Circuit::step`]; editors take it
//! through [`Simulation::lock`] for edits and manual propagation. Both sides
//! see the circuit's running flag, so a run-time loop found by either one
//! stops the ticker.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};

use crate::circuit::Circuit;

/// Default pause between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_micros(250);

/// A circuit shared between editors and a ticker thread.
pub struct Simulation {
    circuit: Arc<Mutex<Circuit>>,
    running: Arc<AtomicBool>,
    tick_interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Simulation {
    /// Wraps `circuit`. The ticker is not started.
    pub fn new(circuit: Circuit) -> Self {
        let running = circuit.running_flag();
        Self {
            circuit: Arc::new(Mutex::new(circuit)),
            running,
            tick_interval: DEFAULT_TICK_INTERVAL,
            handle: None,
        }
    }

    /// Exclusive access to the circuit.
    pub fn lock(&self) -> MutexGuard<'_, Circuit> {
        self.circuit.lock()
    }

    /// Another handle to the shared circuit.
    pub fn circuit(&self) -> Arc<Mutex<Circuit>> {
        Arc::clone(&self.circuit)
    }

    /// Pause between ticks.
    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Sets the pause between ticks. Takes effect on the next `start`.
    pub fn set_tick_interval(&mut self, interval: Duration) {
        self.tick_interval = interval;
    }

    /// `true` while the ticker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Starts the ticker. Clears module errors and any pending notice first.
    /// Does nothing if already running.
    pub fn start(&mut self) {
        if self.handle.is_some() && self.is_running() {
            return;
        }
        self.join();
        {
            let mut circuit = self.circuit.lock();
            circuit.clear_errors();
            circuit.take_notice();
        }
        self.running.store(true, Ordering::SeqCst);

        let circuit = Arc::clone(&self.circuit);
        let running = Arc::clone(&self.running);
        let interval = self.tick_interval;
        #[cfg(feature = "tracing")]
        tracing::info!("simulation started, tick every {interval:?}");

        self.handle = Some(thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let mut c = circuit.lock();
                if let Err(err) = c.step() {
                    #[cfg(feature = "tracing")]
                    tracing::error!("simulation stopped: {err}");
                    c.set_notice(err);
                    running.store(false, Ordering::SeqCst);
                    break;
                }
                drop(c);
                thread::sleep(interval);
            }
        }));
    }

    /// Stops the ticker and waits for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join();
        #[cfg(feature = "tracing")]
        tracing::info!("simulation stopped");
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.join();
    }
}
