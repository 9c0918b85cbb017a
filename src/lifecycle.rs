use crate::types::{DriverState, Error, ProbeFailure};

use heapless::Vec;

#[cfg(feature = "defmt")]
use defmt::debug;
#[cfg(feature = "log")]
use log::debug;
#[cfg(not(any(feature = "defmt", feature = "log")))]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

/// Listeners per signal that can be waiting on the identity probe at once
pub const MAX_LISTENERS: usize = 4;

/// Called once the identity probe succeeds
pub type ReadyListener = fn();
/// Called once the identity probe fails
pub type ErrorListener = fn(ProbeFailure);

/// Readiness state machine shared by the async and blocking drivers.
///
/// Pending listeners are drained exactly once, on the transition out of `Probing`. Listeners
/// registered after that transition are called on the spot if their signal is the one that fired.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: DriverState,
    ready_listeners: Vec<ReadyListener, MAX_LISTENERS>,
    error_listeners: Vec<ErrorListener, MAX_LISTENERS>,
}

impl Lifecycle {
    pub(crate) fn state(&self) -> DriverState {
        self.state
    }

    pub(crate) fn on_ready<E>(&mut self, listener: ReadyListener) -> Result<(), Error<E>> {
        match self.state {
            DriverState::Ready => listener(),
            DriverState::Failed(_) => {}
            DriverState::Uninitialized | DriverState::Probing => {
                self.ready_listeners.push(listener).map_err(|_| Error::ListenersFull)?
            }
        }
        Ok(())
    }

    pub(crate) fn on_error<E>(&mut self, listener: ErrorListener) -> Result<(), Error<E>> {
        match self.state {
            DriverState::Failed(failure) => listener(failure),
            DriverState::Ready => {}
            DriverState::Uninitialized | DriverState::Probing => {
                self.error_listeners.push(listener).map_err(|_| Error::ListenersFull)?
            }
        }
        Ok(())
    }

    /// Enter `Probing`. Returns false when the probe has already been started.
    pub(crate) fn begin_probe(&mut self) -> bool {
        if self.state != DriverState::Uninitialized {
            return false;
        }
        self.state = DriverState::Probing;
        true
    }

    /// Record the probe outcome and notify whoever is waiting on it
    pub(crate) fn finish_probe<E>(&mut self, outcome: &Result<(), Error<E>>) {
        match outcome {
            Ok(()) => {
                debug!("si7020: ready");
                self.state = DriverState::Ready;
                for listener in self.ready_listeners.iter() {
                    listener();
                }
            }
            Err(error) => {
                let failure = ProbeFailure::from(error);
                debug!("si7020: probe failed: {}", failure);
                self.state = DriverState::Failed(failure);
                for listener in self.error_listeners.iter() {
                    listener(failure);
                }
            }
        }
        self.ready_listeners.clear();
        self.error_listeners.clear();
    }

    /// Outcome of a probe that has already run
    pub(crate) fn probe_outcome<E>(&self) -> Result<(), Error<E>> {
        match self.state {
            DriverState::Ready => Ok(()),
            DriverState::Failed(ProbeFailure::IdentityMismatch(id)) => Err(Error::IdentityMismatch(id)),
            DriverState::Failed(ProbeFailure::Timeout) => Err(Error::Timeout),
            DriverState::Failed(ProbeFailure::Transport) => Err(Error::NotReady),
            DriverState::Uninitialized | DriverState::Probing => Err(Error::NotReady),
        }
    }

    /// Gate for every operation that touches the bus after the probe
    pub(crate) fn ensure_ready<E>(&self, require_ready: bool) -> Result<(), Error<E>> {
        if require_ready && self.state != DriverState::Ready {
            return Err(Error::NotReady);
        }
        Ok(())
    }
}
