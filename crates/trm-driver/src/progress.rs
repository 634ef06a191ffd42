//! Progress reporting.
//!
//! The driver pushes network snapshots, status text and outcomes into a
//! [`ProgressSink`] as it runs. Sinks are plain values: a vector that
//! collects, a channel sender, a callback, or nothing at all.

use std::sync::mpsc::Sender;

use trm_events::SimulationEvent;

/// Receiver of simulation progress.
pub trait ProgressSink {
    fn send(&mut self, event: SimulationEvent);

    fn status(&mut self, message: String) {
        self.send(SimulationEvent::status(message));
    }
}

impl ProgressSink for Vec<SimulationEvent> {
    fn send(&mut self, event: SimulationEvent) {
        self.push(event);
    }
}

/// Events sent after the receiver hung up are dropped.
impl ProgressSink for Sender<SimulationEvent> {
    fn send(&mut self, event: SimulationEvent) {
        let _ = Sender::send(self, event);
    }
}

/// Calls a closure for every event.
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(&SimulationEvent)> ProgressSink for CallbackSink<F> {
    fn send(&mut self, event: SimulationEvent) {
        (self.0)(&event);
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn send(&mut self, _event: SimulationEvent) {}
}
