//! Engine event bus
//!
//! One closed event enum over a multi-consumer channel instead of ad hoc
//! subscribe/unsubscribe on every object. The control thread is the only
//! publisher of structural events; audio-thread diagnostics are forwarded
//! by the controller when it polls.

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

/// Diagnostic raised by the audio thread (one-shot, copyable)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diagnostic {
    /// Host delivered a block larger than the supported maximum;
    /// the block was zero-filled
    BadBlockSize,
    /// Command ring overflowed; a control command was dropped
    CommandOverflow,
    /// Reclaim ring overflowed; a removed track was freed on the
    /// audio thread
    ReclaimOverflow,
}

/// Engine events, a closed set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    TrackAdded(usize),
    TrackRemoved(usize),
    TrackStarted(usize),
    TrackStopped(usize),
    FilterAdded { track: usize, filter: usize },
    FilterRemoved { track: usize, filter: usize },
    FilterMoved { track: usize, from: usize, to: usize },
    Diagnostic(Diagnostic),
}

/// Multi-consumer event bus
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: Sender<EngineEvent>,
    rx: Receiver<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    pub fn publish(&self, event: EngineEvent) {
        // Receiver half lives as long as the bus; send cannot fail
        let _ = self.tx.send(event);
    }

    /// A receiver handle; clones share the same queue
    pub fn subscribe(&self) -> Receiver<EngineEvent> {
        self.rx.clone()
    }

    /// Drain everything currently queued
    pub fn drain(&self) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        events
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_and_drain() {
        let bus = EventBus::new();
        bus.publish(EngineEvent::TrackAdded(0));
        bus.publish(EngineEvent::FilterAdded { track: 0, filter: 1 });

        let events = bus.drain();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], EngineEvent::TrackAdded(0));
    }

    #[test]
    fn test_drain_empties_queue() {
        let bus = EventBus::new();
        bus.publish(EngineEvent::TrackStopped(2));
        assert_eq!(bus.drain().len(), 1);
        assert!(bus.drain().is_empty());
    }
}
