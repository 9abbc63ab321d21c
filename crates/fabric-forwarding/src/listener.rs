//! Ordered chain of message listeners fed by the inbound event stream.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace};

use crate::events::FabricEvent;

/// Whether the dispatcher hands an event on to the next listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Continue,
    Stop,
}

/// Receives events from the dispatch path.
///
/// `receive` runs on the dispatch task and must not block: anything that
/// waits on a switch goes to a spawned task.
pub trait MessageListener: Send + Sync {
    /// Returns the name of this listener (for logging).
    fn name(&self) -> &'static str;

    fn receive(&self, event: &FabricEvent) -> Command;
}

/// Hands every event to the registered listeners in registration order.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: Vec<Arc<dyn MessageListener>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Arc<dyn MessageListener>) {
        debug!(listener = listener.name(), "listener registered");
        self.listeners.push(listener);
    }

    pub fn listener_names(&self) -> Vec<&'static str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    /// Walks the chain until a listener returns [`Command::Stop`].
    ///
    /// Returns the number of listeners that saw the event.
    pub fn dispatch(&self, event: &FabricEvent) -> usize {
        let mut seen = 0;
        for listener in &self.listeners {
            seen += 1;
            if listener.receive(event) == Command::Stop {
                trace!(
                    listener = listener.name(),
                    event = event.type_name(),
                    "listener stopped the chain"
                );
                break;
            }
        }
        seen
    }

    /// Dispatches events until the channel closes or `shutdown` turns true.
    ///
    /// Returns the number of events dispatched.
    pub async fn run(
        &self,
        mut events: mpsc::Receiver<FabricEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        info!(listeners = ?self.listener_names(), "event dispatch started");
        let mut dispatched = 0u64;
        loop {
            if *shutdown.borrow() {
                info!("shutdown requested");
                break;
            }
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(&event);
                        dispatched += 1;
                    }
                    None => {
                        info!("event channel closed");
                        break;
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // Sender gone; keep draining until the channel closes.
                        drain(&mut events, self, &mut dispatched).await;
                        break;
                    }
                }
            }
        }
        info!(dispatched, "event dispatch stopped");
        dispatched
    }
}

async fn drain(
    events: &mut mpsc::Receiver<FabricEvent>,
    dispatcher: &EventDispatcher,
    dispatched: &mut u64,
) {
    while let Some(event) = events.recv().await {
        dispatcher.dispatch(&event);
        *dispatched += 1;
    }
}
