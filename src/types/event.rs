//! Host environment events

use tokio::sync::broadcast;

/// Buffered events per subscriber before slow listeners start lagging.
const EVENT_BUFFER: usize = 16;

/// A signal from the host environment that may warrant a refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    /// The window regained focus.
    FocusRegained,
    /// The tab or page became visible again.
    Visible,
}

/// Broadcast bus the host uses to announce [`HostEvent`]s.
///
/// Bindings configured with `refetch_on_focus` subscribe on activation and
/// drop their receiver on deactivation.
#[derive(Debug, Clone)]
pub struct HostEvents {
    tx: broadcast::Sender<HostEvent>,
}

impl HostEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_BUFFER);
        Self { tx }
    }

    /// Announce an event. Returns how many listeners received it.
    pub fn emit(&self, event: HostEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn focus_regained(&self) -> usize {
        self.emit(HostEvent::FocusRegained)
    }

    pub fn visible(&self) -> usize {
        self.emit(HostEvent::Visible)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for HostEvents {
    fn default() -> Self {
        Self::new()
    }
}
