/// State-change notifications
///
/// The moderation engine only emits; delivery (push, email, webhooks) is an
/// external consumer's responsibility and happens off a broadcast
/// subscription.
use crate::moderation::entity::{EntityKind, EntityState};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Payload emitted once per successful moderation transition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChangedEvent {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub previous_state: EntityState,
    pub new_state: EntityState,
    pub actor_id: String,
}

/// Broadcast fan-out for state-change events
#[derive(Clone)]
pub struct ChangeNotifier {
    tx: broadcast::Sender<StateChangedEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event; having no subscribers is not an error
    pub fn emit(&self, event: StateChangedEvent) {
        debug!(
            entity_id = %event.entity_id,
            previous = event.previous_state.as_str(),
            new = event.new_state.as_str(),
            "State changed"
        );
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChangedEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}
