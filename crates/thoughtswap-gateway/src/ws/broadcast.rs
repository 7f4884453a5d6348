use dashmap::DashMap;
use thoughtswap_core::{ConnId, UserRole};
use thoughtswap_protocol::OutboundEvent;
use thoughtswap_room::{Outcome, Participant, Target};
use tokio::sync::mpsc;

/// Per-connection outboxes, keyed by `ConnId`. A Room only ever resolves a
/// command into `Effect`s addressed by `Target` (§9: "rooms hold only
/// identifiers"); this registry is the one place that turns those targets
/// into an actual non-blocking send to a live socket.
#[derive(Default)]
pub struct ConnectionRegistry {
    outboxes: DashMap<ConnId, mpsc::UnboundedSender<OutboundEvent>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, conn_id: ConnId) -> mpsc::UnboundedReceiver<OutboundEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes.insert(conn_id, tx);
        rx
    }

    pub fn unregister(&self, conn_id: &ConnId) {
        self.outboxes.remove(conn_id);
    }

    /// Best-effort, non-blocking: an unbounded channel never backs up the
    /// sender, and a closed receiver (client already gone) is simply dropped
    /// (§5: a slow or vanished recipient must never stall fan-out).
    fn send_to(&self, conn_id: &ConnId, event: OutboundEvent) {
        if let Some(tx) = self.outboxes.get(conn_id) {
            let _ = tx.send(event);
        }
    }

    /// Resolve and deliver every effect in an `Outcome`, given the Room's
    /// participant snapshot at the time the command ran.
    pub fn deliver(&self, participants: &[Participant], outcome: &Outcome) {
        for effect in &outcome.effects {
            match &effect.target {
                Target::Connection(conn_id) => self.send_to(conn_id, effect.event.clone()),
                Target::AllMembers => {
                    for p in participants {
                        self.send_to(&p.conn_id, effect.event.clone());
                    }
                }
                Target::Teachers => {
                    for p in participants.iter().filter(|p| p.role == UserRole::Teacher) {
                        self.send_to(&p.conn_id, effect.event.clone());
                    }
                }
            }
        }
    }
}
