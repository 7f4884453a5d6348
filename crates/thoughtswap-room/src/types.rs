use std::collections::HashMap;

use thoughtswap_core::{ConnId, PromptKind, UserId, UserRole};
use thoughtswap_protocol::OutboundEvent;

/// A connected client, scoped to one Room (§3 Participant). Not persisted.
#[derive(Debug, Clone)]
pub struct Participant {
    pub conn_id: ConnId,
    pub user_id: UserId,
    pub name: String,
    pub role: UserRole,
}

/// The current PromptUse, cached on the Room so handlers don't round-trip
/// the store on every command (§3 Room: "the current PromptUse (if any)").
#[derive(Debug, Clone)]
pub struct CurrentPrompt {
    pub id: String,
    pub content: String,
    pub kind: PromptKind,
    pub options: Vec<String>,
}

/// One recipient's assignment in the current Distribution (§3, §4.6 output).
#[derive(Debug, Clone)]
pub struct DistEntry {
    pub content: String,
    pub author_user_id: UserId,
    pub original_author_name: String,
}

/// The mapping from student to received Thought for the current Swap.
///
/// Keyed by connection id for fan-out, as the source does — but also by
/// `userId` so a reconnect's new connection id can still recover the
/// student's prior assignment (§4.5 rejoin, §9 "Distribution keyed by
/// connection identifier (open question)"). Both maps are written together
/// by every mutation on this type; never update one without the other.
#[derive(Debug, Clone, Default)]
pub struct Distribution {
    by_conn: HashMap<ConnId, DistEntry>,
    by_user: HashMap<UserId, DistEntry>,
}

impl Distribution {
    pub fn clear(&mut self) {
        self.by_conn.clear();
        self.by_user.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.by_conn.is_empty()
    }

    pub fn set(&mut self, conn_id: ConnId, user_id: UserId, entry: DistEntry) {
        self.by_conn.insert(conn_id, entry.clone());
        self.by_user.insert(user_id, entry);
    }

    pub fn get_by_conn(&self, conn_id: &ConnId) -> Option<&DistEntry> {
        self.by_conn.get(conn_id)
    }

    /// Best-effort restoration path: a reconnect arrives with a fresh
    /// `ConnId` that has no entry yet, but the same `userId` may still hold
    /// one from before the reconnect (§4.5, §9).
    pub fn get_by_user(&self, user_id: &UserId) -> Option<&DistEntry> {
        self.by_user.get(user_id)
    }

    /// Re-key an entry found only via `get_by_user` (i.e. under a stale,
    /// already-disconnected `ConnId`) onto the student's new connection, so
    /// subsequent fan-out (`distribution_update`'s `by_conn` iteration) and a
    /// second reconnect both find it under the live connection id. The
    /// orphaned `by_conn` entry for the old connection is left in place —
    /// harmless, since its participant is already gone from the roster and
    /// `distribution_update` skips any entry with no matching participant.
    pub fn rebind_conn(&mut self, new_conn_id: ConnId, user_id: UserId) {
        if let Some(entry) = self.by_user.get(&user_id).cloned() {
            self.by_conn.insert(new_conn_id, entry);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConnId, &DistEntry)> {
        self.by_conn.iter()
    }
}

/// Who an outbound event is addressed to. The Room resolves this to
/// concrete connection ids before returning `Effect`s — it owns the
/// participant roster, so the gateway never needs room-membership logic of
/// its own beyond "deliver to this connection id" (§9: rooms hold only
/// identifiers, never transport objects).
#[derive(Debug, Clone)]
pub enum Target {
    Connection(ConnId),
    AllMembers,
    Teachers,
}

/// One outbound frame plus its addressing, as returned by every Room
/// command handler. The gateway's connection registry does the actual
/// best-effort, non-blocking send (§4.1, §5).
#[derive(Debug, Clone)]
pub struct Effect {
    pub target: Target,
    pub event: OutboundEvent,
}

impl Effect {
    pub fn to(conn_id: ConnId, event: OutboundEvent) -> Self {
        Self {
            target: Target::Connection(conn_id),
            event,
        }
    }

    pub fn all(event: OutboundEvent) -> Self {
        Self {
            target: Target::AllMembers,
            event,
        }
    }

    pub fn teachers(event: OutboundEvent) -> Self {
        Self {
            target: Target::Teachers,
            event,
        }
    }
}

/// Outcome of a command that may also require the caller (registry) to tear
/// the Room down, e.g. `END_SESSION` (§4.5).
#[derive(Debug, Default)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    pub destroy_room: bool,
}

impl Outcome {
    pub fn new(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            destroy_room: false,
        }
    }

    pub fn destroying(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            destroy_room: true,
        }
    }
}
