//! The Hub - central shared state for the relay server.
//!
//! The Hub holds the live-connection set, the session registry, and the
//! group directory in concurrent collections accessible from any task.

use dashmap::DashMap;
use papo_proto::Message;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::state::{ConnId, ConnIdGenerator, GroupDirectory, Registry};

/// Capacity of each connection's outbound queue.
///
/// Delivery never waits: a queue that is full or closed marks the peer dead.
/// The capacity has to absorb a whole file-transfer burst for a receiver
/// that is merely busy writing, so it is sized well above any single
/// fan-out.
pub const OUTBOUND_QUEUE: usize = 256;

/// Central shared state container.
///
/// One `Hub` is shared via `Arc` by every connection task. All collections
/// support concurrent mutation; fan-out snapshots its audience first so no
/// map shard stays locked while messages are queued or peers are reaped.
pub struct Hub {
    /// Live connections' outbound queues, present from accept to cleanup.
    senders: DashMap<ConnId, mpsc::Sender<Message>>,
    /// Who is online.
    pub registry: Registry,
    /// Named groups.
    pub groups: GroupDirectory,
    /// ID generator for accepted connections.
    id_gen: ConnIdGenerator,
}

impl Hub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self {
            senders: DashMap::new(),
            registry: Registry::new(),
            groups: GroupDirectory::new(),
            id_gen: ConnIdGenerator::new(),
        }
    }

    /// Assign an ID to a freshly accepted connection.
    pub fn next_id(&self) -> ConnId {
        self.id_gen.next()
    }

    /// Register a connection's outbound queue. From this moment the
    /// connection is part of the broadcast audience, named or not.
    pub fn register_sender(&self, conn: ConnId, sender: mpsc::Sender<Message>) {
        self.senders.insert(conn, sender);
    }

    /// Whether the connection is still in the live set.
    pub fn is_live(&self, conn: ConnId) -> bool {
        self.senders.contains_key(&conn)
    }

    fn sender_of(&self, conn: ConnId) -> Option<mpsc::Sender<Message>> {
        self.senders.get(&conn).map(|entry| entry.value().clone())
    }

    /// Attempt delivery to one connection. Returns `false` when the
    /// connection is gone, its queue is closed, or its queue is full.
    ///
    /// Delivery never waits for a slow peer: a full queue counts as a dead
    /// one, so a client that stopped reading cannot stall its senders.
    pub fn send_to(&self, conn: ConnId, msg: Message) -> bool {
        let Some(sender) = self.sender_of(conn) else {
            return false;
        };
        sender.try_send(msg).is_ok()
    }

    /// Deliver to every live connection except `exclude`, returning the
    /// connections that could not accept the message.
    ///
    /// One dead destination never aborts delivery to the rest; the caller
    /// feeds the returned list to [`Hub::disconnect`].
    pub fn broadcast(&self, msg: &Message, exclude: Option<ConnId>) -> Vec<ConnId> {
        let audience: Vec<(ConnId, mpsc::Sender<Message>)> = self
            .senders
            .iter()
            .filter(|entry| Some(*entry.key()) != exclude)
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        Self::deliver(audience, msg)
    }

    /// Deliver to a fixed set of connections, returning those that could not
    /// accept the message. Connections already fully cleaned up are skipped
    /// silently.
    pub fn deliver_to(&self, targets: &[ConnId], msg: &Message) -> Vec<ConnId> {
        let audience: Vec<(ConnId, mpsc::Sender<Message>)> = targets
            .iter()
            .filter_map(|conn| self.sender_of(*conn).map(|sender| (*conn, sender)))
            .collect();
        Self::deliver(audience, msg)
    }

    fn deliver(audience: Vec<(ConnId, mpsc::Sender<Message>)>, msg: &Message) -> Vec<ConnId> {
        let mut failed = Vec::new();
        for (conn, sender) in audience {
            if sender.try_send(msg.clone()).is_err() {
                failed.push(conn);
            }
        }
        failed
    }

    /// Disconnect cleanup: remove the connection from the live set, the
    /// registry, and every group, then broadcast a departure notice if the
    /// connection had a name. Safe to call any number of times.
    ///
    /// The notice itself can hit dead queues; those connections are cleaned
    /// up in turn. The worklist settles because every round permanently
    /// removes at least one connection from the live set.
    pub fn disconnect(&self, conn: ConnId) {
        let mut pending = vec![conn];
        while let Some(conn) = pending.pop() {
            if self.senders.remove(&conn).is_none() {
                continue; // already cleaned up
            }
            self.groups.remove_member_everywhere(conn);
            let Some(name) = self.registry.unregister(conn) else {
                debug!(%conn, "closed before join");
                continue;
            };
            info!(%conn, name = %name, "disconnected");
            let notice = Message::system(format!("{name} left"));
            let failed = self.broadcast(&notice, None);
            pending.extend(failed);
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
