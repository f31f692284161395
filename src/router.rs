//! Message routing.
//!
//! The [`Router`] turns one inbound message from a session into its wire
//! effects: replies handed back to the owning connection task, and
//! deliveries pushed onto other connections' outbound queues through the
//! [`Hub`]. Queue failures discovered during fan-out are reaped here so a
//! dead peer is torn down by whoever notices it first.

use std::sync::Arc;

use papo_proto::Message;
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::state::{ConnId, Hub};

/// Chat messages are truncated to this many characters before fan-out.
pub const MAX_CHAT_CHARS: usize = 2000;

/// Routes inbound messages for every connection on the server.
pub struct Router {
    hub: Arc<Hub>,
}

impl Router {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    /// Handles the first message of a session, which must be a `join`.
    ///
    /// On success the name is registered, everyone else is told about the
    /// arrival, and the caller gets the effective name plus the `welcome`
    /// reply to write back. Any other message kind is a policy violation
    /// and the connection must close.
    pub fn register_session(&self, conn: ConnId, msg: &Message) -> HandlerResult<(String, Message)> {
        let Message::Join { name } = msg else {
            return Err(HandlerError::JoinRequired);
        };
        let name = self.hub.registry.register(name.as_deref().unwrap_or(""), conn)?;

        let notice = Message::system(format!("{name} joined"));
        let failed = self.hub.broadcast(&notice, Some(conn));
        self.reap(failed);

        let welcome = Message::welcome(name.clone());
        Ok((name, welcome))
    }

    /// Dispatches one message from an active (joined) session.
    ///
    /// Returns the replies destined for the sender itself; deliveries to
    /// other sessions happen through the hub as a side effect. `Err` maps
    /// to an `error` reply via [`HandlerError::to_error_reply`], except
    /// [`HandlerError::Leave`] which asks the caller to close.
    pub fn dispatch(&self, conn: ConnId, name: &str, msg: Message) -> HandlerResult<Vec<Message>> {
        match msg {
            Message::Join { .. } => Err(HandlerError::AlreadyJoined),
            Message::Chat { msg, .. } => self.chat(conn, name, msg),
            Message::Pm { to, msg, .. } => self.pm(conn, name, to, msg),
            Message::Who { .. } => Ok(vec![Message::Who {
                users: Some(self.hub.registry.list_names()),
            }]),
            Message::CreateGroup { group } => self.create_group(group),
            Message::JoinGroup { group } => self.join_group(conn, group),
            Message::GroupMsg { group, msg, .. } => self.group_msg(conn, name, group, msg),
            msg @ (Message::FileInfo { .. } | Message::FileData { .. } | Message::FileEnd { .. }) => {
                self.relay_file(conn, name, msg)
            }
            Message::Leave => Err(HandlerError::Leave),
            _ => Err(HandlerError::UnknownType),
        }
    }

    /// Public chat: stamp the sender, truncate, fan out to everyone else.
    /// An empty message (after truncation) is dropped without a reply.
    fn chat(&self, conn: ConnId, name: &str, msg: Option<String>) -> HandlerResult<Vec<Message>> {
        let text = truncate_chars(msg.unwrap_or_default(), MAX_CHAT_CHARS);
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let outbound = Message::Chat {
            from: Some(name.to_string()),
            msg: Some(text),
        };
        let failed = self.hub.broadcast(&outbound, Some(conn));
        self.reap(failed);
        Ok(Vec::new())
    }

    /// Private message: deliver to the target and echo a copy (carrying
    /// `to` instead of `from`) back to the sender. A target that cannot
    /// accept the delivery is torn down and reported exactly like an
    /// unknown name.
    fn pm(
        &self,
        conn: ConnId,
        name: &str,
        to: Option<String>,
        msg: Option<String>,
    ) -> HandlerResult<Vec<Message>> {
        let to = to.unwrap_or_default();
        let Some(target) = self.hub.registry.lookup(&to) else {
            return Err(HandlerError::UserNotFound(to));
        };
        let text = msg.unwrap_or_default();
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let delivery = Message::Pm {
            from: Some(name.to_string()),
            to: None,
            msg: Some(text.clone()),
        };
        let echo = Message::Pm {
            from: None,
            to: Some(to.clone()),
            msg: Some(text),
        };
        if target == conn {
            // messaging yourself: both copies go straight back
            return Ok(vec![delivery, echo]);
        }
        if !self.hub.send_to(target, delivery) {
            self.hub.disconnect(target);
            return Err(HandlerError::UserNotFound(to));
        }
        Ok(vec![echo])
    }

    fn create_group(&self, group: Option<String>) -> HandlerResult<Vec<Message>> {
        let name = self.hub.groups.create(&group.unwrap_or_default())?;
        Ok(vec![Message::system(format!("group '{name}' created"))])
    }

    fn join_group(&self, conn: ConnId, group: Option<String>) -> HandlerResult<Vec<Message>> {
        let name = self.hub.groups.join(&group.unwrap_or_default(), conn)?;
        Ok(vec![Message::system(format!("joined group '{name}'"))])
    }

    /// Group chat goes to the group's current members except the sender.
    /// The sender does not have to be a member to post.
    fn group_msg(
        &self,
        conn: ConnId,
        name: &str,
        group: Option<String>,
        msg: Option<String>,
    ) -> HandlerResult<Vec<Message>> {
        let group = group.unwrap_or_default();
        let targets = self.members_except(&group, conn)?;
        let outbound = Message::GroupMsg {
            group: Some(group.trim().to_string()),
            from: Some(name.to_string()),
            msg: Some(msg.unwrap_or_default()),
        };
        let failed = self.hub.deliver_to(&targets, &outbound);
        self.reap(failed);
        Ok(Vec::new())
    }

    /// Relays a file frame (`file_info` / `file_data` / `file_end`).
    ///
    /// Destination priority is group, then `to`, then broadcast; a routing
    /// field that names a missing group or user is an error, never a
    /// fallback. The relayed copy always carries the sender's registered
    /// name as `from` and keeps only the routing field that was used.
    /// `file_info` is preceded by a human-readable notice to the same
    /// audience.
    fn relay_file(&self, conn: ConnId, name: &str, msg: Message) -> HandlerResult<Vec<Message>> {
        let (to, group) = match &msg {
            Message::FileInfo { to, group, .. }
            | Message::FileData { to, group, .. }
            | Message::FileEnd { to, group, .. } => (to.clone(), group.clone()),
            _ => return Err(HandlerError::UnknownType),
        };
        let notice = match &msg {
            Message::FileInfo { name: file, size, .. } => Some(Message::system(format!(
                "{name} is sending file '{}' ({} bytes)",
                file.as_deref().unwrap_or("?"),
                size.unwrap_or(0),
            ))),
            _ => None,
        };

        if let Some(group) = group {
            let targets = self.members_except(&group, conn)?;
            let mut failed = Vec::new();
            if let Some(notice) = &notice {
                failed.extend(self.hub.deliver_to(&targets, notice));
            }
            let outbound = with_routing(&msg, name, None, Some(group.trim().to_string()));
            failed.extend(self.hub.deliver_to(&targets, &outbound));
            self.reap(failed);
            return Ok(Vec::new());
        }

        if let Some(to) = to {
            let Some(target) = self.hub.registry.lookup(&to) else {
                return Err(HandlerError::UserNotFound(to));
            };
            let outbound = with_routing(&msg, name, Some(to.clone()), None);
            if target == conn {
                let mut replies = Vec::new();
                replies.extend(notice);
                replies.push(outbound);
                return Ok(replies);
            }
            if let Some(notice) = notice {
                if !self.hub.send_to(target, notice) {
                    self.hub.disconnect(target);
                    return Err(HandlerError::UserNotFound(to));
                }
            }
            if !self.hub.send_to(target, outbound) {
                self.hub.disconnect(target);
                return Err(HandlerError::UserNotFound(to));
            }
            return Ok(Vec::new());
        }

        let mut failed = Vec::new();
        if let Some(notice) = &notice {
            failed.extend(self.hub.broadcast(notice, Some(conn)));
        }
        let outbound = with_routing(&msg, name, None, None);
        failed.extend(self.hub.broadcast(&outbound, Some(conn)));
        self.reap(failed);
        Ok(Vec::new())
    }

    /// Current members of `group` minus the sender.
    fn members_except(&self, group: &str, conn: ConnId) -> HandlerResult<Vec<ConnId>> {
        let members = self.hub.groups.members(group)?;
        Ok(members.into_iter().filter(|member| *member != conn).collect())
    }

    /// Tears down every connection whose queue rejected a delivery.
    fn reap(&self, failed: Vec<ConnId>) {
        for conn in failed {
            debug!(%conn, "reaping unreachable connection");
            self.hub.disconnect(conn);
        }
    }
}

/// Truncates to at most `max` characters, respecting char boundaries.
fn truncate_chars(mut s: String, max: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max) {
        s.truncate(idx);
    }
    s
}

/// Clones a file frame with `from` forced to the sender's registered name
/// and the routing fields replaced by exactly what the destination should
/// see. Non-file messages pass through untouched.
fn with_routing(frame: &Message, from: &str, to: Option<String>, group: Option<String>) -> Message {
    let mut out = frame.clone();
    match &mut out {
        Message::FileInfo { from: f, to: t, group: g, .. }
        | Message::FileData { from: f, to: t, group: g, .. }
        | Message::FileEnd { from: f, to: t, group: g, .. } => {
            *f = Some(from.to_string());
            *t = to;
            *g = group;
        }
        _ => {}
    }
    out
}
