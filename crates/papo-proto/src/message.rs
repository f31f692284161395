//! Message types for the line-delimited JSON wire protocol.
//!
//! Every message is a single JSON object on its own line, tagged by a `type`
//! field. One enum covers both directions of the conversation: fields that are
//! absent on the wire deserialize to `None`, and `None` fields are skipped
//! when serializing, so each variant's wire shape carries only the fields that
//! are meaningful for it.

use serde::{Deserialize, Serialize};

/// A single protocol message, discriminated by the `type` field.
///
/// Unrecognized `type` tags decode to [`Message::Unknown`] instead of failing,
/// so a server can answer them with a structured error rather than dropping
/// the line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Client → server: claim a display name. Must be the first message.
    Join {
        /// Requested display name.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    /// Server → client: join accepted.
    Welcome {
        /// The effective (normalized) name the server registered.
        you: String,
    },
    /// Broadcast text. Inbound carries `msg`; the relayed copy adds `from`.
    Chat {
        /// Sender name, filled in by the server on relay.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Message text.
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    /// Private text. Inbound carries `to` + `msg`; the delivered copy carries
    /// `from` + `msg`; the sender's echo carries `to` + `msg`.
    Pm {
        /// Sender name, filled in by the server on delivery.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Destination name.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Message text.
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    /// Who is online. Inbound carries no fields; the reply carries `users`.
    Who {
        /// Sorted list of registered names, present only in the reply.
        #[serde(skip_serializing_if = "Option::is_none")]
        users: Option<Vec<String>>,
    },
    /// Client → server: create a named group (does not join it).
    CreateGroup {
        /// Group name to create.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    /// Client → server: join an existing group.
    JoinGroup {
        /// Group name to join.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    /// Group text. Relayed to every current member except the sender.
    GroupMsg {
        /// Target group name.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
        /// Sender name, filled in by the server on relay.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Message text.
        #[serde(skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    /// File transfer announcement. `to` / `group` select unicast or
    /// group-cast routing; neither means broadcast. Relayed copies add `from`
    /// and keep the routing field.
    FileInfo {
        /// File name.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// File size in bytes.
        #[serde(skip_serializing_if = "Option::is_none")]
        size: Option<u64>,
        /// Sender name, filled in by the server on relay.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Destination name for a private transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Destination group for a group transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    /// One chunk of file content, stamped with the file `name` so receivers
    /// can key concurrent transfers by (from, name).
    FileData {
        /// File name of the transfer this chunk belongs to.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Base64-encoded chunk of raw bytes.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<String>,
        /// Sender name, filled in by the server on relay.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Destination name for a private transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Destination group for a group transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    /// End of a file transfer.
    FileEnd {
        /// File name of the completed transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Sender name, filled in by the server on relay.
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        /// Destination name for a private transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<String>,
        /// Destination group for a group transfer.
        #[serde(skip_serializing_if = "Option::is_none")]
        group: Option<String>,
    },
    /// Server → client: human-readable notice (joins, departures, transfers).
    System {
        /// Notice text.
        msg: String,
    },
    /// Server → client: a stable error code.
    Error {
        /// Stable machine-readable code, e.g. `user_not_found`.
        #[serde(rename = "error")]
        code: String,
    },
    /// Client → server: orderly goodbye; the connection closes.
    Leave,
    /// Any inbound message whose `type` tag is not in the catalogue.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Builds a server notice.
    pub fn system(msg: impl Into<String>) -> Self {
        Message::System { msg: msg.into() }
    }

    /// Builds an error reply carrying a stable code.
    pub fn error(code: impl Into<String>) -> Self {
        Message::Error { code: code.into() }
    }

    /// Builds the join acknowledgment.
    pub fn welcome(you: impl Into<String>) -> Self {
        Message::Welcome { you: you.into() }
    }

    /// Short name of the message kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Join { .. } => "join",
            Message::Welcome { .. } => "welcome",
            Message::Chat { .. } => "chat",
            Message::Pm { .. } => "pm",
            Message::Who { .. } => "who",
            Message::CreateGroup { .. } => "create_group",
            Message::JoinGroup { .. } => "join_group",
            Message::GroupMsg { .. } => "group_msg",
            Message::FileInfo { .. } => "file_info",
            Message::FileData { .. } => "file_data",
            Message::FileEnd { .. } => "file_end",
            Message::System { .. } => "system",
            Message::Error { .. } => "error",
            Message::Leave => "leave",
            Message::Unknown => "unknown",
        }
    }
}
