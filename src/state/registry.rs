//! The session registry: who is online.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::RegisterError;
use crate::state::ConnId;

/// Display names longer than this are silently truncated.
pub const MAX_NAME_CHARS: usize = 32;

/// Name ↔ connection bijection, the single source of truth for "who is
/// online."
///
/// At most one entry per name and one name per connection. Normalization
/// (trim + cap) happens here, so every caller sees the effective name.
pub struct Registry {
    /// Effective name → connection.
    names: DashMap<String, ConnId>,
    /// Connection → effective name.
    by_conn: DashMap<ConnId, String>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            names: DashMap::new(),
            by_conn: DashMap::new(),
        }
    }

    /// Trim, cap to [`MAX_NAME_CHARS`], and reject empty names or names
    /// containing a line terminator.
    fn normalize(raw: &str) -> Result<String, RegisterError> {
        let name: String = raw.trim().chars().take(MAX_NAME_CHARS).collect();
        if name.is_empty() || name.contains(&['\n', '\r'][..]) {
            return Err(RegisterError::Invalid);
        }
        Ok(name)
    }

    /// Claim a name for a connection, returning the effective name.
    ///
    /// Normalization runs before the uniqueness check, so two raw names that
    /// collapse to the same effective name conflict.
    pub fn register(&self, raw: &str, conn: ConnId) -> Result<String, RegisterError> {
        let name = Self::normalize(raw)?;
        match self.names.entry(name.clone()) {
            Entry::Occupied(_) => Err(RegisterError::Taken(name)),
            Entry::Vacant(entry) => {
                entry.insert(conn);
                self.by_conn.insert(conn, name.clone());
                Ok(name)
            }
        }
    }

    /// Resolve a name to its connection.
    pub fn lookup(&self, name: &str) -> Option<ConnId> {
        self.names.get(name).map(|entry| *entry.value())
    }

    /// Remove whatever name this connection registered, if any.
    ///
    /// Idempotent. Returns the removed name, so the caller can gate the
    /// departure notice exactly once even under concurrent cleanup.
    pub fn unregister(&self, conn: ConnId) -> Option<String> {
        let (_, name) = self.by_conn.remove(&conn)?;
        self.names.remove(&name);
        Some(name)
    }

    /// All registered names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether nobody has joined.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
