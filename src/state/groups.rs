//! The group directory: named groups and their member sets.

use std::collections::HashSet;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::error::GroupError;
use crate::state::ConnId;

/// Group name → member set.
///
/// Groups have a lifecycle independent of the session registry: creating one
/// does not add the creator, and a group that empties out stays addressable
/// and joinable. Members are removed only by disconnect cleanup.
pub struct GroupDirectory {
    groups: DashMap<String, HashSet<ConnId>>,
}

impl GroupDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    /// Create a group, returning the effective (trimmed) name. The creator is
    /// not made a member.
    pub fn create(&self, raw: &str) -> Result<String, GroupError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(GroupError::Invalid);
        }
        match self.groups.entry(name.to_string()) {
            Entry::Occupied(_) => Err(GroupError::Exists(name.to_string())),
            Entry::Vacant(entry) => {
                entry.insert(HashSet::new());
                Ok(name.to_string())
            }
        }
    }

    /// Add a connection to an existing group. Joining twice is a no-op.
    pub fn join(&self, raw: &str, conn: ConnId) -> Result<String, GroupError> {
        let name = raw.trim();
        match self.groups.get_mut(name) {
            Some(mut members) => {
                members.insert(conn);
                Ok(name.to_string())
            }
            None => Err(GroupError::NotFound(name.to_string())),
        }
    }

    /// Snapshot of a group's current members, so fan-out never iterates a
    /// locked set.
    pub fn members(&self, raw: &str) -> Result<Vec<ConnId>, GroupError> {
        let name = raw.trim();
        match self.groups.get(name) {
            Some(members) => Ok(members.iter().copied().collect()),
            None => Err(GroupError::NotFound(name.to_string())),
        }
    }

    /// Discard this connection from every group. Used on disconnect; the
    /// groups themselves persist.
    pub fn remove_member_everywhere(&self, conn: ConnId) {
        for mut entry in self.groups.iter_mut() {
            entry.value_mut().remove(&conn);
        }
    }
}

impl Default for GroupDirectory {
    fn default() -> Self {
        Self::new()
    }
}
