//! Role list and the role assignment engine.
//!
//! Assignment is always derived from the participant order and the role
//! order, never from the iteration order of a hash-based structure, so the
//! same roster always yields the same assignment.

use crate::domain::Participant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Roles every new session starts with
pub const DEFAULT_ROLES: [&str; 2] = ["Driver", "Navigator"];

/// Maximum role name length, in characters
pub const MAX_ROLE_NAME_LENGTH: usize = 50;

/// Errors that can occur when building or replacing a role list
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RoleError {
    #[error("Role list cannot be empty")]
    Empty,

    #[error("Role name cannot be empty")]
    EmptyName,

    #[error("Role name must be between 1 and 50 characters")]
    InvalidNameLength,

    #[error("Duplicate role name: {0}")]
    Duplicate(String),

    #[error("Primary role {0} cannot be removed")]
    PrimaryRoleRemoved(String),
}

/// Ordered list of unique role names
///
/// Index 0 is the primary role and cannot be removed through [`RoleList::replace`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct RoleList(Vec<String>);

impl RoleList {
    /// Build a validated role list (names are trimmed)
    pub fn new<I, S>(names: I) -> Result<Self, RoleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut roles = Vec::new();
        let mut seen = HashSet::new();

        for name in names {
            let name = name.as_ref().trim();
            if name.is_empty() {
                return Err(RoleError::EmptyName);
            }
            if name.chars().count() > MAX_ROLE_NAME_LENGTH {
                return Err(RoleError::InvalidNameLength);
            }
            if !seen.insert(name.to_string()) {
                return Err(RoleError::Duplicate(name.to_string()));
            }
            roles.push(name.to_string());
        }

        if roles.is_empty() {
            return Err(RoleError::Empty);
        }

        Ok(RoleList(roles))
    }

    /// Validate a replacement list against this one
    ///
    /// The replacement must keep the current primary role at index 0.
    pub fn replace<I, S>(&self, names: I) -> Result<RoleList, RoleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let replacement = RoleList::new(names)?;
        if replacement.primary() != self.primary() {
            return Err(RoleError::PrimaryRoleRemoved(self.primary().to_string()));
        }
        Ok(replacement)
    }

    pub fn primary(&self) -> &str {
        &self.0[0]
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|role| role == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Default for RoleList {
    fn default() -> Self {
        RoleList(DEFAULT_ROLES.iter().map(|role| role.to_string()).collect())
    }
}

impl TryFrom<Vec<String>> for RoleList {
    type Error = RoleError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        RoleList::new(names)
    }
}

impl From<RoleList> for Vec<String> {
    fn from(roles: RoleList) -> Self {
        roles.0
    }
}

/// Give every role-less participant the first role nobody holds yet
///
/// Participants are visited in roster order. Those left over once the roles
/// are exhausted stay role-less.
pub fn assign_initial(participants: &mut [Participant], roles: &RoleList) {
    let mut held: HashSet<String> = participants
        .iter()
        .filter_map(|p| p.role().map(str::to_string))
        .collect();

    for participant in participants.iter_mut().filter(|p| !p.has_role()) {
        match roles.iter().find(|role| !held.contains(*role)) {
            Some(role) => {
                held.insert(role.to_string());
                participant.assign_role(Some(role.to_string()));
            }
            None => break,
        }
    }
}

/// Assign `roles[i]` to `participants[i]` and clear every role beyond the list
///
/// A full re-derivation: applying it twice yields the same assignment.
pub fn reassign_by_position(participants: &mut [Participant], roles: &RoleList) {
    for (index, participant) in participants.iter_mut().enumerate() {
        participant.assign_role(roles.get(index).map(str::to_string));
    }
}

/// Shift roles forward by one among the current role holders
///
/// Each holder takes the role of the next holder in roster order and the last
/// holder wraps around to the first holder's role. Participants without a
/// role are untouched. With fewer than two holders this does nothing.
pub fn rotate(participants: &mut [Participant]) {
    let holders: Vec<usize> = participants
        .iter()
        .enumerate()
        .filter(|(_, p)| p.has_role())
        .map(|(index, _)| index)
        .collect();

    if holders.len() < 2 {
        return;
    }

    let current: Vec<Option<String>> = holders
        .iter()
        .map(|&index| participants[index].role().map(str::to_string))
        .collect();

    for (position, &index) in holders.iter().enumerate() {
        let next = current[(position + 1) % current.len()].clone();
        participants[index].assign_role(next);
    }
}
