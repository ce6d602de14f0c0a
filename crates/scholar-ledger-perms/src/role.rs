//! Roles an identity can hold.
//!
//! Roles are not exclusive: the owner may also be an institution, and any
//! identity may additionally act as a student or visitor. Only the explicit
//! roles (owner, institution) are tracked by the directory; student and
//! visitor are implied by the records and grants that name an identity.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Directory administrator. Exactly one, set at initialization.
    Owner,
    /// May register records.
    Institution,
    /// Subject of at least one record.
    Student,
    /// Holder of at least one access grant.
    Visitor,
}

impl Role {
    const ALL: [Role; 4] = [Role::Owner, Role::Institution, Role::Student, Role::Visitor];

    const fn bit(self) -> u8 {
        match self {
            Role::Owner => 1 << 0,
            Role::Institution => 1 << 1,
            Role::Student => 1 << 2,
            Role::Visitor => 1 << 3,
        }
    }

    /// Lowercase name, as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Institution => "institution",
            Role::Student => "student",
            Role::Visitor => "visitor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of roles held by one identity.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Add a role. Existing roles are kept.
    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    /// Remove a role. Other roles are kept.
    pub fn remove(&mut self, role: Role) {
        self.0 &= !role.bit();
    }

    /// Builder-style insert.
    pub fn with(mut self, role: Role) -> Self {
        self.insert(role);
        self
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Roles in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = Role> + '_ {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

impl fmt::Debug for RoleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Role> for RoleSet {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut set = RoleSet::empty();
        for role in iter {
            set.insert(role);
        }
        set
    }
}
