//! Access guard for table operations
//!
//! Pure decision component: given a caller identity (user id, group
//! memberships, admin flag), the caller's active group context, and a
//! backing file's ownership record, answer read/write/ownership questions.
//! The guard never mutates state. Every mutating operation and `open_table`
//! consults it before anything else runs; read calls on an already-open
//! handle are not re-checked.
//!
//! # Invariants Enforced
//!
//! - A denied call leaves stored state completely unchanged (the guard runs
//!   before any mutation).
//! - Group visibility honors the caller's explicit context override, not
//!   only the session's default group.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TableError, TableResult};

/// Owner/group/world permission bits on a backing file, in the six-character
/// `rwrwrw` form (`-` for an absent bit), e.g. `"rwr---"` for a group-readable
/// private-write file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub owner_read: bool,
    pub owner_write: bool,
    pub group_read: bool,
    pub group_write: bool,
    pub world_read: bool,
    pub world_write: bool,
}

impl Permissions {
    /// Owner read/write only (`rw----`)
    pub fn private() -> Self {
        Self {
            owner_read: true,
            owner_write: true,
            group_read: false,
            group_write: false,
            world_read: false,
            world_write: false,
        }
    }

    /// Owner read/write, group read (`rwr---`)
    pub fn group_readable() -> Self {
        Self {
            group_read: true,
            ..Self::private()
        }
    }

    /// Owner and group read/write (`rwrw--`)
    pub fn group_writable() -> Self {
        Self {
            group_read: true,
            group_write: true,
            ..Self::private()
        }
    }
}

impl FromStr for Permissions {
    type Err = TableError;

    fn from_str(s: &str) -> TableResult<Self> {
        let chars: Vec<char> = s.chars().collect();
        if chars.len() != 6 {
            return Err(TableError::usage(format!(
                "permission string '{}' must be 6 characters",
                s
            )));
        }
        let bit = |i: usize, on: char| -> TableResult<bool> {
            match chars[i] {
                c if c == on => Ok(true),
                '-' => Ok(false),
                c => Err(TableError::usage(format!(
                    "unexpected permission character '{}' in '{}'",
                    c, s
                ))),
            }
        };
        Ok(Self {
            owner_read: bit(0, 'r')?,
            owner_write: bit(1, 'w')?,
            group_read: bit(2, 'r')?,
            group_write: bit(3, 'w')?,
            world_read: bit(4, 'r')?,
            world_write: bit(5, 'w')?,
        })
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = |on: bool, ch: char| if on { ch } else { '-' };
        write!(
            f,
            "{}{}{}{}{}{}",
            c(self.owner_read, 'r'),
            c(self.owner_write, 'w'),
            c(self.group_read, 'r'),
            c(self.group_write, 'w'),
            c(self.world_read, 'r'),
            c(self.world_write, 'w'),
        )
    }
}

/// Which groups a caller is currently acting under when opening a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupContext {
    /// The session's default group
    #[default]
    Session,
    /// An explicit single-group override
    Group(i64),
    /// All groups the caller belongs to
    AllGroups,
}

/// Caller identity as resolved by the (out-of-scope) session layer
#[derive(Debug, Clone)]
pub struct Identity {
    /// User id
    pub user_id: i64,
    /// The session's default group
    pub group_id: i64,
    /// Every group the user belongs to
    pub groups: Vec<i64>,
    /// Admins bypass permission checks
    pub is_admin: bool,
    /// Active group context for visibility decisions
    pub context: GroupContext,
}

impl Identity {
    /// A regular member of a single group, acting under it
    pub fn member(user_id: i64, group_id: i64) -> Self {
        Self {
            user_id,
            group_id,
            groups: vec![group_id],
            is_admin: false,
            context: GroupContext::Session,
        }
    }

    /// An administrator
    pub fn admin(user_id: i64, group_id: i64) -> Self {
        Self {
            is_admin: true,
            ..Self::member(user_id, group_id)
        }
    }

    /// The same identity acting under a different group context
    pub fn with_context(mut self, context: GroupContext) -> Self {
        self.context = context;
        self
    }

    fn is_member_of(&self, group_id: i64) -> bool {
        self.groups.contains(&group_id)
    }

    /// Whether `group_id` is visible under the active context: the session
    /// group by default, the named group under an override, or any group the
    /// caller belongs to under the all-groups context.
    fn group_in_scope(&self, group_id: i64) -> bool {
        if !self.is_member_of(group_id) {
            return false;
        }
        match self.context {
            GroupContext::Session => group_id == self.group_id,
            GroupContext::Group(g) => group_id == g,
            GroupContext::AllGroups => true,
        }
    }
}

/// Ownership facts about a backing file, as the guard sees them
#[derive(Debug, Clone, Copy)]
pub struct Ownership {
    pub owner_id: i64,
    pub group_id: i64,
    pub permissions: Permissions,
}

/// Stateless permission evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGuard;

impl AccessGuard {
    pub fn new() -> Self {
        Self
    }

    /// Whether the caller may read (open) the file. Group scope gates
    /// visibility before ownership: a file whose group is outside the
    /// caller's active context is reachable only through its world bits,
    /// owner included.
    pub fn can_read(&self, file: &Ownership, caller: &Identity) -> bool {
        if caller.is_admin {
            return true;
        }
        if caller.group_in_scope(file.group_id) {
            if caller.user_id == file.owner_id {
                return file.permissions.owner_read;
            }
            return file.permissions.group_read;
        }
        file.permissions.world_read
    }

    /// Whether the caller may mutate the file's table. Same scope-first
    /// rule as `can_read`.
    pub fn can_write(&self, file: &Ownership, caller: &Identity) -> bool {
        if caller.is_admin {
            return true;
        }
        if caller.group_in_scope(file.group_id) {
            if caller.user_id == file.owner_id {
                return file.permissions.owner_write;
            }
            return file.permissions.group_write;
        }
        file.permissions.world_write
    }

    /// Whether the caller may delete the file's backing storage: owner or
    /// admin only
    pub fn can_delete(&self, file: &Ownership, caller: &Identity) -> bool {
        caller.is_admin || caller.user_id == file.owner_id
    }

    /// `can_read` as a guard clause
    pub fn check_read(&self, file: &Ownership, caller: &Identity) -> TableResult<()> {
        if self.can_read(file, caller) {
            Ok(())
        } else {
            Err(TableError::denied(format!(
                "user {} cannot read file owned by {} in group {}",
                caller.user_id, file.owner_id, file.group_id
            )))
        }
    }

    /// `can_write` as a guard clause
    pub fn check_write(&self, file: &Ownership, caller: &Identity) -> TableResult<()> {
        if self.can_write(file, caller) {
            Ok(())
        } else {
            Err(TableError::denied(format!(
                "user {} cannot modify file owned by {} in group {}",
                caller.user_id, file.owner_id, file.group_id
            )))
        }
    }

    /// `can_delete` as a guard clause
    pub fn check_delete(&self, file: &Ownership, caller: &Identity) -> TableResult<()> {
        if self.can_delete(file, caller) {
            Ok(())
        } else {
            Err(TableError::denied(format!(
                "user {} cannot delete file owned by {}",
                caller.user_id, file.owner_id
            )))
        }
    }
}
