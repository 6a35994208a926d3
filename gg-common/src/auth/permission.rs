//! Role permission bitmasks

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;

/// Permission bitmask stored in `roles.permissions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Permission(pub i64);

impl Permission {
    pub const EXIST: Permission = Permission(0x01);
    pub const CREATE_USERS: Permission = Permission(0x02);
    pub const CREATE_SCHOOLS: Permission = Permission(0x04);
    pub const ADMINISTER: Permission = Permission(0x08);
    /// Every bit set; granted to administrators
    pub const ALL: Permission = Permission(0xff);

    pub fn bits(self) -> i64 {
        self.0
    }

    /// True when every bit of `required` is present
    pub fn contains(self, required: Permission) -> bool {
        self.0 & required.0 == required.0
    }
}

impl BitOr for Permission {
    type Output = Permission;

    fn bitor(self, rhs: Permission) -> Permission {
        Permission(self.0 | rhs.0)
    }
}

/// The three built-in roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleName {
    Student,
    Teacher,
    Administrator,
}

impl RoleName {
    pub const ALL: [RoleName; 3] = [RoleName::Student, RoleName::Teacher, RoleName::Administrator];

    pub fn as_str(self) -> &'static str {
        match self {
            RoleName::Student => "Student",
            RoleName::Teacher => "Teacher",
            RoleName::Administrator => "Administrator",
        }
    }

    pub fn parse(name: &str) -> Option<RoleName> {
        RoleName::ALL.into_iter().find(|r| r.as_str() == name)
    }

    /// Permissions and default flag seeded by `insert_roles`
    pub fn defaults(self) -> (Permission, bool) {
        match self {
            RoleName::Student => (Permission::EXIST, true),
            RoleName::Teacher => (Permission::EXIST | Permission::CREATE_USERS, false),
            RoleName::Administrator => (Permission::ALL, false),
        }
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
