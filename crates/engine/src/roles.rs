//! Role hierarchy.
//!
//! Four fixed roles ranked by privilege. The rank doubles as the stored
//! `users.user_level_id`, so `1` is the most privileged level.

use serde::{Deserialize, Serialize};

use crate::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    AdminMaster,
    CompanyAdmin,
    CompanyUser,
    User,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::AdminMaster,
        Role::CompanyAdmin,
        Role::CompanyUser,
        Role::User,
    ];

    /// Numeric rank: lower means more privilege.
    #[must_use]
    pub const fn rank(self) -> i32 {
        match self {
            Self::AdminMaster => 1,
            Self::CompanyAdmin => 2,
            Self::CompanyUser => 3,
            Self::User => 4,
        }
    }

    /// Returns `true` if `self` is as privileged as `other` or more.
    #[must_use]
    pub const fn is_at_least(self, other: Role) -> bool {
        self.rank() <= other.rank()
    }

    /// AdminMaster and CompanyAdmin.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        self.is_at_least(Role::CompanyAdmin)
    }

    #[must_use]
    pub const fn is_master_admin(self) -> bool {
        matches!(self, Self::AdminMaster)
    }

    /// Slug used on the wire and in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AdminMaster => "adminMaster",
            Self::CompanyAdmin => "companyAdmin",
            Self::CompanyUser => "companyUser",
            Self::User => "user",
        }
    }

    /// Looks up a role by its stored level id.
    ///
    /// Returns `None` for ids outside the four known levels; callers decide
    /// whether that is a configuration fault or bad input.
    #[must_use]
    pub fn from_rank(rank: i32) -> Option<Role> {
        Self::ALL.into_iter().find(|role| role.rank() == rank)
    }

    /// Whether an actor holding `self` may hand out `target` to another user.
    ///
    /// AdminMaster may assign any role. CompanyAdmin may assign its own
    /// level and CompanyUser. Nobody else assigns roles.
    #[must_use]
    pub fn can_assign(self, target: Role) -> bool {
        match self {
            Self::AdminMaster => true,
            Self::CompanyAdmin => matches!(target, Role::CompanyAdmin | Role::CompanyUser),
            Self::CompanyUser | Self::User => false,
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Role {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "adminMaster" => Ok(Self::AdminMaster),
            "companyAdmin" => Ok(Self::CompanyAdmin),
            "companyUser" => Ok(Self::CompanyUser),
            "user" => Ok(Self::User),
            other => Err(EngineError::InvalidRole(format!("unknown role: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranks_are_totally_ordered() {
        assert!(Role::AdminMaster.is_at_least(Role::CompanyAdmin));
        assert!(Role::CompanyAdmin.is_at_least(Role::CompanyUser));
        assert!(Role::CompanyUser.is_at_least(Role::User));
        assert!(Role::User.is_at_least(Role::User));
        assert!(!Role::User.is_at_least(Role::CompanyUser));
    }

    #[test]
    fn admin_is_rank_two_or_better() {
        assert!(Role::AdminMaster.is_admin());
        assert!(Role::CompanyAdmin.is_admin());
        assert!(!Role::CompanyUser.is_admin());
        assert!(!Role::User.is_admin());
    }

    #[test]
    fn rank_roundtrips_and_rejects_unknown_levels() {
        for role in Role::ALL {
            assert_eq!(Role::from_rank(role.rank()), Some(role));
        }
        assert_eq!(Role::from_rank(0), None);
        assert_eq!(Role::from_rank(5), None);
    }

    #[test]
    fn slug_parsing() {
        assert_eq!(Role::try_from("companyUser").unwrap(), Role::CompanyUser);
        assert!(Role::try_from("superuser").is_err());
    }

    #[test]
    fn company_admin_assigns_only_company_levels() {
        assert!(Role::CompanyAdmin.can_assign(Role::CompanyUser));
        assert!(Role::CompanyAdmin.can_assign(Role::CompanyAdmin));
        assert!(!Role::CompanyAdmin.can_assign(Role::AdminMaster));
        assert!(!Role::CompanyAdmin.can_assign(Role::User));
        assert!(!Role::CompanyUser.can_assign(Role::User));
    }
}
