use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role supplied by the identity provider. The core trusts this value as
/// already-authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
}

impl Role {
    pub fn is_moderator(self) -> bool {
        matches!(self, Role::Moderator | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// The acting principal for a request: `(user_id, role)` from the identity
/// provider. All role/ownership checks in the services go through the
/// predicates here rather than being re-derived inline per handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_moderator(&self) -> bool {
        self.role.is_moderator()
    }

    /// True when the principal owns the resource or holds a moderation role.
    pub fn can_act_for(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id || self.is_moderator()
    }

    pub fn owns(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!("moderator".parse::<Role>(), Ok(Role::Moderator));
        assert_eq!(" Admin ".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_moderator_predicate() {
        assert!(Role::Moderator.is_moderator());
        assert!(Role::Admin.is_moderator());
        assert!(!Role::User.is_moderator());
    }

    #[test]
    fn test_can_act_for() {
        let owner = Uuid::new_v4();
        let other = Uuid::new_v4();

        let creator = Principal {
            user_id: owner,
            role: Role::User,
        };
        assert!(creator.can_act_for(owner));
        assert!(!creator.can_act_for(other));

        let moderator = Principal {
            user_id: other,
            role: Role::Moderator,
        };
        assert!(moderator.can_act_for(owner));
    }
}
