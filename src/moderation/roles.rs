/// Role hierarchy and the role gate
///
/// One ordered enumeration plus a parameterized predicate replaces the
/// per-tier wrappers the rest of the platform used to carry. A membership
/// check is always "at or above the required rank"; exact-match checks do
/// not exist here.
use crate::error::{DirectoryError, DirectoryResult};
use serde::{Deserialize, Serialize};

/// User role levels, ordered from least to most privileged
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can browse and submit entries
    Member,
    /// Trusted submitter, bulk-imports entries
    Collector,
    /// Reviews the moderation queue
    Moderator,
    /// Full directory administration
    Admin,
    /// Can grant and revoke roles
    SuperAdmin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Collector => "collector",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn from_str(s: &str) -> DirectoryResult<Self> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "collector" => Ok(Role::Collector),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "superadmin" => Ok(Role::SuperAdmin),
            _ => Err(DirectoryError::Validation(format!("Invalid role: {}", s))),
        }
    }

    /// Check if this role can perform actions requiring another role
    pub fn can_act_as(&self, required: Role) -> bool {
        self >= &required
    }
}

/// Outcome of a role-gate check
///
/// `Denied` is a normal negative result, not an error; an unauthenticated
/// caller is distinguished because it maps to a different HTTP status and a
/// different remedy (log in vs. ask for a role upgrade).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allowed,
    Denied { required: Role },
    Unauthenticated,
}

impl Access {
    /// Convert a negative gate result into the matching error
    pub fn require(self, action: &str) -> DirectoryResult<()> {
        match self {
            Access::Allowed => Ok(()),
            Access::Denied { required } => Err(DirectoryError::Authorization(format!(
                "{} requires {} role or higher",
                action,
                required.as_str()
            ))),
            Access::Unauthenticated => Err(DirectoryError::Authentication(format!(
                "{} requires an authenticated caller",
                action
            ))),
        }
    }
}

/// Check whether a caller satisfies a required minimum role
pub fn authorize(caller: Option<Role>, required: Role) -> Access {
    match caller {
        None => Access::Unauthenticated,
        Some(role) if role.can_act_as(required) => Access::Allowed,
        Some(_) => Access::Denied { required },
    }
}

/// Check whether a caller satisfies any of several minimum roles
///
/// Used when an operation is open to unrelated thresholds, e.g.
/// "collector-or-moderator". The reported requirement on denial is the
/// lowest of the minimums.
pub fn authorize_any(caller: Option<Role>, minimums: &[Role]) -> Access {
    let Some(role) = caller else {
        return Access::Unauthenticated;
    };

    if minimums.iter().any(|required| role.can_act_as(*required)) {
        return Access::Allowed;
    }

    Access::Denied {
        required: minimums.iter().copied().min().unwrap_or(Role::SuperAdmin),
    }
}
