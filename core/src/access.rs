//! Roles, permissions and the acting user.
//!
//! Every operation receives the [`Actor`] explicitly. There is no ambient
//! request context to read the caller from.

use crate::error::{AllocationError, Result};
use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Permission names.
pub mod permissions {
    /// Grants every permission
    pub const ALL: &str = "*";
    /// Create bookings
    pub const FORMS_CREATE: &str = "forms.create";
    /// Edit bookings and their allocations
    pub const FORMS_EDIT: &str = "forms.edit";
    /// Read bookings
    pub const FORMS_READ: &str = "forms.read";
    /// Read booking statistics across all users
    pub const FORMS_VIEW_ALL: &str = "forms.view_all";
    /// Soft-delete bookings
    pub const FORMS_DELETE: &str = "forms.delete";
    /// Restore soft-deleted bookings
    pub const FORMS_RESTORE: &str = "forms.restore";
    /// Assign vendors to allocations
    pub const ALLOCATIONS_ASSIGN_VENDOR: &str = "allocations.assign_vendor";
    /// Fill in and submit vehicle details
    pub const VEHICLES_SUBMIT: &str = "vehicles.submit";
    /// Read vehicle assignments
    pub const VEHICLES_READ: &str = "vehicles.read";
    /// Read the audit trail
    pub const AUDIT_READ: &str = "audit.read";
}

/// User role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Full access
    Admin,
    /// Creates and edits own bookings
    Employee,
    /// Transporter supplying vehicles
    Vendor,
    /// Read-only access to bookings
    OrderPlacer,
}

impl Role {
    /// Permissions granted to a role when none are configured explicitly.
    #[must_use]
    pub const fn default_permissions(&self) -> &'static [&'static str] {
        match self {
            Self::Admin => &[permissions::ALL],
            Self::Employee => &[
                permissions::FORMS_CREATE,
                permissions::FORMS_EDIT,
                permissions::FORMS_READ,
                permissions::ALLOCATIONS_ASSIGN_VENDOR,
            ],
            Self::Vendor => &[permissions::VEHICLES_SUBMIT, permissions::VEHICLES_READ],
            Self::OrderPlacer => &[permissions::FORMS_READ],
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Admin => "admin",
            Self::Employee => "employee",
            Self::Vendor => "vendor",
            Self::OrderPlacer => "order_placer",
        };
        f.write_str(name)
    }
}

/// The user performing an operation, with their role and permissions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// User id
    pub id: UserId,
    /// Active role
    pub role: Role,
    /// Granted permissions (`*` grants all)
    pub permissions: BTreeSet<String>,
    /// Deactivated users are denied everything
    pub is_active: bool,
}

impl Actor {
    /// Active actor with the role's default permissions.
    #[must_use]
    pub fn new(id: UserId, role: Role) -> Self {
        Self {
            id,
            role,
            permissions: role
                .default_permissions()
                .iter()
                .map(ToString::to_string)
                .collect(),
            is_active: true,
        }
    }

    /// Replace the permission set.
    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the actor inactive.
    #[must_use]
    pub const fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Whether the actor holds `permission` (directly or via `*`).
    #[must_use]
    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_active
            && (self.permissions.contains(permissions::ALL)
                || self.permissions.contains(permission))
    }

    /// Require `permission`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Forbidden`] if the actor is inactive or
    /// lacks the permission.
    pub fn require(&self, permission: &str) -> Result<()> {
        if self.has_permission(permission) {
            Ok(())
        } else {
            Err(AllocationError::forbidden(permission))
        }
    }

    /// Require one of `roles`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError::Forbidden`] naming the accepted roles.
    pub fn require_role(&self, roles: &[Role]) -> Result<()> {
        if self.is_active && roles.contains(&self.role) {
            return Ok(());
        }
        let accepted: Vec<String> = roles.iter().map(ToString::to_string).collect();
        Err(AllocationError::forbidden(format!(
            "role {}",
            accepted.join(" or ")
        )))
    }

    /// Whether the actor is an active admin.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_active && self.role == Role::Admin
    }
}
