use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::auth::capabilities::{Capabilities, Role, RoleGate};
use crate::auth::AuthenticatedUser;
use crate::error::{AppError, AppResult};
use crate::models::{Floor, Profile};
use crate::schema::{floors, profiles, user_roles};

/// Request-scoped view of who is calling: token identity plus the profile and
/// role rows resolved from the database. Built fresh per request, never cached
/// across requests.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
    pub profile: Option<Profile>,
    pub floor: Option<Floor>,
    pub role: Option<Role>,
    pub caps: Capabilities,
}

impl Identity {
    pub fn require(&self, gate: RoleGate) -> AppResult<()> {
        if gate.allows(&self.caps) {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }
}

/// Fetch profile (with floor) and role for the authenticated user. A missing
/// profile or role row is not an error: the identity simply resolves without
/// it and capability checks deny from there.
pub fn resolve(conn: &mut PgConnection, user: &AuthenticatedUser) -> AppResult<Identity> {
    let profile: Option<Profile> = profiles::table
        .filter(profiles::user_id.eq(user.user_id))
        .first(conn)
        .optional()?;

    let floor: Option<Floor> = match profile.as_ref().and_then(|p| p.floor_id) {
        Some(floor_id) => floors::table.find(floor_id).first(conn).optional()?,
        None => None,
    };

    let role_value: Option<String> = user_roles::table
        .filter(user_roles::user_id.eq(user.user_id))
        .select(user_roles::role)
        .first(conn)
        .optional()?;

    let role = role_value.as_deref().and_then(Role::parse);

    Ok(Identity {
        user_id: user.user_id,
        email: user.email.clone(),
        profile,
        floor,
        role,
        caps: Capabilities::derive(role),
    })
}

/// Role lookup on its own, for the elevated admin operations that re-verify
/// the caller against the database regardless of what the request context
/// already resolved.
pub fn load_role(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<Role>> {
    let role_value: Option<String> = user_roles::table
        .filter(user_roles::user_id.eq(user_id))
        .select(user_roles::role)
        .first(conn)
        .optional()?;
    Ok(role_value.as_deref().and_then(Role::parse))
}
