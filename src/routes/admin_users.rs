//! User administration. These handlers sit behind the same bearer check as
//! everything else, but each one re-reads the caller's role from the
//! database before acting: the token is not trusted to carry authority over
//! other accounts.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::capabilities::Role,
    auth::{password, AuthenticatedUser},
    cache::entity,
    error::{AppError, AppResult},
    identity,
    models::{NewProfile, NewUser, NewUserRole},
    schema::{profiles, user_roles, users},
    state::AppState,
    validation,
};

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub cpf: String,
    pub company: String,
    pub floor_id: Option<Uuid>,
    pub room: String,
}

#[derive(Serialize)]
pub struct CreateUserResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateRoleRequest {
    pub role: String,
}

#[derive(Serialize)]
pub struct UpdateRoleResponse {
    pub user_id: Uuid,
    pub role: String,
}

fn require_db_admin(
    conn: &mut PgConnection,
    caller: &AuthenticatedUser,
) -> AppResult<()> {
    match identity::load_role(conn, caller.user_id)? {
        Some(Role::Admin) => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

/// Provision an account on behalf of a tenant: identity, profile and the
/// default tenant role in one transaction.
pub async fn create_user(
    State(state): State<AppState>,
    caller: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let email = validation::email(&payload.email)?;
    validation::password(&payload.password)?;
    let full_name = validation::required_trimmed("full_name", &payload.full_name)?;
    let cpf = validation::cpf(&payload.cpf)?;
    let company = validation::required_trimmed("company", &payload.company)?;
    let room = validation::required_trimmed("room", &payload.room)?;

    let mut conn = state.db()?;
    require_db_admin(&mut conn, &caller)?;

    let password_hash = password::hash_password(&payload.password)?;
    let user_id = Uuid::new_v4();

    let inserted = conn.transaction::<_, diesel::result::Error, _>(|conn| {
        diesel::insert_into(users::table)
            .values(&NewUser {
                id: user_id,
                email: email.clone(),
                password_hash: password_hash.clone(),
            })
            .execute(conn)?;

        diesel::insert_into(profiles::table)
            .values(&NewProfile {
                id: Uuid::new_v4(),
                user_id,
                full_name: full_name.clone(),
                cpf: cpf.clone(),
                company: company.clone(),
                floor_id: payload.floor_id,
                room: room.clone(),
            })
            .execute(conn)?;

        diesel::insert_into(user_roles::table)
            .values(&NewUserRole {
                id: Uuid::new_v4(),
                user_id,
                role: Role::DEFAULT.as_str().to_string(),
            })
            .execute(conn)?;

        Ok(())
    });

    match inserted {
        Ok(()) => {}
        Err(diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )) => {
            return Err(AppError::conflict("email already registered"));
        }
        Err(err) => return Err(AppError::from(err)),
    }

    state.cache.invalidate(entity::PROFILES);
    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse { user_id, email }),
    ))
}

/// Role management is the one capability that never escalates below admin.
pub async fn update_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    caller: AuthenticatedUser,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<UpdateRoleResponse>> {
    let role = Role::parse(&payload.role)
        .ok_or_else(|| AppError::bad_request(format!("unknown role '{}'", payload.role)))?;

    let mut conn = state.db()?;
    require_db_admin(&mut conn, &caller)?;

    let updated = diesel::update(user_roles::table.filter(user_roles::user_id.eq(user_id)))
        .set(user_roles::role.eq(role.as_str()))
        .execute(&mut conn)?;
    if updated == 0 {
        return Err(AppError::not_found());
    }

    state.cache.invalidate(entity::PROFILES);
    Ok(Json(UpdateRoleResponse {
        user_id,
        role: role.as_str().to_string(),
    }))
}

/// Hard delete. Dependent rows (profile, role, tickets and their comments,
/// notifications, refresh tokens) go with the account via the foreign keys.
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    caller: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    require_db_admin(&mut conn, &caller)?;

    if user_id == caller.user_id {
        return Err(AppError::bad_request("cannot delete the calling account"));
    }

    let deleted = diesel::delete(users::table.find(user_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    // The cascade touches several entities; drop every affected read.
    state.cache.invalidate(entity::PROFILES);
    state.cache.invalidate(entity::TICKETS);
    state.cache.invalidate(entity::TICKET_COMMENTS);
    state.cache.invalidate(entity::RECEPTION_NOTIFICATIONS);

    Ok(StatusCode::NO_CONTENT)
}
