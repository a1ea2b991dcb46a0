use axum::{
    extract::{Path, State},
    Json,
};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    cache::entity,
    error::{AppError, AppResult},
    identity, policy,
    models::{Floor, Profile},
    routes::support::{classify_nullable, to_iso, NullableValue},
    schema::{floors, profiles},
    state::AppState,
    validation,
};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    /// Null when the caller's role only gets the masked directory view.
    pub cpf: Option<String>,
    pub company: String,
    pub room: String,
    pub floor: Option<FloorInfo>,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Serialize, Clone)]
pub struct FloorInfo {
    pub id: Uuid,
    pub floor_number: i32,
    pub name: String,
}

/// Staff directory, ordered by company then name. The recepcao role gets the
/// secure variant with the national ID withheld.
pub async fn list_profiles(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_list_profiles(&identity) {
        return Err(AppError::forbidden());
    }
    let mask_cpf = policy::masks_cpf(&identity);

    let cache_key = format!("masked={}", mask_cpf);
    if let Some(cached) = state.cache.get(entity::PROFILES, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<(Profile, Option<Floor>)> = profiles::table
        .left_join(floors::table)
        .order((profiles::company.asc(), profiles::full_name.asc()))
        .load(&mut conn)?;

    let response: Vec<ProfileResponse> = rows
        .into_iter()
        .map(|(profile, floor)| to_response(profile, floor, mask_cpf))
        .collect();

    let value = serde_json::to_value(&response)?;
    state.cache.put(entity::PROFILES, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn get_own_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<ProfileResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let profile = identity.profile.clone().ok_or_else(AppError::not_found)?;
    let floor = identity.floor.clone();
    Ok(Json(to_response(profile, floor, false)))
}

/// Self-service update of the presentational fields. The national ID and the
/// active flag stay admin-only.
pub async fn update_own_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<ProfileResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let existing = identity.profile.clone().ok_or_else(AppError::not_found)?;

    apply_profile_update(&mut conn, &state, existing, body, false).map(Json)
}

/// Admin-side update of any profile, including deactivation.
pub async fn admin_update_profile(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<ProfileResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_users(&identity) {
        return Err(AppError::forbidden());
    }

    let existing: Profile = profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    apply_profile_update(&mut conn, &state, existing, body, true).map(Json)
}

fn apply_profile_update(
    conn: &mut PgConnection,
    state: &AppState,
    existing: Profile,
    body: Value,
    admin: bool,
) -> AppResult<ProfileResponse> {
    let full_name = match body.get("full_name") {
        None => existing.full_name.clone(),
        Some(Value::String(s)) => validation::required_trimmed("full_name", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected full_name string, got {other}"
            )))
        }
    };
    let company = match body.get("company") {
        None => existing.company.clone(),
        Some(Value::String(s)) => validation::required_trimmed("company", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected company string, got {other}"
            )))
        }
    };
    let room = match body.get("room") {
        None => existing.room.clone(),
        Some(Value::String(s)) => validation::required_trimmed("room", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected room string, got {other}"
            )))
        }
    };
    let avatar_url = match classify_nullable(body.get("avatar_url")) {
        Ok(NullableValue::Omitted) => existing.avatar_url.clone(),
        Ok(NullableValue::Null) => None,
        Ok(NullableValue::String(s)) => Some(s),
        Err(message) => return Err(AppError::bad_request(message)),
    };
    let floor_id = match body.get("floor_id") {
        None => existing.floor_id,
        Some(Value::Null) => None,
        Some(Value::String(s)) => Some(
            s.parse::<Uuid>()
                .map_err(|_| AppError::bad_request("floor_id must be a UUID"))?,
        ),
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected floor_id string or null, got {other}"
            )))
        }
    };

    let cpf = if admin {
        match body.get("cpf") {
            None => existing.cpf.clone(),
            Some(Value::String(s)) => validation::cpf(s)?,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "expected cpf string, got {other}"
                )))
            }
        }
    } else {
        existing.cpf.clone()
    };
    let is_active = if admin {
        match body.get("is_active") {
            None => existing.is_active,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(AppError::bad_request(format!(
                    "expected is_active boolean, got {other}"
                )))
            }
        }
    } else {
        existing.is_active
    };

    diesel::update(profiles::table.find(existing.id))
        .set((
            profiles::full_name.eq(full_name),
            profiles::cpf.eq(cpf),
            profiles::company.eq(company),
            profiles::room.eq(room),
            profiles::floor_id.eq(floor_id),
            profiles::avatar_url.eq(avatar_url),
            profiles::is_active.eq(is_active),
            profiles::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(conn)?;

    let updated: Profile = profiles::table.find(existing.id).first(conn)?;
    let floor: Option<Floor> = match updated.floor_id {
        Some(floor_id) => floors::table.find(floor_id).first(conn).optional()?,
        None => None,
    };

    state.cache.invalidate(entity::PROFILES);
    Ok(to_response(updated, floor, false))
}

fn to_response(profile: Profile, floor: Option<Floor>, mask_cpf: bool) -> ProfileResponse {
    ProfileResponse {
        id: profile.id,
        user_id: profile.user_id,
        full_name: profile.full_name,
        cpf: if mask_cpf { None } else { Some(profile.cpf) },
        company: profile.company,
        room: profile.room,
        floor: floor.map(|f| FloorInfo {
            id: f.id,
            floor_number: f.floor_number,
            name: f.name,
        }),
        avatar_url: profile.avatar_url,
        is_active: profile.is_active,
        created_at: to_iso(profile.created_at),
        updated_at: to_iso(profile.updated_at),
    }
}
