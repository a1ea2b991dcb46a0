use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    cache::entity,
    error::{AppError, AppResult},
    identity, policy,
    models::{Announcement, NewAnnouncement},
    routes::support::to_iso,
    schema::announcements,
    state::AppState,
    validation,
};

#[derive(Deserialize)]
pub struct CreateAnnouncementRequest {
    pub title: String,
    pub content: String,
}

#[derive(Serialize)]
pub struct AnnouncementResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Tenants see active announcements only; content staff sees the full set
/// including deactivated ones.
pub async fn list_announcements(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let staff = policy::can_manage_content(&identity);

    let cache_key = format!("staff={}", staff);
    if let Some(cached) = state.cache.get(entity::ANNOUNCEMENTS, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<Announcement> = if staff {
        announcements::table
            .order(announcements::created_at.desc())
            .load(&mut conn)?
    } else {
        announcements::table
            .filter(announcements::is_active.eq(true))
            .order(announcements::created_at.desc())
            .load(&mut conn)?
    };

    let response: Vec<AnnouncementResponse> = rows.into_iter().map(to_response).collect();
    let value = serde_json::to_value(&response)?;
    state
        .cache
        .put(entity::ANNOUNCEMENTS, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn create_announcement(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateAnnouncementRequest>,
) -> AppResult<(StatusCode, Json<AnnouncementResponse>)> {
    let title = validation::required_trimmed("title", &payload.title)?;
    let content = validation::required_trimmed("content", &payload.content)?;

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let new_announcement = NewAnnouncement {
        id: Uuid::new_v4(),
        title,
        content,
        is_active: true,
        created_by: Some(identity.user_id),
    };

    diesel::insert_into(announcements::table)
        .values(&new_announcement)
        .execute(&mut conn)?;

    let row: Announcement = announcements::table
        .find(new_announcement.id)
        .first(&mut conn)?;

    state.cache.invalidate(entity::ANNOUNCEMENTS);
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn update_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<AnnouncementResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let existing: Announcement = announcements::table
        .find(announcement_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let title = match body.get("title") {
        None => existing.title.clone(),
        Some(Value::String(s)) => validation::required_trimmed("title", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected title string, got {other}"
            )))
        }
    };
    let content = match body.get("content") {
        None => existing.content.clone(),
        Some(Value::String(s)) => validation::required_trimmed("content", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected content string, got {other}"
            )))
        }
    };
    let is_active = match body.get("is_active") {
        None => existing.is_active,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected is_active boolean, got {other}"
            )))
        }
    };

    diesel::update(announcements::table.find(announcement_id))
        .set((
            announcements::title.eq(title),
            announcements::content.eq(content),
            announcements::is_active.eq(is_active),
            announcements::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: Announcement = announcements::table.find(announcement_id).first(&mut conn)?;

    state.cache.invalidate(entity::ANNOUNCEMENTS);
    Ok(Json(to_response(updated)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(announcement_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let deleted =
        diesel::delete(announcements::table.find(announcement_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    state.cache.invalidate(entity::ANNOUNCEMENTS);
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(row: Announcement) -> AnnouncementResponse {
    AnnouncementResponse {
        id: row.id,
        title: row.title,
        content: row.content,
        is_active: row.is_active,
        created_at: to_iso(row.created_at),
        updated_at: to_iso(row.updated_at),
    }
}
