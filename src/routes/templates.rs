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
    auth::capabilities::RoleGate,
    auth::AuthenticatedUser,
    cache::entity,
    error::{AppError, AppResult},
    identity, policy,
    models::{MessageTemplate, NewMessageTemplate},
    routes::support::{classify_nullable, to_iso, NullableValue},
    schema::message_templates,
    state::AppState,
    validation,
};

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct TemplateResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Canned text catalog for the reception desk; staff-only, tenants have no
/// reason to see it.
pub async fn list_templates(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    identity.require(RoleGate::Staff)?;

    let cache_key = "all".to_string();
    if let Some(cached) = state.cache.get(entity::MESSAGE_TEMPLATES, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<MessageTemplate> = message_templates::table
        .order(message_templates::category.asc())
        .load(&mut conn)?;

    let response: Vec<TemplateResponse> = rows.into_iter().map(to_response).collect();
    let value = serde_json::to_value(&response)?;
    state
        .cache
        .put(entity::MESSAGE_TEMPLATES, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn create_template(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTemplateRequest>,
) -> AppResult<(StatusCode, Json<TemplateResponse>)> {
    let title = validation::required_trimmed("title", &payload.title)?;
    let content = validation::required_trimmed("content", &payload.content)?;

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let new_template = NewMessageTemplate {
        id: Uuid::new_v4(),
        title,
        content,
        category: payload.category,
        created_by: Some(identity.user_id),
    };

    diesel::insert_into(message_templates::table)
        .values(&new_template)
        .execute(&mut conn)?;

    let row: MessageTemplate = message_templates::table
        .find(new_template.id)
        .first(&mut conn)?;

    state.cache.invalidate(entity::MESSAGE_TEMPLATES);
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn update_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<TemplateResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let existing: MessageTemplate = message_templates::table
        .find(template_id)
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
    let category = match classify_nullable(body.get("category")) {
        Ok(NullableValue::Omitted) => existing.category.clone(),
        Ok(NullableValue::Null) => None,
        Ok(NullableValue::String(s)) => Some(s),
        Err(message) => return Err(AppError::bad_request(message)),
    };

    diesel::update(message_templates::table.find(template_id))
        .set((
            message_templates::title.eq(title),
            message_templates::content.eq(content),
            message_templates::category.eq(category),
            message_templates::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: MessageTemplate = message_templates::table
        .find(template_id)
        .first(&mut conn)?;

    state.cache.invalidate(entity::MESSAGE_TEMPLATES);
    Ok(Json(to_response(updated)))
}

pub async fn delete_template(
    State(state): State<AppState>,
    Path(template_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let deleted =
        diesel::delete(message_templates::table.find(template_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    state.cache.invalidate(entity::MESSAGE_TEMPLATES);
    Ok(StatusCode::NO_CONTENT)
}

fn to_response(row: MessageTemplate) -> TemplateResponse {
    TemplateResponse {
        id: row.id,
        title: row.title,
        content: row.content,
        category: row.category,
        created_at: to_iso(row.created_at),
        updated_at: to_iso(row.updated_at),
    }
}
