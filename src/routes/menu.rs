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
    models::{MenuItem, NewMenuItem},
    routes::support::{classify_nullable, to_iso, NullableValue},
    schema::menu_items,
    state::AppState,
    validation,
};

#[derive(Deserialize)]
pub struct CreateMenuItemRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub is_available: Option<bool>,
    pub image_url: Option<String>,
}

#[derive(Serialize)]
pub struct MenuItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// The tenant-facing list carries available items only; the management list
/// for content staff carries everything, unavailable items included.
pub async fn list_menu_items(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let staff = policy::can_manage_content(&identity);

    let cache_key = format!("staff={}", staff);
    if let Some(cached) = state.cache.get(entity::MENU_ITEMS, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<MenuItem> = if staff {
        menu_items::table
            .order(menu_items::category.asc())
            .load(&mut conn)?
    } else {
        menu_items::table
            .filter(menu_items::is_available.eq(true))
            .order(menu_items::category.asc())
            .load(&mut conn)?
    };

    let response: Vec<MenuItemResponse> = rows.into_iter().map(to_response).collect();
    let value = serde_json::to_value(&response)?;
    state.cache.put(entity::MENU_ITEMS, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn create_menu_item(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateMenuItemRequest>,
) -> AppResult<(StatusCode, Json<MenuItemResponse>)> {
    let name = validation::required_trimmed("name", &payload.name)?;
    if !payload.price.is_finite() || payload.price < 0.0 {
        return Err(AppError::bad_request("price must be a non-negative number"));
    }

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let new_item = NewMenuItem {
        id: Uuid::new_v4(),
        name,
        description: payload.description,
        price: payload.price,
        category: payload.category,
        is_available: payload.is_available.unwrap_or(true),
        image_url: payload.image_url,
    };

    diesel::insert_into(menu_items::table)
        .values(&new_item)
        .execute(&mut conn)?;

    let row: MenuItem = menu_items::table.find(new_item.id).first(&mut conn)?;

    state.cache.invalidate(entity::MENU_ITEMS);
    Ok((StatusCode::CREATED, Json(to_response(row))))
}

pub async fn update_menu_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<MenuItemResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let existing: MenuItem = menu_items::table
        .find(item_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let name = match body.get("name") {
        None => existing.name.clone(),
        Some(Value::String(s)) => validation::required_trimmed("name", s)?,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected name string, got {other}"
            )))
        }
    };

    let price = match body.get("price") {
        None => existing.price,
        Some(Value::Number(n)) => {
            let value = n.as_f64().unwrap_or(f64::NAN);
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::bad_request("price must be a non-negative number"));
            }
            value
        }
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected price number, got {other}"
            )))
        }
    };

    let is_available = match body.get("is_available") {
        None => existing.is_available,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected is_available boolean, got {other}"
            )))
        }
    };

    let description = nullable_field(&body, "description", existing.description.clone())?;
    let category = nullable_field(&body, "category", existing.category.clone())?;
    let image_url = nullable_field(&body, "image_url", existing.image_url.clone())?;

    diesel::update(menu_items::table.find(item_id))
        .set((
            menu_items::name.eq(name),
            menu_items::description.eq(description),
            menu_items::price.eq(price),
            menu_items::category.eq(category),
            menu_items::is_available.eq(is_available),
            menu_items::image_url.eq(image_url),
            menu_items::updated_at.eq(chrono::Utc::now().naive_utc()),
        ))
        .execute(&mut conn)?;

    let updated: MenuItem = menu_items::table.find(item_id).first(&mut conn)?;

    state.cache.invalidate(entity::MENU_ITEMS);
    Ok(Json(to_response(updated)))
}

pub async fn delete_menu_item(
    State(state): State<AppState>,
    Path(item_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_manage_content(&identity) {
        return Err(AppError::forbidden());
    }

    let deleted = diesel::delete(menu_items::table.find(item_id)).execute(&mut conn)?;
    if deleted == 0 {
        return Err(AppError::not_found());
    }

    state.cache.invalidate(entity::MENU_ITEMS);
    Ok(StatusCode::NO_CONTENT)
}

fn nullable_field(
    body: &Value,
    field: &'static str,
    current: Option<String>,
) -> AppResult<Option<String>> {
    match classify_nullable(body.get(field)) {
        Ok(NullableValue::Omitted) => Ok(current),
        Ok(NullableValue::Null) => Ok(None),
        Ok(NullableValue::String(s)) => Ok(Some(s)),
        Err(message) => Err(AppError::bad_request(message)),
    }
}

fn to_response(row: MenuItem) -> MenuItemResponse {
    MenuItemResponse {
        id: row.id,
        name: row.name,
        description: row.description,
        price: row.price,
        category: row.category,
        is_available: row.is_available,
        image_url: row.image_url,
        created_at: to_iso(row.created_at),
        updated_at: to_iso(row.updated_at),
    }
}
