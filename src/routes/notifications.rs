use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use diesel::prelude::*;
use diesel::PgConnection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    cache::entity,
    error::{AppError, AppResult},
    identity, policy,
    models::{NewReceptionNotification, ReceptionMessage, ReceptionNotification},
    routes::support::to_iso,
    schema::{floors, profiles, reception_messages, reception_notifications},
    state::AppState,
    validation,
};

#[derive(Deserialize)]
pub struct SendNotificationRequest {
    pub recipient_id: Uuid,
    pub message_id: Option<Uuid>,
    pub custom_content: Option<String>,
    pub input_value: Option<String>,
    #[serde(default)]
    pub requires_response: bool,
}

#[derive(Deserialize)]
pub struct RespondRequest {
    pub response_value: String,
}

#[derive(Serialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message: Option<MessageInfo>,
    pub custom_content: Option<String>,
    pub input_value: Option<String>,
    pub requires_response: bool,
    pub response_value: Option<String>,
    pub responded_at: Option<String>,
    pub is_read: bool,
    pub created_at: String,
    pub recipient: Option<RecipientInfo>,
}

#[derive(Serialize, Clone)]
pub struct MessageInfo {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
}

#[derive(Serialize, Clone)]
pub struct RecipientInfo {
    pub full_name: String,
    pub company: String,
    pub room: String,
    pub floor_name: Option<String>,
}

/// Reception-side roles read the whole history; tenants read what was sent to
/// them. Newest first, served through the query cache.
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;

    let sender_side = policy::can_send_notification(&identity);
    if !sender_side && !identity.caps.is_cliente {
        return Err(AppError::forbidden());
    }

    let cache_key = format!("user={},sender={}", identity.user_id, sender_side);
    if let Some(cached) = state.cache.get(entity::RECEPTION_NOTIFICATIONS, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<ReceptionNotification> = if sender_side {
        reception_notifications::table
            .order(reception_notifications::created_at.desc())
            .load(&mut conn)?
    } else {
        reception_notifications::table
            .filter(reception_notifications::recipient_id.eq(identity.user_id))
            .order(reception_notifications::created_at.desc())
            .load(&mut conn)?
    };

    let messages = load_messages(&mut conn, &rows)?;
    let recipients = load_recipients(&mut conn, &rows)?;

    let response: Vec<NotificationResponse> = rows
        .into_iter()
        .map(|row| {
            let message = row.message_id.and_then(|id| messages.get(&id).cloned());
            let recipient = recipients.get(&row.recipient_id).cloned();
            to_response(row, message, recipient)
        })
        .collect();

    let value = serde_json::to_value(&response)?;
    state
        .cache
        .put(entity::RECEPTION_NOTIFICATIONS, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn send_notification(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<SendNotificationRequest>,
) -> AppResult<(StatusCode, Json<NotificationResponse>)> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_send_notification(&identity) {
        return Err(AppError::forbidden());
    }

    let custom_content = match payload.custom_content.as_deref() {
        Some(text) => Some(validation::required_trimmed("custom_content", text)?),
        None => None,
    };
    if payload.message_id.is_none() && custom_content.is_none() {
        return Err(AppError::bad_request(
            "either message_id or custom_content is required",
        ));
    }

    if let Some(message_id) = payload.message_id {
        let known: Option<Uuid> = reception_messages::table
            .find(message_id)
            .select(reception_messages::id)
            .first(&mut conn)
            .optional()?;
        if known.is_none() {
            return Err(AppError::bad_request("unknown message_id"));
        }
    }

    let recipient_exists: Option<Uuid> = profiles::table
        .filter(profiles::user_id.eq(payload.recipient_id))
        .select(profiles::user_id)
        .first(&mut conn)
        .optional()?;
    if recipient_exists.is_none() {
        return Err(AppError::bad_request("unknown recipient"));
    }

    let new_notification = NewReceptionNotification {
        id: Uuid::new_v4(),
        sender_id: identity.user_id,
        recipient_id: payload.recipient_id,
        message_id: payload.message_id,
        custom_content,
        input_value: payload.input_value,
        requires_response: payload.requires_response,
    };

    diesel::insert_into(reception_notifications::table)
        .values(&new_notification)
        .execute(&mut conn)?;

    let row: ReceptionNotification = reception_notifications::table
        .find(new_notification.id)
        .first(&mut conn)?;

    let messages = load_messages(&mut conn, std::slice::from_ref(&row))?;
    let recipients = load_recipients(&mut conn, std::slice::from_ref(&row))?;
    let message = row.message_id.and_then(|id| messages.get(&id).cloned());
    let recipient = recipients.get(&row.recipient_id).cloned();

    state.cache.invalidate(entity::RECEPTION_NOTIFICATIONS);

    Ok((
        StatusCode::CREATED,
        Json(to_response(row, message, recipient)),
    ))
}

/// One-shot response by the recipient. Rejected when the notification never
/// asked for a response, and with 409 when a response is already recorded.
pub async fn respond_to_notification(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<RespondRequest>,
) -> AppResult<Json<NotificationResponse>> {
    let response_value = validation::required_trimmed("response_value", &payload.response_value)?;

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;

    let row: ReceptionNotification = reception_notifications::table
        .find(notification_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if !policy::is_notification_recipient(&identity, &row) {
        return Err(AppError::forbidden());
    }
    if !row.requires_response {
        return Err(AppError::bad_request(
            "notification does not accept a response",
        ));
    }
    if row.response_value.is_some() {
        return Err(AppError::conflict("notification already answered"));
    }

    let now = chrono::Utc::now().naive_utc();
    // Guard against a concurrent answer: the filter re-checks that no
    // response landed between the read above and this write.
    let updated_rows = diesel::update(
        reception_notifications::table
            .find(notification_id)
            .filter(reception_notifications::response_value.is_null()),
    )
    .set((
        reception_notifications::response_value.eq(Some(response_value)),
        reception_notifications::responded_at.eq(Some(now)),
    ))
    .execute(&mut conn)?;

    if updated_rows == 0 {
        return Err(AppError::conflict("notification already answered"));
    }

    let updated: ReceptionNotification = reception_notifications::table
        .find(notification_id)
        .first(&mut conn)?;

    let messages = load_messages(&mut conn, std::slice::from_ref(&updated))?;
    let recipients = load_recipients(&mut conn, std::slice::from_ref(&updated))?;
    let message = updated.message_id.and_then(|id| messages.get(&id).cloned());
    let recipient = recipients.get(&updated.recipient_id).cloned();

    state.cache.invalidate(entity::RECEPTION_NOTIFICATIONS);

    Ok(Json(to_response(updated, message, recipient)))
}

pub async fn mark_as_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<StatusCode> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;

    let row: ReceptionNotification = reception_notifications::table
        .find(notification_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if !policy::is_notification_recipient(&identity, &row) {
        return Err(AppError::forbidden());
    }

    diesel::update(reception_notifications::table.find(notification_id))
        .set(reception_notifications::is_read.eq(true))
        .execute(&mut conn)?;

    state.cache.invalidate(entity::RECEPTION_NOTIFICATIONS);
    Ok(StatusCode::NO_CONTENT)
}

fn load_messages(
    conn: &mut PgConnection,
    rows: &[ReceptionNotification],
) -> AppResult<HashMap<Uuid, MessageInfo>> {
    let message_ids: Vec<Uuid> = rows.iter().filter_map(|n| n.message_id).collect();
    if message_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let messages: Vec<ReceptionMessage> = reception_messages::table
        .filter(reception_messages::id.eq_any(&message_ids))
        .load(conn)?;

    Ok(messages
        .into_iter()
        .map(|m| {
            (
                m.id,
                MessageInfo {
                    id: m.id,
                    title: m.title,
                    content: m.content,
                    category: m.category,
                },
            )
        })
        .collect())
}

fn load_recipients(
    conn: &mut PgConnection,
    rows: &[ReceptionNotification],
) -> AppResult<HashMap<Uuid, RecipientInfo>> {
    let user_ids: Vec<Uuid> = rows.iter().map(|n| n.recipient_id).collect();
    if user_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let entries: Vec<(Uuid, String, String, String, Option<String>)> = profiles::table
        .left_join(floors::table)
        .filter(profiles::user_id.eq_any(&user_ids))
        .select((
            profiles::user_id,
            profiles::full_name,
            profiles::company,
            profiles::room,
            floors::name.nullable(),
        ))
        .load(conn)?;

    Ok(entries
        .into_iter()
        .map(|(user_id, full_name, company, room, floor_name)| {
            (
                user_id,
                RecipientInfo {
                    full_name,
                    company,
                    room,
                    floor_name,
                },
            )
        })
        .collect())
}

fn to_response(
    row: ReceptionNotification,
    message: Option<MessageInfo>,
    recipient: Option<RecipientInfo>,
) -> NotificationResponse {
    NotificationResponse {
        id: row.id,
        sender_id: row.sender_id,
        recipient_id: row.recipient_id,
        message,
        custom_content: row.custom_content,
        input_value: row.input_value,
        requires_response: row.requires_response,
        response_value: row.response_value,
        responded_at: row.responded_at.map(to_iso),
        is_read: row.is_read,
        created_at: to_iso(row.created_at),
        recipient,
    }
}
