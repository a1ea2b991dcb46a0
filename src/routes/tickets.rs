use std::collections::HashMap;
use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use diesel::prelude::*;
use diesel::PgConnection;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    cache::entity,
    error::{AppError, AppResult},
    identity::{self, Identity},
    models::{NewTicket, NewTicketComment, Ticket, TicketComment},
    policy,
    routes::support::{classify_nullable, to_iso, NullableValue},
    schema::{floors, profiles, ticket_comments, tickets},
    state::AppState,
    validation,
};

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_RESOLVED: &str = "resolved";

const STATUSES: &[&str] = &[STATUS_PENDING, STATUS_IN_PROGRESS, STATUS_RESOLVED];

#[derive(Deserialize)]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct AddCommentRequest {
    pub content: String,
}

#[derive(Serialize)]
pub struct TicketResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub requester: Option<RequesterInfo>,
}

#[derive(Serialize, Clone)]
pub struct RequesterInfo {
    pub full_name: String,
    pub company: String,
    pub room: String,
    pub floor_name: Option<String>,
}

#[derive(Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_admin: bool,
    pub created_at: String,
}

/// Tenants get their own tickets, ticket staff gets everything; both newest
/// first. The list is served through the query cache keyed by requester and
/// staff flag.
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let staff = identity.caps.is_central_atendimento;

    let cache_key = format!("user={},staff={}", identity.user_id, staff);
    if let Some(cached) = state.cache.get(entity::TICKETS, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<Ticket> = if staff {
        tickets::table
            .order(tickets::created_at.desc())
            .load(&mut conn)?
    } else {
        tickets::table
            .filter(tickets::user_id.eq(identity.user_id))
            .order(tickets::created_at.desc())
            .load(&mut conn)?
    };

    let requesters = load_requesters(&mut conn, &rows)?;
    let response: Vec<TicketResponse> = rows
        .into_iter()
        .map(|ticket| {
            let requester = requesters.get(&ticket.user_id).cloned();
            to_ticket_response(ticket, requester)
        })
        .collect();

    let value = serde_json::to_value(&response)?;
    state.cache.put(entity::TICKETS, &cache_key, value.clone());
    Ok(Json(value))
}

pub async fn create_ticket(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateTicketRequest>,
) -> AppResult<(StatusCode, Json<TicketResponse>)> {
    let title = validation::required_trimmed("title", &payload.title)?;
    let description = validation::ticket_description(&payload.description)?;

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;

    let new_ticket = NewTicket {
        id: Uuid::new_v4(),
        user_id: identity.user_id,
        title,
        description,
        status: STATUS_PENDING.to_string(),
    };

    diesel::insert_into(tickets::table)
        .values(&new_ticket)
        .execute(&mut conn)?;

    let ticket: Ticket = tickets::table.find(new_ticket.id).first(&mut conn)?;
    let requesters = load_requesters(&mut conn, std::slice::from_ref(&ticket))?;
    let requester = requesters.get(&ticket.user_id).cloned();

    state.cache.invalidate(entity::TICKETS);
    state.feed.publish("tickets", ticket.id);

    Ok((
        StatusCode::CREATED,
        Json(to_ticket_response(ticket, requester)),
    ))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<TicketResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let ticket = load_visible_ticket(&mut conn, &identity, ticket_id)?;

    let requesters = load_requesters(&mut conn, std::slice::from_ref(&ticket))?;
    let requester = requesters.get(&ticket.user_id).cloned();
    Ok(Json(to_ticket_response(ticket, requester)))
}

/// Staff-side mutation: status transitions (unordered, any of the three
/// states) and the internal notes field. Tenants cannot reach this, not even
/// for their own tickets.
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(body): Json<Value>,
) -> AppResult<Json<TicketResponse>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    if !policy::can_update_ticket(&identity) {
        return Err(AppError::forbidden());
    }

    let existing: Ticket = tickets::table
        .find(ticket_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    let status = match body.get("status") {
        None => None,
        Some(Value::String(s)) => {
            if !STATUSES.contains(&s.as_str()) {
                return Err(AppError::bad_request(format!("unknown status '{s}'")));
            }
            Some(s.clone())
        }
        Some(other) => {
            return Err(AppError::bad_request(format!(
                "expected status string, got {other}"
            )))
        }
    };

    let admin_notes = match classify_nullable(body.get("admin_notes")) {
        Ok(NullableValue::Omitted) => None,
        Ok(NullableValue::Null) => Some(None),
        Ok(NullableValue::String(s)) => Some(Some(s)),
        Err(message) => return Err(AppError::bad_request(message)),
    };

    if status.is_none() && admin_notes.is_none() {
        let requesters = load_requesters(&mut conn, std::slice::from_ref(&existing))?;
        let requester = requesters.get(&existing.user_id).cloned();
        return Ok(Json(to_ticket_response(existing, requester)));
    }

    let now = chrono::Utc::now().naive_utc();
    diesel::update(tickets::table.find(ticket_id))
        .set((
            status
                .map(|s| tickets::status.eq(s))
                .unwrap_or_else(|| tickets::status.eq(existing.status.clone())),
            admin_notes
                .map(|n| tickets::admin_notes.eq(n))
                .unwrap_or_else(|| tickets::admin_notes.eq(existing.admin_notes.clone())),
            tickets::updated_at.eq(now),
        ))
        .execute(&mut conn)?;

    let updated: Ticket = tickets::table.find(ticket_id).first(&mut conn)?;
    let requesters = load_requesters(&mut conn, std::slice::from_ref(&updated))?;
    let requester = requesters.get(&updated.user_id).cloned();

    state.cache.invalidate(entity::TICKETS);
    state.feed.publish("tickets", ticket_id);

    Ok(Json(to_ticket_response(updated, requester)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<Value>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let _ticket = load_visible_ticket(&mut conn, &identity, ticket_id)?;

    let cache_key = format!("ticket={}", ticket_id);
    if let Some(cached) = state.cache.get(entity::TICKET_COMMENTS, &cache_key) {
        return Ok(Json(cached));
    }

    let rows: Vec<TicketComment> = ticket_comments::table
        .filter(ticket_comments::ticket_id.eq(ticket_id))
        .order(ticket_comments::created_at.asc())
        .load(&mut conn)?;

    let response: Vec<CommentResponse> = rows.into_iter().map(to_comment_response).collect();
    let value = serde_json::to_value(&response)?;
    state
        .cache
        .put(entity::TICKET_COMMENTS, &cache_key, value.clone());
    Ok(Json(value))
}

/// Append-only thread. The staff-side flag is derived from the caller's
/// resolved role, never taken from the request body.
pub async fn add_comment(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<AddCommentRequest>,
) -> AppResult<(StatusCode, Json<CommentResponse>)> {
    let content = validation::comment_content(&payload.content)?;

    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let ticket: Ticket = tickets::table
        .find(ticket_id)
        .first(&mut conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if !policy::can_comment_on_ticket(&identity, &ticket) {
        return Err(AppError::forbidden());
    }

    let new_comment = NewTicketComment {
        id: Uuid::new_v4(),
        ticket_id,
        user_id: identity.user_id,
        content,
        is_admin: identity.caps.is_central_atendimento,
    };

    diesel::insert_into(ticket_comments::table)
        .values(&new_comment)
        .execute(&mut conn)?;

    let comment: TicketComment = ticket_comments::table.find(new_comment.id).first(&mut conn)?;

    state.cache.invalidate(entity::TICKET_COMMENTS);
    state.feed.publish("ticket_comments", ticket_id);

    Ok((StatusCode::CREATED, Json(to_comment_response(comment))))
}

/// Change markers for one open ticket. The stream carries table names and the
/// ticket id only; clients re-fetch through the normal endpoints. Dropping
/// the connection drops the broadcast receiver, which is the unsubscribe.
pub async fn ticket_events(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    let _ticket = load_visible_ticket(&mut conn, &identity, ticket_id)?;
    drop(conn);

    let rx = state.feed.subscribe();
    let stream = stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) if event.ticket_id == ticket_id => {
                    let sse = Event::default()
                        .event(event.table)
                        .data(event.ticket_id.to_string());
                    return Some((Ok(sse), rx));
                }
                // Markers for other tickets, and gaps after lagging behind,
                // are both safe to skip: the client re-fetches on every
                // marker it does see.
                Ok(_) => continue,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn load_visible_ticket(
    conn: &mut PgConnection,
    identity: &Identity,
    ticket_id: Uuid,
) -> AppResult<Ticket> {
    let ticket: Ticket = tickets::table
        .find(ticket_id)
        .first(conn)
        .optional()?
        .ok_or_else(AppError::not_found)?;

    if !policy::can_view_ticket(identity, &ticket) {
        return Err(AppError::forbidden());
    }
    Ok(ticket)
}

fn load_requesters(
    conn: &mut PgConnection,
    rows: &[Ticket],
) -> AppResult<HashMap<Uuid, RequesterInfo>> {
    let user_ids: Vec<Uuid> = rows.iter().map(|t| t.user_id).collect();
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
                RequesterInfo {
                    full_name,
                    company,
                    room,
                    floor_name,
                },
            )
        })
        .collect())
}

fn to_ticket_response(ticket: Ticket, requester: Option<RequesterInfo>) -> TicketResponse {
    TicketResponse {
        id: ticket.id,
        user_id: ticket.user_id,
        title: ticket.title,
        description: ticket.description,
        status: ticket.status,
        admin_notes: ticket.admin_notes,
        created_at: to_iso(ticket.created_at),
        updated_at: to_iso(ticket.updated_at),
        requester,
    }
}

fn to_comment_response(comment: TicketComment) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        ticket_id: comment.ticket_id,
        user_id: comment.user_id,
        content: comment.content,
        is_admin: comment.is_admin,
        created_at: to_iso(comment.created_at),
    }
}
