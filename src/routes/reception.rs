use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::capabilities::RoleGate,
    auth::AuthenticatedUser,
    error::AppResult,
    identity,
    models::ReceptionMessage,
    schema::reception_messages,
    state::AppState,
};

#[derive(Serialize)]
pub struct ReceptionMessageResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub has_input_field: bool,
    pub input_field_label: Option<String>,
    pub input_field_placeholder: Option<String>,
    pub sort_order: i32,
}

/// Active canned messages for the send-notification screen, in display order.
/// The recepcao gate also admits central_atendimento and admin.
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ReceptionMessageResponse>>> {
    let mut conn = state.db()?;
    let identity = identity::resolve(&mut conn, &user)?;
    identity.require(RoleGate::Recepcao)?;

    let rows: Vec<ReceptionMessage> = reception_messages::table
        .filter(reception_messages::is_active.eq(true))
        .order(reception_messages::sort_order.asc())
        .load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|row| ReceptionMessageResponse {
            id: row.id,
            title: row.title,
            content: row.content,
            category: row.category,
            has_input_field: row.has_input_field,
            input_field_label: row.input_field_label,
            input_field_placeholder: row.input_field_placeholder,
            sort_order: row.sort_order,
        })
        .collect();

    Ok(Json(response))
}
