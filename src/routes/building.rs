use axum::{extract::State, Json};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUser,
    error::AppResult,
    models::{Floor, MeetingRoom},
    schema::{floors, meeting_rooms},
    state::AppState,
};

#[derive(Serialize)]
pub struct FloorResponse {
    pub id: Uuid,
    pub floor_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_available: bool,
    pub is_premium: bool,
    pub features: Vec<String>,
}

#[derive(Serialize)]
pub struct MeetingRoomResponse {
    pub id: Uuid,
    pub name: String,
    pub floor: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
}

/// Static reference data: every authenticated occupant may browse floors.
pub async fn list_floors(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<FloorResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<Floor> = floors::table
        .order(floors::floor_number.asc())
        .load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|floor| FloorResponse {
            id: floor.id,
            floor_number: floor.floor_number,
            name: floor.name,
            description: floor.description,
            is_available: floor.is_available,
            is_premium: floor.is_premium,
            features: floor.features.unwrap_or_default(),
        })
        .collect();

    Ok(Json(response))
}

/// Bookable rooms, available ones only, ordered by floor then name.
pub async fn list_meeting_rooms(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> AppResult<Json<Vec<MeetingRoomResponse>>> {
    let mut conn = state.db()?;

    let rows: Vec<MeetingRoom> = meeting_rooms::table
        .filter(meeting_rooms::is_available.eq(true))
        .order((meeting_rooms::floor.asc(), meeting_rooms::name.asc()))
        .load(&mut conn)?;

    let response = rows
        .into_iter()
        .map(|room| MeetingRoomResponse {
            id: room.id,
            name: room.name,
            floor: room.floor,
            capacity: room.capacity,
            description: room.description,
        })
        .collect();

    Ok(Json(response))
}
