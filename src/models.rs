use chrono::NaiveDateTime;
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::*;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = refresh_tokens)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
    pub revoked_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = refresh_tokens)]
pub struct NewRefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub issued_at: NaiveDateTime,
    pub expires_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = floors)]
pub struct Floor {
    pub id: Uuid,
    pub floor_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_available: bool,
    pub is_premium: bool,
    pub features: Option<Vec<String>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = floors)]
pub struct NewFloor {
    pub id: Uuid,
    pub floor_number: i32,
    pub name: String,
    pub description: Option<String>,
    pub is_available: bool,
    pub is_premium: bool,
    pub features: Option<Vec<String>>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = profiles)]
#[diesel(belongs_to(User, foreign_key = user_id))]
#[diesel(belongs_to(Floor, foreign_key = floor_id))]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub cpf: String,
    pub company: String,
    pub floor_id: Option<Uuid>,
    pub room: String,
    pub avatar_url: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub cpf: String,
    pub company: String,
    pub floor_id: Option<Uuid>,
    pub room: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = user_roles)]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct UserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_roles)]
pub struct NewUserRole {
    pub id: Uuid,
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = tickets)]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct Ticket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
    pub admin_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = tickets)]
pub struct NewTicket {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = ticket_comments)]
#[diesel(belongs_to(Ticket, foreign_key = ticket_id))]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_admin: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = ticket_comments)]
pub struct NewTicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = announcements)]
pub struct Announcement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = announcements)]
pub struct NewAnnouncement {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = menu_items)]
pub struct MenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = menu_items)]
pub struct NewMenuItem {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub category: Option<String>,
    pub is_available: bool,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = message_templates)]
pub struct MessageTemplate {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = message_templates)]
pub struct NewMessageTemplate {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub created_by: Option<Uuid>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = reception_messages)]
pub struct ReceptionMessage {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub has_input_field: bool,
    pub input_field_label: Option<String>,
    pub input_field_placeholder: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reception_messages)]
pub struct NewReceptionMessage {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category: Option<String>,
    pub has_input_field: bool,
    pub input_field_label: Option<String>,
    pub input_field_placeholder: Option<String>,
    pub is_active: bool,
    pub sort_order: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = reception_notifications)]
#[diesel(belongs_to(ReceptionMessage, foreign_key = message_id))]
pub struct ReceptionNotification {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message_id: Option<Uuid>,
    pub custom_content: Option<String>,
    pub input_value: Option<String>,
    pub requires_response: bool,
    pub response_value: Option<String>,
    pub responded_at: Option<NaiveDateTime>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = reception_notifications)]
pub struct NewReceptionNotification {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message_id: Option<Uuid>,
    pub custom_content: Option<String>,
    pub input_value: Option<String>,
    pub requires_response: bool,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = meeting_rooms)]
pub struct MeetingRoom {
    pub id: Uuid,
    pub name: String,
    pub floor: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = meeting_rooms)]
pub struct NewMeetingRoom {
    pub id: Uuid,
    pub name: String,
    pub floor: String,
    pub capacity: Option<i32>,
    pub description: Option<String>,
    pub is_available: bool,
}
