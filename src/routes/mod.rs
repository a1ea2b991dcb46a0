use axum::http::HeaderValue;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{auth::AuthenticatedUser, state::AppState};

pub mod admin_users;
pub mod announcements;
pub mod auth;
pub mod building;
pub mod health;
pub mod menu;
pub mod notifications;
pub mod profiles;
pub mod reception;
pub mod support;
pub mod templates;
pub mod tickets;

pub fn create_router(state: AppState) -> Router<()> {
    let cors = if let Some(origins) = state.config.cors_allowed_origin.as_ref() {
        let headers: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|value| {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed
                        .parse::<HeaderValue>()
                        .expect("invalid CORS allowed origin")
                })
            })
            .collect();

        let allow_origin = AllowOrigin::list(headers);

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    } else {
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true)
    };

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me));

    let tickets_routes = Router::new()
        .route("/", get(tickets::list_tickets).post(tickets::create_ticket))
        .route(
            "/:id",
            get(tickets::get_ticket).patch(tickets::update_ticket),
        )
        .route(
            "/:id/comments",
            get(tickets::list_comments).post(tickets::add_comment),
        )
        .route("/:id/events", get(tickets::ticket_events));

    let announcements_routes = Router::new()
        .route(
            "/",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/:id",
            patch(announcements::update_announcement).delete(announcements::delete_announcement),
        );

    let menu_routes = Router::new()
        .route("/", get(menu::list_menu_items).post(menu::create_menu_item))
        .route(
            "/:id",
            patch(menu::update_menu_item).delete(menu::delete_menu_item),
        );

    let templates_routes = Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::create_template),
        )
        .route(
            "/:id",
            patch(templates::update_template).delete(templates::delete_template),
        );

    let reception_routes = Router::new().route("/messages", get(reception::list_messages));

    let notifications_routes = Router::new()
        .route(
            "/",
            get(notifications::list_notifications).post(notifications::send_notification),
        )
        .route("/:id/response", post(notifications::respond_to_notification))
        .route("/:id/read", post(notifications::mark_as_read));

    let profiles_routes = Router::new()
        .route("/", get(profiles::list_profiles))
        .route(
            "/me",
            get(profiles::get_own_profile).patch(profiles::update_own_profile),
        )
        .route("/:user_id", patch(profiles::admin_update_profile));

    let admin_routes = Router::new()
        .route("/users", post(admin_users::create_user))
        .route("/users/:user_id", axum::routing::delete(admin_users::delete_user))
        .route("/users/:user_id/role", patch(admin_users::update_role));

    let protected_state = state.clone();
    let protected_routes = Router::new()
        .nest("/api/tickets", tickets_routes)
        .nest("/api/announcements", announcements_routes)
        .nest("/api/menu", menu_routes)
        .nest("/api/templates", templates_routes)
        .nest("/api/reception", reception_routes)
        .nest("/api/notifications", notifications_routes)
        .nest("/api/profiles", profiles_routes)
        .route("/api/floors", get(building::list_floors))
        .route("/api/meeting-rooms", get(building::list_meeting_rooms))
        .nest("/api/admin", admin_routes)
        .layer(middleware::from_extractor_with_state::<AuthenticatedUser, _>(protected_state));

    Router::new()
        .merge(protected_routes)
        .nest("/api/auth", auth_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(cors)
        .layer(DefaultBodyLimit::max(1024 * 256))
}
