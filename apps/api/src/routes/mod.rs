pub mod health;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};

use crate::admin::handlers as admin;
use crate::deliveries::handlers as deliveries;
use crate::recipients::handlers as recipients;
use crate::reminders::handlers as reminders;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Recipient directory
        .route("/api/v1/recipients", get(recipients::handle_get_recipients))
        .route(
            "/api/v1/recipients/search",
            get(recipients::handle_search_recipients),
        )
        .route(
            "/api/v1/recipients/refresh",
            post(recipients::handle_refresh_recipients),
        )
        // Deliveries
        .route(
            "/api/v1/deliveries",
            get(deliveries::handle_list_deliveries).post(deliveries::handle_save_delivery),
        )
        .route("/api/v1/deliveries/:id", get(deliveries::handle_get_delivery))
        .route(
            "/api/v1/deliveries/:id/status",
            patch(deliveries::handle_update_status),
        )
        .route(
            "/api/v1/deliveries/:id/reminders",
            post(reminders::handle_send_reminder),
        )
        // Scheduled trigger
        .route(
            "/api/v1/reminders/automatic",
            post(reminders::handle_automatic_reminders),
        )
        // Admin panel
        .route("/api/v1/admin/users", get(admin::handle_list_users))
        .route(
            "/api/v1/admin/preauthorized",
            get(admin::handle_list_preauthorized).post(admin::handle_add_preauthorized),
        )
        .route(
            "/api/v1/admin/preauthorized/:email",
            delete(admin::handle_remove_preauthorized),
        )
        .with_state(state)
}
