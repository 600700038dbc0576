pub mod activity;
pub mod admin;
pub mod auth;
pub mod buildings;
pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod health;
pub mod invoices;
pub mod maintenance;
pub mod rooms;
pub mod students;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::infrastructure::AppState;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Auth
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        // Students
        .route("/students", get(students::list_students))
        .route(
            "/students/:id",
            get(students::get_student).put(students::update_student),
        )
        .route("/students/:id/activate", post(students::activate_student))
        .route("/students/:id/reject", post(students::reject_student))
        .route("/students/:id/status", put(students::set_student_status))
        // Buildings
        .route(
            "/buildings",
            get(buildings::list_buildings).post(buildings::create_building),
        )
        .route(
            "/buildings/:id",
            get(buildings::get_building)
                .put(buildings::update_building)
                .delete(buildings::delete_building),
        )
        // Rooms
        .route("/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route(
            "/rooms/:id",
            get(rooms::get_room)
                .put(rooms::update_room)
                .delete(rooms::delete_room),
        )
        .route("/rooms/:id/status", put(rooms::set_room_status))
        .route("/rooms/:id/residents", get(rooms::list_residents))
        .route(
            "/rooms/:id/residents/:student_id",
            delete(rooms::remove_resident),
        )
        .route("/rooms/:id/recompute", post(rooms::recompute_room))
        // Contracts
        .route(
            "/contracts",
            get(contracts::list_contracts).post(contracts::create_contract),
        )
        .route(
            "/contracts/:id",
            get(contracts::get_contract)
                .put(contracts::update_contract)
                .delete(contracts::delete_contract),
        )
        .route(
            "/contracts/:id/terminate",
            post(contracts::terminate_contract),
        )
        // Invoices
        .route(
            "/invoices",
            get(invoices::list_invoices).post(invoices::create_invoice),
        )
        .route(
            "/invoices/:id",
            get(invoices::get_invoice).delete(invoices::delete_invoice),
        )
        .route(
            "/invoices/:id/status",
            put(invoices::update_invoice_status),
        )
        // Maintenance
        .route(
            "/maintenance",
            get(maintenance::list_requests).post(maintenance::create_request),
        )
        .route("/maintenance/:id/status", put(maintenance::update_status))
        .route("/maintenance/:id/cancel", post(maintenance::cancel_request))
        // Activity, dashboard, admin
        .route("/activity-logs", get(activity::list_activity_logs))
        .route("/dashboard", get(dashboard::get_dashboard))
        .route("/admin/expire", post(admin::run_expiration))
        .with_state(state)
}
