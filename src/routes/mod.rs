pub mod admin;
pub mod health;
pub mod page;
pub mod reset;
pub mod session;

pub use admin::admin_stats;
pub use health::health_check;
pub use page::{
    adjust_points, login, logout, request_password_reset, show_page, sign_up, toggle_theme,
};
pub use reset::{confirm_password_reset, show_reset_form};

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// Build the application router (without transport layers)
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(show_page))
        .route("/login", post(login))
        .route("/signup", post(sign_up))
        .route("/logout", post(logout))
        .route("/adjust", post(adjust_points))
        .route("/theme", post(toggle_theme))
        .route("/reset-password", post(request_password_reset))
        .route(
            "/reset-password/confirm",
            get(show_reset_form).post(confirm_password_reset),
        )
        .route("/health", get(health_check))
        .route("/admin/stats", get(admin_stats))
        .with_state(state)
}
