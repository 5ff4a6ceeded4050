use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/signup", post(handlers::signup))
        .route("/users/login", post(handlers::login))
        .route("/users/refresh", post(handlers::refresh))
        .route("/users/logout", post(handlers::logout))
        .route(
            "/users/me",
            get(handlers::me)
                .patch(handlers::update_me)
                .delete(handlers::delete_me),
        )
        .route("/users", get(handlers::list_users))
        .route("/users/:id", delete(handlers::delete_user))
        .route("/admin/create-admin", post(handlers::create_account))
}
