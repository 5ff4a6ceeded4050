use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub mod dto;
pub mod handlers;
pub mod repo;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/inventory",
            post(handlers::create_item).get(handlers::list_items),
        )
        .route("/inventory/mine", get(handlers::my_items))
        .route("/inventory/user/:id", get(handlers::items_by_user))
        .route("/inventory/stats", get(handlers::stats))
        .route(
            "/inventory/:id",
            get(handlers::get_item)
                .patch(handlers::update_item)
                .delete(handlers::delete_item),
        )
}
