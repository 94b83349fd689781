//! Route definitions for the weather record service

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Weather record routes, mounted under /weather
pub fn weather_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::get_all_weathers).post(handlers::create_weather),
        )
        .route(
            "/:id",
            get(handlers::get_weather)
                .patch(handlers::update_weather)
                .delete(handlers::delete_weather),
        )
        // overlapping segments must share one parameter name; extraction is positional
        .route("/:id/:limit", get(handlers::get_weathers_paged))
}
