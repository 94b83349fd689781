//! HTTP handlers for weather record endpoints
//!
//! The full-listing read goes through the listing cache; every successful
//! mutation deletes the cached listing afterwards, so the next listing read
//! repopulates from the store. Paged and single-record reads always go to
//! the store directly.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Map, Value};

use crate::cache::{ListingCache, ALL_WEATHERS_KEY};
use crate::error::StoreError;
use crate::services::weather::{WeatherRecord, WeatherService};
use crate::validation;
use crate::AppState;

/// Create a weather record
pub async fn create_weather(
    State(state): State<AppState>,
    Json(body): Json<Map<String, Value>>,
) -> (StatusCode, Json<Value>) {
    let missing = validation::missing_required_fields(&body);
    if !missing.is_empty() {
        return (StatusCode::OK, Json(creation_failed(missing)));
    }

    let service = WeatherService::new(state.db.clone());
    match service.create(&body).await {
        Ok(record) => {
            invalidate_listing(state.cache.as_ref()).await;
            (
                StatusCode::OK,
                Json(weather_envelope("weather successfully created!", &record)),
            )
        }
        Err(StoreError::Validation { field, message }) => {
            tracing::debug!("Rejected weather creation: {} {}", field, message);
            (StatusCode::OK, Json(creation_failed(vec![field])))
        }
        Err(err) => {
            tracing::error!("Error in adding weather to db: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// List every weather record, served from the cache when possible
pub async fn get_all_weathers(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    if let Some(records) = read_cached_listing(state.cache.as_ref()).await {
        tracing::info!("Hit cache in getting all weathers");
        return (StatusCode::OK, Json(json!({ "weathers": records })));
    }

    tracing::info!("Miss cache in getting all weathers");
    let service = WeatherService::new(state.db.clone());
    match service.list_all().await {
        Ok(records) => {
            store_cached_listing(state.cache.as_ref(), &records).await;
            (StatusCode::OK, Json(json!({ "weathers": records })))
        }
        Err(err) => {
            tracing::error!("Error in getting all weathers: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// List weather records one page at a time
pub async fn get_weathers_paged(
    State(state): State<AppState>,
    Path((page, limit)): Path<(u32, u32)>,
) -> (StatusCode, Json<Value>) {
    let service = WeatherService::new(state.db.clone());
    match service.list_paged(page, limit).await {
        Ok(paged) => (
            StatusCode::OK,
            Json(json!({
                "weathers": paged.items,
                "total": paged.total,
                "pages": paged.pages,
                "page": page,
            })),
        ),
        Err(err) => {
            tracing::error!("Error in getting weathers by page: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// Fetch a single weather record by id
pub async fn get_weather(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> (StatusCode, Json<Value>) {
    let service = WeatherService::new(state.db.clone());
    match service.get(id).await {
        Ok(record) => (StatusCode::OK, Json(json!({ "weather": [record] }))),
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("No weather Found in id: {}", id) })),
        ),
        Err(err) => {
            tracing::error!("Error in getting weather: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// Apply a partial update to a weather record
pub async fn update_weather(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<Map<String, Value>>,
) -> (StatusCode, Json<Value>) {
    let service = WeatherService::new(state.db.clone());
    match service.update(id, &body).await {
        Ok(record) => {
            invalidate_listing(state.cache.as_ref()).await;
            (
                StatusCode::OK,
                Json(weather_envelope("weather successfully updated!", &record)),
            )
        }
        Err(StoreError::InvalidField(key)) => {
            tracing::debug!("Invalid key in updating weather: {}", key);
            (
                StatusCode::BAD_REQUEST,
                Json(json!({ "message": format!("Invalid key: {}", key) })),
            )
        }
        Err(StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": format!("weather id: {} not found!", id) })),
        ),
        Err(err) => {
            tracing::error!("Error in updating weather: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// Delete a weather record by id
pub async fn delete_weather(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> (StatusCode, Json<Value>) {
    let service = WeatherService::new(state.db.clone());
    match service.delete(id).await {
        Ok(true) => {
            invalidate_listing(state.cache.as_ref()).await;
            (
                StatusCode::OK,
                Json(json!({ "message": "weather successfully removed!" })),
            )
        }
        Ok(false) => {
            tracing::info!("Delete weather with id {} not found", id);
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "message": "No weather Found" })),
            )
        }
        Err(err) => {
            tracing::error!("Error in deleting weather: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(something_went_wrong()),
            )
        }
    }
}

/// Shape the `{message, weather: [record]}` envelope shared by mutations
fn weather_envelope(message: &str, record: &WeatherRecord) -> Value {
    json!({ "message": message, "weather": [record] })
}

fn creation_failed(required: Vec<String>) -> Value {
    json!({ "message": "weather creation failed!", "required": required })
}

fn something_went_wrong() -> Value {
    json!({ "message": "Something went wrong!" })
}

/// Read the cached listing; connectivity or decoding problems degrade to a
/// cache miss instead of failing the request.
async fn read_cached_listing(cache: &dyn ListingCache) -> Option<Vec<WeatherRecord>> {
    match cache.get(ALL_WEATHERS_KEY).await {
        Ok(Some(payload)) => match serde_json::from_slice(&payload) {
            Ok(records) => Some(records),
            Err(err) => {
                tracing::warn!("Discarding undecodable cached listing: {}", err);
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            tracing::warn!("Cache read failed, falling back to db: {}", err);
            None
        }
    }
}

/// Store the listing payload; failures are logged, never surfaced.
async fn store_cached_listing(cache: &dyn ListingCache, records: &[WeatherRecord]) {
    match serde_json::to_vec(records) {
        Ok(payload) => {
            if let Err(err) = cache.set(ALL_WEATHERS_KEY, &payload).await {
                tracing::warn!("Failed to populate listing cache: {}", err);
            }
        }
        Err(err) => tracing::warn!("Failed to encode listing for cache: {}", err),
    }
}

/// Drop the cached listing after a successful mutation.
async fn invalidate_listing(cache: &dyn ListingCache) {
    if let Err(err) = cache.delete(ALL_WEATHERS_KEY).await {
        tracing::warn!("Failed to invalidate listing cache: {}", err);
    }
}
