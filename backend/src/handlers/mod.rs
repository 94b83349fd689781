//! HTTP handlers for the weather record service

pub mod health;
pub mod weather;

pub use health::health_check;
pub use weather::{
    create_weather, delete_weather, get_all_weathers, get_weather, get_weathers_paged,
    update_weather,
};
