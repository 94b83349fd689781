//! Business logic services for the weather record service

pub mod weather;

pub use weather::WeatherService;
