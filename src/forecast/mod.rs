mod client;
pub mod evaluator;
mod models;
pub mod window;

pub use client::{
    ForecastClient, ForecastClientConfig, ForecastError, ForecastProvider, DARKSKY_API_URL,
};
pub use models::*;
