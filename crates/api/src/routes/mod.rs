mod api;
mod health;
mod webhook;

pub use api::api_router;
pub use health::health_router;
pub use webhook::webhook_router;
