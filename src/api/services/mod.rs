pub mod health;
pub mod tiny;

pub use health::{AppStartTime, HealthService, health_routes};
pub use tiny::{LongResponse, TinyResponse, TinyService, tiny_routes};
