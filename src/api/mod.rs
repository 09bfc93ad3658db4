//! HTTP surface
//!
//! - `services::tiny`: `GET /tiny/?longUrl=` and `GET /long/?tinyUrl=`
//! - `services::health`: health, readiness and liveness probes

pub mod services;
