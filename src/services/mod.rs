//! Service layer for business logic
//!
//! Shared between the HTTP handlers and the CLI subcommands.

pub mod lookup;
pub mod write_behind;

pub use lookup::{LinkPolicy, LookupCoordinator, Shortened};
pub use write_behind::{Reservation, WriteBehind};
