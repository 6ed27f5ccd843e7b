//! Service layer: admission, routing, and presence orchestration.
//!
//! [`RelayService`] owns the user and agent registries and is the only
//! component that mutates them.

pub mod relay_service;

pub use relay_service::{RelayService, RelayStats, RouteOutcome};
