//! Persisted usage state and its file-backed repository.

pub mod repository;
pub mod state;

pub use repository::{StateRepository, StoreError, StoreResult};
pub use state::{LimitEstimate, LimitHit, TrackerState, UsageSample};
