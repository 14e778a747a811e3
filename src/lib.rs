// src/lib.rs
// Public library surface for integration tests (and the advise binary).

pub mod api;
pub mod catalog;
pub mod explain;
pub mod polish;
pub mod profile;
pub mod ranker;
pub mod registry;
pub mod scoring;
pub mod weights;

// ---- Re-exports for stable public API ----
pub use crate::api::{app, create_router, AppState};
pub use crate::catalog::{Catalog, CatalogHandle, CatalogLoadError, InstrumentRecord};
pub use crate::profile::{RequestProfile, Stage, ValidationError};
pub use crate::ranker::{rank, RankOptions};
pub use crate::scoring::{score, Criterion, ReasonEntry, ScoredResult};
pub use crate::weights::ScorePolicy;
