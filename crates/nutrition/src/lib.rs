//! Recipe nutrition aggregation.
//!
//! Listens for recipes, fans out one ingredient lookup per reference,
//! collects the partial set of answers and publishes one classified
//! aggregate per recipe. [`service`] is the pure computation; [`worker`]
//! is the fan-out/fan-in orchestration; [`kafka`] wires both to the
//! broker.

pub mod kafka;
pub mod service;
pub mod worker;

pub use service::{NutritionError, NutritionService};
pub use worker::{LookupSession, RecipeWorker, SessionFactory};
