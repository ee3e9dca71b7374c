// src/core/mod.rs — Core solving engine

pub mod cancel;
pub mod iteration;
pub mod orchestrator;
pub mod repair;
pub mod scheduler;
pub mod types;

pub use cancel::CancelToken;
pub use orchestrator::{DatasetOrchestrator, OrchestratorConfig};
