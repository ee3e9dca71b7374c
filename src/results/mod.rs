// src/results/mod.rs — Results persistence

pub mod store;
pub mod writer;

pub use store::{ResultsStore, SplitRecords};
pub use writer::{spawn_results_writer, ResultsHandle};
