// src/lib.rs — Library root for repairbench

pub mod cli;
pub mod core;
pub mod dataset;
pub mod evaluator;
pub mod infra;
pub mod provider;
pub mod results;
pub mod util;
