// logsift - app/mod.rs
//
// Application layer: worker output ingestion, buffering, and the pipeline
// driver.
// Dependencies: core layer, util.
// Must NOT depend on: ui, platform specifics.

pub mod buffer;
pub mod gate;
pub mod pipeline;
pub mod producer;
pub mod scheduler;
