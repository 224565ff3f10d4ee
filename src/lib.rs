// logsift - lib.rs
//
// Library entry point, exposing every module for integration testing and for
// embedding the pipeline in another front end.
//
// The binary in `main.rs` is a thin CLI over this surface.

pub mod app;
pub mod core;
pub mod platform;
pub mod ui;
pub mod util;
