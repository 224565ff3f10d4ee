// logsift - core/mod.rs
//
// Core business logic layer: the data model, the sanitizer, and the chat
// output classifier.
// Dependencies: standard library and regex only.
// Must NOT depend on: ui, platform, app, or any I/O.

pub mod classify;
pub mod model;
pub(crate) mod patterns;
pub mod sanitize;
pub mod trace;
