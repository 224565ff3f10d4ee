// logsift - platform/mod.rs
//
// Platform abstraction layer: config file location and loading, input files.
// Dependencies: standard library, directories, serde, toml, util.
// Must NOT depend on: core, app, ui.

pub mod config;
pub mod fs;
