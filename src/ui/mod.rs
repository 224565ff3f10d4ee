// logsift - ui/mod.rs
//
// UI layer: presentation only.
// Dependencies: app (buffers), core (read-only models), serde_json.
// Must NOT depend on: platform, direct I/O beyond the writer it is handed.

pub mod term;
