// Library root
// -----------
// This crate exposes the simulator as a library. The binary (`main.rs`)
// wires configuration, the health gate and the terminal menu together.
//
// Module responsibilities:
// - `config`: defaults, config file, env overrides and scenarios.
// - `error`: typed errors for configuration and session misuse.
// - `api`: the blocking HTTP transport and health probe.
// - `session`: one simulated dial: id, input history, current state.
// - `runner`: interactive and scripted control loops over a session.
// - `ui`: terminal rendering and prompts for the runners.
//
// The runners only see the `Transport`, `Operator` and `ScriptObserver`
// traits, so they can be driven without a network or a terminal.
pub mod api;
pub mod config;
pub mod error;
pub mod runner;
pub mod session;
pub mod ui;
