//! Cross-module scenarios for the knowledge crate.

mod session_flow;
